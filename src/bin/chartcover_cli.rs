//! ChartCover CLI - Builds, inspects and exports cover templates
//!
//! Commands: build, inspect, render, covers, cmyk
//! Outputs JSON to stdout, logs to stderr (RUST_LOG)
//! Returns non-zero on failure, 2 on preflight failure

use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chartcover_core::{
    export_pdf, fill_placeholders, to_cmyk, CoverConfig, CoverError, CoverResult, PageRange,
    Placeholders, PrintSpec, Template,
    pipeline::run_preflight,
    print::ColorSpace,
};

#[derive(Parser)]
#[command(name = "chartcover-cli")]
#[command(about = "ChartCover CLI - Cover Template Generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cover template and save it as a template file
    Build {
        /// Template file to write
        #[arg(short, long)]
        out: PathBuf,

        /// Also write the rendered template as a PDF preview
        #[arg(long)]
        preview: Option<PathBuf>,

        /// Seed for a reproducible starfield
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Open a template file and report on it
    Inspect {
        /// Template file
        template: PathBuf,
    },

    /// Export a template file to PDF
    Render {
        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        /// PDF to write
        #[arg(short, long)]
        out: PathBuf,

        /// Pages to export: all, N or N-M
        #[arg(long)]
        pages: Option<PageRange>,

        #[arg(long, requires_all = ["birth_info", "location"])]
        name: Option<String>,

        #[arg(long, requires_all = ["name", "location"])]
        birth_info: Option<String>,

        #[arg(long, requires_all = ["name", "birth_info"])]
        location: Option<String>,

        /// Write RGB fills instead of CMYK swatches
        #[arg(long)]
        rgb: bool,
    },

    /// Generate one filled cover PDF per color scheme
    Covers {
        #[arg(long)]
        name: String,

        #[arg(long)]
        birth_info: String,

        #[arg(long)]
        location: String,

        /// Output folder
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Convert an RGB triple to CMYK
    #[command(allow_negative_numbers = true)]
    Cmyk { r: i64, g: i64, b: i64 },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match CoverConfig::load(path) {
            Ok(c) => c,
            Err(e) => return failure(&format!("Failed to load config: {}", e)),
        },
        None => CoverConfig::default(),
    };

    let result = match cli.command {
        Commands::Build { out, preview, seed } => build(config, &out, preview.as_deref(), seed),
        Commands::Inspect { template } => inspect(&template),
        Commands::Render { template, out, pages, name, birth_info, location, rgb } => {
            let values = match (name, birth_info, location) {
                (Some(n), Some(b), Some(l)) => Some(Placeholders::new(n, b, l)),
                _ => None,
            };
            let mut spec = config.print.clone();
            if let Some(range) = pages {
                spec.page_range = range;
            }
            if rgb {
                spec.color_space = ColorSpace::Rgb;
            }
            render(&template, &out, values.as_ref(), &spec)
        }
        Commands::Covers { name, birth_info, location, out_dir } => {
            covers(&config, Placeholders::new(name, birth_info, location), &out_dir)
        }
        Commands::Cmyk { r, g, b } => to_cmyk(r, g, b).map(|cmyk| {
            let rgb = json!({ "r": r, "g": g, "b": b });
            (json!({ "success": true, "rgb": rgb, "cmyk": cmyk }), ExitCode::SUCCESS)
        }),
    };

    match result {
        Ok((output, code)) => emit(&output, code),
        Err(e @ CoverError::PreflightFailed(_)) => {
            emit(&json!({ "success": false, "error": e.to_string() }), ExitCode::from(2))
        }
        Err(e) => failure(&e.to_string()),
    }
}

type Outcome = CoverResult<(serde_json::Value, ExitCode)>;

fn build(config: CoverConfig, out: &Path, preview: Option<&Path>, seed: Option<u64>) -> Outcome {
    let config = CoverConfig {
        seed: seed.or(config.seed),
        ..config
    };
    let mut template = config.build_template()?;

    // A template is rendered once before it can be saved.
    let exported = export_pdf(&mut template, &config.print)?;
    if let Some(path) = preview {
        fs::write(path, &exported.bytes)?;
    }
    template.save(out)?;

    Ok((
        json!({
            "success": true,
            "template": out,
            "preview": preview,
            "id": template.id,
            "pages": template.pages.len(),
            "swatches": template.colors.len(),
            "manifest": exported.manifest,
        }),
        ExitCode::SUCCESS,
    ))
}

fn inspect(path: &Path) -> Outcome {
    let template = Template::load(path)?;
    let preflight = run_preflight(&template, Default::default());
    let code = if preflight.valid { ExitCode::SUCCESS } else { ExitCode::from(2) };

    let pages: Vec<_> = template
        .pages
        .iter()
        .map(|p| {
            json!({ "scheme": p.scheme.name, "regions": p.regions.len(), "stars": p.stars.len() })
        })
        .collect();
    let swatches: Vec<_> = template.colors.iter().map(|c| &c.name).collect();

    Ok((
        json!({
            "id": template.id,
            "name": template.name,
            "engineVersion": template.engine_version,
            "state": template.state(),
            "geometry": template.geometry,
            "pages": pages,
            "tokens": template.placeholder_tokens(),
            "swatches": swatches,
            "preflight": preflight,
        }),
        code,
    ))
}

fn render(path: &Path, out: &Path, values: Option<&Placeholders>, spec: &PrintSpec) -> Outcome {
    let saved = Template::load(path)?;
    let mut template = match values {
        Some(values) => fill_placeholders(&saved, values)?,
        None => saved.instantiate(),
    };

    let exported = export_pdf(&mut template, spec)?;
    fs::write(out, &exported.bytes)?;

    Ok((
        json!({
            "success": true,
            "output": out,
            "bytes": exported.bytes.len(),
            "manifest": exported.manifest,
        }),
        ExitCode::SUCCESS,
    ))
}

fn covers(config: &CoverConfig, values: Placeholders, out_dir: &Path) -> Outcome {
    let stem = file_stem(&values.name);
    fs::create_dir_all(out_dir)?;
    let template = config.build_template()?;
    let mut filled = fill_placeholders(&template, &values)?;

    let mut files = vec![];
    for page in 1..=filled.pages.len() {
        let scheme = filled.pages[page - 1].scheme.name.clone();
        let spec = config.print.clone().pages(PageRange::single(page));
        let exported = export_pdf(&mut filled, &spec)?;

        let path = out_dir.join(format!("{}_{}_Cover.pdf", stem, file_stem(&scheme)));
        fs::write(&path, &exported.bytes)?;
        files.push(json!({ "scheme": scheme, "path": path, "hash": exported.manifest.pdf_hash }));
    }

    Ok((
        json!({ "success": true, "outputFolder": out_dir, "files": files }),
        ExitCode::SUCCESS,
    ))
}

/// Single path component safe to use inside the output folder
fn file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "Cover".to_string()
    } else {
        cleaned.to_string()
    }
}

fn emit(output: &serde_json::Value, code: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(output) {
        Ok(text) => {
            println!("{}", text);
            code
        }
        Err(e) => failure(&e.to_string()),
    }
}

fn failure(message: &str) -> ExitCode {
    println!("{}", json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_stays_in_folder() {
        assert_eq!(file_stem("Ada Lovelace"), "Ada Lovelace");
        assert_eq!(file_stem("Zoë"), "Zoë");
        assert_eq!(file_stem("../../x"), "_.._x");
        assert_eq!(file_stem("a/b\\c"), "a_b_c");
        assert_eq!(file_stem("line\nbreak"), "line_break");
        assert_eq!(file_stem(".."), "Cover");
        assert_eq!(file_stem("   "), "Cover");
    }

    #[test]
    fn test_covers_writes_inside_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let values = Placeholders::new("../escape", "1990", "Paris");
        let (output, _) = covers(&CoverConfig::default(), values, dir.path()).unwrap();

        let files = output["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        for file in files {
            let path = PathBuf::from(file["path"].as_str().unwrap());
            assert_eq!(path.parent().unwrap(), dir.path());
            assert!(path.exists());
        }
        assert!(dir.path().join("_escape_Black_Cover.pdf").exists());
    }
}
