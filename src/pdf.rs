//! PDF backend built on pdf-writer
//!
//! Template bounds use a top-left origin. PDF user space starts bottom-left,
//! so every y coordinate is flipped against the page height.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::color::NamedColor;
use crate::error::{CoverError, CoverResult};
use crate::hashing::sha256_hex;
use crate::pipeline::{render, ExportManifest, RenderBackend, RenderReport, TextRun};
use crate::print::{ColorSpace, PrintSpec};
use crate::templates::{Alignment, Bounds, PageGeometry, Template};

const REGULAR_FONT: Name<'static> = Name(b"F1");
const BOLD_FONT: Name<'static> = Name(b"F2");

/// Average glyph advance as a fraction of the font size
const AVG_CHAR_WIDTH: f64 = 0.6;

/// Bezier control distance for a quarter circle
const KAPPA: f64 = 0.552_284_749_8;

struct OpenPage {
    id: Ref,
    content_id: Ref,
    content: Content,
    geometry: PageGeometry,
}

pub struct PdfBackend {
    pdf: Pdf,
    color_space: ColorSpace,
    include_bleed: bool,
    page_tree_id: Ref,
    regular_font_id: Ref,
    bold_font_id: Ref,
    next_ref_id: i32,
    pages: Vec<Ref>,
    current: Option<OpenPage>,
}

impl PdfBackend {
    pub fn new(title: &str, spec: &PrintSpec) -> Self {
        let mut pdf = Pdf::new();

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let info_id = Ref::new(3);
        let regular_font_id = Ref::new(4);
        let bold_font_id = Ref::new(5);

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.document_info(info_id)
            .title(TextStr(title))
            .creator(TextStr(concat!("chartcover ", env!("CARGO_PKG_VERSION"))));
        pdf.type1_font(regular_font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_font_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        Self {
            pdf,
            color_space: spec.color_space,
            include_bleed: spec.include_bleed,
            page_tree_id,
            regular_font_id,
            bold_font_id,
            next_ref_id: 6,
            pages: vec![],
            current: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write the page tree and return the file bytes
    pub fn finish(mut self) -> CoverResult<Vec<u8>> {
        if self.current.is_some() {
            return Err(CoverError::Backend("page still open".into()));
        }
        let mut page_tree = self.pdf.pages(self.page_tree_id);
        page_tree.kids(self.pages.iter().copied());
        page_tree.count(self.pages.len() as i32);
        page_tree.finish();
        Ok(self.pdf.finish())
    }

    fn alloc_ref(&mut self) -> Ref {
        let id = Ref::new(self.next_ref_id);
        self.next_ref_id += 1;
        id
    }

    fn open_page(&mut self) -> CoverResult<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| CoverError::Backend("no page open".into()))
    }

    fn set_fill(color_space: ColorSpace, content: &mut Content, color: &NamedColor) {
        match color_space {
            ColorSpace::Cmyk => {
                let [c, m, y, k] = color.value.channels().map(|v| (v / 100.0) as f32);
                content.set_fill_cmyk(c, m, y, k);
            }
            ColorSpace::Rgb => {
                let rgb = color.source;
                content.set_fill_rgb(
                    rgb.r as f32 / 255.0,
                    rgb.g as f32 / 255.0,
                    rgb.b as f32 / 255.0,
                );
            }
        }
    }
}

impl RenderBackend for PdfBackend {
    fn begin_page(&mut self, _index: usize, geometry: &PageGeometry) -> CoverResult<()> {
        if self.current.is_some() {
            return Err(CoverError::Backend("previous page not ended".into()));
        }
        let id = self.alloc_ref();
        let content_id = self.alloc_ref();
        self.current = Some(OpenPage {
            id,
            content_id,
            content: Content::new(),
            geometry: *geometry,
        });
        Ok(())
    }

    fn fill_rect(&mut self, bounds: &Bounds, color: &NamedColor) -> CoverResult<()> {
        let color_space = self.color_space;
        let page = self.open_page()?;
        let y = page.geometry.height - bounds.bottom;
        Self::set_fill(color_space, &mut page.content, color);
        page.content.rect(
            bounds.left as f32,
            y as f32,
            bounds.width() as f32,
            bounds.height() as f32,
        );
        page.content.fill_nonzero();
        Ok(())
    }

    fn fill_ellipse(&mut self, bounds: &Bounds, color: &NamedColor) -> CoverResult<()> {
        let color_space = self.color_space;
        let page = self.open_page()?;
        let rx = bounds.width() / 2.0;
        let ry = bounds.height() / 2.0;
        let cx = bounds.left + rx;
        let cy = page.geometry.height - (bounds.top + ry);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        let p = |v: f64| v as f32;

        Self::set_fill(color_space, &mut page.content, color);
        let content = &mut page.content;
        content.move_to(p(cx + rx), p(cy));
        content.cubic_to(p(cx + rx), p(cy + ky), p(cx + kx), p(cy + ry), p(cx), p(cy + ry));
        content.cubic_to(p(cx - kx), p(cy + ry), p(cx - rx), p(cy + ky), p(cx - rx), p(cy));
        content.cubic_to(p(cx - rx), p(cy - ky), p(cx - kx), p(cy - ry), p(cx), p(cy - ry));
        content.cubic_to(p(cx + kx), p(cy - ry), p(cx + rx), p(cy - ky), p(cx + rx), p(cy));
        content.close_path();
        content.fill_nonzero();
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> CoverResult<()> {
        let color_space = self.color_space;
        let page = self.open_page()?;
        let width = estimate_text_width(run.contents, run.font_size);
        let x = match run.alignment {
            Alignment::Left => run.bounds.left,
            Alignment::Center => run.bounds.left + (run.bounds.width() - width) / 2.0,
            Alignment::Right => run.bounds.right - width,
        };
        // First baseline sits one font size below the region top.
        let baseline = page.geometry.height - (run.bounds.top + run.font_size);
        let font = if run.bold { BOLD_FONT } else { REGULAR_FONT };
        let encoded = encode_win_ansi(run.contents);

        Self::set_fill(color_space, &mut page.content, run.color);
        page.content.begin_text();
        page.content.set_font(font, run.font_size as f32);
        page.content.next_line(x as f32, baseline as f32);
        page.content.show(Str(&encoded));
        page.content.end_text();
        Ok(())
    }

    fn end_page(&mut self) -> CoverResult<()> {
        let open = self
            .current
            .take()
            .ok_or_else(|| CoverError::Backend("no page open".into()))?;
        let geometry = open.geometry;
        let trim = Rect::new(0.0, 0.0, geometry.width as f32, geometry.height as f32);
        let media = if self.include_bleed {
            let b = geometry.bleed as f32;
            Rect::new(-b, -b, geometry.width as f32 + b, geometry.height as f32 + b)
        } else {
            trim
        };

        self.pdf.stream(open.content_id, &open.content.finish());

        let mut page = self.pdf.page(open.id);
        page.media_box(media);
        page.bleed_box(media);
        page.trim_box(trim);
        page.parent(self.page_tree_id);
        page.contents(open.content_id);
        page.resources()
            .fonts()
            .pair(REGULAR_FONT, self.regular_font_id)
            .pair(BOLD_FONT, self.bold_font_id);
        page.finish();

        self.pages.push(open.id);
        Ok(())
    }
}

/// Rough advance width for the standard Helvetica faces
pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * AVG_CHAR_WIDTH
}

/// Code points of WinAnsi bytes 0x80..=0x9F; `None` marks unassigned slots
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// WinAnsiEncoding bytes; characters outside it become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match u32::from(c) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&mapped| mapped == Some(c))
            .map_or(b'?', |i| 0x80 + i as u8),
    }
}

#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub bytes: Vec<u8>,
    pub report: RenderReport,
    pub manifest: ExportManifest,
}

/// Render a template to PDF bytes in one call
pub fn export_pdf(template: &mut Template, spec: &PrintSpec) -> CoverResult<ExportedPdf> {
    let mut backend = PdfBackend::new(&template.name, spec);
    let report = render(template, &mut backend, spec)?;
    let bytes = backend.finish()?;
    let manifest = ExportManifest::new(template, &report, spec, sha256_hex(&bytes))?;
    log::info!(
        "exported {} bytes for template {} ({})",
        bytes.len(),
        template.id,
        spec.preset
    );
    Ok(ExportedPdf { bytes, report, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Ada"), b"Ada".to_vec());
        assert_eq!(encode_win_ansi("Zoë"), vec![b'Z', b'o', 0xEB]);
        assert_eq!(encode_win_ansi("☉"), b"?".to_vec());
    }

    #[test]
    fn test_encode_win_ansi_high_block() {
        assert_eq!(encode_win_ansi("€"), vec![0x80]);
        assert_eq!(encode_win_ansi("‘’“”"), vec![0x91, 0x92, 0x93, 0x94]);
        assert_eq!(encode_win_ansi("1990–2000"), b"1990\x962000".to_vec());
        assert_eq!(encode_win_ansi("Ÿ"), vec![0x9F]);
        // C1 controls have no WinAnsi glyph
        assert_eq!(encode_win_ansi("\u{0080}\u{009F}"), b"??".to_vec());
    }

    #[test]
    fn test_estimate_text_width() {
        assert_eq!(estimate_text_width("", 36.0), 0.0);
        assert!((estimate_text_width("{{NAME}}", 10.0) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_rejects_open_page() {
        let mut backend = PdfBackend::new("t", &PrintSpec::default());
        backend.begin_page(0, &PageGeometry::default()).unwrap();
        assert!(backend.begin_page(1, &PageGeometry::default()).is_err());
        assert!(backend.finish().is_err());
    }

    #[test]
    fn test_end_without_begin() {
        let mut backend = PdfBackend::new("t", &PrintSpec::default());
        assert!(backend.end_page().is_err());
        assert_eq!(backend.page_count(), 0);
    }
}
