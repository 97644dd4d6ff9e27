//! ChartCover Core - Cover Template Generator
//!
//! # Ground Rules
//! 1. Swatches Are Named By Their Source (`"<label> [r,g,b]"`)
//! 2. Placeholders Stay Tokens Until A Consumer Fills Them
//! 3. Bad Input Fails Where It Enters
//! 4. Preflight Runs Before Every Render
//! 5. Saved Templates Are Instantiated, Never Re-rendered

pub mod color;
pub mod config;
pub mod error;
pub mod hashing;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod placeholders;
pub mod print;
pub mod templates;
pub mod validation;

pub use color::{to_cmyk, CmykColor, ColorRegistry, NamedColor, RgbColor};
pub use config::CoverConfig;
pub use error::{CoverError, CoverResult};
pub use hashing::{canonical_json, compute_manifest_hash, compute_template_hash, sha256_hex};
pub use layout::{
    add_cover_page, build_default_template, build_template, CoverLayout, CoverTemplateBuilder,
};
pub use pdf::{export_pdf, ExportedPdf, PdfBackend};
pub use pipeline::{render, ExportManifest, RenderBackend, RenderReport, TextRun};
pub use placeholders::{fill_placeholders, Placeholders};
pub use print::{ColorSpace, PageRange, PrintSpec};
pub use templates::{
    Bounds, ColorScheme, CoverPage, PageGeometry, Template, TemplateState, TextRegion,
};
pub use validation::{
    FailureMode, Preflight, PreflightReport, ValidationViolation, ViolationSeverity,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
