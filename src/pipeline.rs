//! Render Pipeline - Single Entry Point
//!
//! `render` always runs preflight before anything reaches the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::NamedColor;
use crate::error::{CoverError, CoverResult};
use crate::hashing::{compute_manifest_hash, compute_template_hash};
use crate::print::{ColorSpace, PrintSpec};
use crate::templates::{Alignment, Bounds, PageGeometry, Template};
use crate::validation::{FailureMode, Preflight, PreflightReport};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static PREFLIGHT_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_preflight_call_count() -> u32 {
    PREFLIGHT_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_preflight_call_count() {
    PREFLIGHT_CALL_COUNT.store(0, Ordering::SeqCst);
}

/// A text region resolved to absolute page bounds and a swatch
#[derive(Debug, Clone)]
pub struct TextRun<'a> {
    pub contents: &'a str,
    pub bounds: Bounds,
    pub font_size: f64,
    pub alignment: Alignment,
    pub bold: bool,
    pub color: &'a NamedColor,
}

/// Document-composition backend. Bounds are in page units, top-left origin.
pub trait RenderBackend {
    fn begin_page(&mut self, index: usize, geometry: &PageGeometry) -> CoverResult<()>;
    fn fill_rect(&mut self, bounds: &Bounds, color: &NamedColor) -> CoverResult<()>;
    fn fill_ellipse(&mut self, bounds: &Bounds, color: &NamedColor) -> CoverResult<()>;
    fn draw_text(&mut self, run: &TextRun<'_>) -> CoverResult<()>;
    fn end_page(&mut self) -> CoverResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    pub template_id: String,
    /// 1-based page numbers in render order
    pub pages: Vec<usize>,
    pub swatches: usize,
    pub preflight: PreflightReport,
    pub rendered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub id: String,
    pub template_id: String,
    pub template_name: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub pages: Vec<usize>,
    pub color_space: ColorSpace,
    pub preset: String,
    pub template_hash: String,
    pub pdf_hash: String,
    pub manifest_hash: String,
}

impl ExportManifest {
    pub fn new(
        template: &Template,
        report: &RenderReport,
        spec: &PrintSpec,
        pdf_hash: String,
    ) -> CoverResult<Self> {
        let mut manifest = Self {
            id: Uuid::new_v4().to_string(),
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: report.rendered_at,
            pages: report.pages.clone(),
            color_space: spec.color_space,
            preset: spec.preset.clone(),
            template_hash: compute_template_hash(template)?,
            pdf_hash,
            manifest_hash: String::new(), // Computed after
        };
        manifest.manifest_hash = compute_manifest_hash(&manifest)?;
        Ok(manifest)
    }
}

pub fn run_preflight(template: &Template, mode: FailureMode) -> PreflightReport {
    #[cfg(feature = "test-hooks")]
    PREFLIGHT_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

    Preflight::new().run(template, mode)
}

/// Render the pages selected by `spec` through `backend`.
///
/// Preflight always runs first. On success the template moves to `Rendered`.
pub fn render<B>(
    template: &mut Template,
    backend: &mut B,
    spec: &PrintSpec,
) -> CoverResult<RenderReport>
where
    B: RenderBackend + ?Sized,
{
    template.ensure_renderable()?;
    let range = spec.page_range.resolve(template.pages.len())?;

    // MANDATORY: no bypass.
    let preflight = run_preflight(template, spec.failure_mode);
    if !preflight.valid {
        return Err(CoverError::PreflightFailed(preflight.summary()));
    }
    if !preflight.violations.is_empty() {
        let summary = preflight.summary();
        match spec.failure_mode {
            FailureMode::Log => log::info!("preflight for template {}: {}", template.id, summary),
            _ => log::warn!("preflight for template {}: {}", template.id, summary),
        }
    }

    let geometry = template.geometry;
    let content = geometry.content_area();
    let page_bounds = geometry.page_bounds();
    let mut pages = vec![];

    for index in range {
        let page = &template.pages[index];
        backend.begin_page(index, &geometry)?;

        backend.fill_rect(&page_bounds, swatch(template, &page.background)?)?;

        let star_color = swatch(template, &page.accent)?;
        for star in &page.stars {
            backend.fill_ellipse(&star.bounds, star_color)?;
        }

        for region in &page.regions {
            backend.draw_text(&TextRun {
                contents: &region.contents,
                bounds: region.bounds.resolve(&content),
                font_size: region.font_size,
                alignment: region.alignment,
                bold: region.bold,
                color: swatch(template, &region.color)?,
            })?;
        }

        backend.end_page()?;
        pages.push(index + 1);
    }

    template.mark_rendered();
    log::info!("rendered template {} pages {:?}", template.id, pages);

    Ok(RenderReport {
        template_id: template.id.clone(),
        pages,
        swatches: template.colors.len(),
        preflight,
        rendered_at: Utc::now(),
    })
}

fn swatch<'t>(template: &'t Template, name: &str) -> CoverResult<&'t NamedColor> {
    template
        .colors
        .get(name)
        .ok_or_else(|| CoverError::UnknownSwatch(name.to_string()))
}
