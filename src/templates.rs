//! Template System - Cover Pages and Their Lifecycle
//!
//! Bounds use a top-left origin: `(top, left, bottom, right)` in page units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::color::{ColorRegistry, RgbColor};
use crate::error::{CoverError, CoverResult};
use crate::layout::CoverLayout;
use crate::placeholders::find_tokens;
use crate::ENGINE_VERSION;

pub type TemplateId = String;

pub const DEFAULT_PAGE_WIDTH: f64 = 612.0;
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;
pub const DEFAULT_MARGIN: f64 = 36.0;
pub const DEFAULT_BLEED: f64 = 9.0;
pub const DEFAULT_PAGES_PER_TEMPLATE: usize = 2;
pub const DEFAULT_TEMPLATE_NAME: &str = "AstrologyChartTemplate";

// Float slack for containment checks.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub bleed: f64,
    pub pages_per_template: usize,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_PAGE_WIDTH,
            height: DEFAULT_PAGE_HEIGHT,
            margin: DEFAULT_MARGIN,
            bleed: DEFAULT_BLEED,
            pages_per_template: DEFAULT_PAGES_PER_TEMPLATE,
        }
    }
}

impl PageGeometry {
    pub fn new(width: f64, height: f64, margin: f64, bleed: f64) -> CoverResult<Self> {
        let geometry = Self {
            width,
            height,
            margin,
            bleed,
            ..Self::default()
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> CoverResult<()> {
        let dims = [self.width, self.height, self.margin, self.bleed];
        if dims.iter().any(|v| !v.is_finite()) {
            return Err(CoverError::InvalidGeometry("dimensions must be finite".into()));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(CoverError::InvalidGeometry(format!(
                "page size {}x{} must be positive",
                self.width, self.height
            )));
        }
        if self.margin < 0.0 || self.bleed < 0.0 {
            return Err(CoverError::InvalidGeometry(
                "margin and bleed must not be negative".into(),
            ));
        }
        let short_side = self.width.min(self.height);
        if self.margin * 2.0 >= short_side {
            return Err(CoverError::InvalidGeometry(format!(
                "margin {} leaves no content area on a {}x{} page",
                self.margin, self.width, self.height
            )));
        }
        if self.bleed * 2.0 > short_side {
            return Err(CoverError::InvalidGeometry(format!(
                "bleed {} exceeds half of a {}x{} page",
                self.bleed, self.width, self.height
            )));
        }
        if self.pages_per_template == 0 {
            return Err(CoverError::InvalidGeometry(
                "a template needs at least one page".into(),
            ));
        }
        Ok(())
    }

    pub fn page_bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.height, self.width)
    }

    /// Page bounds minus margins
    pub fn content_area(&self) -> Bounds {
        Bounds::new(
            self.margin,
            self.margin,
            self.height - self.margin,
            self.width - self.margin,
        )
    }

    pub fn bleed_bounds(&self) -> Bounds {
        Bounds::new(
            -self.bleed,
            -self.bleed,
            self.height + self.bleed,
            self.width + self.bleed,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Bounds {
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self { top, left, bottom, right }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.top >= self.top - EPSILON
            && other.left >= self.left - EPSILON
            && other.bottom <= self.bottom + EPSILON
            && other.right <= self.right + EPSILON
    }
}

/// Bounds as fractions of an enclosing area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeBounds {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl RelativeBounds {
    /// Full width, vertical span `[top, bottom]`
    pub fn band(top: f64, bottom: f64) -> Self {
        Self { top, left: 0.0, bottom, right: 1.0 }
    }

    pub fn resolve(&self, area: &Bounds) -> Bounds {
        Bounds::new(
            area.top + area.height() * self.top,
            area.left + area.width() * self.left,
            area.top + area.height() * self.bottom,
            area.left + area.width() * self.right,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRegion {
    pub token: String,
    pub contents: String,
    pub bounds: RelativeBounds,
    pub font_size: f64,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default)]
    pub bold: bool,
    /// Swatch name in the template's color registry
    pub color: String,
}

impl TextRegion {
    pub fn is_placeholder(&self) -> bool {
        self.token.starts_with("{{") && self.token.ends_with("}}")
    }
}

/// Decorative filled ellipse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub bounds: Bounds,
}

impl Star {
    pub fn diameter(&self) -> f64 {
        self.bounds.width()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,
    pub background: RgbColor,
    pub text: RgbColor,
    pub accent: RgbColor,
}

impl ColorScheme {
    pub fn black() -> Self {
        Self {
            name: "Black".to_string(),
            background: RgbColor::BLACK,
            text: RgbColor::WHITE,
            accent: RgbColor::GOLD,
        }
    }

    pub fn blue() -> Self {
        Self {
            name: "Blue".to_string(),
            background: RgbColor::NAVY,
            text: RgbColor::WHITE,
            accent: RgbColor::GOLD,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::black(), Self::blue()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverPage {
    pub scheme: ColorScheme,
    /// Swatch names
    pub background: String,
    pub accent: String,
    pub regions: Vec<TextRegion>,
    #[serde(default)]
    pub stars: Vec<Star>,
}

impl CoverPage {
    pub fn new(scheme: ColorScheme, background: String, accent: String) -> Self {
        Self {
            scheme,
            background,
            accent,
            regions: vec![],
            stars: vec![],
        }
    }

    /// Tokens must stay unique so substitution is unambiguous.
    pub fn push_region(&mut self, region: TextRegion) -> CoverResult<()> {
        if self.region(&region.token).is_some() {
            return Err(CoverError::DuplicateRegionToken(region.token));
        }
        self.regions.push(region);
        Ok(())
    }

    pub fn region(&self, token: &str) -> Option<&TextRegion> {
        self.regions.iter().find(|r| r.token == token)
    }

    pub fn decoration_count(&self) -> usize {
        self.stars.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateState {
    Empty,
    PagesAdded,
    Rendered,
    Saved,
    Discarded,
}

impl fmt::Display for TemplateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::PagesAdded => "pages_added",
            Self::Rendered => "rendered",
            Self::Saved => "saved",
            Self::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub geometry: PageGeometry,
    #[serde(default)]
    pub layout: CoverLayout,
    #[serde(default)]
    pub pages: Vec<CoverPage>,
    #[serde(default)]
    pub colors: ColorRegistry,
    state: TemplateState,
}

impl Template {
    pub fn new(geometry: PageGeometry, layout: CoverLayout) -> CoverResult<Self> {
        geometry.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            geometry,
            layout,
            pages: vec![],
            colors: ColorRegistry::new(),
            state: TemplateState::Empty,
        })
    }

    pub fn state(&self) -> TemplateState {
        self.state
    }

    pub fn content_area(&self) -> Bounds {
        self.geometry.content_area()
    }

    pub fn ensure_accepts_page(&self) -> CoverResult<()> {
        match self.state {
            TemplateState::Empty | TemplateState::PagesAdded => {}
            state => return Err(invalid_state("add a page to", state)),
        }
        if self.pages.len() >= self.geometry.pages_per_template {
            return Err(CoverError::PageLimitExceeded(self.geometry.pages_per_template));
        }
        Ok(())
    }

    pub fn push_page(&mut self, page: CoverPage) -> CoverResult<&CoverPage> {
        self.ensure_accepts_page()?;
        self.pages.push(page);
        self.state = TemplateState::PagesAdded;
        let index = self.pages.len() - 1;
        Ok(&self.pages[index])
    }

    pub fn ensure_renderable(&self) -> CoverResult<()> {
        match self.state {
            TemplateState::PagesAdded | TemplateState::Rendered => Ok(()),
            state => Err(invalid_state("render", state)),
        }
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.state = TemplateState::Rendered;
    }

    /// Write the template file. Only a rendered template can be saved.
    pub fn save(&mut self, path: &Path) -> CoverResult<()> {
        if self.state != TemplateState::Rendered {
            return Err(invalid_state("save", self.state));
        }
        self.state = TemplateState::Saved;
        let written = serde_json::to_string_pretty(&*self)
            .map_err(CoverError::from)
            .and_then(|json| fs::write(path, json).map_err(CoverError::from));
        if let Err(e) = written {
            self.state = TemplateState::Rendered;
            return Err(e);
        }
        log::info!("saved template {} to {}", self.id, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> CoverResult<Self> {
        let content = fs::read_to_string(path)?;
        let template: Template = serde_json::from_str(&content)?;
        check_engine_version(&template.engine_version)?;
        template.geometry.validate()?;
        template.layout.validate(&template.geometry)?;
        log::info!(
            "loaded template {} ({} pages) from {}",
            template.id,
            template.pages.len(),
            path.display()
        );
        Ok(template)
    }

    /// Fresh editable copy, the way opening a template file yields an untitled document.
    pub fn instantiate(&self) -> Self {
        let state = if self.pages.is_empty() {
            TemplateState::Empty
        } else {
            TemplateState::PagesAdded
        };
        Self {
            id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            state,
            ..self.clone()
        }
    }

    pub fn discard(&mut self) -> CoverResult<()> {
        match self.state {
            TemplateState::Saved | TemplateState::Discarded => {
                Err(invalid_state("discard", self.state))
            }
            _ => {
                self.state = TemplateState::Discarded;
                Ok(())
            }
        }
    }

    /// Every `{{TOKEN}}` still present in region contents, in page order
    pub fn placeholder_tokens(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|p| p.regions.iter())
            .flat_map(|r| find_tokens(&r.contents))
            .map(str::to_string)
            .collect()
    }
}

fn invalid_state(action: &'static str, state: TemplateState) -> CoverError {
    CoverError::InvalidState {
        action,
        state: state.to_string(),
    }
}

fn check_engine_version(written_by: &str) -> CoverResult<()> {
    let mismatch = || {
        CoverError::EngineVersionMismatch(written_by.to_string(), ENGINE_VERSION.to_string())
    };
    let file_ver = semver::Version::parse(written_by).map_err(|_| mismatch())?;
    let engine_ver = semver::Version::parse(ENGINE_VERSION).map_err(|_| mismatch())?;

    if file_ver.major > engine_ver.major {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_areas() {
        let g = PageGeometry::default();
        assert_eq!(g.page_bounds(), Bounds::new(0.0, 0.0, 792.0, 612.0));
        assert_eq!(g.content_area(), Bounds::new(36.0, 36.0, 756.0, 576.0));
        assert_eq!(g.bleed_bounds(), Bounds::new(-9.0, -9.0, 801.0, 621.0));
    }

    #[test]
    fn test_geometry_rejects_oversized_margin() {
        assert!(matches!(
            PageGeometry::new(612.0, 792.0, 307.0, 9.0),
            Err(CoverError::InvalidGeometry(_))
        ));
        assert!(matches!(
            PageGeometry::new(612.0, 792.0, 306.0, 9.0),
            Err(CoverError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_geometry_rejects_oversized_bleed() {
        assert!(PageGeometry::new(612.0, 792.0, 36.0, 306.0).is_ok());
        assert!(matches!(
            PageGeometry::new(612.0, 792.0, 36.0, 306.5),
            Err(CoverError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_geometry_rejects_negative_and_nan() {
        assert!(PageGeometry::new(612.0, 792.0, -1.0, 9.0).is_err());
        assert!(PageGeometry::new(f64::NAN, 792.0, 36.0, 9.0).is_err());
        assert!(PageGeometry::new(0.0, 792.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_relative_bounds_resolve() {
        let area = Bounds::new(36.0, 36.0, 756.0, 576.0);
        let name = RelativeBounds::band(0.2, 0.4).resolve(&area);
        assert_eq!(name.top, 36.0 + 720.0 * 0.2);
        assert_eq!(name.bottom, 36.0 + 720.0 * 0.4);
        assert_eq!(name.left, 36.0);
        assert_eq!(name.right, 576.0);
        assert!(area.contains(&name));
    }

    #[test]
    fn test_duplicate_region_token_rejected() {
        let mut page = CoverPage::new(ColorScheme::black(), "bg".into(), "accent".into());
        let region = TextRegion {
            token: "{{NAME}}".into(),
            contents: "{{NAME}}".into(),
            bounds: RelativeBounds::band(0.2, 0.4),
            font_size: 36.0,
            alignment: Alignment::Center,
            bold: true,
            color: "Text Color [255,255,255]".into(),
        };
        page.push_region(region.clone()).unwrap();
        let err = page.push_region(region).unwrap_err();
        assert!(matches!(err, CoverError::DuplicateRegionToken(t) if t == "{{NAME}}"));
        assert_eq!(page.regions.len(), 1);
    }

    #[test]
    fn test_empty_template_cannot_render_or_save() {
        let mut template = Template::new(PageGeometry::default(), CoverLayout::default()).unwrap();
        assert_eq!(template.state(), TemplateState::Empty);
        assert!(template.ensure_renderable().is_err());
        let dir = tempfile::tempdir().unwrap();
        assert!(template.save(&dir.path().join("t.json")).is_err());
    }

    #[test]
    fn test_discard_is_terminal() {
        let mut template = Template::new(PageGeometry::default(), CoverLayout::default()).unwrap();
        template.discard().unwrap();
        assert_eq!(template.state(), TemplateState::Discarded);
        assert!(template.discard().is_err());
        assert!(template.ensure_accepts_page().is_err());
    }

    #[test]
    fn test_engine_version_check() {
        assert!(check_engine_version(ENGINE_VERSION).is_ok());
        assert!(check_engine_version("0.3.0").is_ok());
        assert!(matches!(
            check_engine_version("99.0.0"),
            Err(CoverError::EngineVersionMismatch(..))
        ));
        assert!(check_engine_version("not-a-version").is_err());
    }
}
