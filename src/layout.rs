//! Cover Layout - Builds the Cover Pages of a Template
//!
//! Region placement is expressed in fractions of the content area:
//!
//! | region      | span          | color  | size | weight  |
//! |-------------|---------------|--------|------|---------|
//! | name        | 0.20 - 0.40   | text   | 36   | bold    |
//! | birth info  | 0.45 - 0.55   | accent | 18   | regular |
//! | location    | 0.60 - 0.70   | text   | 14   | regular |
//! | title       | bottom band   | text   | 16   | bold    |

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::color::RgbColor;
use crate::error::{CoverError, CoverResult};
use crate::templates::{
    Alignment, Bounds, ColorScheme, CoverPage, PageGeometry, RelativeBounds, Star, Template,
    TextRegion,
};

pub const NAME_TOKEN: &str = "{{NAME}}";
pub const BIRTH_INFO_TOKEN: &str = "{{BIRTH_INFO}}";
pub const LOCATION_TOKEN: &str = "{{LOCATION}}";
pub const TITLE_TOKEN: &str = "TITLE";
pub const DEFAULT_TITLE: &str = "Astrology Birth Chart";

pub const BACKGROUND_LABEL: &str = "Cover BG";
pub const STAR_LABEL: &str = "Star Color";
pub const TEXT_LABEL: &str = "Text Color";

pub const DEFAULT_STAR_COUNT: usize = 50;
pub const DEFAULT_TITLE_BAND: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverLayout {
    pub star_count: usize,
    pub star_min_size: f64,
    pub star_max_size: f64,
    pub title: String,
    pub title_band: f64,
}

impl Default for CoverLayout {
    fn default() -> Self {
        Self {
            star_count: DEFAULT_STAR_COUNT,
            star_min_size: 1.0,
            star_max_size: 4.0,
            title: DEFAULT_TITLE.to_string(),
            title_band: DEFAULT_TITLE_BAND,
        }
    }
}

impl CoverLayout {
    pub fn validate(&self, geometry: &PageGeometry) -> CoverResult<()> {
        if !(self.star_min_size > 0.0 && self.star_min_size <= self.star_max_size) {
            return Err(CoverError::InvalidGeometry(format!(
                "star size range {}..{} is empty",
                self.star_min_size, self.star_max_size
            )));
        }
        if self.star_max_size > geometry.width.min(geometry.height) {
            return Err(CoverError::InvalidGeometry(format!(
                "stars up to {} do not fit a {}x{} page",
                self.star_max_size, geometry.width, geometry.height
            )));
        }
        if !(self.title_band > 0.0) {
            return Err(CoverError::InvalidGeometry("title band must be positive".into()));
        }
        Ok(())
    }

    /// Title band as a fraction of the content area, clamped to it
    fn title_bounds(&self, content: &Bounds) -> RelativeBounds {
        let band = self.title_band.min(content.height());
        RelativeBounds::band(1.0 - band / content.height(), 1.0)
    }
}

pub struct CoverTemplateBuilder {
    layout: CoverLayout,
    rng: StdRng,
}

impl CoverTemplateBuilder {
    pub fn new(layout: CoverLayout) -> Self {
        Self {
            layout,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible starfields
    pub fn with_seed(layout: CoverLayout, seed: u64) -> Self {
        Self {
            layout,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn layout(&self) -> &CoverLayout {
        &self.layout
    }

    pub fn build_template(
        &self,
        width: f64,
        height: f64,
        margin: f64,
        bleed: f64,
    ) -> CoverResult<Template> {
        let geometry = PageGeometry::new(width, height, margin, bleed)?;
        self.build_with_geometry(geometry)
    }

    pub fn build_with_geometry(&self, geometry: PageGeometry) -> CoverResult<Template> {
        geometry.validate()?;
        self.layout.validate(&geometry)?;
        let template = Template::new(geometry, self.layout.clone())?;
        log::info!(
            "built template {} ({}x{}, margin {}, bleed {})",
            template.id,
            geometry.width,
            geometry.height,
            geometry.margin,
            geometry.bleed
        );
        Ok(template)
    }

    pub fn add_cover_page<'t>(
        &mut self,
        template: &'t mut Template,
        background: RgbColor,
        text: RgbColor,
        accent: RgbColor,
    ) -> CoverResult<&'t CoverPage> {
        let scheme = ColorScheme {
            name: format!("Page {}", template.pages.len() + 1),
            background,
            text,
            accent,
        };
        self.add_scheme_page(template, scheme)
    }

    pub fn add_scheme_page<'t>(
        &mut self,
        template: &'t mut Template,
        scheme: ColorScheme,
    ) -> CoverResult<&'t CoverPage> {
        template.ensure_accepts_page()?;
        self.layout.validate(&template.geometry)?;

        let background = template
            .colors
            .resolve_rgb(BACKGROUND_LABEL, scheme.background)
            .name
            .clone();
        let accent = template.colors.resolve_rgb(STAR_LABEL, scheme.accent).name.clone();
        let text_swatch = template.colors.resolve_rgb(TEXT_LABEL, scheme.text).name.clone();
        let accent_text_swatch = template
            .colors
            .resolve_rgb(TEXT_LABEL, scheme.accent)
            .name
            .clone();

        let content = template.content_area();
        let stars = self.starfield(&template.geometry);
        let title_bounds = self.layout.title_bounds(&content);

        let mut page = CoverPage::new(scheme, background, accent);
        page.stars = stars;
        page.push_region(placeholder(NAME_TOKEN, 0.20, 0.40, 36.0, true, &text_swatch))?;
        page.push_region(placeholder(
            BIRTH_INFO_TOKEN,
            0.45,
            0.55,
            18.0,
            false,
            &accent_text_swatch,
        ))?;
        page.push_region(placeholder(LOCATION_TOKEN, 0.60, 0.70, 14.0, false, &text_swatch))?;
        page.push_region(TextRegion {
            token: TITLE_TOKEN.to_string(),
            contents: self.layout.title.clone(),
            bounds: title_bounds,
            font_size: 16.0,
            alignment: Alignment::Center,
            bold: true,
            color: text_swatch,
        })?;

        log::debug!(
            "adding {} cover page with {} stars to template {}",
            page.scheme.name,
            page.stars.len(),
            template.id
        );
        template.push_page(page)
    }

    /// Build a template with one page per scheme
    pub fn build_from_schemes(
        &mut self,
        geometry: PageGeometry,
        schemes: &[ColorScheme],
    ) -> CoverResult<Template> {
        let mut template = self.build_with_geometry(geometry)?;
        for scheme in schemes {
            self.add_scheme_page(&mut template, scheme.clone())?;
        }
        Ok(template)
    }

    fn starfield(&mut self, geometry: &PageGeometry) -> Vec<Star> {
        let page = geometry.page_bounds();
        let (min, max) = (self.layout.star_min_size, self.layout.star_max_size);

        (0..self.layout.star_count)
            .map(|_| {
                let size = self.rng.random_range(min..=max);
                let x = self.rng.random_range(page.left..=page.right - size);
                let y = self.rng.random_range(page.top..=page.bottom - size);
                Star {
                    bounds: Bounds::new(y, x, y + size, x + size),
                }
            })
            .collect()
    }
}

impl Default for CoverTemplateBuilder {
    fn default() -> Self {
        Self::new(CoverLayout::default())
    }
}

fn placeholder(
    token: &str,
    top: f64,
    bottom: f64,
    font_size: f64,
    bold: bool,
    color: &str,
) -> TextRegion {
    TextRegion {
        token: token.to_string(),
        contents: token.to_string(),
        bounds: RelativeBounds::band(top, bottom),
        font_size,
        alignment: Alignment::Center,
        bold,
        color: color.to_string(),
    }
}

pub fn build_template(width: f64, height: f64, margin: f64, bleed: f64) -> CoverResult<Template> {
    CoverTemplateBuilder::default().build_template(width, height, margin, bleed)
}

pub fn add_cover_page(
    template: &mut Template,
    background: RgbColor,
    text: RgbColor,
    accent: RgbColor,
) -> CoverResult<&CoverPage> {
    CoverTemplateBuilder::new(template.layout.clone())
        .add_cover_page(template, background, text, accent)
}

/// Black and blue covers on the default page
pub fn build_default_template() -> CoverResult<Template> {
    CoverTemplateBuilder::default()
        .build_from_schemes(PageGeometry::default(), &ColorScheme::defaults())
}
