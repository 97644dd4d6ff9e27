//! Engine configuration loaded from JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CoverResult;
use crate::layout::{CoverLayout, CoverTemplateBuilder};
use crate::print::PrintSpec;
use crate::templates::{ColorScheme, PageGeometry, Template};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverConfig {
    pub geometry: PageGeometry,
    pub layout: CoverLayout,
    pub schemes: Vec<ColorScheme>,
    pub print: PrintSpec,
    pub seed: Option<u64>,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            layout: CoverLayout::default(),
            schemes: ColorScheme::defaults(),
            print: PrintSpec::default(),
            seed: None,
        }
    }
}

impl CoverConfig {
    pub fn load(path: &Path) -> CoverResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: CoverConfig = serde_json::from_str(&content)?;
        config.geometry.validate()?;
        config.layout.validate(&config.geometry)?;
        Ok(config)
    }

    pub fn builder(&self) -> CoverTemplateBuilder {
        match self.seed {
            Some(seed) => CoverTemplateBuilder::with_seed(self.layout.clone(), seed),
            None => CoverTemplateBuilder::new(self.layout.clone()),
        }
    }

    /// One page per configured scheme
    pub fn build_template(&self) -> CoverResult<Template> {
        self.builder().build_from_schemes(self.geometry, &self.schemes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::{ColorSpace, PageRange};

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.json");
        fs::write(
            &path,
            r#"{"layout": {"starCount": 10}, "print": {"colorSpace": "RGB", "pageRange": "1"}, "seed": 3}"#,
        )
        .unwrap();

        let config = CoverConfig::load(&path).unwrap();
        assert_eq!(config.layout.star_count, 10);
        assert_eq!(config.layout.title, "Astrology Birth Chart");
        assert_eq!(config.geometry, PageGeometry::default());
        assert_eq!(config.print.color_space, ColorSpace::Rgb);
        assert_eq!(config.print.page_range, PageRange::single(1));
        assert_eq!(config.schemes.len(), 2);

        let template = config.build_template().unwrap();
        assert_eq!(template.pages.len(), 2);
        assert!(template.pages.iter().all(|p| p.stars.len() == 10));
    }

    #[test]
    fn test_invalid_geometry_in_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.json");
        fs::write(&path, r#"{"geometry": {"margin": 400}}"#).unwrap();
        assert!(CoverConfig::load(&path).is_err());
    }
}
