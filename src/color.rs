//! Color System - RGB to CMYK Process Swatches
//!
//! Swatches are keyed by `"<label> [r,g,b]"`. Resolving the same key twice
//! returns the stored swatch instead of registering a duplicate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoverError, CoverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0, g: 0, b: 0 };
    pub const WHITE: RgbColor = RgbColor { r: 255, g: 255, b: 255 };
    pub const NAVY: RgbColor = RgbColor { r: 0, g: 0, b: 128 };
    pub const GOLD: RgbColor = RgbColor { r: 255, g: 215, b: 0 };

    /// Build from unchecked integers, rejecting anything outside 0-255.
    pub fn new(r: i64, g: i64, b: i64) -> CoverResult<Self> {
        Ok(Self {
            r: component('r', r)?,
            g: component('g', g)?,
            b: component('b', b)?,
        })
    }

    pub fn to_cmyk(self) -> CmykColor {
        let c0 = 1.0 - self.r as f64 / 255.0;
        let m0 = 1.0 - self.g as f64 / 255.0;
        let y0 = 1.0 - self.b as f64 / 255.0;
        let k = c0.min(m0).min(y0);

        let (c, m, y) = if k == 1.0 {
            (0.0, 0.0, 0.0)
        } else {
            ((c0 - k) / (1.0 - k), (m0 - k) / (1.0 - k), (y0 - k) / (1.0 - k))
        };

        CmykColor {
            c: c * 100.0,
            m: m * 100.0,
            y: y * 100.0,
            k: k * 100.0,
        }
    }
}

impl From<[u8; 3]> for RgbColor {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.r, self.g, self.b)
    }
}

fn component(channel: char, value: i64) -> CoverResult<u8> {
    u8::try_from(value).map_err(|_| CoverError::InvalidColorComponent { channel, value })
}

/// Process color, each channel a percentage in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CmykColor {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

impl CmykColor {
    pub fn channels(&self) -> [f64; 4] {
        [self.c, self.m, self.y, self.k]
    }
}

/// Convert an RGB triple to CMYK percentages
pub fn to_cmyk(r: i64, g: i64, b: i64) -> CoverResult<CmykColor> {
    Ok(RgbColor::new(r, g, b)?.to_cmyk())
}

/// Swatch name for a label and source triple
pub fn swatch_name(label: &str, rgb: RgbColor) -> String {
    format!("{} {}", label, rgb)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub value: CmykColor,
    pub source: RgbColor,
}

/// Swatch registry owned by one template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorRegistry {
    colors: BTreeMap<String, NamedColor>,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup-or-create for `(label, r, g, b)`.
    pub fn resolve(&mut self, label: &str, r: i64, g: i64, b: i64) -> CoverResult<NamedColor> {
        let rgb = RgbColor::new(r, g, b)?;
        Ok(self.resolve_rgb(label, rgb).clone())
    }

    pub fn resolve_rgb(&mut self, label: &str, rgb: RgbColor) -> &NamedColor {
        let name = swatch_name(label, rgb);
        self.colors.entry(name).or_insert_with_key(|name| {
            log::debug!("registering swatch {}", name);
            NamedColor {
                name: name.clone(),
                value: rgb.to_cmyk(),
                source: rgb,
            }
        })
    }

    pub fn get(&self, name: &str) -> Option<&NamedColor> {
        self.colors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.colors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedColor> {
        self.colors.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_has_no_division_by_zero() {
        let black = to_cmyk(0, 0, 0).unwrap();
        assert_eq!(black.channels(), [0.0, 0.0, 0.0, 100.0]);
    }

    #[test]
    fn test_white_is_empty() {
        let white = to_cmyk(255, 255, 255).unwrap();
        assert_eq!(white.channels(), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_gold() {
        let gold = RgbColor::GOLD.to_cmyk();
        assert_eq!(gold.c, 0.0);
        assert!((gold.m - 15.686_274_509_803_92).abs() < 1e-9);
        assert_eq!(gold.y, 100.0);
        assert_eq!(gold.k, 0.0);
    }

    #[test]
    fn test_navy() {
        let navy = RgbColor::NAVY.to_cmyk();
        assert_eq!(navy.c, 100.0);
        assert_eq!(navy.m, 100.0);
        assert_eq!(navy.y, 0.0);
        assert!((navy.k - (1.0 - 128.0 / 255.0) * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_channels_in_range_and_k_is_min_complement() {
        for r in (0..=255).step_by(15) {
            for g in (0..=255).step_by(17) {
                for b in (0..=255).step_by(51) {
                    let cmyk = to_cmyk(r, g, b).unwrap();
                    for ch in cmyk.channels() {
                        assert!((0.0..=100.0).contains(&ch), "{} out of range", ch);
                    }
                    let complement = |v: i64| 1.0 - v as f64 / 255.0;
                    let k = complement(r).min(complement(g)).min(complement(b));
                    assert_eq!(cmyk.k, k * 100.0);
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = to_cmyk(256, 0, 0).unwrap_err();
        assert!(matches!(err, CoverError::InvalidColorComponent { channel: 'r', value: 256 }));

        let err = to_cmyk(0, 0, -1).unwrap_err();
        assert!(matches!(err, CoverError::InvalidColorComponent { channel: 'b', value: -1 }));
    }

    #[test]
    fn test_swatch_name_format() {
        assert_eq!(swatch_name("Star Color", RgbColor::GOLD), "Star Color [255,215,0]");
    }

    #[test]
    fn test_resolve_is_cached() {
        let mut registry = ColorRegistry::new();
        let first = registry.resolve("Star Color", 255, 215, 0).unwrap();
        assert_eq!(registry.len(), 1);

        let second = registry.resolve("Star Color", 255, 215, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_rgb_different_label_is_new_swatch() {
        let mut registry = ColorRegistry::new();
        registry.resolve("Star Color", 255, 215, 0).unwrap();
        registry.resolve("Text Color", 255, 215, 0).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("Text Color [255,215,0]"));
        assert!(registry.get("Text Color [1,2,3]").is_none());
    }

    #[test]
    fn test_invalid_resolve_does_not_register() {
        let mut registry = ColorRegistry::new();
        assert!(registry.resolve("Cover BG", 0, 300, 0).is_err());
        assert!(registry.is_empty());
    }
}
