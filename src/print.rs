//! Print Settings for Export
//!
//! Page ranges are 1-based and inclusive, written `all`, `2` or `1-2`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{CoverError, CoverResult};
use crate::validation::FailureMode;

pub const DEFAULT_PRESET: &str = "[High Quality Print]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorSpace {
    Rgb,
    #[default]
    Cmyk,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageRange {
    #[default]
    All,
    Pages { first: usize, last: usize },
}

impl PageRange {
    pub fn single(page: usize) -> Self {
        Self::Pages { first: page, last: page }
    }

    /// Zero-based index range into a template with `page_count` pages
    pub fn resolve(&self, page_count: usize) -> CoverResult<Range<usize>> {
        match *self {
            Self::All => Ok(0..page_count),
            Self::Pages { first, last } => {
                if first == 0 || first > last || last > page_count {
                    return Err(CoverError::InvalidPageRange(format!(
                        "{} on a {}-page template",
                        self, page_count
                    )));
                }
                Ok(first - 1..last)
            }
        }
    }
}

impl FromStr for PageRange {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| CoverError::InvalidPageRange(s.to_string()))
        };
        let (first, last) = match s.split_once('-') {
            Some((a, b)) => (parse(a)?, parse(b)?),
            None => {
                let page = parse(s)?;
                (page, page)
            }
        };
        if first == 0 || first > last {
            return Err(CoverError::InvalidPageRange(s.to_string()));
        }
        Ok(Self::Pages { first, last })
    }
}

impl TryFrom<String> for PageRange {
    type Error = CoverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageRange> for String {
    fn from(range: PageRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Pages { first, last } if first == last => write!(f, "{}", first),
            Self::Pages { first, last } => write!(f, "{}-{}", first, last),
        }
    }
}

/// Export settings handed to the render pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintSpec {
    pub color_space: ColorSpace,
    pub page_range: PageRange,
    pub include_bleed: bool,
    pub failure_mode: FailureMode,
    pub preset: String,
}

impl Default for PrintSpec {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Cmyk,
            page_range: PageRange::All,
            include_bleed: true,
            failure_mode: FailureMode::Block,
            preset: DEFAULT_PRESET.to_string(),
        }
    }
}

impl PrintSpec {
    pub fn pages(mut self, range: PageRange) -> Self {
        self.page_range = range;
        self
    }

    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_ranges() {
        assert_eq!("all".parse::<PageRange>().unwrap(), PageRange::All);
        assert_eq!("1".parse::<PageRange>().unwrap(), PageRange::single(1));
        assert_eq!(
            " 1-2 ".parse::<PageRange>().unwrap(),
            PageRange::Pages { first: 1, last: 2 }
        );
    }

    #[test]
    fn test_reject_bad_page_ranges() {
        for bad in ["0", "3-1", "first", "1-", "-2", ""] {
            assert!(bad.parse::<PageRange>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_resolve_against_page_count() {
        assert_eq!(PageRange::All.resolve(2).unwrap(), 0..2);
        assert_eq!(PageRange::single(2).resolve(2).unwrap(), 1..2);
        assert!(PageRange::single(3).resolve(2).is_err());
    }

    #[test]
    fn test_display_round_trips_through_serde() {
        let spec = PrintSpec::default().pages(PageRange::Pages { first: 1, last: 2 });
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""pageRange":"1-2""#));
        assert!(json.contains(r#""colorSpace":"CMYK""#));
        let back: PrintSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
