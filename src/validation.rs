//! Preflight System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy maps violations to actions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::templates::Template;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Block,
    Warn,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    /// 1-based page number, when the violation belongs to one page
    pub page: Option<usize>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl ValidationViolation {
    fn error(rule: &str, page: Option<usize>, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            severity: ViolationSeverity::Error,
            message,
            page,
            expected: None,
            actual: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub template_id: String,
}

impl PreflightReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| match v.page {
                Some(page) => format!("{} (page {}): {}", v.rule, page, v.message),
                None => format!("{}: {}", v.rule, v.message),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Preflight rule trait - produces violations
pub trait PreflightRule {
    fn name(&self) -> &'static str;
    fn check(&self, template: &Template) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct PageCountRule;

impl PreflightRule for PageCountRule {
    fn name(&self) -> &'static str { "page_count" }

    fn check(&self, template: &Template) -> Vec<ValidationViolation> {
        let expected = template.geometry.pages_per_template;
        let actual = template.pages.len();
        if actual == expected {
            return vec![];
        }

        let severity = if actual < expected {
            ViolationSeverity::Warning
        } else {
            ViolationSeverity::Error
        };
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity,
            message: "Page count differs from template geometry".to_string(),
            page: None,
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
        }]
    }
}

pub struct RegionBoundsRule;

impl PreflightRule for RegionBoundsRule {
    fn name(&self) -> &'static str { "region_bounds" }

    fn check(&self, template: &Template) -> Vec<ValidationViolation> {
        let content = template.geometry.content_area();
        let page_bounds = template.geometry.page_bounds();
        let mut violations = vec![];

        for (i, page) in template.pages.iter().enumerate() {
            for region in &page.regions {
                let bounds = region.bounds.resolve(&content);
                let (area, area_name) = if region.is_placeholder() {
                    (&content, "content area")
                } else {
                    (&page_bounds, "page")
                };
                if !area.contains(&bounds) {
                    violations.push(ValidationViolation::error(
                        self.name(),
                        Some(i + 1),
                        format!("Region {} extends outside the {}", region.token, area_name),
                    ));
                }
            }
        }
        violations
    }
}

pub struct StarfieldRule;

impl PreflightRule for StarfieldRule {
    fn name(&self) -> &'static str { "starfield" }

    fn check(&self, template: &Template) -> Vec<ValidationViolation> {
        let page_bounds = template.geometry.page_bounds();
        let (min, max) = (template.layout.star_min_size, template.layout.star_max_size);
        let mut violations = vec![];

        for (i, page) in template.pages.iter().enumerate() {
            let outside = page.stars.iter().filter(|s| !page_bounds.contains(&s.bounds)).count();
            if outside > 0 {
                violations.push(ValidationViolation::error(
                    self.name(),
                    Some(i + 1),
                    format!("{} stars outside the page", outside),
                ));
            }

            let misfit = page
                .stars
                .iter()
                .filter(|s| s.diameter() < min - 1e-9 || s.diameter() > max + 1e-9)
                .count();
            if misfit > 0 {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    message: format!("{} stars outside the size range", misfit),
                    page: Some(i + 1),
                    expected: Some(format!("{}..{}", min, max)),
                    actual: None,
                });
            }
        }
        violations
    }
}

pub struct SwatchRule;

impl PreflightRule for SwatchRule {
    fn name(&self) -> &'static str { "swatches" }

    fn check(&self, template: &Template) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for (i, page) in template.pages.iter().enumerate() {
            let references = [&page.background, &page.accent]
                .into_iter()
                .chain(page.regions.iter().map(|r| &r.color));
            for name in references {
                if !template.colors.contains(name) {
                    violations.push(ValidationViolation::error(
                        self.name(),
                        Some(i + 1),
                        format!("Swatch {} is not registered", name),
                    ));
                }
            }
        }
        violations
    }
}

pub struct TokenRule;

impl PreflightRule for TokenRule {
    fn name(&self) -> &'static str { "tokens" }

    fn check(&self, template: &Template) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for (i, page) in template.pages.iter().enumerate() {
            let mut seen = HashSet::new();
            for region in &page.regions {
                if !seen.insert(region.token.as_str()) {
                    violations.push(ValidationViolation::error(
                        self.name(),
                        Some(i + 1),
                        format!("Token {} appears more than once", region.token),
                    ));
                }
            }
        }
        violations
    }
}

/// Preflight orchestrates rules and applies policy
pub struct Preflight {
    rules: Vec<Box<dyn PreflightRule>>,
}

impl Preflight {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(PageCountRule),
                Box::new(RegionBoundsRule),
                Box::new(StarfieldRule),
                Box::new(SwatchRule),
                Box::new(TokenRule),
            ],
        }
    }

    pub fn run(&self, template: &Template, mode: FailureMode) -> PreflightReport {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(template))
            .collect();

        let has_errors = violations.iter().any(|v| v.severity == ViolationSeverity::Error);

        let valid = match mode {
            FailureMode::Block => !has_errors,
            FailureMode::Warn | FailureMode::Log => true,
        };

        PreflightReport {
            valid,
            violations,
            template_id: template.id.clone(),
        }
    }
}

impl Default for Preflight {
    fn default() -> Self {
        Self::new()
    }
}
