//! Placeholder substitution for downstream consumers
//!
//! Templates always keep their `{{TOKEN}}` text. Filling produces a new
//! instantiated template and leaves the source untouched.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{CoverError, CoverResult};
use crate::layout::{BIRTH_INFO_TOKEN, LOCATION_TOKEN, NAME_TOKEN};
use crate::templates::{Template, TemplateState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholders {
    pub name: String,
    pub birth_info: String,
    pub location: String,
}

impl Placeholders {
    pub fn new(
        name: impl Into<String>,
        birth_info: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            birth_info: birth_info.into(),
            location: location.into(),
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (NAME_TOKEN, self.name.as_str()),
            (BIRTH_INFO_TOKEN, self.birth_info.as_str()),
            (LOCATION_TOKEN, self.location.as_str()),
        ]
    }

    fn value_for(&self, token: &str) -> Option<&str> {
        self.pairs()
            .into_iter()
            .find(|(known, _)| *known == token)
            .map(|(_, value)| value)
    }

    /// Replace every known token in one pass. Substituted text is never rescanned.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        for span in token_spans(text) {
            let token = &text[span.clone()];
            out.push_str(&text[copied..span.start]);
            out.push_str(self.value_for(token).unwrap_or(token));
            copied = span.end;
        }
        out.push_str(&text[copied..]);
        out
    }
}

pub fn fill_placeholders(template: &Template, values: &Placeholders) -> CoverResult<Template> {
    if template.state() == TemplateState::Discarded {
        return Err(CoverError::InvalidState {
            action: "fill",
            state: template.state().to_string(),
        });
    }

    let mut filled = template.instantiate();
    for region in filled.pages.iter_mut().flat_map(|p| p.regions.iter_mut()) {
        region.contents = values.substitute(&region.contents);
    }
    log::debug!("filled template {} into {}", template.id, filled.id);
    Ok(filled)
}

/// `{{...}}` tokens in order of appearance
pub fn find_tokens(text: &str) -> Vec<&str> {
    token_spans(text).into_iter().map(|span| &text[span]).collect()
}

fn token_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = vec![];
    let mut offset = 0;
    while let Some(found) = text[offset..].find("{{") {
        let start = offset + found;
        let Some(len) = text[start..].find("}}") else {
            break;
        };
        let end = start + len + 2;
        spans.push(start..end);
        offset = end;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tokens() {
        assert_eq!(find_tokens("{{NAME}}"), vec!["{{NAME}}"]);
        assert_eq!(
            find_tokens("born {{BIRTH_INFO}} in {{LOCATION}}"),
            vec!["{{BIRTH_INFO}}", "{{LOCATION}}"]
        );
        assert!(find_tokens("Astrology Birth Chart").is_empty());
        assert!(find_tokens("{{unterminated").is_empty());
    }

    #[test]
    fn test_pairs_cover_all_tokens() {
        let values = Placeholders::new("Ada", "Dec 10, 1815", "London");
        let tokens: Vec<_> = values.pairs().iter().map(|(t, _)| *t).collect();
        assert_eq!(tokens, vec![NAME_TOKEN, BIRTH_INFO_TOKEN, LOCATION_TOKEN]);
    }

    #[test]
    fn test_substitute_single_pass() {
        let values = Placeholders::new("{{LOCATION}}", "{{NAME}}", "Paris");
        assert_eq!(values.substitute(NAME_TOKEN), "{{LOCATION}}");
        assert_eq!(values.substitute(BIRTH_INFO_TOKEN), "{{NAME}}");
        assert_eq!(
            values.substitute("{{NAME}} / {{LOCATION}} / {{OTHER}}"),
            "{{LOCATION}} / Paris / {{OTHER}}"
        );
        assert_eq!(values.substitute("no tokens"), "no tokens");
    }
}
