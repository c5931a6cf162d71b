//! Declarative field extraction
//!
//! A `SelectorSpec` is an ordered list of `FieldSpec`s. Applying it to a parsed
//! document runs every CSS selector and collects one value per matched element:
//! either the value of the requested attribute, or the element's text.
//!
//! # Extraction Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Selector matches N elements | N values, in document order |
//! | Selector matches nothing | empty sequence, key still present |
//! | Attribute set but missing on element | empty string |
//! | No attribute set | trimmed text of the element and its descendants |

mod field_map;

pub use field_map::{FieldMap, Fields};

use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Describes one field to extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Output key; unique within a `SelectorSpec`
    pub key: String,

    /// CSS selector matched against the whole document
    pub selector: String,

    /// Attribute to read from each match; text is used when absent
    #[serde(default, alias = "attr")]
    pub attribute: Option<String>,
}

impl FieldSpec {
    /// Creates a field that extracts element text
    pub fn text(key: &str, selector: &str) -> Self {
        Self {
            key: key.to_string(),
            selector: selector.to_string(),
            attribute: None,
        }
    }

    /// Creates a field that extracts an attribute value
    pub fn attr(key: &str, selector: &str, attribute: &str) -> Self {
        Self {
            key: key.to_string(),
            selector: selector.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledField {
    spec: FieldSpec,
    selector: Selector,
}

/// An ordered, validated set of fields with pre-compiled selectors
///
/// Construction fails if a key is empty or duplicated, or if a selector does
/// not parse. Once built it is immutable and shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct SelectorSpec {
    fields: Vec<CompiledField>,
}

impl SelectorSpec {
    /// Validates and compiles a list of field specs
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorSpec)` - Every field is valid
    /// * `Err(ConfigError)` - A key is empty or duplicated, or a selector is invalid
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(fields.len());

        for spec in fields {
            if spec.key.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Field with selector '{}' has an empty key",
                    spec.selector
                )));
            }

            if !seen.insert(spec.key.clone()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate field key '{}'",
                    spec.key
                )));
            }

            let selector =
                Selector::parse(&spec.selector).map_err(|e| ConfigError::InvalidSelector {
                    key: spec.key.clone(),
                    message: e.to_string(),
                })?;

            compiled.push(CompiledField { spec, selector });
        }

        Ok(Self { fields: compiled })
    }

    /// A spec with no fields; extraction yields an empty map
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the field specs in order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().map(|field| &field.spec)
    }

    /// Returns the field keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.spec.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Applies this spec to a document
    pub fn apply(&self, document: &Html) -> Fields {
        apply(self, document)
    }
}

/// Extracts every field of `spec` from `document`
///
/// The result holds every key of the spec, in spec order, even when the
/// selector matched nothing.
pub fn apply(spec: &SelectorSpec, document: &Html) -> Fields {
    let mut fields = Fields::new();

    for field in &spec.fields {
        let values = fields.values_mut(field.spec.key.clone());
        for element in document.select(&field.selector) {
            values.push(extract_value(element, field.spec.attribute.as_deref()));
        }
    }

    fields
}

fn extract_value(element: ElementRef<'_>, attribute: Option<&str>) -> String {
    match attribute {
        Some(name) => element.value().attr(name).unwrap_or_default().to_string(),
        None => element.text().collect::<String>().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_attribute_extraction_in_document_order() {
        let spec = SelectorSpec::new(vec![FieldSpec::attr("links", "a", "href")]).unwrap();
        let html = doc(r#"<html><body><a href="/x">X</a><a href="/y">Y</a></body></html>"#);

        let fields = spec.apply(&html);
        assert_eq!(fields.get("links").unwrap(), ["/x", "/y"]);
    }

    #[test]
    fn test_text_extraction() {
        let spec = SelectorSpec::new(vec![
            FieldSpec::text("title", "h1"),
            FieldSpec::text("paragraphs", "p"),
        ])
        .unwrap();
        let html = doc(
            r#"<html><body><h1>  Hello <em>world</em> </h1><p>one</p><p>two</p></body></html>"#,
        );

        let fields = spec.apply(&html);
        assert_eq!(fields.get("title").unwrap(), ["Hello world"]);
        assert_eq!(fields.get("paragraphs").unwrap(), ["one", "two"]);
    }

    #[test]
    fn test_missing_attribute_yields_empty_string() {
        let spec = SelectorSpec::new(vec![FieldSpec::attr("links", "a", "href")]).unwrap();
        let html = doc(r#"<html><body><a>no href</a><a href="/z">z</a></body></html>"#);

        let fields = spec.apply(&html);
        assert_eq!(fields.get("links").unwrap(), ["", "/z"]);
    }

    #[test]
    fn test_unmatched_selector_yields_empty_sequence() {
        let spec = SelectorSpec::new(vec![FieldSpec::text("title", "h1")]).unwrap();
        let fields = spec.apply(&doc("<html><body><p>nothing</p></body></html>"));

        assert_eq!(fields.get("title"), Some(&[][..]));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_value_count_matches_node_count() {
        let spec = SelectorSpec::new(vec![FieldSpec::text("items", "li")]).unwrap();
        let html = doc("<ul><li>a</li><li>b</li><li>c</li></ul><ol><li>d</li></ol>");
        let selector = Selector::parse("li").unwrap();

        let fields = spec.apply(&html);
        assert_eq!(fields.get("items").unwrap().len(), html.select(&selector).count());
    }

    #[test]
    fn test_keys_follow_spec_order() {
        let spec = SelectorSpec::new(vec![
            FieldSpec::text("z", "h1"),
            FieldSpec::text("a", "p"),
        ])
        .unwrap();
        let fields = spec.apply(&doc("<p>x</p>"));
        let keys: Vec<_> = fields.keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_empty_spec_yields_empty_fields() {
        let fields = SelectorSpec::empty().apply(&doc("<h1>Title</h1>"));
        assert!(fields.is_empty());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = SelectorSpec::new(vec![
            FieldSpec::text("title", "h1"),
            FieldSpec::text("title", "h2"),
        ]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = SelectorSpec::new(vec![FieldSpec::text(" ", "h1")]);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let result = SelectorSpec::new(vec![FieldSpec::text("bad", "a[[[")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidSelector { ref key, .. }) if key == "bad"
        ));
    }

    #[test]
    fn test_field_spec_deserializes_attr_alias() {
        let spec: FieldSpec =
            toml::from_str("key = \"links\"\nselector = \"a\"\nattr = \"href\"").unwrap();
        assert_eq!(spec, FieldSpec::attr("links", "a", "href"));

        let spec: FieldSpec = toml::from_str("key = \"title\"\nselector = \"h1\"").unwrap();
        assert_eq!(spec.attribute, None);
    }
}
