use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::kind::EntityKind;
use super::version::RefVersion;

/// A single-language text entry (`{ "@xml:lang": "en", "#text": "..." }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(rename = "@xml:lang", default)]
    pub lang: String,
    #[serde(rename = "#text", default)]
    pub text: String,
}

impl LocalizedText {
    /// Read a localized-text field, tolerating a single object in place of an array
    pub fn from_value(value: &Value) -> Vec<Self> {
        let items: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![value],
            _ => Vec::new(),
        };

        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()
    }

    /// Pick the text for `lang`, falling back to the first entry
    pub fn pick<'a>(texts: &'a [Self], lang: &str) -> Option<&'a str> {
        texts
            .iter()
            .find(|t| t.lang.eq_ignore_ascii_case(lang))
            .or_else(|| texts.first())
            .map(|t| t.text.as_str())
    }
}

/// A pointer from one dataset to a specific version of another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReference {
    /// Target id; blank only on a "set but blank" reference
    pub ref_id: String,
    pub ref_type: EntityKind,
    pub ref_version: RefVersion,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub display_hint: Vec<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl EntityReference {
    pub fn new(ref_id: impl Into<String>, ref_type: EntityKind, ref_version: RefVersion) -> Self {
        Self {
            ref_id: ref_id.into(),
            ref_type,
            ref_version,
            display_hint: Vec::new(),
            uri: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.ref_id.trim().is_empty()
    }
}

/// Field names that make a mapping node a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceShape {
    pub id_field: String,
    pub type_field: String,
    pub version_field: String,
    #[serde(default)]
    pub hint_field: Option<String>,
    #[serde(default)]
    pub uri_field: Option<String>,
}

impl ReferenceShape {
    /// `@refObjectId` / `@type` / `@version` as written in ILCD datasets
    pub fn ilcd() -> Self {
        Self {
            id_field: "@refObjectId".to_string(),
            type_field: "@type".to_string(),
            version_field: "@version".to_string(),
            hint_field: Some("common:shortDescription".to_string()),
            uri_field: Some("@uri".to_string()),
        }
    }

    /// `refId` / `refType` / `refVersion` as written by API clients
    pub fn plain() -> Self {
        Self {
            id_field: "refId".to_string(),
            type_field: "refType".to_string(),
            version_field: "refVersion".to_string(),
            hint_field: Some("displayHint".to_string()),
            uri_field: None,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::ilcd(), Self::plain()]
    }

    /// Try to read `object` as a reference of this shape.
    ///
    /// Returns `None` when the type tag is missing or names no known kind.
    /// A recognised tag without an id yields a blank reference.
    pub fn extract(&self, object: &Map<String, Value>) -> Option<EntityReference> {
        let kind = object
            .get(&self.type_field)
            .and_then(Value::as_str)
            .and_then(|tag| tag.parse::<EntityKind>().ok())?;

        let ref_id = object
            .get(&self.id_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let version = object.get(&self.version_field).and_then(Value::as_str);
        let display_hint = self
            .hint_field
            .as_ref()
            .and_then(|f| object.get(f))
            .map(LocalizedText::from_value)
            .unwrap_or_default();
        let uri = self
            .uri_field
            .as_ref()
            .and_then(|f| object.get(f))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(EntityReference {
            ref_id,
            ref_type: kind,
            ref_version: RefVersion::from_field(version),
            display_hint,
            uri,
        })
    }
}
