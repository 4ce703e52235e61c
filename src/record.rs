use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Digest as _;
use sha2::Sha256;

/// One catalog entry in canonical form. Source documents disagree on field
/// names (`name` vs `model_name` vs `API`); normalization happens once here
/// so downstream code never sees the raw shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub source_key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub categories: Vec<String>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub metric: Option<String>,
    pub auth: Option<String>,
    /// Raw fields as fetched, kept for identifier derivation and display of
    /// anything the canonical set does not cover.
    pub raw: Map<String, Value>,
}

const TITLE_KEYS: &[&str] = &["name", "model_name", "dataset_name", "title", "API", "use_case"];
const DESCRIPTION_KEYS: &[&str] = &["description", "Description", "summary"];
const LINK_KEYS: &[&str] = &["url", "URL", "link", "Link"];
const CATEGORY_KEYS: &[&str] = &["category", "Category", "task", "type"];
const LANGUAGE_KEYS: &[&str] = &["language", "Language"];
const LICENSE_KEYS: &[&str] = &["license", "License"];
const METRIC_KEYS: &[&str] = &["size", "performance"];
const AUTH_KEYS: &[&str] = &["Auth", "auth"];

impl Record {
    /// Normalizes one raw JSON value. Non-object values carry no usable
    /// fields and are dropped from the sequence.
    pub fn from_value(source_key: &str, value: Value) -> Option<Self> {
        let Value::Object(raw) = value else {
            return None;
        };

        let categories = first_string(&raw, CATEGORY_KEYS)
            .map(|joined| {
                joined
                    .split(',')
                    .map(|part| part.trim().to_owned())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let tags = raw
            .get("tags")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            source_key: source_key.to_owned(),
            title: first_string(&raw, TITLE_KEYS),
            description: first_string(&raw, DESCRIPTION_KEYS),
            link: first_string(&raw, LINK_KEYS),
            categories,
            language: first_string(&raw, LANGUAGE_KEYS),
            license: first_string(&raw, LICENSE_KEYS),
            tags,
            metric: first_string(&raw, METRIC_KEYS),
            auth: first_string(&raw, AUTH_KEYS),
            raw,
        })
    }

    /// Stable identifier used for favorites membership. Fallback chain:
    /// explicit `id` field, `model_id` field, literal `title` field, derived
    /// link, then a fingerprint of source key + derived title. A record with
    /// no derivable display title gets no identifier and cannot be favorited.
    pub fn id(&self) -> Option<String> {
        for key in ["id", "model_id", "title"] {
            if let Some(explicit) = string_field(&self.raw, key) {
                return Some(explicit);
            }
        }
        if let Some(link) = self.link.as_deref().filter(|link| !link.trim().is_empty()) {
            return Some(link.to_owned());
        }

        let title = self.title.as_deref().filter(|title| !title.trim().is_empty())?;
        let mut hasher = Sha256::new();
        hasher.update(self.source_key.as_bytes());
        hasher.update(b"\n");
        hasher.update(title.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    /// True when normalization found nothing presentable at all.
    pub fn is_blank(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.link.is_none()
    }

    /// Sets the category for records that arrived without one (used by the
    /// sectioned object shape where the wrapper key names the category).
    pub fn with_default_category(mut self, category: &str) -> Self {
        if self.categories.is_empty() {
            self.categories.push(category.to_owned());
        }
        self
    }
}

fn first_string(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_field(raw, key))
}

fn string_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    let value = raw.get(key)?.as_str()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_owned())
}
