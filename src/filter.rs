use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::favorites::Favorites;
use crate::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Source order, untouched.
    #[default]
    Relevance,
    NameAsc,
    NameDesc,
}

/// User-selected facet values plus sort mode. Mutated only by explicit user
/// interaction; read on every re-render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub category: Option<String>,
    pub language: Option<String>,
    pub license: Option<String>,
    /// Per-view text query; the cross-source variant is `search`.
    pub query: Option<String>,
    pub favorites_only: bool,
    #[serde(default)]
    pub sort: SortMode,
}

impl FilterState {
    /// Any non-default facet, flag, or sort disables pagination for the
    /// affected view: filtered results render in one pass.
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }
}

/// Applies facet predicates (ANDed, in a fixed order) and the sort mode.
/// Stateless and deterministic: identical inputs yield identical output,
/// ties keep their input order.
pub fn apply<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    filter: &FilterState,
    favorites: &Favorites,
) -> Vec<&'a Record> {
    let mut matched: Vec<&Record> = records
        .into_iter()
        .filter(|record| matches_category(record, filter.category.as_deref()))
        .filter(|record| matches_exact(record.language.as_deref(), filter.language.as_deref()))
        .filter(|record| matches_exact(record.license.as_deref(), filter.license.as_deref()))
        .filter(|record| match &filter.query {
            None => true,
            Some(query) => {
                let needle = query.trim().to_lowercase();
                needle.is_empty() || haystack(record).contains(&needle)
            }
        })
        .filter(|record| {
            if !filter.favorites_only {
                return true;
            }
            record.id().is_some_and(|id| favorites.contains(&id))
        })
        .collect();

    match filter.sort {
        SortMode::Relevance => {}
        SortMode::NameAsc => matched.sort_by_cached_key(|record| sort_key(record)),
        // Stable descending: titles reversed, untitled records still last,
        // ties keep input order.
        SortMode::NameDesc => matched.sort_by(|a, b| {
            let (a_untitled, a_title) = sort_key(a);
            let (b_untitled, b_title) = sort_key(b);
            a_untitled.cmp(&b_untitled).then(b_title.cmp(&a_title))
        }),
    }
    matched
}

/// Global text search: scans title, description, categories, tags, license,
/// and source key for case-insensitive substring containment over the
/// de-duplicated aggregate of all cached sources. Bypasses pagination.
pub fn search<'a>(catalog: &'a Catalog, query: &str) -> Vec<&'a Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .all_records()
        .into_iter()
        .filter(|record| haystack(record).contains(&needle))
        .collect()
}

fn matches_category(record: &Record, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted else {
        return true;
    };
    record
        .categories
        .iter()
        .any(|category| category.eq_ignore_ascii_case(wanted))
}

fn matches_exact(actual: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => actual.is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
    }
}

// Untitled records order last; the index keeps the sort stable for them too.
fn sort_key(record: &Record) -> (bool, String) {
    match &record.title {
        Some(title) => (false, title.to_lowercase()),
        None => (true, String::new()),
    }
}

fn haystack(record: &Record) -> String {
    let mut parts: Vec<&str> = Vec::new();
    parts.extend(record.title.as_deref());
    parts.extend(record.description.as_deref());
    parts.extend(record.categories.iter().map(String::as_str));
    parts.extend(record.tags.iter().map(String::as_str));
    parts.extend(record.license.as_deref());
    parts.push(&record.source_key);
    parts.join("\n").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{FilterState, SortMode, apply, search};
    use crate::catalog::Catalog;
    use crate::favorites::Favorites;
    use crate::record::Record;
    use serde_json::{Value, json};

    fn record(value: Value) -> Record {
        Record::from_value("test", value).unwrap()
    }

    fn sample() -> Vec<Record> {
        vec![
            record(json!({"name": "bert", "task": "nlp, classification", "language": "en", "license": "MIT"})),
            record(json!({"name": "Albatross", "task": "vision", "language": "en", "license": "Apache-2.0"})),
            record(json!({"name": "corvid", "task": "NLP", "language": "de", "license": "mit"})),
        ]
    }

    #[test]
    fn predicates_are_anded_case_insensitively() {
        let records = sample();
        let favorites = Favorites::in_memory();
        let filter = FilterState {
            category: Some("nlp".to_owned()),
            license: Some("MIT".to_owned()),
            ..FilterState::default()
        };
        let matched = apply(&records, &filter, &favorites);
        let titles: Vec<_> = matched.iter().map(|r| r.display_title()).collect();
        assert_eq!(titles, ["bert", "corvid"]);

        let narrowed = FilterState {
            language: Some("EN".to_owned()),
            ..filter
        };
        let matched = apply(&records, &narrowed, &favorites);
        let titles: Vec<_> = matched.iter().map(|r| r.display_title()).collect();
        assert_eq!(titles, ["bert"]);
    }

    #[test]
    fn relevance_preserves_input_order() {
        let records = sample();
        let favorites = Favorites::in_memory();
        let matched = apply(&records, &FilterState::default(), &favorites);
        let titles: Vec<_> = matched.iter().map(|r| r.display_title()).collect();
        assert_eq!(titles, ["bert", "Albatross", "corvid"]);
    }

    #[test]
    fn name_sort_is_case_insensitive_and_reversible() {
        let records = sample();
        let favorites = Favorites::in_memory();
        let asc = FilterState {
            sort: SortMode::NameAsc,
            ..FilterState::default()
        };
        let titles: Vec<_> = apply(&records, &asc, &favorites)
            .iter()
            .map(|r| r.display_title())
            .collect();
        assert_eq!(titles, ["Albatross", "bert", "corvid"]);

        let desc = FilterState {
            sort: SortMode::NameDesc,
            ..FilterState::default()
        };
        let titles: Vec<_> = apply(&records, &desc, &favorites)
            .iter()
            .map(|r| r.display_title())
            .collect();
        assert_eq!(titles, ["corvid", "bert", "Albatross"]);
    }

    #[test]
    fn apply_is_deterministic() {
        let records = sample();
        let favorites = Favorites::in_memory();
        let filter = FilterState {
            category: Some("nlp".to_owned()),
            sort: SortMode::NameAsc,
            ..FilterState::default()
        };
        let first: Vec<_> = apply(&records, &filter, &favorites)
            .iter()
            .map(|r| r.display_title().to_owned())
            .collect();
        let second: Vec<_> = apply(&records, &filter, &favorites)
            .iter()
            .map(|r| r.display_title().to_owned())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn query_narrows_alongside_facets() {
        let records = sample();
        let favorites = Favorites::in_memory();
        let filter = FilterState {
            category: Some("nlp".to_owned()),
            query: Some("CORV".to_owned()),
            ..FilterState::default()
        };
        let matched = apply(&records, &filter, &favorites);
        let titles: Vec<_> = matched.iter().map(|r| r.display_title()).collect();
        assert_eq!(titles, ["corvid"]);

        // A blank query matches everything.
        let blank = FilterState {
            query: Some("   ".to_owned()),
            ..FilterState::default()
        };
        assert_eq!(apply(&records, &blank, &favorites).len(), 3);
    }

    #[test]
    fn favorites_only_with_empty_set_matches_nothing() {
        let records = sample();
        let favorites = Favorites::in_memory();
        let filter = FilterState {
            favorites_only: true,
            ..FilterState::default()
        };
        assert!(apply(&records, &filter, &favorites).is_empty());
    }

    #[test]
    fn favorites_only_keeps_toggled_records() {
        let records = sample();
        let mut favorites = Favorites::in_memory();
        favorites.toggle(&records[2].id().unwrap());
        let filter = FilterState {
            favorites_only: true,
            ..FilterState::default()
        };
        let matched = apply(&records, &filter, &favorites);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].display_title(), "corvid");
    }

    #[test]
    fn search_spans_all_sources_and_fields() {
        let mut catalog = Catalog::new();
        catalog.insert(
            "one",
            vec![
                Record::from_value("one", json!({"name": "bert", "description": "encoder"}))
                    .unwrap(),
            ],
        );
        catalog.insert(
            "two",
            vec![
                Record::from_value("two", json!({"name": "squad", "tags": ["question-answering"]}))
                    .unwrap(),
                Record::from_value("two", json!({"name": "other"})).unwrap(),
            ],
        );

        let hits = search(&catalog, "QUESTION");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].display_title(), "squad");

        // Source key participates in the haystack.
        assert_eq!(search(&catalog, "two").len(), 2);
        assert!(search(&catalog, "  ").is_empty());
    }

    #[test]
    fn default_filter_is_inactive() {
        assert!(!FilterState::default().is_active());
        let active = FilterState {
            sort: SortMode::NameAsc,
            ..FilterState::default()
        };
        assert!(active.is_active());
    }
}
