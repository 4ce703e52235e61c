use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::SourceDescriptor;
use crate::record::Record;

/// Wrapper keys probed, in order, when a source body is an object instead
/// of a bare array.
const WRAPPER_KEYS: &[&str] = &["items", "data", "records", "models", "datasets", "apis", "tools"];

/// Seam between the fetch pipeline and the transport, so tests can inject
/// canned bodies without a network.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    async fn load_body(&self, descriptor: &SourceDescriptor) -> anyhow::Result<Value>;
}

/// Production loader: http(s) locations go through reqwest, everything else
/// is read from disk relative to the config directory.
pub struct HttpLoader {
    client: reqwest::Client,
    base_dir: PathBuf,
}

impl HttpLoader {
    pub fn new(base_dir: PathBuf) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build catalog http client")?;
        Ok(Self { client, base_dir })
    }
}

#[async_trait]
impl SourceLoader for HttpLoader {
    async fn load_body(&self, descriptor: &SourceDescriptor) -> anyhow::Result<Value> {
        if let Ok(url) = Url::parse(&descriptor.location) {
            if url.scheme() == "http" || url.scheme() == "https" {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?;
                if !response.status().is_success() {
                    anyhow::bail!("GET {url} returned {}", response.status());
                }
                return response
                    .json::<Value>()
                    .await
                    .with_context(|| format!("parse JSON body: {url}"));
            }
        }

        let path = self.base_dir.join(&descriptor.location);
        let json = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read source file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parse source file: {}", path.display()))
    }
}

/// Fetches one source and normalizes it to a flat record sequence. Transport
/// failures, non-success statuses, and unrecognized shapes all degrade to an
/// empty sequence: callers treat "no data" and "fetch failed" identically.
pub async fn load_records(loader: &dyn SourceLoader, descriptor: &SourceDescriptor) -> Vec<Record> {
    tracing::debug!(key = %descriptor.key, location = %descriptor.location, "loading source");
    let body = match loader.load_body(descriptor).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(
                key = %descriptor.key,
                err = %format!("{err:#}"),
                "failed to load source; treating as empty"
            );
            return Vec::new();
        }
    };

    let records = normalize_body(&descriptor.key, body);
    tracing::info!(key = %descriptor.key, count = records.len(), "loaded source");
    records
}

/// Loads every configured source concurrently. Completion order across
/// sources is nondeterministic, but the catalog's insertion order always
/// follows the config, so the aggregate stays deterministic.
pub async fn load_all(
    loader: std::sync::Arc<dyn SourceLoader>,
    sources: &[SourceDescriptor],
) -> crate::catalog::Catalog {
    let mut set = tokio::task::JoinSet::new();
    for descriptor in sources.iter().cloned() {
        let loader = std::sync::Arc::clone(&loader);
        set.spawn(async move {
            let records = load_records(loader.as_ref(), &descriptor).await;
            (descriptor.key, records)
        });
    }

    let mut by_key = std::collections::HashMap::new();
    while let Some(result) = set.join_next().await {
        match result {
            Ok((key, records)) => {
                by_key.insert(key, records);
            }
            Err(err) => tracing::warn!(%err, "source load task failed"),
        }
    }

    let mut catalog = crate::catalog::Catalog::new();
    for descriptor in sources {
        catalog.insert(
            &descriptor.key,
            by_key.remove(&descriptor.key).unwrap_or_default(),
        );
    }
    catalog
}

fn normalize_body(source_key: &str, body: Value) -> Vec<Record> {
    match body {
        Value::Array(values) => to_records(source_key, values),
        Value::Object(mut map) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(values)) = map.remove(*key) {
                    return to_records(source_key, values);
                }
            }

            // Sectioned shape: every top-level array field is flattened in
            // key order, the field name doubling as a default category.
            let mut records = Vec::new();
            for (section, value) in map {
                let Value::Array(values) = value else {
                    continue;
                };
                records.extend(
                    to_records(source_key, values)
                        .into_iter()
                        .map(|record| record.with_default_category(&section)),
                );
            }
            if records.is_empty() {
                tracing::warn!(key = %source_key, "source body matched no recognized shape");
            }
            records
        }
        _ => {
            tracing::warn!(key = %source_key, "source body is neither array nor object");
            Vec::new()
        }
    }
}

fn to_records(source_key: &str, values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .filter_map(|value| Record::from_value(source_key, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{HttpLoader, SourceLoader, load_records, normalize_body};
    use crate::config::SourceDescriptor;
    use serde_json::json;

    fn titles(records: &[crate::record::Record]) -> Vec<String> {
        records
            .iter()
            .map(|record| record.display_title().to_owned())
            .collect()
    }

    #[test]
    fn bare_array_and_wrappers_normalize_identically() {
        let body = json!([{"name": "a"}, {"name": "b"}]);
        let bare = normalize_body("src", body.clone());

        for wrapper in ["items", "data", "models"] {
            let wrapped = normalize_body("src", json!({ wrapper: body.clone() }));
            assert_eq!(titles(&bare), titles(&wrapped), "wrapper {wrapper}");
        }
    }

    #[test]
    fn wrapper_keys_probed_in_order() {
        let body = json!({
            "data": [{"name": "from-data"}],
            "items": [{"name": "from-items"}]
        });
        assert_eq!(titles(&normalize_body("src", body)), ["from-items"]);
    }

    #[test]
    fn sectioned_shape_flattens_with_section_as_category() {
        let body = json!({
            "Animals": [{"API": "cat-facts"}],
            "Books": [{"API": "openlibrary", "Category": "Reading"}],
            "count": 2
        });
        let records = normalize_body("src", body);
        assert_eq!(titles(&records), ["cat-facts", "openlibrary"]);
        assert_eq!(records[0].categories, ["Animals"]);
        assert_eq!(records[1].categories, ["Reading"]);
    }

    #[test]
    fn unrecognized_shapes_are_empty() {
        assert!(normalize_body("src", json!("nope")).is_empty());
        assert!(normalize_body("src", json!({"total": 3})).is_empty());
        assert!(normalize_body("src", json!(null)).is_empty());
    }

    struct FailingLoader;

    #[async_trait::async_trait]
    impl SourceLoader for FailingLoader {
        async fn load_body(&self, _: &SourceDescriptor) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn load_failure_degrades_to_empty() {
        let descriptor = SourceDescriptor {
            key: "down".to_owned(),
            location: "https://unreachable.invalid/data.json".to_owned(),
            label: "Down".to_owned(),
        };
        assert!(load_records(&FailingLoader, &descriptor).await.is_empty());
    }

    #[tokio::test]
    async fn local_files_resolve_against_base_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.json"), r#"[{"name": "local"}]"#).unwrap();

        let loader = HttpLoader::new(temp.path().to_path_buf()).unwrap();
        let descriptor = SourceDescriptor {
            key: "a".to_owned(),
            location: "a.json".to_owned(),
            label: "A".to_owned(),
        };
        let records = load_records(&loader, &descriptor).await;
        assert_eq!(titles(&records), ["local"]);
    }
}
