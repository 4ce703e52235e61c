use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::{FavoritesListArgs, FavoritesToggleArgs};

/// Persistent set of record identifiers, serialized as a JSON array of
/// strings. The only component with cross-session lifetime. Identifiers are
/// opaque strings here; derivation lives on `Record`.
#[derive(Debug, Clone)]
pub struct Favorites {
    path: Option<PathBuf>,
    ids: BTreeSet<String>,
}

impl Favorites {
    /// Loads the set once at startup. A missing or unreadable file starts
    /// the session with an empty set; that is not an error.
    pub fn load(path: &Path) -> Self {
        let ids = match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<BTreeSet<String>>(&json) {
                Ok(ids) => ids,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "favorites file is not a JSON string array; starting empty");
                    BTreeSet::new()
                }
            },
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no favorites file; starting empty");
                BTreeSet::new()
            }
        };

        Self {
            path: Some(path.to_path_buf()),
            ids,
        }
    }

    /// Session-only store, never persisted. Used by tests and one-shot
    /// commands that run without a favorites file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ids: BTreeSet::new(),
        }
    }

    /// Flips membership and persists immediately. Persistence failures are
    /// logged and swallowed: the in-memory state stays authoritative for the
    /// rest of the session.
    pub fn toggle(&mut self, id: &str) -> bool {
        let now_favorite = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_owned());
            true
        };
        self.persist();
        now_favorite
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = self.try_persist(path) {
            tracing::warn!(path = %path.display(), err = %format!("{err:#}"), "favorites persist failed; change will not survive this session");
        }
    }

    fn try_persist(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string(&self.ids).context("serialize favorites")?;
        std::fs::write(path, json)
            .with_context(|| format!("write favorites: {}", path.display()))?;
        Ok(())
    }
}

pub fn run_list(args: FavoritesListArgs) -> anyhow::Result<()> {
    let favorites = Favorites::load(Path::new(&args.favorites));
    for id in favorites.all() {
        println!("{id}");
    }
    tracing::info!(count = favorites.len(), "listed favorites");
    Ok(())
}

pub fn run_toggle(args: FavoritesToggleArgs) -> anyhow::Result<()> {
    let mut favorites = Favorites::load(Path::new(&args.favorites));
    let now_favorite = favorites.toggle(&args.id);
    println!("{}", if now_favorite { "added" } else { "removed" });
    Ok(())
}
