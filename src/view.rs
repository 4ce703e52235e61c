use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::favorites::Favorites;
use crate::filter::FilterState;
use crate::paginate::Paginator;
use crate::record::Record;
use crate::render::{RenderMode, render_batch};

/// Everything one browse session owns: the cache, pagination cursors,
/// favorites, and the active filter. One context per page load (CLI
/// invocation or server process); no ambient globals.
///
/// The update cycle is unidirectional: a state mutation, then a single
/// render call. Render never mutates state beyond cursor advancement in
/// `advance`.
pub struct CatalogContext {
    catalog: Catalog,
    paginator: Paginator,
    favorites: Favorites,
    filter: FilterState,
    batch_size: usize,
    sentinel_seq: u64,
    /// Outstanding sentinel tokens, each mapping to its source. A token is
    /// removed the moment it fires, which is what makes it one-shot.
    issued: HashMap<String, String>,
}

impl CatalogContext {
    pub fn new(batch_size: usize, favorites: Favorites) -> Self {
        Self {
            catalog: Catalog::new(),
            paginator: Paginator::new(),
            favorites,
            filter: FilterState::default(),
            batch_size,
            sentinel_seq: 0,
            issued: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn insert_source(&mut self, source_key: &str, records: Vec<Record>) {
        self.catalog.insert(source_key, records);
    }

    /// Replaces the active filter. A changed filter resets every cursor and
    /// voids outstanding sentinels: filtered views render unpaginated.
    pub fn set_filter(&mut self, filter: FilterState) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        self.paginator.reset_all();
        self.issued.clear();
    }

    /// Replace-mode view of one source: the full filtered result when a
    /// filter is active, otherwise a fresh first batch with a sentinel.
    pub fn view_source(&mut self, source_key: &str) -> String {
        if self.filter.is_active() {
            let matched =
                crate::filter::apply(self.catalog.records(source_key), &self.filter, &self.favorites);
            return render_batch(matched, &self.favorites, RenderMode::Replace, None);
        }

        self.paginator.reset(source_key);
        self.issued.retain(|_, key| key != source_key);

        let batch: Vec<Record> = self
            .paginator
            .next_batch(&self.catalog, source_key, self.batch_size)
            .to_vec();
        let sentinel = (!batch.is_empty()).then(|| self.issue_token(source_key));
        render_batch(&batch, &self.favorites, RenderMode::Replace, sentinel.as_deref())
    }

    /// Viewport-trigger entry point: the client reports that a sentinel
    /// became visible. Each token fires at most once; replayed or unknown
    /// tokens, an active filter, and an exhausted source all yield `None`.
    pub fn advance(&mut self, source_key: &str, token: &str) -> Option<String> {
        if self.filter.is_active() {
            return None;
        }
        match self.issued.remove(token) {
            Some(issued_for) if issued_for == source_key => {}
            Some(issued_for) => {
                // Token belongs to another source; it is spent either way.
                tracing::debug!(token, expected = %issued_for, got = %source_key, "sentinel token source mismatch");
                return None;
            }
            None => return None,
        }

        let batch: Vec<Record> = self
            .paginator
            .next_batch(&self.catalog, source_key, self.batch_size)
            .to_vec();
        if batch.is_empty() {
            return None;
        }

        let sentinel = self.issue_token(source_key);
        Some(render_batch(
            &batch,
            &self.favorites,
            RenderMode::Append,
            Some(&sentinel),
        ))
    }

    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        self.favorites.toggle(id)
    }

    /// Cross-source text search; renders every match in one pass.
    pub fn search(&self, query: &str) -> String {
        let hits = crate::filter::search(&self.catalog, query);
        render_batch(hits, &self.favorites, RenderMode::Replace, None)
    }

    fn issue_token(&mut self, source_key: &str) -> String {
        self.sentinel_seq += 1;
        let token = format!("{source_key}:{}", self.sentinel_seq);
        self.issued.insert(token.clone(), source_key.to_owned());
        token
    }
}
