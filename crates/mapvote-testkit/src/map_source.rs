//! Scripted candidate map sources

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mapvote_core::{CatalogError, MapMeta, MapSourceEffects};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
enum Behavior {
    Maps(Vec<MapMeta>),
    Fail(String),
}

/// Map source returning a scripted answer and counting queries.
///
/// The answer can be swapped while the source is shared with a runtime.
#[derive(Debug)]
pub struct StubMapSource {
    behavior: Mutex<Behavior>,
    queries: AtomicUsize,
}

impl StubMapSource {
    /// Source answering with `maps`
    pub fn with_maps(maps: Vec<MapMeta>) -> Self {
        Self {
            behavior: Mutex::new(Behavior::Maps(maps)),
            queries: AtomicUsize::new(0),
        }
    }

    /// Source answering with untiered maps named `names`
    pub fn with_names(names: &[&str]) -> Self {
        Self::with_maps(names.iter().map(|name| MapMeta::new(*name)).collect())
    }

    /// Source that always fails with `CatalogError::Unavailable`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            behavior: Mutex::new(Behavior::Fail(reason.into())),
            queries: AtomicUsize::new(0),
        }
    }

    /// Answer later queries with untiered maps named `names`
    pub fn set_names(&self, names: &[&str]) {
        *self.behavior.lock() =
            Behavior::Maps(names.iter().map(|name| MapMeta::new(*name)).collect());
    }

    /// Fail later queries with `CatalogError::Unavailable`
    pub fn set_failing(&self, reason: impl Into<String>) {
        *self.behavior.lock() = Behavior::Fail(reason.into());
    }

    /// Number of queries served
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MapSourceEffects for StubMapSource {
    async fn query_candidate_maps(&self) -> Result<Vec<MapMeta>, CatalogError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().clone();
        match behavior {
            Behavior::Maps(maps) => Ok(maps),
            Behavior::Fail(reason) => Err(CatalogError::unavailable(reason)),
        }
    }
}
