use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::data::model::Table;
use crate::error::Result;

/// Holds the normalized table between renders.
///
/// The entry is replaced wholesale: once `ttl` has elapsed (or after
/// [`invalidate`](TableCache::invalidate)) the next lookup reloads. A `None`
/// TTL keeps the table until invalidated. Failed loads are not cached.
#[derive(Debug)]
pub struct TableCache {
    ttl: Option<Duration>,
    entry: Option<(Instant, Arc<Table>)>,
}

impl TableCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self { ttl, entry: None }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        match (&self.entry, self.ttl) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some((loaded_at, _)), Some(ttl)) => now.saturating_duration_since(*loaded_at) < ttl,
        }
    }

    /// The cached table, if any, regardless of age.
    pub fn peek(&self) -> Option<Arc<Table>> {
        self.entry.as_ref().map(|(_, t)| Arc::clone(t))
    }

    pub fn get_or_load<F>(&mut self, loader: F) -> Result<Arc<Table>>
    where
        F: FnOnce() -> Result<Table>,
    {
        self.get_or_load_at(Instant::now(), loader)
    }

    pub fn get_or_load_at<F>(&mut self, now: Instant, loader: F) -> Result<Arc<Table>>
    where
        F: FnOnce() -> Result<Table>,
    {
        if self.is_fresh(now) {
            if let Some((_, table)) = &self.entry {
                return Ok(Arc::clone(table));
            }
        }

        let table = Arc::new(loader()?);
        self.entry = Some((now, Arc::clone(&table)));
        Ok(table)
    }

    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            log::debug!("table cache invalidated");
        }
    }
}
