use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use parking_lot::RwLock;

use super::{
    CacheStore,
    error::{CacheError, Result},
    types::{CacheQuery, CacheRow, NewCacheRow},
};

#[derive(Debug)]
struct Table {
    next_id: u64,
    rows: Vec<CacheRow>,
}

/// Cache table kept in process memory.
#[derive(Debug)]
pub struct InMemoryCacheStore {
    table: RwLock<Table>,
    available: AtomicBool,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                next_id: 1,
                rows: Vec::new(),
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Snapshot of every row, oldest first.
    pub fn rows(&self) -> Vec<CacheRow> {
        self.table.read().rows.clone()
    }

    /// Make every call fail with [`CacheError::Unavailable`] until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable(
                "in-memory cache store is offline".to_string(),
            ))
        }
    }
}

impl CacheStore for InMemoryCacheStore {
    fn find_latest(&self, query: &CacheQuery) -> Result<Option<CacheRow>> {
        self.ensure_available()?;
        let table = self.table.read();
        Ok(table
            .rows
            .iter()
            .filter(|row| query.matches(row))
            .fold(None::<&CacheRow>, |best, row| match best {
                Some(best) if !row.is_newer_than(best) => Some(best),
                _ => Some(row),
            })
            .cloned())
    }

    fn count(&self) -> Result<usize> {
        self.ensure_available()?;
        Ok(self.table.read().rows.len())
    }

    fn clear(&self) -> Result<usize> {
        self.ensure_available()?;
        let mut table = self.table.write();
        let removed = table.rows.len();
        table.rows.clear();
        Ok(removed)
    }

    fn insert(&self, row: NewCacheRow) -> Result<CacheRow> {
        self.ensure_available()?;
        let mut table = self.table.write();
        let row = CacheRow {
            id: table.next_id,
            position: row.position,
            cuisine: row.cuisine,
            results: row.results,
            created_at: Utc::now(),
        };
        table.next_id += 1;
        table.rows.push(row.clone());
        Ok(row)
    }
}
