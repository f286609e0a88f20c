//! In-memory storage backed by an append-only `Vec` under one `RwLock`.

use std::sync::RwLock;

use crate::error::{PomoError, Result};
use crate::timer::Interval;

use super::Storage;

/// Concurrency-safe in-memory store.
///
/// Ids are positions in the vector plus one. Writers take the write lock,
/// lookups share the read lock.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    intervals: RwLock<Vec<Interval>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.intervals.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn slot(len: usize, id: i64) -> Result<usize> {
    if id <= 0 || id as usize > len {
        return Err(PomoError::InvalidId(id));
    }
    Ok(id as usize - 1)
}

impl Storage for InMemoryStorage {
    fn create(&self, interval: &Interval) -> Result<i64> {
        let mut intervals = self.intervals.write()?;
        let id = intervals.len() as i64 + 1;
        let mut record = interval.clone();
        record.id = id;
        intervals.push(record);
        Ok(id)
    }

    fn update(&self, interval: &Interval) -> Result<()> {
        let mut intervals = self.intervals.write()?;
        let idx = slot(intervals.len(), interval.id)?;
        intervals[idx] = interval.clone();
        Ok(())
    }

    fn by_id(&self, id: i64) -> Result<Interval> {
        let intervals = self.intervals.read()?;
        let idx = slot(intervals.len(), id)?;
        Ok(intervals[idx].clone())
    }

    fn last(&self) -> Result<Interval> {
        let intervals = self.intervals.read()?;
        intervals.last().cloned().ok_or(PomoError::NoIntervals)
    }

    fn breaks(&self, n: usize) -> Result<Vec<Interval>> {
        let intervals = self.intervals.read()?;
        Ok(intervals
            .iter()
            .rev()
            .filter(|i| i.category.is_break())
            .take(n)
            .cloned()
            .collect())
    }

    fn update_with(
        &self,
        id: i64,
        apply: &mut dyn FnMut(&mut Interval) -> bool,
    ) -> Result<Interval> {
        let mut intervals = self.intervals.write()?;
        let idx = slot(intervals.len(), id)?;
        let mut record = intervals[idx].clone();
        if apply(&mut record) {
            intervals[idx] = record.clone();
        }
        Ok(record)
    }
}
