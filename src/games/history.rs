use crate::games::types::{RoundId, RoundReport};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Bounded archive of finished rounds, oldest evicted first
pub struct RoundHistory {
    reports: Mutex<LruCache<RoundId, RoundReport>>,
}

impl RoundHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            reports: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn record(&self, report: RoundReport) {
        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        reports.put(report.round.id, report);
    }

    pub fn get(&self, round_id: RoundId) -> Option<RoundReport> {
        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        reports.get(&round_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
