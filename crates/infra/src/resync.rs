//! Per-user marks recording that a role transition committed.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use guestlist_core::UserId;

/// Users whose live sessions carry a role hint older than their latest transition.
///
/// Written by the transition service, consumed by the session synchronizer on
/// the affected user's next authorization check. Nothing is pushed to the
/// user's open session. Marks older than the retention window are dropped on
/// the next write.
#[derive(Debug)]
pub struct ResyncMarks {
    retention: Duration,
    inner: RwLock<HashMap<UserId, DateTime<Utc>>>,
}

impl Default for ResyncMarks {
    fn default() -> Self {
        // Matches the default session lifetime.
        Self::with_retention(Duration::hours(12))
    }
}

impl ResyncMarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks are kept for `retention`; pass the session lifetime.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Record a committed transition; keeps the latest time if marked twice.
    pub fn mark(&self, user_id: UserId, at: DateTime<Utc>) {
        if let Ok(mut map) = self.inner.write() {
            if let Some(cutoff) = at.checked_sub_signed(self.retention) {
                map.retain(|_, marked| *marked >= cutoff);
            }
            let slot = map.entry(user_id).or_insert(at);
            if at > *slot {
                *slot = at;
            }
        }
    }

    pub fn peek(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.inner.read().ok()?.get(&user_id).copied()
    }

    /// Remove and return the mark for `user_id`.
    pub fn take(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.inner.write().ok()?.remove(&user_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_latest_mark() {
        let marks = ResyncMarks::new();
        let id = UserId::new();
        let t0 = Utc::now();
        marks.mark(id, t0 + Duration::seconds(2));
        marks.mark(id, t0);
        assert_eq!(marks.peek(id), Some(t0 + Duration::seconds(2)));
    }

    #[test]
    fn take_consumes() {
        let marks = ResyncMarks::new();
        let id = UserId::new();
        marks.mark(id, Utc::now());
        assert_eq!(marks.len(), 1);
        assert!(marks.take(id).is_some());
        assert!(marks.take(id).is_none());
        assert!(marks.is_empty());
    }

    #[test]
    fn marks_past_retention_are_dropped() {
        let marks = ResyncMarks::with_retention(Duration::minutes(30));
        let t0 = Utc::now();
        let old: Vec<UserId> = (0..100).map(|_| UserId::new()).collect();
        for &id in &old {
            marks.mark(id, t0);
        }
        let recent = UserId::new();
        marks.mark(recent, t0 + Duration::minutes(10));
        assert_eq!(marks.len(), 101);

        let fresh = UserId::new();
        marks.mark(fresh, t0 + Duration::minutes(31));
        assert_eq!(marks.len(), 2);
        assert!(marks.peek(old[0]).is_none());
        assert_eq!(marks.peek(recent), Some(t0 + Duration::minutes(10)));
        assert!(marks.peek(fresh).is_some());
    }
}
