use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{error, trace};

use crate::{
    error::UpdateError,
    order_index::{BucketsDescending, OrderIndex, Seq},
    record::{ClientId, Record, Score},
    update::ScoreUpdate,
    FastHashMap,
};

/// Ranking positions `first..=last` (1-based, highest score at 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankWindow {
    first: usize,
    last: usize,
}

impl RankWindow {
    /// Clamps `[rank - scope, rank + scope]` to the positions that exist.
    /// `None` when `rank < 1`, `scope < 0` or nothing is left after clamping.
    pub fn new(rank: i64, scope: i64, positions: usize) -> Option<Self> {
        if rank < 1 || scope < 0 {
            return None;
        }
        let lower = rank.saturating_sub(scope).max(1);
        let upper = rank
            .saturating_add(scope)
            .min(i64::try_from(positions).unwrap_or(i64::MAX));
        if lower > upper {
            return None;
        }
        Some(Self {
            first: lower as usize,
            last: upper as usize,
        })
    }

    #[inline]
    pub fn first(&self) -> usize {
        self.first
    }

    #[inline]
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of positions covered; always at least one.
    #[inline]
    pub fn positions(&self) -> usize {
        self.last - self.first + 1
    }
}

/// A record plus its stamp in the bucket it currently occupies.
#[derive(Clone, Copy, Debug)]
struct Slot {
    record: Record,
    seq: Seq,
}

/// Every known client plus the score-ordered index over them.
///
/// The map owns the records; the index only holds ids. After any call,
/// successful or not, each record sits in exactly the bucket for its score.
#[derive(Debug, Default)]
pub struct RankingEngine {
    clients: FastHashMap<ClientId, Slot>,
    sorted_clients: OrderIndex,
}

impl RankingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known clients.
    #[inline]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Distinct scores, i.e. ranking positions.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.sorted_clients.bucket_count()
    }

    pub fn get(&self, id: ClientId) -> Option<Record> {
        self.clients.get(&id).map(|slot| slot.record)
    }

    pub fn score_of(&self, id: ClientId) -> Option<Score> {
        self.clients.get(&id).map(|slot| slot.record.score())
    }

    /// Applies one score report. A client seen for the first time starts at zero.
    ///
    /// The new score is worked out on a copy of the record and only committed
    /// once it is known to be valid, so a rejected update touches nothing.
    pub fn update(&mut self, update: ScoreUpdate) -> Result<Record, UpdateError> {
        let user = update.user();
        let known = self.clients.get(&user).copied();
        let mut record = known.map_or_else(|| Record::new(user), |slot| slot.record);
        let old = record.score();

        match update {
            ScoreUpdate::Absolute { total, .. } => record.set_absolute(total),
            ScoreUpdate::Relative { delta, .. } => {
                if let Err(err) = record.apply_delta(delta) {
                    trace!(user, old, %delta, error = %err, "relative update rejected");
                    return Err(err);
                }
            }
        }

        let seq = match known {
            Some(slot) => self
                .sorted_clients
                .rebucket(user, slot.seq, old, record.score())
                .unwrap_or_else(|| {
                    error!(user, old, "client missing from its bucket, reinserting");
                    self.sorted_clients.insert(user, record.score())
                }),
            None => self.sorted_clients.insert(user, record.score()),
        };
        self.clients.insert(user, Slot { record, seq });
        trace!(user, old, new = record.score(), "score updated");
        Ok(record)
    }

    /// Parses a raw report and applies it.
    pub fn update_message(&mut self, message: &Value) -> Result<Record, UpdateError> {
        self.update(ScoreUpdate::from_message(message)?)
    }

    /// Clients occupying the `top_size` highest ranking positions.
    ///
    /// Positions are buckets, so ties in the last position can make the result
    /// longer than `top_size`.
    pub fn top(&self, top_size: i64) -> Vec<Record> {
        if top_size <= 0 {
            return Vec::new();
        }
        let n = usize::try_from(top_size).unwrap_or(usize::MAX);
        self.flatten(self.sorted_clients.n_largest_buckets(n))
    }

    /// Clients within `scope` positions of `rank`, highest first.
    pub fn relative_top(&self, rank: i64, scope: i64) -> Vec<Record> {
        match RankWindow::new(rank, scope, self.bucket_count()) {
            Some(window) => self.window(window),
            None => Vec::new(),
        }
    }

    pub fn window(&self, window: RankWindow) -> Vec<Record> {
        self.flatten(
            self.sorted_clients
                .buckets_range(window.first() - 1, window.positions()),
        )
    }

    pub fn reset(&mut self) {
        self.clients.clear();
        self.sorted_clients.clear();
    }

    fn flatten(&self, buckets: BucketsDescending<'_>) -> Vec<Record> {
        buckets
            .flat_map(|(_, bucket)| bucket.ids())
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Panics unless the map and the index describe exactly the same clients.
    #[doc(hidden)]
    pub fn assert_consistent(&self) {
        self.sorted_clients.assert_invariants();
        assert_eq!(self.sorted_clients.len(), self.clients.len());
        let mut seen = FxHashSet::default();
        for (score, bucket) in self.sorted_clients.buckets_descending() {
            for (&seq, &id) in bucket.entries() {
                assert!(seen.insert(id), "client {id} indexed twice");
                let slot = self
                    .clients
                    .get(&id)
                    .unwrap_or_else(|| panic!("client {id} indexed but unknown"));
                assert_eq!(slot.record.score(), score, "client {id} in wrong bucket");
                assert_eq!(slot.seq, seq, "client {id} has a stale stamp");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(records: &[Record]) -> Vec<ClientId> {
        records.iter().map(Record::id).collect()
    }

    #[test]
    fn window_clamps_to_existing_positions() {
        assert_eq!(
            RankWindow::new(5, 8, 10),
            Some(RankWindow { first: 1, last: 10 })
        );
        assert_eq!(
            RankWindow::new(11, 2, 10),
            Some(RankWindow { first: 9, last: 10 })
        );
        assert_eq!(RankWindow::new(13, 2, 10), None);
        assert_eq!(RankWindow::new(-3, 2, 10), None);
        assert_eq!(RankWindow::new(5, -2, 10), None);
        assert_eq!(RankWindow::new(1, 0, 0), None);
        assert_eq!(
            RankWindow::new(i64::MAX, i64::MAX, 3),
            Some(RankWindow { first: 1, last: 3 })
        );
    }

    #[test]
    fn rejected_update_leaves_state_untouched() {
        let mut engine = RankingEngine::new();
        engine.update_message(&json!({"user": 1, "total": 10})).unwrap();

        for bad in [
            json!({"total": 99}),
            json!({"user": 1}),
            json!({"user": 2, "score": "*3"}),
            json!({"user": 1, "score": "+x"}),
        ] {
            assert!(engine.update_message(&bad).is_err());
            assert_eq!(engine.len(), 1);
            assert_eq!(engine.bucket_count(), 1);
            assert_eq!(engine.score_of(1), Some(10));
            engine.assert_consistent();
        }
    }

    #[test]
    fn overflowing_relative_update_does_not_create_client() {
        let mut engine = RankingEngine::new();
        engine
            .update(ScoreUpdate::Absolute { user: 1, total: i64::MAX })
            .unwrap();
        assert!(engine.update_message(&json!({"user": 1, "score": "+1"})).is_err());
        assert_eq!(engine.score_of(1), Some(i64::MAX));

        let min = format!("-{}", i64::MAX);
        engine.update_message(&json!({"user": 2, "score": min})).unwrap();
        assert!(engine.update_message(&json!({"user": 2, "score": "-2"})).is_err());
        assert_eq!(engine.score_of(2), Some(-i64::MAX));
        engine.assert_consistent();
    }

    #[test]
    fn repeated_absolute_value_is_idempotent() {
        let mut engine = RankingEngine::new();
        engine.update_message(&json!({"user": 4, "total": 70})).unwrap();
        engine.update_message(&json!({"user": 5, "total": 70})).unwrap();
        engine.update_message(&json!({"user": 4, "total": 70})).unwrap();
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.bucket_count(), 1);
        assert_eq!(ids(&engine.top(1)), [4, 5]);
        engine.assert_consistent();
    }

    #[test]
    fn ties_widen_top_results() {
        let mut engine = RankingEngine::new();
        for (user, total) in [(1, 50), (2, 40), (3, 40), (4, 30)] {
            engine.update(ScoreUpdate::Absolute { user, total }).unwrap();
        }
        assert_eq!(ids(&engine.top(2)), [1, 2, 3]);
        assert_eq!(ids(&engine.relative_top(2, 0)), [2, 3]);
        assert!(engine.top(0).is_empty());
        assert!(engine.top(-4).is_empty());
        assert_eq!(engine.top(i64::MAX).len(), 4);
    }

    #[test]
    fn moving_a_client_keeps_tie_order_of_the_rest() {
        let mut engine = RankingEngine::new();
        for user in [10, 11, 12] {
            engine.update(ScoreUpdate::Absolute { user, total: 5 }).unwrap();
        }
        engine.update_message(&json!({"user": 11, "score": "+1"})).unwrap();
        engine.update_message(&json!({"user": 11, "score": "-1"})).unwrap();
        assert_eq!(ids(&engine.top(1)), [10, 12, 11]);
        engine.assert_consistent();
    }

    #[test]
    fn reset_forgets_everyone() {
        let mut engine = RankingEngine::new();
        for user in 0..20 {
            engine
                .update(ScoreUpdate::Absolute { user, total: user % 4 })
                .unwrap();
        }
        engine.reset();
        assert!(engine.is_empty());
        assert_eq!(engine.bucket_count(), 0);
        assert!(engine.top(5).is_empty());
        assert!(engine.relative_top(1, 1).is_empty());
        engine.assert_consistent();
    }
}
