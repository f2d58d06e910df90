use quickcheck::quickcheck;
use scoreboard::{Record, RankingEngine};
use serde_json::json;
use std::collections::HashMap;

/// Naive ranking: sort everything on every query.
#[derive(Default)]
struct Model {
    // user -> (score, moment it entered its current bucket)
    clients: HashMap<i64, (i64, u64)>,
    tick: u64,
}

impl Model {
    fn set(&mut self, user: i64, score: i64) {
        if self.clients.get(&user).map(|&(s, _)| s) != Some(score) {
            self.tick += 1;
            self.clients.insert(user, (score, self.tick));
        }
    }

    fn add(&mut self, user: i64, delta: i64) {
        let current = self.clients.get(&user).map_or(0, |&(s, _)| s);
        self.set(user, current + delta);
    }

    fn positions(&self) -> Vec<Vec<i64>> {
        let mut entries: Vec<_> = self
            .clients
            .iter()
            .map(|(&user, &(score, tick))| (score, tick, user))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let mut positions: Vec<Vec<i64>> = Vec::new();
        let mut last_score = None;
        for (score, _, user) in entries {
            if last_score == Some(score) {
                positions.last_mut().unwrap().push(user);
            } else {
                positions.push(vec![user]);
                last_score = Some(score);
            }
        }
        positions
    }

    fn top(&self, size: i64) -> Vec<i64> {
        let take = usize::try_from(size.max(0)).unwrap();
        self.positions().into_iter().take(take).flatten().collect()
    }

    fn relative_top(&self, rank: i64, scope: i64) -> Vec<i64> {
        if rank < 1 || scope < 0 {
            return Vec::new();
        }
        let positions = self.positions();
        let first = (rank - scope).max(1) as usize;
        let last = ((rank + scope) as usize).min(positions.len());
        if first > last {
            return Vec::new();
        }
        positions[first - 1..last].iter().flatten().copied().collect()
    }
}

fn ids(records: Vec<Record>) -> Vec<i64> {
    records.iter().map(Record::id).collect()
}

quickcheck! {
    fn engine_matches_naive_model(ops: Vec<(u8, u8, i8)>) -> bool {
        let mut engine = RankingEngine::new();
        let mut model = Model::default();
        for (kind, a, b) in ops {
            let user = i64::from(a % 16);
            let value = i64::from(b);
            match kind % 4 {
                0 => {
                    engine.update_message(&json!({"user": user, "total": value})).unwrap();
                    model.set(user, value);
                }
                1 => {
                    let delta = format!("{value:+}");
                    engine.update_message(&json!({"user": user, "score": delta})).unwrap();
                    model.add(user, value);
                }
                2 => {
                    let size = value % 8;
                    assert_eq!(ids(engine.top(size)), model.top(size));
                }
                _ => {
                    let rank = i64::from(a % 10) - 1;
                    let scope = value % 4;
                    assert_eq!(
                        ids(engine.relative_top(rank, scope)),
                        model.relative_top(rank, scope)
                    );
                }
            }
        }
        engine.assert_consistent();
        assert_eq!(engine.bucket_count(), model.positions().len());
        true
    }

    fn rejected_reports_never_change_state(scores: Vec<(u8, i8)>, junk: Vec<String>) -> bool {
        let mut engine = RankingEngine::new();
        for (user, total) in &scores {
            engine
                .update_message(&json!({"user": i64::from(*user), "total": i64::from(*total)}))
                .unwrap();
        }
        let before = ids(engine.top(i64::MAX));
        for text in junk {
            let valid = text.len() > 1
                && (text.starts_with('+') || text.starts_with('-'))
                && text[1..].bytes().all(|c| c.is_ascii_digit());
            if valid {
                continue;
            }
            assert!(engine.update_message(&json!({"user": 0, "score": text})).is_err());
        }
        ids(engine.top(i64::MAX)) == before
    }

    fn unique_maximum_is_alone_on_top(totals: Vec<i16>) -> bool {
        let mut engine = RankingEngine::new();
        for (user, total) in (1..).zip(&totals) {
            engine
                .update_message(&json!({"user": user, "total": i64::from(*total)}))
                .unwrap();
        }
        let champion = totals.len() as i64 + 1;
        let best = totals.iter().copied().max().map_or(0, i64::from) + 1;
        engine
            .update_message(&json!({"user": champion, "total": best}))
            .unwrap();
        ids(engine.top(1)) == vec![champion]
    }
}
