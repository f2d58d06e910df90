#![allow(dead_code)]

use std::{sync::Mutex, time::Duration};

use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use scoreboard::{ClientId, RankingEngine, Score, ScoreUpdate};

static BASE_SEED: Lazy<u64> = Lazy::new(|| {
    std::env::var("SCOREBOARD_BENCH_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x7d11_5eed_f065_cafe)
});

static RNG_COUNTER: Lazy<Mutex<u64>> = Lazy::new(|| Mutex::new(0));

pub fn usize_env(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

pub fn duration_env(name: &str, default_secs: f64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| *s > 0.0)
        .unwrap_or(default_secs);
    Duration::from_secs_f64(secs)
}

#[inline]
pub fn seeded_rng() -> StdRng {
    let mut guard = RNG_COUNTER.lock().unwrap();
    let seed = BASE_SEED.wrapping_add(*guard);
    *guard = guard.wrapping_add(1);
    StdRng::seed_from_u64(seed)
}

/// `n` clients with scores drawn from `0..score_range`.
pub fn uniform_random(n: usize, score_range: Score) -> Vec<(ClientId, Score)> {
    let mut rng = seeded_rng();
    (0..n as ClientId)
        .map(|id| (id, rng.gen_range(0..score_range)))
        .collect()
}

/// Every client on the same score: one huge bucket.
pub fn same_score(n: usize, score: Score) -> Vec<(ClientId, Score)> {
    (0..n as ClientId).map(|id| (id, score)).collect()
}

/// Few distinct scores, many clients per bucket.
pub fn heavy_ties(n: usize, distinct: Score) -> Vec<(ClientId, Score)> {
    let mut rng = seeded_rng();
    (0..n as ClientId)
        .map(|id| (id, rng.gen_range(0..distinct.max(1))))
        .collect()
}

pub fn build_engine(entries: &[(ClientId, Score)]) -> RankingEngine {
    let mut engine = RankingEngine::new();
    for &(user, total) in entries {
        engine
            .update(ScoreUpdate::Absolute { user, total })
            .unwrap();
    }
    engine
}

pub fn shuffled_ids(entries: &[(ClientId, Score)]) -> Vec<ClientId> {
    let mut rng = seeded_rng();
    let mut ids: Vec<_> = entries.iter().map(|&(id, _)| id).collect();
    ids.shuffle(&mut rng);
    ids
}
