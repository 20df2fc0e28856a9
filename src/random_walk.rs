//! Biased random walk generation.
//!
//! Every `(node, walk_index)` task draws from its own `ChaCha8Rng`, seeded from the
//! configured seed and the task coordinates only. Output is therefore stable for a
//! fixed seed, independent of Rayon thread count or scheduling.

use crate::transition::TransitionSampler;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Maximum walk length (in nodes, start included).
    pub length: usize,
    /// Number of walks per node.
    pub walks_per_node: usize,
    /// Seed for deterministic RNG.
    pub seed: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            length: 10,
            walks_per_node: 8,
            seed: 42,
        }
    }
}

/// SplitMix64 finalizer.
pub(crate) fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

/// Seed for one walk task; depends only on `(seed, node, walk_index)`.
pub(crate) fn task_seed(seed: u64, node: usize, walk_index: usize) -> u64 {
    mix64(mix64(seed ^ mix64(node as u64)) ^ (walk_index as u64).wrapping_add(0x9e3779b97f4a7c15))
}

/// Walks for every node, `walks_per_node` rounds.
///
/// Order is walk-index major: all nodes (ascending) for round 0, then round 1, etc.
pub fn generate_walks(sampler: &TransitionSampler, config: WalkConfig) -> Vec<Vec<usize>> {
    let start_nodes: Vec<usize> = (0..sampler.node_count()).collect();
    generate_walks_from_nodes(sampler, &start_nodes, config)
}

/// Walks restricted to an explicit set of start nodes (sharding, partial refresh).
pub fn generate_walks_from_nodes(
    sampler: &TransitionSampler,
    start_nodes: &[usize],
    config: WalkConfig,
) -> Vec<Vec<usize>> {
    let jobs: Vec<(usize, usize)> = (0..config.walks_per_node)
        .flat_map(|round| start_nodes.iter().map(move |&node| (round, node)))
        .collect();

    jobs.par_iter()
        .map(|&(round, node)| {
            let mut rng = ChaCha8Rng::seed_from_u64(task_seed(config.seed, node, round));
            biased_walk(sampler, node, config.length, &mut rng)
        })
        .collect()
}

fn biased_walk(
    sampler: &TransitionSampler,
    start: usize,
    length: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let mut walk = Vec::with_capacity(length);
    if length == 0 {
        return walk;
    }
    walk.push(start);

    let mut slot: Option<usize> = None;
    for _ in 1..length {
        let next = match slot {
            None => sampler.sample_first(start, rng),
            Some(e) => sampler.sample_next(e, rng),
        };
        // Zero out-degree: the walk ends here.
        let Some(e) = next else { break };
        walk.push(sampler.target(e));
        slot = Some(e);
    }

    walk
}
