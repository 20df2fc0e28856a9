//! Precomputed node2vec second-order transitions.
//!
//! For a walk that arrived at `v` from `t`, the unnormalized weight of moving on to
//! a neighbor `x` of `v` is `w(v, x) * alpha(t, x)` with
//!
//! ```text
//! alpha(t, x) = 1/p   if x == t          (return)
//!             = 1     if x in N(t)       (distance 1 from t)
//!             = 1/q   otherwise          (distance 2 from t)
//! ```
//!
//! One alias table is stored per directed edge slot, so a walk step is two array
//! lookups and an O(1) draw regardless of degree. Directed graphs need no special
//! casing: the table is keyed by the edge actually traversed, never by searching
//! `t` in `v`'s neighbor list.

use crate::alias::AliasTable;
use crate::graph::WeightedGraphRef;
use rand::Rng;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct TransitionSampler {
    offsets: Vec<usize>,
    targets: Vec<usize>,
    first: Vec<AliasTable>,
    edges: Vec<AliasTable>,
    p: f32,
    q: f32,
}

fn fill_biased_weights<G: WeightedGraphRef>(
    graph: &G,
    prev: usize,
    nbrs: &[usize],
    wts: &[f32],
    inv_p: f32,
    inv_q: f32,
    buf: &mut Vec<f32>,
) {
    buf.clear();
    buf.extend(nbrs.iter().zip(wts).map(|(&x, &w)| {
        let alpha = if x == prev {
            inv_p
        } else if graph.contains_edge(prev, x) {
            1.0
        } else {
            inv_q
        };
        w * alpha
    }));
}

impl TransitionSampler {
    /// Build every table. `p` and `q` must be positive (validated upstream).
    pub fn new<G: WeightedGraphRef + Sync>(graph: &G, p: f32, q: f32) -> Self {
        let n = graph.node_count();
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0usize);
        let mut targets = Vec::new();
        for v in 0..n {
            targets.extend_from_slice(graph.neighbors_and_weights_ref(v).0);
            offsets.push(targets.len());
        }

        let first: Vec<AliasTable> = (0..n)
            .into_par_iter()
            .map(|v| AliasTable::new(graph.neighbors_and_weights_ref(v).1))
            .collect();

        let inv_p = 1.0 / p;
        let inv_q = 1.0 / q;
        let per_node: Vec<Vec<AliasTable>> = (0..n)
            .into_par_iter()
            .map_init(Vec::new, |buf, t| {
                let (t_nbrs, _) = graph.neighbors_and_weights_ref(t);
                t_nbrs
                    .iter()
                    .map(|&v| {
                        let (nbrs, wts) = graph.neighbors_and_weights_ref(v);
                        fill_biased_weights(graph, t, nbrs, wts, inv_p, inv_q, buf);
                        AliasTable::new(buf.as_slice())
                    })
                    .collect()
            })
            .collect();
        let edges: Vec<AliasTable> = per_node.into_iter().flatten().collect();
        debug_assert_eq!(edges.len(), targets.len());

        Self {
            offsets,
            targets,
            first,
            edges,
            p,
            q,
        }
    }

    pub fn node_count(&self) -> usize {
        self.first.len()
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn out_degree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    /// Destination node of an edge slot.
    pub fn target(&self, slot: usize) -> usize {
        self.targets[slot]
    }

    /// First step from `node`, proportional to edge weight. Returns the edge slot taken,
    /// or `None` when `node` has no out-edges.
    pub fn sample_first<R: Rng + ?Sized>(&self, node: usize, rng: &mut R) -> Option<usize> {
        let i = self.first[node].sample(rng)?;
        Some(self.offsets[node] + i)
    }

    /// Next step after traversing edge slot `slot` (`t -> v`). Returns the next edge
    /// slot, or `None` when `v` has no out-edges.
    pub fn sample_next<R: Rng + ?Sized>(&self, slot: usize, rng: &mut R) -> Option<usize> {
        let v = self.targets[slot];
        let i = self.edges[slot].sample(rng)?;
        Some(self.offsets[v] + i)
    }

    /// Normalized distribution over `v`'s out-edges for a walk that arrived via `t -> v`.
    ///
    /// Uses the first `t -> v` slot; duplicate edges carry identical tables.
    pub fn transition_probabilities(&self, t: usize, v: usize) -> Option<Vec<f32>> {
        let range = self.offsets[t]..self.offsets[t + 1];
        let slot = range.into_iter().find(|&e| self.targets[e] == v)?;
        Some(self.edges[slot].probabilities())
    }

    /// Normalized first-step distribution over `v`'s out-edges.
    pub fn first_step_probabilities(&self, v: usize) -> Vec<f32> {
        self.first[v].probabilities()
    }
}
