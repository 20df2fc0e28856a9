//! Graph adapter traits and the row-built [`GraphIndex`].

use crate::{Error, Result};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::hash::Hash;

/// A graph view that can return **borrowed** neighbor slices.
pub trait GraphRef {
    fn node_count(&self) -> usize;
    fn neighbors_ref(&self, node: usize) -> &[usize];
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_ref(node).len()
    }
}

/// A weighted graph view that can return **borrowed** neighbor + weight slices.
///
/// CSR-style: a node has a contiguous neighbor list and a contiguous weight list,
/// with matching indices.
pub trait WeightedGraphRef {
    fn node_count(&self) -> usize;

    /// Return `(neighbors, weights)` for a node.
    ///
    /// Requirements:
    /// - `neighbors.len() == weights.len()`
    /// - Weights are positive.
    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f32]);

    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_and_weights_ref(node).0.len()
    }

    /// Whether `target` is an out-neighbor of `source`.
    fn contains_edge(&self, source: usize, target: usize) -> bool {
        self.neighbors_and_weights_ref(source).0.contains(&target)
    }
}

/// Graph construction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphOptions {
    /// `false` mirrors every edge with the same weight.
    pub is_directed: bool,
    /// Keep only the heaviest `k` out-edges per node (ties: earlier insertion wins).
    pub max_neighbors: Option<usize>,
    /// Rescale each node's out-weights to sum to 1.
    pub normalize_by_degree: bool,
}

/// One input row: a source id, its neighbor ids and optional matching weights.
///
/// `None` fields model nulls in the host table. A null source produces no edges
/// and a null output row; a null neighbor list makes the source an isolated node;
/// a null entry inside the list is skipped along with its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyRow<N> {
    pub source: Option<N>,
    pub neighbors: Option<Vec<Option<N>>>,
    pub weights: Option<Vec<f32>>,
}

impl<N> AdjacencyRow<N> {
    pub fn new(source: N, neighbors: impl IntoIterator<Item = N>) -> Self {
        Self {
            source: Some(source),
            neighbors: Some(neighbors.into_iter().map(Some).collect()),
            weights: None,
        }
    }

    pub fn weighted(
        source: N,
        neighbors: impl IntoIterator<Item = N>,
        weights: impl IntoIterator<Item = f32>,
    ) -> Self {
        Self {
            source: Some(source),
            neighbors: Some(neighbors.into_iter().map(Some).collect()),
            weights: Some(weights.into_iter().collect()),
        }
    }

    /// A source whose neighbor list is null.
    pub fn isolated(source: N) -> Self {
        Self {
            source: Some(source),
            neighbors: None,
            weights: None,
        }
    }

    /// A row whose source id is null.
    pub fn null() -> Self {
        Self {
            source: None,
            neighbors: None,
            weights: None,
        }
    }
}

/// Dense-id adjacency built from input rows.
///
/// Out-edges are stored CSR-style in insertion order (after truncation), so an
/// edge has a stable slot index `offsets[v] + i` that downstream stages key on.
#[derive(Debug, Clone)]
pub struct GraphIndex<N> {
    names: Vec<N>,
    ids: FxHashMap<N, usize>,
    offsets: Vec<usize>,
    targets: Vec<usize>,
    weights: Vec<f32>,
    // Sorted, deduplicated out-neighbors for membership tests.
    member_offsets: Vec<usize>,
    members: Vec<usize>,
}

fn validate_row<N>(row_idx: usize, row: &AdjacencyRow<N>) -> Result<()> {
    let (Some(nbrs), Some(wts)) = (&row.neighbors, &row.weights) else {
        return Ok(());
    };
    if nbrs.len() != wts.len() {
        return Err(Error::validation(
            "weights",
            format!(
                "row {row_idx}: {} neighbors but {} weights",
                nbrs.len(),
                wts.len()
            ),
        ));
    }
    if let Some((j, w)) = wts
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && **w > 0.0))
    {
        return Err(Error::validation(
            "weights",
            format!("row {row_idx}, position {j}: weight must be finite and > 0, got {w}"),
        ));
    }
    Ok(())
}

/// Indices of the `k` heaviest edges, kept in insertion order.
fn heaviest(edges: &[(usize, f32)], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..edges.len()).collect();
    // Stable: equal weights keep insertion order.
    order.sort_by_key(|&i| Reverse(OrderedFloat(edges[i].1)));
    order.truncate(k);
    order.sort_unstable();
    order
}

impl<N: Eq + Hash + Clone> GraphIndex<N> {
    /// Build the adjacency structure. Every row is validated before any id is assigned.
    pub fn from_rows(rows: &[AdjacencyRow<N>], options: &GraphOptions) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            validate_row(i, row)?;
        }

        let mut names: Vec<N> = Vec::new();
        let mut ids: FxHashMap<N, usize> = FxHashMap::default();
        let mut adj: Vec<Vec<(usize, f32)>> = Vec::new();

        let mut intern = |name: &N, names: &mut Vec<N>, adj: &mut Vec<Vec<(usize, f32)>>| -> usize {
            if let Some(&id) = ids.get(name) {
                return id;
            }
            let id = names.len();
            ids.insert(name.clone(), id);
            names.push(name.clone());
            adj.push(Vec::new());
            id
        };

        for row in rows {
            let Some(source) = &row.source else { continue };
            let u = intern(source, &mut names, &mut adj);
            let Some(nbrs) = &row.neighbors else { continue };

            for (j, nbr) in nbrs.iter().enumerate() {
                let Some(nbr) = nbr else { continue };
                let w = row.weights.as_ref().map_or(1.0, |wts| wts[j]);
                let v = intern(nbr, &mut names, &mut adj);
                adj[u].push((v, w));
                if !options.is_directed && u != v {
                    adj[v].push((u, w));
                }
            }
        }
        drop(intern);

        if let Some(k) = options.max_neighbors {
            for edges in adj.iter_mut().filter(|e| e.len() > k) {
                let keep = heaviest(edges, k);
                *edges = keep.into_iter().map(|i| edges[i]).collect();
            }
        }

        if options.normalize_by_degree {
            for edges in &mut adj {
                let total: f32 = edges.iter().map(|&(_, w)| w).sum();
                if total > 0.0 {
                    for (_, w) in edges.iter_mut() {
                        *w /= total;
                    }
                }
            }
        }

        let n = names.len();
        let m: usize = adj.iter().map(Vec::len).sum();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::with_capacity(m);
        let mut weights = Vec::with_capacity(m);
        let mut member_offsets = Vec::with_capacity(n + 1);
        let mut members = Vec::with_capacity(m);
        offsets.push(0);
        member_offsets.push(0);

        let mut scratch: Vec<usize> = Vec::new();
        for edges in &adj {
            targets.extend(edges.iter().map(|&(v, _)| v));
            weights.extend(edges.iter().map(|&(_, w)| w));
            offsets.push(targets.len());

            scratch.clear();
            scratch.extend(edges.iter().map(|&(v, _)| v));
            scratch.sort_unstable();
            scratch.dedup();
            members.extend_from_slice(&scratch);
            member_offsets.push(members.len());
        }

        Ok(Self {
            names,
            ids,
            offsets,
            targets,
            weights,
            member_offsets,
            members,
        })
    }

    /// Dense id of an input identifier.
    pub fn node_id(&self, name: &N) -> Option<usize> {
        self.ids.get(name).copied()
    }
}

impl<N> GraphIndex<N> {
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Number of stored directed edges (mirrors and duplicates included).
    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    /// Input identifier of a dense id.
    pub fn node_name(&self, id: usize) -> Option<&N> {
        self.names.get(id)
    }

    /// First edge slot of `node`; out-edge `i` of `node` lives at `edge_offset(node) + i`.
    pub fn edge_offset(&self, node: usize) -> usize {
        self.offsets[node]
    }

    pub fn has_neighbor(&self, source: usize, target: usize) -> bool {
        let set = &self.members[self.member_offsets[source]..self.member_offsets[source + 1]];
        set.binary_search(&target).is_ok()
    }
}

impl<N> GraphRef for GraphIndex<N> {
    fn node_count(&self) -> usize {
        self.names.len()
    }

    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.targets[self.offsets[node]..self.offsets[node + 1]]
    }
}

impl<N> WeightedGraphRef for GraphIndex<N> {
    fn node_count(&self) -> usize {
        self.names.len()
    }

    fn neighbors_and_weights_ref(&self, node: usize) -> (&[usize], &[f32]) {
        let range = self.offsets[node]..self.offsets[node + 1];
        (&self.targets[range.clone()], &self.weights[range])
    }

    fn contains_edge(&self, source: usize, target: usize) -> bool {
        self.has_neighbor(source, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(rows: &[AdjacencyRow<&'static str>], options: GraphOptions) -> GraphIndex<&'static str> {
        GraphIndex::from_rows(rows, &options).unwrap()
    }

    fn edges_of(g: &GraphIndex<&'static str>, name: &'static str) -> Vec<(&'static str, f32)> {
        let id = g.node_id(&name).unwrap();
        let (nbrs, wts) = g.neighbors_and_weights_ref(id);
        nbrs.iter()
            .zip(wts)
            .map(|(&v, &w)| (*g.node_name(v).unwrap(), w))
            .collect()
    }

    #[test]
    fn ids_follow_first_occurrence() {
        let g = build(
            &[AdjacencyRow::new("b", ["c", "a"]), AdjacencyRow::new("a", ["d"])],
            GraphOptions { is_directed: true, ..Default::default() },
        );
        assert_eq!(g.node_id(&"b"), Some(0));
        assert_eq!(g.node_id(&"c"), Some(1));
        assert_eq!(g.node_id(&"a"), Some(2));
        assert_eq!(g.node_id(&"d"), Some(3));
        assert_eq!(g.node_name(3), Some(&"d"));
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn undirected_mirrors_with_same_weight() {
        let g = build(
            &[AdjacencyRow::weighted("a", ["b", "a"], [2.5, 1.0])],
            GraphOptions::default(),
        );
        assert_eq!(edges_of(&g, "a"), vec![("b", 2.5), ("a", 1.0)]);
        assert_eq!(edges_of(&g, "b"), vec![("a", 2.5)]);
        // Self-loop stored once.
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn duplicates_are_kept_not_summed() {
        let g = build(
            &[AdjacencyRow::new("a", ["b", "b"])],
            GraphOptions { is_directed: true, ..Default::default() },
        );
        assert_eq!(edges_of(&g, "a"), vec![("b", 1.0), ("b", 1.0)]);
        assert!(g.has_neighbor(0, 1));
        assert!(!g.has_neighbor(1, 0));
    }

    #[test]
    fn truncation_keeps_heaviest_with_stable_ties() {
        let g = build(
            &[AdjacencyRow::weighted("a", ["b", "c", "d", "e"], [1.0, 3.0, 1.0, 2.0])],
            GraphOptions { is_directed: true, max_neighbors: Some(3), ..Default::default() },
        );
        assert_eq!(edges_of(&g, "a"), vec![("b", 1.0), ("c", 3.0), ("e", 2.0)]);
    }

    #[test]
    fn normalization_sums_to_one_after_truncation() {
        let g = build(
            &[AdjacencyRow::weighted("a", ["b", "c", "d"], [1.0, 3.0, 4.0])],
            GraphOptions {
                is_directed: true,
                max_neighbors: Some(2),
                normalize_by_degree: true,
            },
        );
        let e = edges_of(&g, "a");
        assert_eq!(e.len(), 2);
        assert!((e[0].1 - 3.0 / 7.0).abs() < 1e-6);
        assert!((e[1].1 - 4.0 / 7.0).abs() < 1e-6);
    }

    #[test]
    fn nulls_are_isolated_or_skipped() {
        let rows = vec![
            AdjacencyRow::null(),
            AdjacencyRow::isolated("x"),
            AdjacencyRow {
                source: Some("a"),
                neighbors: Some(vec![Some("b"), None, Some("c")]),
                weights: Some(vec![1.0, 9.0, 2.0]),
            },
        ];
        let g = build(&rows, GraphOptions { is_directed: true, ..Default::default() });
        assert_eq!(g.node_count(), 4);
        assert_eq!(GraphRef::out_degree(&g, g.node_id(&"x").unwrap()), 0);
        assert_eq!(edges_of(&g, "a"), vec![("b", 1.0), ("c", 2.0)]);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let err = GraphIndex::from_rows(
            &[AdjacencyRow::weighted("a", ["b", "c"], [1.0])],
            &GraphOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_validation());

        let err = GraphIndex::from_rows(
            &[AdjacencyRow::weighted("a", ["b"], [0.0])],
            &GraphOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_validation());

        let err = GraphIndex::from_rows(
            &[AdjacencyRow::weighted("a", ["b"], [-2.0])],
            &GraphOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("weight"));
    }
}
