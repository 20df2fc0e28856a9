//! Trained matrices and their projection back onto input rows.

use crate::config::EmbeddingType;
use crate::graph::{AdjacencyRow, GraphIndex};
use std::hash::Hash;

/// Row-major `num_rows x dim` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// `data.len()` must be a multiple of `dim`.
    pub fn from_data(dim: usize, data: Vec<f32>) -> Self {
        debug_assert!(dim > 0 && data.len() % dim == 0);
        Self { dim, data }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_rows(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn row(&self, node: usize) -> &[f32] {
        &self.data[node * self.dim..(node + 1) * self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Both trained matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    pub central: EmbeddingMatrix,
    pub contextual: EmbeddingMatrix,
}

impl Embeddings {
    pub fn select(&self, kind: EmbeddingType) -> &EmbeddingMatrix {
        match kind {
            EmbeddingType::Central => &self.central,
            EmbeddingType::Contextual => &self.contextual,
        }
    }
}

/// One vector per input row, in row order.
///
/// Rows sharing a source id get the same vector; a null source yields `None`.
pub fn materialize<N: Eq + Hash + Clone>(
    graph: &GraphIndex<N>,
    rows: &[AdjacencyRow<N>],
    matrix: &EmbeddingMatrix,
) -> Vec<Option<Vec<f32>>> {
    rows.iter()
        .map(|row| {
            let id = graph.node_id(row.source.as_ref()?)?;
            Some(matrix.row(id).to_vec())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphOptions;

    #[test]
    fn rows_are_views_into_data() {
        let m = EmbeddingMatrix::from_data(2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.num_rows(), 3);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.rows().count(), 3);
    }

    #[test]
    fn materialize_follows_row_order() {
        let rows = vec![
            AdjacencyRow::new("b", ["a"]),
            AdjacencyRow::null(),
            AdjacencyRow::new("a", ["b"]),
            AdjacencyRow::new("b", ["c"]),
        ];
        let g = GraphIndex::from_rows(&rows, &GraphOptions::default()).unwrap();
        // ids: b=0, a=1, c=2
        let m = EmbeddingMatrix::from_data(1, vec![0.0, 1.0, 2.0]);
        let out = materialize(&g, &rows, &m);
        assert_eq!(out, vec![Some(vec![0.0]), None, Some(vec![1.0]), Some(vec![0.0])]);

        let both = Embeddings {
            central: m.clone(),
            contextual: EmbeddingMatrix::from_data(1, vec![9.0, 9.0, 9.0]),
        };
        assert_eq!(both.select(EmbeddingType::Central), &m);
        assert_eq!(both.select(EmbeddingType::Contextual).row(2), &[9.0]);
    }
}
