//! `walkembed`: node2vec embeddings for row-oriented adjacency data.
//!
//! Stages run strictly in order, each consuming only the previous stage's output:
//!
//! 1. [`GraphIndex`]: dense ids + adjacency from `(source, neighbors, weights)` rows.
//! 2. [`TransitionSampler`]: per-edge second-order alias tables (node2vec `p`/`q`).
//! 3. [`generate_walks`]: `num_of_walks` walks per node, one seeded stream per task.
//! 4. [`Corpus`]: skip-gram pairs or CBOW examples from a sliding window.
//! 5. [`train`]: negative-sampling SGD over two matrices (central, contextual).
//! 6. [`materialize`]: vectors back in input row order.
//!
//! Public invariants (must not drift):
//! - **Node order**: ids are assigned on first occurrence in row order.
//! - **Determinism**: walks are identical for a fixed `random_state` regardless of thread
//!   count; training is bit-reproducible with a single worker.
//! - **Fail fast**: every option is validated before the graph is built.

pub mod alias;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod graph;
pub mod node2vec;
pub mod random_walk;
pub mod registry;
pub mod sparse;
pub mod train;
pub mod transition;

pub use alias::AliasTable;
pub use config::{EmbeddingType, ModelType, Node2VecConfig};
pub use corpus::{cbow_examples, skipgram_pairs, Corpus, CorpusPair};
pub use embedding::{materialize, EmbeddingMatrix, Embeddings};
pub use graph::{AdjacencyRow, GraphIndex, GraphOptions, GraphRef, WeightedGraphRef};
pub use node2vec::{ExecutionContext, Node2Vec, Node2VecOutput};
pub use random_walk::{generate_walks, generate_walks_from_nodes, WalkConfig};
pub use registry::{dispatch, Arguments, Operation, Output, OPERATIONS};
pub use sparse::{from_list, get, normalize, ListElement, NormalizeAxis, SparseVector};
pub use train::{train, TrainerConfig};
pub use transition::TransitionSampler;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An enumerated option outside its supported set.
    #[error("unsupported {option} '{value}', expected one of: {expected}")]
    Configuration {
        option: &'static str,
        value: String,
        expected: &'static str,
    },
    /// A numeric parameter outside its range, or malformed row input.
    #[error("invalid {parameter}: {message}")]
    Validation {
        parameter: &'static str,
        message: String,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl Error {
    pub fn configuration(option: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        Self::Configuration {
            option,
            value: value.into(),
            expected,
        }
    }

    pub fn validation(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            parameter,
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
