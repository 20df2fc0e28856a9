//! End-to-end node2vec: rows in, one vector per row out.

use crate::config::{EmbeddingType, Node2VecConfig};
use crate::corpus::Corpus;
use crate::embedding::{materialize, EmbeddingMatrix, Embeddings};
use crate::graph::{AdjacencyRow, GraphIndex};
use crate::random_walk::generate_walks;
use crate::train::train;
use crate::transition::TransitionSampler;
use crate::{Error, Result};
use std::hash::Hash;
use std::time::Instant;

/// Report a finished stage: `info` when the invocation is verbose, `debug` otherwise.
macro_rules! stage_done {
    ($verbose:expr, $stage:expr, $started:expr, $($field:tt)*) => {
        if $verbose {
            tracing::info!(stage = $stage, elapsed_ms = $started.elapsed().as_millis() as u64, $($field)*);
        } else {
            tracing::debug!(stage = $stage, elapsed_ms = $started.elapsed().as_millis() as u64, $($field)*);
        }
    };
}

/// Process-level execution settings, passed explicitly into every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Training threads. `1` gives bit-reproducible embeddings.
    workers: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

impl ExecutionContext {
    pub fn with_workers(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::validation("workers", "must be > 0"));
        }
        Ok(Self { workers })
    }

    /// One training worker per available core.
    pub fn available_parallelism() -> Self {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

/// A validated node2vec invocation.
#[derive(Debug, Clone)]
pub struct Node2Vec {
    config: Node2VecConfig,
}

/// Everything a fitted invocation produced.
#[derive(Debug, Clone)]
pub struct Node2VecOutput<N> {
    pub graph: GraphIndex<N>,
    pub embeddings: Embeddings,
    embedding_type: EmbeddingType,
}

impl<N: Eq + Hash + Clone> Node2VecOutput<N> {
    /// The matrix selected by `embedding_type`.
    pub fn matrix(&self) -> &EmbeddingMatrix {
        self.embeddings.select(self.embedding_type)
    }

    /// Vector of an input identifier.
    pub fn vector(&self, name: &N) -> Option<&[f32]> {
        let id = self.graph.node_id(name)?;
        Some(self.matrix().row(id))
    }

    /// One vector per row, aligned to `rows`.
    pub fn embeddings_for_rows(&self, rows: &[AdjacencyRow<N>]) -> Vec<Option<Vec<f32>>> {
        materialize(&self.graph, rows, self.matrix())
    }
}

impl Node2Vec {
    /// Validate every option; nothing is computed on failure.
    pub fn new(config: Node2VecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Node2VecConfig {
        &self.config
    }

    /// Run every stage and keep the intermediate graph and both matrices.
    pub fn fit<N: Eq + Hash + Clone + Sync>(
        &self,
        ctx: &ExecutionContext,
        rows: &[AdjacencyRow<N>],
    ) -> Result<Node2VecOutput<N>> {
        let cfg = &self.config;
        let verbose = cfg.verbose;
        let _span = tracing::debug_span!("node2vec", rows = rows.len()).entered();

        let started = Instant::now();
        let graph = {
            let _s = tracing::debug_span!("node2vec_stage", stage = "graph").entered();
            GraphIndex::from_rows(rows, &cfg.graph_options())?
        };
        stage_done!(verbose, "graph", started, nodes = graph.node_count(), edges = graph.edge_count());

        let started = Instant::now();
        let sampler = {
            let _s = tracing::debug_span!("node2vec_stage", stage = "transitions").entered();
            TransitionSampler::new(&graph, cfg.p, cfg.q)
        };
        stage_done!(verbose, "transitions", started, p = cfg.p, q = cfg.q);

        let started = Instant::now();
        let walks = {
            let _s = tracing::debug_span!("node2vec_stage", stage = "walks").entered();
            generate_walks(&sampler, cfg.walk_config())
        };
        stage_done!(verbose, "walks", started, walks = walks.len());
        drop(sampler);

        let started = Instant::now();
        let trainer = cfg.trainer_config();
        let corpus = Corpus::new(walks, graph.node_count(), trainer.window_size, trainer.model);
        stage_done!(verbose, "corpus", started, words = corpus.len_words(), model = %trainer.model);

        let started = Instant::now();
        let embeddings = {
            let _s = tracing::debug_span!("node2vec_stage", stage = "train").entered();
            train(&corpus, &trainer, ctx.workers())?
        };
        stage_done!(
            verbose,
            "train",
            started,
            workers = ctx.workers(),
            epochs = trainer.epochs,
            dim = trainer.embedding_size
        );

        Ok(Node2VecOutput {
            graph,
            embeddings,
            embedding_type: cfg.embedding_type,
        })
    }

    /// Fit, then return the configured vector for every row (null source -> `None`).
    pub fn embed<N: Eq + Hash + Clone + Sync>(
        &self,
        ctx: &ExecutionContext,
        rows: &[AdjacencyRow<N>],
    ) -> Result<Vec<Option<Vec<f32>>>> {
        let out = self.fit(ctx, rows)?;
        Ok(out.embeddings_for_rows(rows))
    }
}
