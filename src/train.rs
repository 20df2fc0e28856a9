//! Skip-gram / CBOW training with negative sampling.
//!
//! Two matrices are trained: `central` (input vectors) and `contextual` (output
//! vectors). Each positive example takes one gradient step on its true output row and
//! one on each of `negative_samples` rows drawn from the unigram distribution raised to
//! the 0.75 power.
//!
//! # Concurrency and determinism
//!
//! With one worker every update happens in corpus order on one RNG stream, so results
//! are bit-reproducible for a fixed seed. With more workers, walks are split into
//! contiguous shards (one RNG per shard) that update the shared matrices Hogwild-style:
//! cells are `AtomicU32` bit patterns accessed with relaxed ordering, so there is no
//! undefined behaviour, but concurrent read-modify-write on a hot row can drop an
//! update. Multi-worker output is not bit-identical across runs or thread counts.

use crate::alias::AliasTable;
use crate::config::ModelType;
use crate::corpus::{Corpus, CorpusPair};
use crate::embedding::{EmbeddingMatrix, Embeddings};
use crate::random_walk::mix64;
use crate::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// Keeps the init and training streams disjoint from walk seeds.
const INIT_STREAM: u64 = 0x5eed_0000_0000_0001;
const TRAIN_STREAM: u64 = 0x5eed_0000_0000_0002;

/// Smoothing exponent of the negative-sampling distribution.
const UNIGRAM_POWER: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainerConfig {
    pub model: ModelType,
    pub embedding_size: usize,
    /// Context radius on each side.
    pub window_size: usize,
    pub negative_samples: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub min_learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            model: ModelType::SkipGram,
            embedding_size: 64,
            window_size: 5,
            negative_samples: 5,
            epochs: 1,
            learning_rate: 0.025,
            min_learning_rate: 0.0001,
            seed: 42,
        }
    }
}

/// Linear decay from `learning_rate` to the floor over `total` words.
pub(crate) fn decayed_lr(config: &TrainerConfig, processed: u64, total: u64) -> f32 {
    if total == 0 {
        return config.learning_rate;
    }
    let progress = (processed as f64 / total as f64).min(1.0) as f32;
    (config.learning_rate * (1.0 - progress)).max(config.min_learning_rate)
}

/// Row-major `f32` matrix whose cells tolerate unsynchronized concurrent updates.
struct SharedMatrix {
    dim: usize,
    cells: Vec<AtomicU32>,
}

impl SharedMatrix {
    fn new(matrix: EmbeddingMatrix) -> Self {
        let dim = matrix.dim();
        let cells = matrix
            .into_data()
            .into_iter()
            .map(|x| AtomicU32::new(x.to_bits()))
            .collect();
        Self { dim, cells }
    }

    #[inline]
    fn get(&self, row: usize, i: usize) -> f32 {
        f32::from_bits(self.cells[row * self.dim + i].load(Ordering::Relaxed))
    }

    #[inline]
    fn add(&self, row: usize, i: usize, delta: f32) {
        let cell = &self.cells[row * self.dim + i];
        let x = f32::from_bits(cell.load(Ordering::Relaxed));
        cell.store((x + delta).to_bits(), Ordering::Relaxed);
    }

    fn into_matrix(self) -> EmbeddingMatrix {
        let data = self
            .cells
            .into_iter()
            .map(|c| f32::from_bits(c.into_inner()))
            .collect();
        EmbeddingMatrix::from_data(self.dim, data)
    }
}

fn init_matrix<R: Rng>(num_nodes: usize, dim: usize, rng: &mut R) -> Result<EmbeddingMatrix> {
    let bound = 0.5 / dim as f32;
    let dist = Uniform::new(-bound, bound)
        .map_err(|e| Error::validation("embedding_size", e.to_string()))?;
    let data = (0..num_nodes * dim).map(|_| dist.sample(rng)).collect();
    Ok(EmbeddingMatrix::from_data(dim, data))
}

/// `freq^0.75` alias table over node ids.
fn negative_table(frequencies: &[u64]) -> AliasTable {
    let weights: Vec<f32> = frequencies
        .iter()
        .map(|&f| (f as f64).powf(UNIGRAM_POWER) as f32)
        .collect();
    AliasTable::new(&weights)
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

struct Worker<'a> {
    central: &'a SharedMatrix,
    contextual: &'a SharedMatrix,
    negatives: &'a AliasTable,
    config: &'a TrainerConfig,
    hidden: Vec<f32>,
    grad: Vec<f32>,
    rng: ChaCha8Rng,
}

impl<'a> Worker<'a> {
    /// One logistic step on output row `out`; accumulates the input-side gradient.
    fn output_step(&mut self, out: usize, label: f32, lr: f32) {
        let dim = self.config.embedding_size;
        let mut dot = 0.0f32;
        for i in 0..dim {
            dot += self.hidden[i] * self.contextual.get(out, i);
        }
        let g = (label - sigmoid(dot)) * lr;
        for i in 0..dim {
            self.grad[i] += g * self.contextual.get(out, i);
            self.contextual.add(out, i, g * self.hidden[i]);
        }
    }

    /// Positive step on `positive`, then the negative draws (skipping `positive`).
    fn contrast(&mut self, positive: usize, lr: f32) {
        self.output_step(positive, 1.0, lr);
        for _ in 0..self.config.negative_samples {
            let Some(neg) = self.negatives.sample(&mut self.rng) else { break };
            if neg == positive {
                continue;
            }
            self.output_step(neg, 0.0, lr);
        }
    }

    fn train_pair(&mut self, pair: &CorpusPair, lr: f32) {
        let dim = self.config.embedding_size;
        self.grad.fill(0.0);
        match pair {
            CorpusPair::SkipGram { target, context } => {
                for i in 0..dim {
                    self.hidden[i] = self.central.get(*target, i);
                }
                self.contrast(*context, lr);
                for i in 0..dim {
                    self.central.add(*target, i, self.grad[i]);
                }
            }
            CorpusPair::Cbow { target, context } => {
                let scale = 1.0 / context.len() as f32;
                self.hidden.fill(0.0);
                for &c in context {
                    for i in 0..dim {
                        self.hidden[i] += self.central.get(c, i) * scale;
                    }
                }
                self.contrast(*target, lr);
                for &c in context {
                    for i in 0..dim {
                        self.central.add(c, i, self.grad[i]);
                    }
                }
            }
        }
    }

    fn run(&mut self, corpus: &Corpus, walks: &[Vec<usize>], progress: &AtomicU64, total: u64) {
        for walk in walks {
            let lr = decayed_lr(self.config, progress.load(Ordering::Relaxed), total);
            for pair in corpus.walk_pairs(walk) {
                self.train_pair(&pair, lr);
            }
            progress.fetch_add(walk.len() as u64, Ordering::Relaxed);
        }
    }
}

/// Train both matrices over `corpus` with `workers` threads (see module docs).
///
/// `config.model` and `config.window_size` must describe how `corpus` was built.
pub fn train(corpus: &Corpus, config: &TrainerConfig, workers: usize) -> Result<Embeddings> {
    if corpus.model() != config.model {
        return Err(Error::configuration(
            "model",
            corpus.model().as_str(),
            config.model.as_str(),
        ));
    }
    if corpus.window() != config.window_size {
        return Err(Error::validation(
            "window_size",
            format!(
                "corpus was built with window {}, trainer configured with {}",
                corpus.window(),
                config.window_size
            ),
        ));
    }

    let num_nodes = corpus.frequencies().len();
    let dim = config.embedding_size;
    let workers = workers.max(1);

    let mut init_rng = ChaCha8Rng::seed_from_u64(mix64(config.seed ^ INIT_STREAM));
    let central = SharedMatrix::new(init_matrix(num_nodes, dim, &mut init_rng)?);
    let contextual = SharedMatrix::new(init_matrix(num_nodes, dim, &mut init_rng)?);
    let negatives = negative_table(corpus.frequencies());

    let total = (corpus.len_words() * config.epochs) as u64;
    let progress = AtomicU64::new(0);
    let walks = corpus.walks();

    let pool = if workers > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?,
        )
    } else {
        None
    };

    let worker_for = |epoch: usize, shard: usize| Worker {
        central: &central,
        contextual: &contextual,
        negatives: &negatives,
        config,
        hidden: vec![0.0; dim],
        grad: vec![0.0; dim],
        rng: ChaCha8Rng::seed_from_u64(mix64(
            config.seed ^ TRAIN_STREAM ^ mix64(((epoch as u64) << 32) | shard as u64),
        )),
    };

    for epoch in 0..config.epochs {
        match &pool {
            None => worker_for(epoch, 0).run(corpus, walks, &progress, total),
            Some(pool) => {
                let chunk = walks.len().div_ceil(workers).max(1);
                pool.install(|| {
                    walks
                        .par_chunks(chunk)
                        .enumerate()
                        .for_each(|(shard, shard_walks)| {
                            worker_for(epoch, shard).run(corpus, shard_walks, &progress, total)
                        })
                });
            }
        }
        tracing::debug!(
            epoch,
            lr = decayed_lr(config, progress.load(Ordering::Relaxed), total),
            "training epoch finished"
        );
    }

    Ok(Embeddings {
        central: central.into_matrix(),
        contextual: contextual.into_matrix(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_component_corpus(model: ModelType) -> Corpus {
        let mut walks = Vec::new();
        for _ in 0..100 {
            walks.push(vec![0, 1, 0, 1]);
            walks.push(vec![2, 3, 2, 3]);
        }
        Corpus::new(walks, 4, 1, model)
    }

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn small_config(model: ModelType) -> TrainerConfig {
        TrainerConfig {
            model,
            embedding_size: 8,
            window_size: 1,
            negative_samples: 3,
            epochs: 10,
            learning_rate: 0.05,
            min_learning_rate: 0.0001,
            seed: 7,
        }
    }

    #[test]
    fn learning_rate_decays_linearly_to_floor() {
        let cfg = TrainerConfig {
            learning_rate: 0.1,
            min_learning_rate: 0.01,
            ..Default::default()
        };
        assert!((decayed_lr(&cfg, 0, 100) - 0.1).abs() < 1e-7);
        assert!((decayed_lr(&cfg, 50, 100) - 0.05).abs() < 1e-7);
        assert!((decayed_lr(&cfg, 95, 100) - 0.01).abs() < 1e-7);
        assert!((decayed_lr(&cfg, 500, 100) - 0.01).abs() < 1e-7);
        assert!((decayed_lr(&cfg, 3, 0) - 0.1).abs() < 1e-7);
    }

    #[test]
    fn negative_table_uses_smoothed_unigram() {
        let t = negative_table(&[16, 1, 0]);
        let p = t.probabilities();
        // 16^0.75 = 8, 1^0.75 = 1.
        assert!((p[0] - 8.0 / 9.0).abs() < 1e-6);
        assert!((p[1] - 1.0 / 9.0).abs() < 1e-6);
        assert_eq!(p[2], 0.0);
    }

    #[test]
    fn initialization_is_small_and_seeded() {
        let corpus = Corpus::new(vec![vec![0], vec![1]], 2, 1, ModelType::SkipGram);
        // Single-node walks produce no examples, so output equals initialization.
        let cfg = TrainerConfig { embedding_size: 4, window_size: 1, ..Default::default() };
        let a = train(&corpus, &cfg, 1).unwrap();
        let b = train(&corpus, &cfg, 1).unwrap();
        assert_eq!(a, b);
        for x in a.central.data().iter().chain(a.contextual.data()) {
            assert!(x.abs() <= 0.5 / 4.0);
        }
        assert_ne!(a.central, a.contextual);
    }

    #[test]
    fn single_worker_is_bit_reproducible() {
        for model in [ModelType::SkipGram, ModelType::Cbow] {
            let corpus = two_component_corpus(model);
            let cfg = small_config(model);
            let a = train(&corpus, &cfg, 1).unwrap();
            let b = train(&corpus, &cfg, 1).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn skipgram_pulls_co_occurring_nodes_together() {
        let corpus = two_component_corpus(ModelType::SkipGram);
        let emb = train(&corpus, &small_config(ModelType::SkipGram), 1).unwrap();
        let same = dot(emb.central.row(0), emb.contextual.row(1));
        let cross = dot(emb.central.row(0), emb.contextual.row(3));
        assert!(same > 0.0, "same={same}");
        assert!(same > cross, "same={same} cross={cross}");
    }

    #[test]
    fn cbow_pulls_co_occurring_nodes_together() {
        let corpus = two_component_corpus(ModelType::Cbow);
        let emb = train(&corpus, &small_config(ModelType::Cbow), 1).unwrap();
        let same = dot(emb.central.row(2), emb.contextual.row(3));
        let cross = dot(emb.central.row(2), emb.contextual.row(1));
        assert!(same > cross, "same={same} cross={cross}");
    }

    #[test]
    fn config_must_match_corpus() {
        let corpus = two_component_corpus(ModelType::Cbow);
        let err = train(&corpus, &small_config(ModelType::SkipGram), 1).unwrap_err();
        assert!(err.is_configuration(), "{err}");
        assert!(err.to_string().contains("cbow"));

        let wider = TrainerConfig { window_size: 3, ..small_config(ModelType::Cbow) };
        let err = train(&corpus, &wider, 1).unwrap_err();
        assert!(matches!(err, Error::Validation { parameter: "window_size", .. }), "{err}");

        assert!(train(&corpus, &small_config(ModelType::Cbow), 1).is_ok());
    }

    #[test]
    fn hogwild_workers_produce_finite_matrices() {
        let corpus = two_component_corpus(ModelType::SkipGram);
        let emb = train(&corpus, &small_config(ModelType::SkipGram), 4).unwrap();
        assert_eq!(emb.central.num_rows(), 4);
        assert_eq!(emb.contextual.dim(), 8);
        assert!(emb.central.data().iter().all(|x| x.is_finite()));
        assert!(emb.contextual.data().iter().all(|x| x.is_finite()));
    }
}
