//! Training examples from walks.
//!
//! Walks play the role of sentences and nodes the role of words. Windows never wrap
//! past a walk boundary.

use crate::config::ModelType;

/// One training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusPair {
    /// Predict `context` from `target`.
    SkipGram { target: usize, context: usize },
    /// Predict `target` from the average of `context`.
    Cbow { target: usize, context: Vec<usize> },
}

/// Skip-gram `(target, context)` pairs.
///
/// For each position `i` and offset `j` in `1..=window`: `(w[i], w[i-j])` then
/// `(w[i], w[i+j])`, each only when in bounds.
pub fn skipgram_pairs(walk: &[usize], window: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    // Offsets past the walk length never land in bounds.
    let window = window.min(walk.len());
    (0..walk.len()).flat_map(move |i| {
        (1..=window).flat_map(move |j| {
            let before = i.checked_sub(j).map(|k| (walk[i], walk[k]));
            let after = walk.get(i + j).map(|&c| (walk[i], c));
            before.into_iter().chain(after)
        })
    })
}

/// CBOW `(target, context)` examples; positions with no context are skipped.
pub fn cbow_examples(walk: &[usize], window: usize) -> impl Iterator<Item = (usize, Vec<usize>)> + '_ {
    (0..walk.len()).filter_map(move |i| {
        let lo = i.saturating_sub(window);
        let hi = i.saturating_add(window).saturating_add(1).min(walk.len());
        let context: Vec<usize> = walk[lo..i].iter().chain(&walk[i + 1..hi]).copied().collect();
        (!context.is_empty()).then_some((walk[i], context))
    })
}

/// A walk corpus plus the statistics training needs.
#[derive(Debug, Clone)]
pub struct Corpus {
    walks: Vec<Vec<usize>>,
    frequencies: Vec<u64>,
    window: usize,
    model: ModelType,
}

impl Corpus {
    /// `num_nodes` sizes the frequency table; every walk entry must be `< num_nodes`.
    pub fn new(walks: Vec<Vec<usize>>, num_nodes: usize, window: usize, model: ModelType) -> Self {
        let mut frequencies = vec![0u64; num_nodes];
        for &v in walks.iter().flatten() {
            frequencies[v] += 1;
        }
        Self {
            walks,
            frequencies,
            window,
            model,
        }
    }

    pub fn walks(&self) -> &[Vec<usize>] {
        &self.walks
    }

    /// Occurrence count of each node across all walks.
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn model(&self) -> ModelType {
        self.model
    }

    /// Total walk positions (the unit of learning-rate progress).
    pub fn len_words(&self) -> usize {
        self.walks.iter().map(Vec::len).sum()
    }

    /// Examples of a single walk, in window order.
    pub fn walk_pairs<'a>(&'a self, walk: &'a [usize]) -> Box<dyn Iterator<Item = CorpusPair> + 'a> {
        match self.model {
            ModelType::SkipGram => Box::new(
                skipgram_pairs(walk, self.window)
                    .map(|(target, context)| CorpusPair::SkipGram { target, context }),
            ),
            ModelType::Cbow => Box::new(
                cbow_examples(walk, self.window)
                    .map(|(target, context)| CorpusPair::Cbow { target, context }),
            ),
        }
    }

    /// Every example of the corpus, walk by walk.
    pub fn pairs(&self) -> impl Iterator<Item = CorpusPair> + '_ {
        self.walks.iter().flat_map(move |w| self.walk_pairs(w))
    }
}
