//! Invocation options and their validation.
//!
//! Numeric options are signed at the boundary so that a negative count is reported as a
//! validation failure instead of being silently wrapped or rejected by a parser.

use crate::graph::GraphOptions;
use crate::random_walk::WalkConfig;
use crate::train::TrainerConfig;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Training objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum ModelType {
    #[default]
    SkipGram,
    Cbow,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipGram => "skipgram",
            Self::Cbow => "cbow",
        }
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skipgram" => Ok(Self::SkipGram),
            "cbow" => Ok(Self::Cbow),
            other => Err(Error::configuration("model_type", other, "skipgram, cbow")),
        }
    }
}

impl TryFrom<String> for ModelType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ModelType> for String {
    fn from(m: ModelType) -> Self {
        m.as_str().to_owned()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which trained matrix is exposed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum EmbeddingType {
    #[default]
    Central,
    Contextual,
}

impl EmbeddingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Central => "central",
            Self::Contextual => "contextual",
        }
    }
}

impl FromStr for EmbeddingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "central" => Ok(Self::Central),
            "contextual" => Ok(Self::Contextual),
            other => Err(Error::configuration(
                "embedding_type",
                other,
                "central, contextual",
            )),
        }
    }
}

impl TryFrom<String> for EmbeddingType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<EmbeddingType> for String {
    fn from(e: EmbeddingType) -> Self {
        e.as_str().to_owned()
    }
}

impl fmt::Display for EmbeddingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every option recognized by the node2vec operation.
///
/// Defaults follow the host-side wrapper: 8 walks of length 10, `p = q = 1`,
/// skip-gram with 64 dimensions and a window of 5, central vectors, seed 42.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Node2VecConfig {
    pub is_directed: bool,
    /// Maximum walk length in nodes, start node included.
    pub walk_length: i64,
    pub num_of_walks: i64,
    /// Return parameter.
    pub p: f32,
    /// In-out parameter.
    pub q: f32,
    pub max_neighbors: Option<i64>,
    pub normalize_by_degree: bool,
    pub model_type: ModelType,
    pub embedding_size: i64,
    pub window_size: i64,
    pub embedding_type: EmbeddingType,
    pub random_state: u64,
    pub verbose: bool,
    /// Negative draws per positive example.
    pub negative_samples: i64,
    /// Passes over the walk corpus.
    pub epochs: i64,
    pub learning_rate: f32,
    /// Floor for the linearly decayed learning rate.
    pub min_learning_rate: f32,
}

impl Default for Node2VecConfig {
    fn default() -> Self {
        Self {
            is_directed: false,
            walk_length: 10,
            num_of_walks: 8,
            p: 1.0,
            q: 1.0,
            max_neighbors: None,
            normalize_by_degree: false,
            model_type: ModelType::SkipGram,
            embedding_size: 64,
            window_size: 5,
            embedding_type: EmbeddingType::Central,
            random_state: 42,
            verbose: false,
            negative_samples: 5,
            epochs: 1,
            learning_rate: 0.025,
            min_learning_rate: 0.0001,
        }
    }
}

fn positive_count(parameter: &'static str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(Error::validation(parameter, format!("must be > 0, got {value}")));
    }
    Ok(())
}

fn positive_real(parameter: &'static str, value: f32) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::validation(parameter, format!("must be a finite number > 0, got {value}")));
    }
    Ok(())
}

impl Node2VecConfig {
    /// Check every numeric range. Runs before any graph construction.
    pub fn validate(&self) -> Result<()> {
        positive_count("walk_length", self.walk_length)?;
        positive_count("num_of_walks", self.num_of_walks)?;
        positive_real("p", self.p)?;
        positive_real("q", self.q)?;
        if let Some(k) = self.max_neighbors {
            positive_count("max_neighbors", k)?;
        }
        positive_count("embedding_size", self.embedding_size)?;
        positive_count("window_size", self.window_size)?;
        positive_count("negative_samples", self.negative_samples)?;
        positive_count("epochs", self.epochs)?;
        positive_real("learning_rate", self.learning_rate)?;
        if !(self.min_learning_rate.is_finite()
            && self.min_learning_rate >= 0.0
            && self.min_learning_rate <= self.learning_rate)
        {
            return Err(Error::validation(
                "min_learning_rate",
                format!(
                    "must be in [0, learning_rate={}], got {}",
                    self.learning_rate, self.min_learning_rate
                ),
            ));
        }
        Ok(())
    }

    /// Apply string-valued options, as received from a host keyword map.
    pub fn with_options(mut self, model_type: &str, embedding_type: &str) -> Result<Self> {
        self.model_type = model_type.parse()?;
        self.embedding_type = embedding_type.parse()?;
        Ok(self)
    }

    // The accessors below assume `validate` has succeeded.

    pub(crate) fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            is_directed: self.is_directed,
            max_neighbors: self.max_neighbors.map(|k| k as usize),
            normalize_by_degree: self.normalize_by_degree,
        }
    }

    pub(crate) fn walk_config(&self) -> WalkConfig {
        WalkConfig {
            length: self.walk_length as usize,
            walks_per_node: self.num_of_walks as usize,
            seed: self.random_state,
        }
    }

    pub(crate) fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            model: self.model_type,
            embedding_size: self.embedding_size as usize,
            window_size: self.window_size as usize,
            negative_samples: self.negative_samples as usize,
            epochs: self.epochs as usize,
            learning_rate: self.learning_rate,
            min_learning_rate: self.min_learning_rate,
            seed: self.random_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_parameter(cfg: Node2VecConfig) -> &'static str {
        match cfg.validate() {
            Err(Error::Validation { parameter, .. }) => parameter,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        Node2VecConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_numbers_are_validation_errors() {
        let base = Node2VecConfig::default();
        assert_eq!(
            validation_parameter(Node2VecConfig { walk_length: 0, ..base.clone() }),
            "walk_length"
        );
        assert_eq!(
            validation_parameter(Node2VecConfig { num_of_walks: -1, ..base.clone() }),
            "num_of_walks"
        );
        assert_eq!(validation_parameter(Node2VecConfig { p: 0.0, ..base.clone() }), "p");
        assert_eq!(validation_parameter(Node2VecConfig { q: -1.0, ..base.clone() }), "q");
        assert_eq!(
            validation_parameter(Node2VecConfig { max_neighbors: Some(0), ..base.clone() }),
            "max_neighbors"
        );
        assert_eq!(
            validation_parameter(Node2VecConfig { embedding_size: 0, ..base.clone() }),
            "embedding_size"
        );
        assert_eq!(
            validation_parameter(Node2VecConfig { window_size: -3, ..base.clone() }),
            "window_size"
        );
        assert_eq!(
            validation_parameter(Node2VecConfig { p: f32::NAN, ..base.clone() }),
            "p"
        );
        assert_eq!(
            validation_parameter(Node2VecConfig { min_learning_rate: 1.0, ..base }),
            "min_learning_rate"
        );
    }

    #[test]
    fn unknown_enumerations_are_configuration_errors() {
        let err = "invalid".parse::<ModelType>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("model_type"));

        let err = "invalid".parse::<EmbeddingType>().unwrap_err();
        assert!(err.is_configuration());

        let cfg = Node2VecConfig::default().with_options("cbow", "contextual").unwrap();
        assert_eq!(cfg.model_type, ModelType::Cbow);
        assert_eq!(cfg.embedding_type, EmbeddingType::Contextual);
    }

    #[test]
    fn stage_configs_carry_validated_values() {
        let cfg = Node2VecConfig {
            walk_length: 7,
            num_of_walks: 3,
            max_neighbors: Some(4),
            random_state: 9,
            ..Default::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.graph_options().max_neighbors, Some(4));
        let w = cfg.walk_config();
        assert_eq!((w.length, w.walks_per_node, w.seed), (7, 3, 9));
        assert_eq!(cfg.trainer_config().negative_samples, 5);
    }
}
