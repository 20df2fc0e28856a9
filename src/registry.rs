//! Static table of the operations a host can invoke by name, and their typed handlers.
//!
//! Every operation is elementwise over a host column: the output has one value per
//! input row.

use crate::config::Node2VecConfig;
use crate::graph::AdjacencyRow;
use crate::node2vec::{ExecutionContext, Node2Vec};
use crate::sparse::{from_list, get, normalize, SparseVector};
use crate::{Error, Result};
use std::fmt;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`crate::Node2Vec::embed`]
    Node2Vec,
    /// [`crate::sparse::from_list`]
    SparseFromList,
    /// [`crate::sparse::normalize`]
    SparseNormalize,
    /// [`crate::sparse::get`]
    SparseGet,
}

/// `(namespace, name, operation)` for every exposed operation.
pub const OPERATIONS: &[(&str, &str, Operation)] = &[
    ("graph", "node2vec", Operation::Node2Vec),
    ("sparse", "from_list", Operation::SparseFromList),
    ("sparse", "normalize", Operation::SparseNormalize),
    ("sparse", "get", Operation::SparseGet),
];

/// Column inputs for one invocation. `N` is the node id type of the graph operation.
#[derive(Debug, Clone)]
pub enum Arguments<'a, N> {
    Node2Vec {
        config: Node2VecConfig,
        rows: &'a [AdjacencyRow<N>],
    },
    SparseFromList {
        lists: &'a [Option<Vec<f64>>],
    },
    SparseNormalize {
        vectors: &'a [SparseVector],
        how: &'a str,
        p: f64,
    },
    SparseGet {
        vectors: &'a [SparseVector],
        index: i64,
    },
}

impl<N> Arguments<'_, N> {
    /// The operation these arguments are shaped for.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Node2Vec { .. } => Operation::Node2Vec,
            Self::SparseFromList { .. } => Operation::SparseFromList,
            Self::SparseNormalize { .. } => Operation::SparseNormalize,
            Self::SparseGet { .. } => Operation::SparseGet,
        }
    }
}

/// One output value per input row.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Embeddings(Vec<Option<Vec<f32>>>),
    Sparse(Vec<SparseVector>),
    Values(Vec<Option<f64>>),
}

impl Output {
    pub fn len(&self) -> usize {
        match self {
            Self::Embeddings(v) => v.len(),
            Self::Sparse(v) => v.len(),
            Self::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Operation {
    pub fn lookup(namespace: &str, name: &str) -> Result<Self> {
        OPERATIONS
            .iter()
            .find(|(ns, n, _)| *ns == namespace && *n == name)
            .map(|&(_, _, op)| op)
            .ok_or_else(|| {
                Error::configuration(
                    "operation",
                    format!("{namespace}.{name}"),
                    "graph.node2vec, sparse.from_list, sparse.normalize, sparse.get",
                )
            })
    }

    fn entry(self) -> (&'static str, &'static str) {
        match self {
            Self::Node2Vec => ("graph", "node2vec"),
            Self::SparseFromList => ("sparse", "from_list"),
            Self::SparseNormalize => ("sparse", "normalize"),
            Self::SparseGet => ("sparse", "get"),
        }
    }

    pub fn namespace(self) -> &'static str {
        self.entry().0
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// Run the handler for this operation over a column of inputs.
    ///
    /// Options are checked before any row is processed, so an empty column still
    /// reports a bad `how`, `p` or `index`.
    pub fn invoke<N: Eq + Hash + Clone + Sync>(
        self,
        ctx: &ExecutionContext,
        args: Arguments<'_, N>,
    ) -> Result<Output> {
        if args.operation() != self {
            return Err(Error::validation(
                "arguments",
                format!("{self} received arguments for {}", args.operation()),
            ));
        }
        let _span = tracing::debug_span!("invoke", operation = %self).entered();

        match args {
            Arguments::Node2Vec { config, rows } => {
                Ok(Output::Embeddings(Node2Vec::new(config)?.embed(ctx, rows)?))
            }
            Arguments::SparseFromList { lists } => Ok(Output::Sparse(
                lists.iter().map(|l| from_list(l.as_deref())).collect(),
            )),
            Arguments::SparseNormalize { vectors, how, p } => {
                normalize(&SparseVector::null(), how, p)?;
                let out = vectors
                    .iter()
                    .map(|v| normalize(v, how, p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Output::Sparse(out))
            }
            Arguments::SparseGet { vectors, index } => {
                get(&SparseVector::null(), index)?;
                let out = vectors
                    .iter()
                    .map(|v| get(v, index))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Output::Values(out))
            }
        }
    }
}

/// Resolve `namespace.name` and invoke it.
pub fn dispatch<N: Eq + Hash + Clone + Sync>(
    namespace: &str,
    name: &str,
    ctx: &ExecutionContext,
    args: Arguments<'_, N>,
) -> Result<Output> {
    Operation::lookup(namespace, name)?.invoke(ctx, args)
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace(), self.name())
    }
}
