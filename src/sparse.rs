//! Sparse `{dim, indices, values}` vectors.
//!
//! A null input is represented by `dim == None` and propagates through every
//! operation instead of failing.

use crate::{Error, Result};
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparseVector {
    pub dim: Option<u32>,
    pub indices: Vec<u32>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.dim.is_none()
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Dense form; `None` for a null vector. Entries indexed past `dim` are dropped.
    pub fn to_dense(&self) -> Option<Vec<f64>> {
        let mut out = vec![0.0; self.dim? as usize];
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            if let Some(slot) = out.get_mut(i as usize) {
                *slot = v;
            }
        }
        Some(out)
    }
}

/// An element type accepted by [`from_list`].
///
/// `None` marks a null element: it counts toward `dim` but is never stored.
pub trait ListElement: Copy {
    fn to_value(self) -> Option<f64>;
}

macro_rules! impl_list_element {
    ($($t:ty),*) => {
        $(
            impl ListElement for $t {
                #[inline]
                fn to_value(self) -> Option<f64> {
                    Some(self as f64)
                }
            }
        )*
    };
}

impl_list_element!(i32, i64, f32, f64);

impl<T: ListElement> ListElement for Option<T> {
    #[inline]
    fn to_value(self) -> Option<f64> {
        self.and_then(ListElement::to_value)
    }
}

/// Keep the non-zero, non-null entries of a dense list.
pub fn from_list<T: ListElement>(list: Option<&[T]>) -> SparseVector {
    let Some(list) = list else {
        return SparseVector::null();
    };
    let (indices, values): (Vec<u32>, Vec<f64>) = list
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| Some((i as u32, v.to_value()?)))
        .filter(|&(_, v)| v != 0.0)
        .unzip();
    SparseVector {
        dim: Some(list.len() as u32),
        indices,
        values,
    }
}

/// Normalization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeAxis {
    /// Each vector is scaled by its own Lp norm.
    Vertical,
}

impl FromStr for NormalizeAxis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vertical" => Ok(Self::Vertical),
            other => Err(Error::configuration("how", other, "vertical")),
        }
    }
}

/// Divide the stored values by the vector's Lp norm (`p >= 1`).
///
/// Null and all-zero vectors are returned unchanged.
pub fn normalize(vector: &SparseVector, how: &str, p: f64) -> Result<SparseVector> {
    let NormalizeAxis::Vertical = how.parse::<NormalizeAxis>()?;
    if !(p >= 1.0) {
        return Err(Error::validation("p", format!("must be >= 1.0, got {p}")));
    }
    if vector.is_null() {
        return Ok(vector.clone());
    }

    let norm = if p.is_infinite() {
        vector.values.iter().fold(0.0f64, |m, v| m.max(v.abs()))
    } else {
        vector.values.iter().map(|v| v.abs().powf(p)).sum::<f64>().powf(1.0 / p)
    };
    if !(norm > 0.0) {
        return Ok(vector.clone());
    }

    Ok(SparseVector {
        dim: vector.dim,
        indices: vector.indices.clone(),
        values: vector.values.iter().map(|v| v / norm).collect(),
    })
}

/// Value at `index`: `0.0` when absent but in range, `None` when out of range or null.
pub fn get(vector: &SparseVector, index: i64) -> Result<Option<f64>> {
    if index < 0 {
        return Err(Error::validation("index", format!("must be >= 0, got {index}")));
    }
    let Some(dim) = vector.dim else {
        return Ok(None);
    };
    if index >= dim as i64 {
        return Ok(None);
    }
    // Indices are ascending, as `from_list` produces them.
    let value = match vector.indices.binary_search(&(index as u32)) {
        Ok(pos) => vector.values.get(pos).copied().unwrap_or(0.0),
        Err(_) => 0.0,
    };
    Ok(Some(value))
}
