//! Run configuration: record geometry, strategy, k and search effort.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KnnError, Result};

/// Tiny-image geometry: 32x32 RGB.
pub const TINY_IMAGE: RecordGeometry = RecordGeometry { width: 32, height: 32, channels: 3 };

/// Number of f32 values in a tiny-image GIST descriptor.
pub const GIST_DIMS: usize = 384;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordGeometry {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl RecordGeometry {
    pub fn record_width(&self) -> usize {
        self.width * self.height * self.channels
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Linear,
    Tree,
}

impl FromStr for Strategy {
    type Err = KnnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Strategy::Linear),
            "tree" | "kdtree" => Ok(Strategy::Tree),
            other => Err(KnnError::config(format!("unknown strategy `{other}`"))),
        }
    }
}

/// Per-query work budget for tree search, counted in leaf points examined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Unbounded,
    Checks(usize),
}

impl Effort {
    pub fn limit(&self) -> Option<usize> {
        match *self {
            Effort::Unbounded => None,
            Effort::Checks(n) => Some(n),
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effort::Unbounded => f.write_str("unbounded"),
            Effort::Checks(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Effort {
    type Err = KnnError;

    /// Accepts `unbounded`, `-1` (FLANN convention) or a positive integer.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") || s == "-1" {
            return Ok(Effort::Unbounded);
        }
        match s.parse::<usize>() {
            Ok(0) => Err(KnnError::config("checks must be positive")),
            Ok(n) => Ok(Effort::Checks(n)),
            Err(_) => Err(KnnError::config(format!("invalid effort `{s}`"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Number of randomized kd-trees in the forest.
    pub trees: usize,
    /// Maximum points held by a leaf.
    pub leaf_size: usize,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self { trees: 4, leaf_size: 1, seed: 1337 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    pub record_width: usize,
    pub strategy: Strategy,
    pub k: usize,
    pub effort: Effort,
    pub tree: TreeParams,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            record_width: TINY_IMAGE.record_width(),
            strategy: Strategy::Linear,
            k: 10,
            effort: Effort::Unbounded,
            tree: TreeParams::default(),
        }
    }
}

impl KnnConfig {
    pub fn validate(&self) -> Result<()> {
        if self.record_width == 0 {
            return Err(KnnError::config("record_width must be positive"));
        }
        if self.k == 0 {
            return Err(KnnError::config("k must be at least 1"));
        }
        if self.effort == Effort::Checks(0) {
            return Err(KnnError::config("checks must be positive"));
        }
        self.tree.validate()
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<()> {
        if self.trees == 0 {
            return Err(KnnError::config("tree count must be positive"));
        }
        if self.leaf_size == 0 {
            return Err(KnnError::config("leaf_size must be positive"));
        }
        Ok(())
    }
}
