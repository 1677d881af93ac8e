//! Chunking configuration.
//!
//! A [`ChunkSpec`] maps dimension names to block sizes. When one is supplied
//! the source dataset is opened lazily and regridding is evaluated block by
//! block while the output is written, bounding memory use to one block of
//! each variable at a time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::dataset::Dimension;
use crate::error::{RegridError, Result};

/// Mapping from dimension name to a positive block size
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkSpec(BTreeMap<String, usize>);

impl ChunkSpec {
    /// Create an empty chunk spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, dim: impl Into<String>, size: usize) -> Self {
        self.insert(dim, size);
        self
    }

    pub fn insert(&mut self, dim: impl Into<String>, size: usize) {
        self.0.insert(dim.into(), size);
    }

    /// Block size for a dimension, if one was configured
    pub fn get(&self, dim: &str) -> Option<usize> {
        self.0.get(dim).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, size)| (name.as_str(), *size))
    }

    /// Reject zero block sizes. Dimension names are checked separately
    /// against the dataset in [`ChunkSpec::validate_against`].
    pub fn validate(&self) -> Result<()> {
        for (dim, size) in self.iter() {
            if size == 0 {
                return Err(RegridError::config(format!(
                    "Chunk size for dimension '{}' must be positive",
                    dim
                )));
            }
        }
        Ok(())
    }

    /// Check that every named dimension exists in the dataset
    pub fn validate_against(&self, dimensions: &[Dimension]) -> Result<()> {
        self.validate()?;

        let unknown: Vec<&str> = self
            .iter()
            .map(|(dim, _)| dim)
            .filter(|dim| !dimensions.iter().any(|d| d.name == *dim))
            .collect();

        if !unknown.is_empty() {
            let available: Vec<&str> = dimensions.iter().map(|d| d.name.as_str()).collect();
            return Err(RegridError::config(format!(
                "Chunk spec names dimensions not present in the source dataset: {} (available: {})",
                unknown.join(", "),
                available.join(", ")
            )));
        }

        Ok(())
    }

    /// Ranges covering `0..len` for the named dimension. Dimensions without a
    /// configured size form a single block.
    pub fn ranges_for(&self, dim: &str, len: usize) -> Vec<Range<usize>> {
        chunk_ranges(len, self.get(dim).unwrap_or(len))
    }
}

impl FromStr for ChunkSpec {
    type Err = RegridError;

    /// Parse `time=40,latitude=70,longitude=70`
    fn from_str(s: &str) -> Result<Self> {
        let mut spec = ChunkSpec::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (dim, size) = entry.split_once('=').ok_or_else(|| {
                RegridError::InvalidParameter {
                    param: "chunks".to_string(),
                    message: format!("Expected DIM=SIZE, got '{}'", entry),
                }
            })?;

            let dim = dim.trim();
            if dim.is_empty() {
                return Err(RegridError::InvalidParameter {
                    param: "chunks".to_string(),
                    message: format!("Missing dimension name in '{}'", entry),
                });
            }

            let size: usize = size.trim().parse().map_err(|_| RegridError::InvalidParameter {
                param: "chunks".to_string(),
                message: format!("Invalid chunk size for '{}': '{}'", dim, size.trim()),
            })?;

            spec.insert(dim, size);
        }

        spec.validate()?;
        Ok(spec)
    }
}

impl fmt::Display for ChunkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(dim, size)| format!("{}={}", dim, size))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Split `0..len` into consecutive ranges of at most `size` elements
pub fn chunk_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Cartesian product of per-axis ranges, in row-major order.
///
/// No axes yields a single empty block; any axis without ranges yields none.
pub fn block_plan(axes: &[Vec<Range<usize>>]) -> Vec<Vec<Range<usize>>> {
    axes.iter().fold(vec![Vec::new()], |blocks, ranges| {
        blocks
            .iter()
            .flat_map(|prefix| {
                ranges.iter().map(move |range| {
                    let mut block = prefix.clone();
                    block.push(range.clone());
                    block
                })
            })
            .collect()
    })
}
