use thiserror::Error;

use super::key::{MAX_LAYER, MAX_LAYER_DEPTH};
use crate::render::BatchError;

/// Rejected draw-order inputs. The previous value is kept.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum OrderKeyError {
    #[error("layer {0} exceeds the maximum of {MAX_LAYER}")]
    LayerOutOfRange(u32),

    #[error("layer depth {0} exceeds the maximum of {MAX_LAYER_DEPTH}")]
    DepthOutOfRange(u32),
}

/// Sprite grid configuration errors, reported before any sprite is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid map has {actual} cells but the layout is {columns}x{rows} ({expected} cells)")]
    LayoutMismatch {
        columns: usize,
        rows: usize,
        expected: usize,
        actual: usize,
    },

    #[error("grid map cell {index} is {found:?}, expected a digit")]
    InvalidCell { index: usize, found: char },

    #[error("grid map cell {index} selects texture #{texture_index} but only {available} were supplied and no fallback texture is set")]
    TextureIndex {
        index: usize,
        texture_index: usize,
        available: usize,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),
}
