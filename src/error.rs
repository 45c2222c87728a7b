//! Engine error types

use std::io;
use thiserror::Error;

use crate::components::layers::BlendMode;

/// Errors returned by buffer, layer-stack, compositing and tool operations.
///
/// Every operation that returns one of these leaves its buffer / stack
/// exactly as it was before the call.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} buffer")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    #[error("layer index {index} is out of range (stack has {len} layers)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cannot remove the last remaining layer")]
    CannotRemoveLastLayer,

    #[error("layer '{name}' is locked")]
    LayerLocked { name: String },

    #[error("blend mode {} is not supported by the compositor", .0.name())]
    UnsupportedBlendMode(BlendMode),

    #[error("invalid buffer dimensions {width}x{height}")]
    InvalidDimensions { width: u64, height: u64 },

    #[error("invalid project record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    pub(crate) fn out_of_bounds(x: i64, y: i64, width: u32, height: u32) -> Self {
        EngineError::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<EngineError> for String {
    fn from(err: EngineError) -> Self {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
