//! Error types for Zilly.
//!
//! Only construction paths can fail. Spatial queries and simulation steps
//! degrade to "no collision" / no-op instead of returning errors.

use thiserror::Error;

/// Top-level error type for Zilly operations.
#[derive(Debug, Error)]
pub enum ZillyError {
    /// Map/layer construction errors
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    /// Tuning parameter errors
    #[error("Tuning error: {0}")]
    Tuning(#[from] TuningError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a collision grid from raw layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// Width or height is zero or negative
    #[error("Invalid map dimensions {width}x{height}")]
    InvalidDimensions {
        /// Width in tiles
        width: i32,
        /// Height in tiles
        height: i32,
    },

    /// Game layer does not hold exactly width*height tiles
    #[error("Game layer has {actual} tiles, expected {expected}")]
    GameLayerSize {
        /// Expected tile count
        expected: usize,
        /// Actual tile count
        actual: usize,
    },

    /// Raw bytes could not be viewed as tile records
    #[error("Layer '{layer}' bytes are not a whole number of records: {reason}")]
    RawLayer {
        /// Layer name
        layer: &'static str,
        /// Cast failure description
        reason: String,
    },

    /// Fixture row contained a glyph without a tile mapping
    #[error("Unknown fixture glyph '{glyph}' at ({x}, {y})")]
    UnknownGlyph {
        /// The glyph
        glyph: char,
        /// Column
        x: usize,
        /// Row
        y: usize,
    },

    /// Fixture rows have different lengths
    #[error("Fixture row {row} has length {actual}, expected {expected}")]
    RaggedRows {
        /// Row index
        row: usize,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },
}

/// Errors raised when addressing tuning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TuningError {
    /// No parameter with this name (case-insensitive)
    #[error("Unknown tuning parameter '{0}'")]
    UnknownName(String),

    /// Index outside the parameter list
    #[error("Tuning index {index} out of range (0..{len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of parameters
        len: usize,
    },
}

/// Result type alias for Zilly operations.
pub type ZillyResult<T> = Result<T, ZillyError>;
