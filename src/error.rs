use crate::geometry::Direction;
use std::ffi;
use std::path::PathBuf;
use thiserror::Error;

/// A CRS definition that PROJ could not turn into a spatial reference.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed CRS definition `{definition}`: {reason}")]
    MalformedDefinition { definition: String, reason: String },
    #[error("A nul byte was found in the CRS definition: {0}")]
    ArgumentNul(#[from] ffi::NulError),
}

/// A parsed CRS that could not be turned into something that transforms coordinates.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("Projection parameters could not be exported: {reason}")]
    Export { reason: String },
    #[error("The projection engine for `{params}` could not be built: {reason}")]
    Engine { params: String, reason: String },
    #[error("The CRS to CRS transformer could not be built: {reason}")]
    Transformer { reason: String },
    #[error("A nul byte was found in a PROJ argument: {0}")]
    ArgumentNul(#[from] ffi::NulError),
    #[error("The search path {0:?} is not valid UTF-8")]
    InvalidPath(PathBuf),
}

/// PROJ reported an error while transforming coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed {direction} transform of ({x}, {y}): {message}")]
pub struct TransformError {
    pub direction: Direction,
    /// Attempted input, in the caller's units.
    pub x: f64,
    pub y: f64,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("Coordinate slices differ in length: x has {x}, y has {y}, z has {z}")]
    LengthMismatch { x: usize, y: usize, z: usize },
    #[error("Failed to transform coordinates because the transformer could not be constructed: {0}")]
    Unavailable(ConstructionError),
}
