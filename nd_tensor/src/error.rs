//! Error type shared by the expression engine and its storage collaborators.

use thiserror::Error;

use crate::shape::Shape;

/// Errors raised while building or assigning tensor expressions.
///
/// Every variant is produced synchronously at construction time; traversal
/// itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error(
        "cannot broadcast shapes {} at axis {axis}: conflicting extents {extents:?}",
        join_shapes(.shapes)
    )]
    Broadcast {
        axis: usize,
        extents: Vec<usize>,
        shapes: Vec<Shape>,
    },

    #[error("elementwise operation needs at least one tensor operand, got only scalars")]
    NoTensorOperand,

    #[error("cannot assign a result of shape {rhs} into a destination of shape {dest}")]
    AssignShape { dest: Shape, rhs: Shape },

    #[error("cannot broadcast a tensor of shape {from} to shape {to}")]
    BroadcastTo { from: Shape, to: Shape },

    #[error("data length {len} does not match shape {shape} (expected {expected})")]
    DataLength {
        len: usize,
        shape: Shape,
        expected: usize,
    },

    #[error("axis {axis} is out of range for a tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("{axes:?} is not a permutation of the {ndim} axes")]
    InvalidPermutation { axes: Vec<usize>, ndim: usize },

    #[error("slice {start}..{end} step {step} is invalid for axis {axis} of extent {extent}")]
    InvalidSlice {
        axis: usize,
        start: usize,
        end: usize,
        step: usize,
        extent: usize,
    },

    #[error("cannot reshape {from} into {to}: element counts differ")]
    ReshapeSize { from: Shape, to: Shape },

    #[error("cannot reshape a non-contiguous view of shape {from} into {to}")]
    NotContiguous { from: Shape, to: Shape },
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TensorError>;

fn join_shapes(shapes: &[Shape]) -> String {
    shapes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
