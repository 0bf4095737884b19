//! # nd_tensor - Lazy Strided Tensor Expressions
//!
//! This crate provides an expression-template engine for elementwise
//! arithmetic over N-dimensional strided tensors. Operations over any number
//! of broadcast-compatible operands build a tree of lazy nodes; nothing is
//! computed until the tree is traversed or assigned into storage.
//!
//! ## Overview
//!
//! The core abstractions are:
//! - [`Shape`] and [`broadcast_shapes`] - Shapes and the broadcast resolver
//! - [`Motion`], [`Walker`] and [`Indexer`] - Cursors every operand provides
//! - [`Operand`] - Trait for anything that can appear in an expression
//! - [`Expression`] - Lazy node applying one function over a tuple of operands
//! - [`Tensor`] - Reference-counted handle to a node
//! - [`n_operator`] / [`a_operator`] - Lazy construction and eager assignment
//! - [`Backend`] - Strategy owning storage and traversal choice
//!
//! ## Example
//!
//! ```ignore
//! use nd_tensor::prelude::*;
//! use nd_backend_cpu::{CpuBackend, CpuTensor};
//!
//! let a = CpuTensor::from_vec(vec![1.0, 2.0, 3.0], Shape::new(vec![3, 1]))?;
//! let b = CpuTensor::from_vec(vec![10.0, 20.0], Shape::new(vec![1, 2]))?;
//!
//! // Lazy: (3, 2) result, no element computed yet.
//! let c = n_operator(|x: f64, y: f64| x * y + 1.0, (&a, &b))?;
//!
//! // Evaluate on demand.
//! let stored = c.eval::<CpuBackend>()?;
//!
//! // Eager compound assignment.
//! let mut d = CpuTensor::zeros(&Shape::new(vec![3, 2]));
//! a_operator(functor::AddAssign, &mut d, &c)?;
//! ```

pub mod backend;
pub mod error;
pub mod eval;
pub mod evaluator;
pub mod expr;
pub mod frontend;
pub mod func;
pub mod functor;
pub mod node;
pub mod scalar;
pub mod shape;
pub mod tensor;
pub mod walker;

pub use backend::Backend;
pub use error::{Result, TensorError};
pub use eval::{Elements, Odometer, Traversal};
pub use evaluator::{Evaluator, FlatEvaluator};
pub use expr::Expression;
pub use frontend::{
    a_operator, a_operator_with, n_operator, Argument, ElemOf, OperatorArgs, OperatorOutput,
    ScalarArgument, ScalarKind, TensorKind,
};
pub use func::{AssignFn, ElementFn};
pub use node::Tensor;
pub use scalar::{BindFirst, BindSecond, Degenerate, Scalar};
pub use shape::{broadcast_shapes, Descriptor, Shape, Strides};
pub use tensor::{AssignTarget, Element, Operand, OperandTuple};
pub use walker::{Indexer, Motion, ScalarIndexer, ScalarWalker, Walker, WalkerMut};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::Backend;
    pub use crate::error::{Result, TensorError};
    pub use crate::eval::Traversal;
    pub use crate::expr::Expression;
    pub use crate::frontend::{a_operator, a_operator_with, n_operator, Argument};
    pub use crate::func::{AssignFn, ElementFn};
    pub use crate::functor;
    pub use crate::node::Tensor;
    pub use crate::scalar::Scalar;
    pub use crate::shape::{broadcast_shapes, Shape, Strides};
    pub use crate::tensor::{AssignTarget, Element, Operand};
    pub use crate::walker::{Indexer, Motion, Walker, WalkerMut};
}
