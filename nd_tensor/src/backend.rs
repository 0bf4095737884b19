//! Backend trait - the strategy that owns materialized storage and decides how
//! expressions are traversed.

use std::fmt;

use crate::error::Result;
use crate::eval::{self, Traversal};
use crate::frontend::{a_operator_with, Argument, ElemOf};
use crate::func::AssignFn;
use crate::shape::Shape;
use crate::tensor::{AssignTarget, Element, Operand};

/// Backend trait for tensor evaluation.
///
/// A backend is a type-level switch: code generic over `B: Backend` picks its
/// storage and traversal strategy without any global state, so alternative
/// backends can be tested side by side.
pub trait Backend: Clone + Copy + fmt::Debug + Default + Send + Sync + 'static {
    /// The storage type for this backend.
    type Storage<T: Element>: AssignTarget<Elem = T> + Argument + Clone;

    // === Creation ===

    /// Create storage from a flat row-major data vector and shape.
    fn from_vec<T: Element>(data: Vec<T>, shape: Shape) -> Result<Self::Storage<T>>;

    /// Create storage filled with a constant value.
    fn full<T: Element>(shape: &Shape, value: T) -> Self::Storage<T>;

    // === Evaluation ===

    /// Traversal strategy used by [`Backend::materialize`] and
    /// [`Backend::assign`].
    fn traversal() -> Traversal {
        Traversal::Auto
    }

    /// Evaluate any operand into fresh storage.
    fn materialize<E>(operand: &E) -> Result<Self::Storage<E::Elem>>
    where
        E: Operand + ?Sized,
    {
        let data = eval::collect(operand, Self::traversal());
        Self::from_vec(data, operand.shape().clone())
    }

    /// Eager compound assignment into backend storage.
    fn assign<'d, F, T, R>(
        func: F,
        dest: &'d mut Self::Storage<T>,
        rhs: R,
    ) -> Result<&'d mut Self::Storage<T>>
    where
        T: Element,
        R: Argument,
        F: AssignFn<T, ElemOf<R>>,
    {
        a_operator_with(Self::traversal(), func, dest, rhs)
    }
}
