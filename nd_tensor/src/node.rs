//! Public tensor handle over an expression node.

use std::fmt;
use std::ops;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::Result;
use crate::eval::{self, Elements, Traversal};
use crate::expr::Expression;
use crate::frontend::{n_operator, OperatorArgs, OperatorOutput};
use crate::func::ElementFn;
use crate::functor;
use crate::scalar::BindFirst;
use crate::shape::Shape;
use crate::tensor::{Element, Operand};

/// A lazy tensor expression.
/// Reference-counted for cheap sharing: cloning a handle never copies data,
/// and several expressions may hold the same node.
pub struct Tensor<E>(pub(crate) Arc<E>);

impl<E> Tensor<E> {
    /// Wrap a node in a new handle.
    pub fn new(expr: E) -> Self {
        Tensor(Arc::new(expr))
    }

    /// The node behind this handle.
    pub fn expr(&self) -> &E {
        &self.0
    }

    /// Whether two handles share one node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<E> Clone for Tensor<E> {
    fn clone(&self) -> Self {
        Tensor(Arc::clone(&self.0))
    }
}

impl<E: fmt::Debug> fmt::Debug for Tensor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tensor").field(&self.0).finish()
    }
}

impl<E: Operand> Tensor<E> {
    pub fn shape(&self) -> &Shape {
        self.0.shape()
    }

    pub fn ndim(&self) -> usize {
        self.0.ndim()
    }

    pub fn numel(&self) -> usize {
        self.0.numel()
    }

    /// Iterate over the values in row-major order, computing each on demand.
    pub fn iter(&self) -> Elements<'_, E> {
        Elements::new(&*self.0)
    }

    /// Evaluate every element into a row-major vector.
    pub fn to_vec(&self) -> Vec<E::Elem> {
        eval::collect(&*self.0, Traversal::Auto)
    }

    /// Materialize into storage of backend `B`.
    pub fn eval<B: Backend>(&self) -> Result<B::Storage<E::Elem>> {
        B::materialize(&*self.0)
    }

    // === Fallible arithmetic ===

    pub fn try_add<R>(&self, rhs: R) -> Result<OperatorOutput<functor::Add, (Self, R)>>
    where
        (Self, R): OperatorArgs<functor::Add>,
    {
        n_operator(functor::Add, (self.clone(), rhs))
    }

    pub fn try_sub<R>(&self, rhs: R) -> Result<OperatorOutput<functor::Sub, (Self, R)>>
    where
        (Self, R): OperatorArgs<functor::Sub>,
    {
        n_operator(functor::Sub, (self.clone(), rhs))
    }

    pub fn try_mul<R>(&self, rhs: R) -> Result<OperatorOutput<functor::Mul, (Self, R)>>
    where
        (Self, R): OperatorArgs<functor::Mul>,
    {
        n_operator(functor::Mul, (self.clone(), rhs))
    }

    pub fn try_div<R>(&self, rhs: R) -> Result<OperatorOutput<functor::Div, (Self, R)>>
    where
        (Self, R): OperatorArgs<functor::Div>,
    {
        n_operator(functor::Div, (self.clone(), rhs))
    }

    /// Elementwise larger value.
    pub fn maximum<R>(&self, rhs: R) -> Result<OperatorOutput<functor::Maximum, (Self, R)>>
    where
        (Self, R): OperatorArgs<functor::Maximum>,
    {
        n_operator(functor::Maximum, (self.clone(), rhs))
    }

    /// Elementwise smaller value.
    pub fn minimum<R>(&self, rhs: R) -> Result<OperatorOutput<functor::Minimum, (Self, R)>>
    where
        (Self, R): OperatorArgs<functor::Minimum>,
    {
        n_operator(functor::Minimum, (self.clone(), rhs))
    }

    /// Lazily apply a unary function to every element.
    pub fn map<F>(&self, func: F) -> Tensor<Expression<F, (Self,)>>
    where
        F: ElementFn<(E::Elem,)>,
        F::Output: Element,
    {
        // A single tensor operand always broadcasts against itself.
        match Expression::new(func, (self.clone(),)) {
            Ok(expr) => Tensor::new(expr),
            Err(e) => unreachable!("unary expression failed to build: {e}"),
        }
    }
}

impl<E: Operand> Operand for Tensor<E> {
    type Elem = E::Elem;

    type Walker<'a> = E::Walker<'a>
    where
        Self: 'a;

    type Indexer<'a> = E::Indexer<'a>
    where
        Self: 'a;

    fn shape(&self) -> &Shape {
        self.0.shape()
    }

    fn create_walker(&self, max_dim: usize) -> Self::Walker<'_> {
        self.0.create_walker(max_dim)
    }

    fn create_indexer(&self) -> Self::Indexer<'_> {
        self.0.create_indexer()
    }

    fn is_flat(&self) -> bool {
        self.0.is_flat()
    }
}

// === Operator overloads ===
//
// These panic with the error message when shapes do not broadcast; the
// `try_*` methods and `n_operator` report the same error as a `Result`.

macro_rules! binary_overload {
    ($trait:ident, $method:ident, $functor:ident) => {
        impl<E: Operand, R> ops::$trait<R> for Tensor<E>
        where
            (Tensor<E>, R): OperatorArgs<functor::$functor>,
        {
            type Output = OperatorOutput<functor::$functor, (Tensor<E>, R)>;

            fn $method(self, rhs: R) -> Self::Output {
                n_operator(functor::$functor, (self, rhs)).unwrap_or_else(|e| panic!("{e}"))
            }
        }

        impl<E: Operand, R> ops::$trait<R> for &Tensor<E>
        where
            (Tensor<E>, R): OperatorArgs<functor::$functor>,
        {
            type Output = OperatorOutput<functor::$functor, (Tensor<E>, R)>;

            fn $method(self, rhs: R) -> Self::Output {
                n_operator(functor::$functor, (self.clone(), rhs))
                    .unwrap_or_else(|e| panic!("{e}"))
            }
        }
    };
}

binary_overload!(Add, add, Add);
binary_overload!(Sub, sub, Sub);
binary_overload!(Mul, mul, Mul);
binary_overload!(Div, div, Div);
binary_overload!(Rem, rem, Rem);

// `scalar op tensor`
//
// Concrete per primitive: the element type is pinned to the scalar's type, so
// selecting `usize: ops::Div<_>` never has to look through `OperatorArgs`.
macro_rules! scalar_lhs_overload {
    (@op $t:ty, $trait:ident, $method:ident) => {
        impl<E: Operand<Elem = $t>> ops::$trait<Tensor<E>> for $t {
            type Output = Tensor<Expression<BindFirst<functor::$trait, $t>, (Tensor<E>,)>>;

            fn $method(self, rhs: Tensor<E>) -> Self::Output {
                bind_first(functor::$trait, self, rhs)
            }
        }

        impl<E: Operand<Elem = $t>> ops::$trait<&Tensor<E>> for $t {
            type Output = Tensor<Expression<BindFirst<functor::$trait, $t>, (Tensor<E>,)>>;

            fn $method(self, rhs: &Tensor<E>) -> Self::Output {
                bind_first(functor::$trait, self, rhs.clone())
            }
        }
    };
    ($($t:ty),*) => {
        $(
            scalar_lhs_overload!(@op $t, Add, add);
            scalar_lhs_overload!(@op $t, Sub, sub);
            scalar_lhs_overload!(@op $t, Mul, mul);
            scalar_lhs_overload!(@op $t, Div, div);
        )*
    };
}

/// `func(value, x)` over every element of `rhs`.
fn bind_first<F, S, O>(func: F, value: S, rhs: O) -> Tensor<Expression<BindFirst<F, S>, (O,)>>
where
    O: Operand,
    S: Element,
    BindFirst<F, S>: ElementFn<(O::Elem,)>,
    <BindFirst<F, S> as ElementFn<(O::Elem,)>>::Output: Element,
{
    // A single tensor operand always broadcasts against itself.
    match Expression::new(BindFirst::new(func, value), (rhs,)) {
        Ok(expr) => Tensor::new(expr),
        Err(e) => unreachable!("unary expression failed to build: {e}"),
    }
}

scalar_lhs_overload!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<E> ops::Neg for Tensor<E>
where
    E: Operand,
    functor::Neg: ElementFn<(E::Elem,)>,
    <functor::Neg as ElementFn<(E::Elem,)>>::Output: Element,
{
    type Output = Tensor<Expression<functor::Neg, (Tensor<E>,)>>;

    fn neg(self) -> Self::Output {
        self.map(functor::Neg)
    }
}

impl<E> ops::Neg for &Tensor<E>
where
    E: Operand,
    functor::Neg: ElementFn<(E::Elem,)>,
    <functor::Neg as ElementFn<(E::Elem,)>>::Output: Element,
{
    type Output = Tensor<Expression<functor::Neg, (Tensor<E>,)>>;

    fn neg(self) -> Self::Output {
        self.map(functor::Neg)
    }
}
