//! Scalar operands: binding a scalar into a binary function, and promoting a
//! scalar to a rank-0 operand.

use crate::func::ElementFn;
use crate::shape::Shape;
use crate::tensor::{Element, Operand};
use crate::walker::{ScalarIndexer, ScalarWalker};

/// Explicit scalar argument wrapper.
///
/// Primitive numbers are already recognised as scalars by the operator
/// frontend; this wrapper lets any other [`Element`] type be passed as one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scalar<T>(pub T);

/// `G(x) = F(scalar, x)`.
#[derive(Debug, Clone, Copy)]
pub struct BindFirst<F, S> {
    func: F,
    scalar: S,
}

impl<F, S> BindFirst<F, S> {
    pub fn new(func: F, scalar: S) -> Self {
        BindFirst { func, scalar }
    }

    pub fn scalar(&self) -> &S {
        &self.scalar
    }
}

impl<F, S, X> ElementFn<(X,)> for BindFirst<F, S>
where
    F: ElementFn<(S, X)>,
    S: Copy,
{
    type Output = F::Output;

    #[inline]
    fn apply(&self, (x,): (X,)) -> F::Output {
        self.func.apply((self.scalar, x))
    }
}

/// `G(x) = F(x, scalar)`.
#[derive(Debug, Clone, Copy)]
pub struct BindSecond<F, S> {
    func: F,
    scalar: S,
}

impl<F, S> BindSecond<F, S> {
    pub fn new(func: F, scalar: S) -> Self {
        BindSecond { func, scalar }
    }

    pub fn scalar(&self) -> &S {
        &self.scalar
    }
}

impl<F, S, X> ElementFn<(X,)> for BindSecond<F, S>
where
    F: ElementFn<(X, S)>,
    S: Copy,
{
    type Output = F::Output;

    #[inline]
    fn apply(&self, (x,): (X,)) -> F::Output {
        self.func.apply((x, self.scalar))
    }
}

/// A scalar promoted to a rank-0 operand. It broadcasts against any shape and
/// ignores every motion.
#[derive(Debug, Clone)]
pub struct Degenerate<T> {
    value: T,
    shape: Shape,
}

impl<T: Element> Degenerate<T> {
    pub fn new(value: T) -> Self {
        Degenerate {
            value,
            shape: Shape::scalar(),
        }
    }

    pub fn value(&self) -> T {
        self.value
    }
}

impl<T: Element> Operand for Degenerate<T> {
    type Elem = T;
    type Walker<'a> = ScalarWalker<T>;
    type Indexer<'a> = ScalarIndexer<T>;

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn create_walker(&self, _max_dim: usize) -> ScalarWalker<T> {
        ScalarWalker::new(self.value)
    }

    fn create_indexer(&self) -> ScalarIndexer<T> {
        ScalarIndexer::new(self.value)
    }

    fn is_flat(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functor::{Div, Sub};
    use crate::walker::{Indexer, Motion, Walker};

    #[test]
    fn test_bind_first_keeps_argument_order() {
        let g = BindFirst::new(Sub, 10i32);
        assert_eq!(g.apply((3i32,)), 7);

        let h = BindFirst::new(|a: f64, b: f64| a / b, 1.0);
        assert_eq!(h.apply((4.0,)), 0.25);
    }

    #[test]
    fn test_bind_second_keeps_argument_order() {
        let g = BindSecond::new(Sub, 10i32);
        assert_eq!(g.apply((3i32,)), -7);

        let h = BindSecond::new(Div, 2.0f64);
        assert_eq!(h.apply((5.0f64,)), 2.5);
        assert_eq!(*h.scalar(), 2.0);
    }

    #[test]
    fn test_degenerate_operand() {
        let d = Degenerate::new(3u16);
        assert!(d.shape().is_scalar());
        assert_eq!(d.numel(), 1);
        assert!(d.is_flat());

        let mut w = d.create_walker(3);
        w.walk(2, 5);
        w.reset_back_all();
        assert_eq!(w.value(), 3);
        assert_eq!(d.create_indexer().get(41), 3);
    }
}
