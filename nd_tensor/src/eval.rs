//! Traversal drivers: row-major odometer, iteration, materialization and
//! assignment.
//!
//! This is the only place that bounds walker motion to the valid index space.

use std::iter::FusedIterator;

use log::debug;
use smallvec::SmallVec;

use crate::func::AssignFn;
use crate::shape::Shape;
use crate::tensor::{AssignTarget, Operand};
use crate::walker::{Indexer, Motion, Walker, WalkerMut};

/// Traversal strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Traversal {
    /// Use flat indexers whenever every operand already has the result shape,
    /// walkers otherwise.
    #[default]
    Auto,
    /// Always walk, even when a flat path is available.
    Walker,
}

/// Row-major multi-index counter that drives a walker through a shape.
///
/// Starting from the all-zero index, [`Odometer::advance`] steps the last axis
/// and, when an axis wraps, resets it and carries into the axis before it.
#[derive(Debug, Clone)]
pub struct Odometer {
    dims: SmallVec<[usize; 6]>,
    index: SmallVec<[usize; 6]>,
    done: bool,
}

impl Odometer {
    pub fn new(shape: &Shape) -> Self {
        Odometer {
            dims: shape.dims().iter().copied().collect(),
            index: SmallVec::from_elem(0, shape.ndim()),
            done: shape.numel() == 0,
        }
    }

    /// Current multi-index.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Whether the traversal is exhausted.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Move to the next position, applying the same motion to `walker`.
    /// Returns `false` once every position has been visited.
    pub fn advance<M: Motion + ?Sized>(&mut self, walker: &mut M) -> bool {
        if self.done {
            return false;
        }
        for axis in (0..self.dims.len()).rev() {
            if self.index[axis] + 1 < self.dims[axis] {
                self.index[axis] += 1;
                walker.step(axis);
                return true;
            }
            self.index[axis] = 0;
            walker.reset(axis);
        }
        self.done = true;
        false
    }
}

/// Call `sink` with every value of `operand`, in row-major order.
pub fn for_each<E, S>(operand: &E, traversal: Traversal, mut sink: S)
where
    E: Operand + ?Sized,
    S: FnMut(E::Elem),
{
    let numel = operand.numel();
    if numel == 0 {
        return;
    }

    if traversal == Traversal::Auto && operand.is_flat() {
        debug!("flat traversal over {} elements", numel);
        let indexer = operand.create_indexer();
        for i in 0..numel {
            sink(indexer.get(i));
        }
        return;
    }

    debug!("walker traversal over shape {}", operand.shape());
    let mut odometer = Odometer::new(operand.shape());
    let mut walker = operand.create_walker(operand.ndim());
    loop {
        sink(walker.value());
        if !odometer.advance(&mut walker) {
            break;
        }
    }
}

/// Evaluate `operand` into a row-major vector.
pub fn collect<E>(operand: &E, traversal: Traversal) -> Vec<E::Elem>
where
    E: Operand + ?Sized,
{
    let mut out = Vec::with_capacity(operand.numel());
    for_each(operand, traversal, |v| out.push(v));
    out
}

/// Apply `func(&mut dest[i], rhs[i])` at every position of `dest`.
///
/// `rhs` must broadcast to exactly `dest`'s shape; the frontend checks this.
pub fn assign<F, D, R>(traversal: Traversal, func: &F, dest: &mut D, rhs: &R)
where
    D: AssignTarget + ?Sized,
    R: Operand + ?Sized,
    F: AssignFn<D::Elem, R::Elem>,
{
    let shape = dest.shape().clone();
    let numel = shape.numel();
    if numel == 0 {
        return;
    }

    if traversal == Traversal::Auto && rhs.is_flat() && rhs.shape() == &shape {
        let indexer = rhs.create_indexer();
        if let Some(slice) = dest.as_flat_mut() {
            debug!("flat assignment over {} elements", numel);
            for (i, slot) in slice.iter_mut().enumerate() {
                func.assign(slot, indexer.get(i));
            }
            return;
        }
    }

    debug!("walker assignment over shape {}", shape);
    let ndim = shape.ndim();
    let mut odometer = Odometer::new(&shape);
    let mut walkers = (dest.create_walker_mut(ndim), rhs.create_walker(ndim));
    loop {
        func.assign(walkers.0.value_mut(), walkers.1.value());
        if !odometer.advance(&mut walkers) {
            break;
        }
    }
}

/// Iterator over an operand's values in row-major order. Each value is
/// computed when the iterator reaches it.
pub struct Elements<'a, E: Operand + ?Sized + 'a> {
    walker: E::Walker<'a>,
    odometer: Odometer,
    remaining: usize,
}

impl<'a, E: Operand + ?Sized + 'a> Elements<'a, E> {
    pub fn new(operand: &'a E) -> Self {
        Elements {
            walker: operand.create_walker(operand.ndim()),
            odometer: Odometer::new(operand.shape()),
            remaining: operand.numel(),
        }
    }
}

impl<'a, E: Operand + ?Sized + 'a> Iterator for Elements<'a, E> {
    type Item = E::Elem;

    fn next(&mut self) -> Option<E::Elem> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.walker.value();
        self.remaining -= 1;
        if self.remaining > 0 {
            self.odometer.advance(&mut self.walker);
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, E: Operand + ?Sized + 'a> ExactSizeIterator for Elements<'a, E> {}

impl<'a, E: Operand + ?Sized + 'a> FusedIterator for Elements<'a, E> {}
