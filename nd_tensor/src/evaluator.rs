//! Composite walker: one function applied over a group of sub-walkers.

use std::fmt;

use crate::func::ElementFn;
use crate::walker::{Indexer, IndexerTuple, Motion, Walker, WalkerTuple};

/// Walker over an expression node.
///
/// Holds one sub-walker per operand. Every motion is forwarded to all of them
/// in operand order; each sub-walker decides for itself whether the motion is
/// a no-op on its own layout. [`Walker::value`] calls the function afresh on
/// every dereference.
pub struct Evaluator<'a, F, W> {
    func: &'a F,
    walkers: W,
}

impl<'a, F, W: WalkerTuple> Evaluator<'a, F, W> {
    pub fn new(func: &'a F, walkers: W) -> Self {
        Evaluator { func, walkers }
    }

    pub fn walkers(&self) -> &W {
        &self.walkers
    }
}

impl<F, W: Motion> Motion for Evaluator<'_, F, W> {
    #[inline]
    fn walk(&mut self, axis: usize, steps: isize) {
        self.walkers.walk(axis, steps);
    }

    #[inline]
    fn step(&mut self, axis: usize) {
        self.walkers.step(axis);
    }

    #[inline]
    fn step_back(&mut self, axis: usize) {
        self.walkers.step_back(axis);
    }

    #[inline]
    fn reset(&mut self, axis: usize) {
        self.walkers.reset(axis);
    }

    #[inline]
    fn reset_back(&mut self, axis: usize) {
        self.walkers.reset_back(axis);
    }

    #[inline]
    fn reset_back_all(&mut self) {
        self.walkers.reset_back_all();
    }

    #[inline]
    fn update_offset(&mut self) {
        self.walkers.update_offset();
    }
}

impl<F, W> Walker for Evaluator<'_, F, W>
where
    W: WalkerTuple,
    F: ElementFn<W::Items>,
{
    type Item = F::Output;

    #[inline]
    fn value(&self) -> F::Output {
        self.func.apply(self.walkers.values())
    }
}

impl<F, W> fmt::Debug for Evaluator<'_, F, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}

/// Flat indexer over an expression node whose operands all share its shape.
pub struct FlatEvaluator<'a, F, I> {
    func: &'a F,
    indexers: I,
}

impl<'a, F, I: IndexerTuple> FlatEvaluator<'a, F, I> {
    pub fn new(func: &'a F, indexers: I) -> Self {
        FlatEvaluator { func, indexers }
    }
}

impl<F, I> Indexer for FlatEvaluator<'_, F, I>
where
    I: IndexerTuple,
    F: ElementFn<I::Items>,
{
    type Item = F::Output;

    #[inline]
    fn get(&self, index: usize) -> F::Output {
        self.func.apply(self.indexers.values_at(index))
    }
}

impl<F, I> fmt::Debug for FlatEvaluator<'_, F, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatEvaluator").finish_non_exhaustive()
    }
}
