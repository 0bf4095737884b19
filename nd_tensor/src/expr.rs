//! Expression node: a lazy elementwise function over a tuple of operands.

use std::fmt;

use log::trace;

use crate::error::Result;
use crate::evaluator::{Evaluator, FlatEvaluator};
use crate::func::ElementFn;
use crate::shape::{broadcast_shapes, Descriptor, Shape};
use crate::tensor::{Element, Operand, OperandTuple};

/// Lazy elementwise expression `F(op_1, ..., op_N)`.
///
/// The broadcast shape is resolved once, at construction. Nothing is read
/// from the operands until a walker or indexer created from the node is
/// dereferenced, and no state is kept between traversals.
#[derive(Clone)]
pub struct Expression<F, Ops> {
    func: F,
    operands: Ops,
    descriptor: Descriptor,
    flat: bool,
}

impl<F, Ops> Expression<F, Ops>
where
    Ops: OperandTuple,
    F: ElementFn<Ops::Elems>,
    F::Output: Element,
{
    /// Build a node over `operands`, failing if their shapes do not broadcast.
    pub fn new(func: F, operands: Ops) -> Result<Self> {
        let shape = broadcast_shapes(&operands.shapes())?;
        let flat = operands.all_flat(&shape);
        trace!(
            "expression node: arity {}, shape {}, flat {}",
            Ops::ARITY,
            shape,
            flat
        );
        Ok(Expression {
            func,
            operands,
            descriptor: Descriptor::new(shape),
            flat,
        })
    }
}

impl<F, Ops> Expression<F, Ops> {
    /// Unified shape and its row-major strides.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn func(&self) -> &F {
        &self.func
    }

    pub fn operands(&self) -> &Ops {
        &self.operands
    }
}

impl<F, Ops> Operand for Expression<F, Ops>
where
    Ops: OperandTuple,
    F: ElementFn<Ops::Elems>,
    F::Output: Element,
{
    type Elem = F::Output;

    type Walker<'a> = Evaluator<'a, F, Ops::Walkers<'a>>
    where
        Self: 'a;

    type Indexer<'a> = FlatEvaluator<'a, F, Ops::Indexers<'a>>
    where
        Self: 'a;

    fn shape(&self) -> &Shape {
        self.descriptor.shape()
    }

    fn create_walker(&self, max_dim: usize) -> Self::Walker<'_> {
        debug_assert!(max_dim >= self.descriptor.ndim());
        Evaluator::new(&self.func, self.operands.create_walkers(max_dim))
    }

    fn create_indexer(&self) -> Self::Indexer<'_> {
        FlatEvaluator::new(&self.func, self.operands.create_indexers())
    }

    fn is_flat(&self) -> bool {
        self.flat
    }
}

impl<F, Ops: fmt::Debug> fmt::Debug for Expression<F, Ops> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("shape", self.descriptor.shape())
            .field("operands", &self.operands)
            .finish_non_exhaustive()
    }
}
