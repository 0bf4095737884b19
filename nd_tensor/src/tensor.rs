//! Operand capability - what every expression operand (storage, view, or
//! nested expression) provides to the engine.

use std::fmt;

use smallvec::SmallVec;

use crate::shape::Shape;
use crate::walker::{Indexer, IndexerTuple, Walker, WalkerMut, WalkerTuple};

/// Element types an operand can yield.
pub trait Element: Copy + fmt::Debug + 'static {}

impl<T: Copy + fmt::Debug + 'static> Element for T {}

/// Core trait for anything that can take part in an elementwise expression.
///
/// The method set mirrors what expressions themselves expose, which is what
/// lets expressions nest inside expressions to any depth.
pub trait Operand {
    /// Element type produced at each position.
    type Elem: Element;

    /// Cursor over this operand, aligned to an outer traversal rank.
    type Walker<'a>: Walker<Item = Self::Elem>
    where
        Self: 'a;

    /// Flat row-major access, valid when [`Operand::is_flat`] holds.
    type Indexer<'a>: Indexer<Item = Self::Elem>
    where
        Self: 'a;

    /// Shape of this operand.
    fn shape(&self) -> &Shape;

    /// Create a walker positioned at the first element of a traversal of rank
    /// `max_dim`. The operand's own axes are right-aligned inside the
    /// `max_dim` axes; the leading axes it lacks are degenerate.
    /// `max_dim` must be at least `self.ndim()`.
    fn create_walker(&self, max_dim: usize) -> Self::Walker<'_>;

    /// Create a flat indexer over this operand's own shape.
    fn create_indexer(&self) -> Self::Indexer<'_>;

    /// Whether [`Operand::create_indexer`] gives O(1) flat access that agrees
    /// with walker traversal over this operand's own shape.
    fn is_flat(&self) -> bool;

    /// Get number of dimensions.
    fn ndim(&self) -> usize {
        self.shape().ndim()
    }

    /// Get number of elements.
    fn numel(&self) -> usize {
        self.shape().numel()
    }
}

/// Writable storage that can be the destination of an assignment.
pub trait AssignTarget: Operand {
    type WalkerMut<'a>: WalkerMut<Item = Self::Elem>
    where
        Self: 'a;

    /// Create a mutable walker aligned to a traversal of rank `max_dim`.
    fn create_walker_mut(&mut self, max_dim: usize) -> Self::WalkerMut<'_>;

    /// Elements in row-major order as one mutable slice, when the layout
    /// allows it.
    fn as_flat_mut(&mut self) -> Option<&mut [Self::Elem]>;
}

/// A fixed group of operands: the children of one expression node.
pub trait OperandTuple {
    /// Tuple of the operands' element types.
    type Elems;

    type Walkers<'a>: WalkerTuple<Items = Self::Elems>
    where
        Self: 'a;

    type Indexers<'a>: IndexerTuple<Items = Self::Elems>
    where
        Self: 'a;

    const ARITY: usize;

    fn shapes(&self) -> SmallVec<[&Shape; 6]>;

    /// Whether every operand is flat and already has `shape`.
    fn all_flat(&self, shape: &Shape) -> bool;

    fn create_walkers(&self, max_dim: usize) -> Self::Walkers<'_>;

    fn create_indexers(&self) -> Self::Indexers<'_>;
}

macro_rules! impl_operand_tuple {
    ($arity:expr; $($op:ident : $idx:tt),+) => {
        impl<$($op: Operand),+> OperandTuple for ($($op,)+) {
            type Elems = ($($op::Elem,)+);

            type Walkers<'a> = ($($op::Walker<'a>,)+)
            where
                Self: 'a;

            type Indexers<'a> = ($($op::Indexer<'a>,)+)
            where
                Self: 'a;

            const ARITY: usize = $arity;

            fn shapes(&self) -> SmallVec<[&Shape; 6]> {
                let mut shapes = SmallVec::new();
                $(shapes.push(self.$idx.shape());)+
                shapes
            }

            fn all_flat(&self, shape: &Shape) -> bool {
                true $(&& self.$idx.is_flat() && self.$idx.shape() == shape)+
            }

            fn create_walkers(&self, max_dim: usize) -> Self::Walkers<'_> {
                ($(self.$idx.create_walker(max_dim),)+)
            }

            fn create_indexers(&self) -> Self::Indexers<'_> {
                ($(self.$idx.create_indexer(),)+)
            }
        }
    };
}

impl_operand_tuple!(1; A0: 0);
impl_operand_tuple!(2; A0: 0, A1: 1);
impl_operand_tuple!(3; A0: 0, A1: 1, A2: 2);
impl_operand_tuple!(4; A0: 0, A1: 1, A2: 2, A3: 3);
impl_operand_tuple!(5; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
impl_operand_tuple!(6; A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);
