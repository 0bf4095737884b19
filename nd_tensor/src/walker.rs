//! Walker capability - per-operand cursors over a (possibly broadcast) index space.
//!
//! A walker sits at a multi-index of the *unified* shape of the expression it
//! was created for. Axis numbers passed to [`Motion`] methods are axes of that
//! unified shape; an operand whose own shape is degenerate (extent 1, or a
//! leading axis it does not have) on an axis ignores motion along it. That is
//! the whole broadcasting mechanism: nothing is ever replicated.
//!
//! Walkers never bounds-check. Keeping every position inside the valid index
//! space is the job of whoever drives the traversal (see [`crate::eval`]).

/// Cursor motion shared by every walker kind.
pub trait Motion {
    /// Move `steps` positions along `axis`.
    fn walk(&mut self, axis: usize, steps: isize);

    /// Move one position forward along `axis`.
    fn step(&mut self, axis: usize) {
        self.walk(axis, 1);
    }

    /// Move one position backward along `axis`.
    fn step_back(&mut self, axis: usize) {
        self.walk(axis, -1);
    }

    /// Rewind `axis` to its first position, leaving other axes untouched.
    fn reset(&mut self, axis: usize);

    /// Move `axis` to its last position, leaving other axes untouched.
    fn reset_back(&mut self, axis: usize);

    /// Move to the last valid multi-index.
    fn reset_back_all(&mut self);

    /// Recompute any lazily maintained position state. Idempotent.
    fn update_offset(&mut self) {}
}

/// A walker that yields values.
pub trait Walker: Motion {
    type Item;

    /// Value at the current position, computed on every call.
    fn value(&self) -> Self::Item;
}

/// A walker over writable storage, used for assignment destinations.
pub trait WalkerMut: Motion {
    type Item;

    fn value_mut(&mut self) -> &mut Self::Item;
}

/// Flat, row-major element access for operands whose shape already matches
/// the traversal shape.
pub trait Indexer {
    type Item;

    fn get(&self, index: usize) -> Self::Item;
}

/// Walker over a rank-0 operand. Every axis is degenerate, so motion is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct ScalarWalker<T> {
    value: T,
}

impl<T> ScalarWalker<T> {
    pub fn new(value: T) -> Self {
        ScalarWalker { value }
    }
}

impl<T> Motion for ScalarWalker<T> {
    fn walk(&mut self, _axis: usize, _steps: isize) {}

    fn reset(&mut self, _axis: usize) {}

    fn reset_back(&mut self, _axis: usize) {}

    fn reset_back_all(&mut self) {}
}

impl<T: Copy> Walker for ScalarWalker<T> {
    type Item = T;

    fn value(&self) -> T {
        self.value
    }
}

/// Indexer over a rank-0 operand.
#[derive(Debug, Clone, Copy)]
pub struct ScalarIndexer<T> {
    value: T,
}

impl<T> ScalarIndexer<T> {
    pub fn new(value: T) -> Self {
        ScalarIndexer { value }
    }
}

impl<T: Copy> Indexer for ScalarIndexer<T> {
    type Item = T;

    fn get(&self, _index: usize) -> T {
        self.value
    }
}

/// A fixed group of walkers dereferenced together.
pub trait WalkerTuple: Motion {
    type Items;

    fn values(&self) -> Self::Items;
}

/// A fixed group of indexers read at the same flat position.
pub trait IndexerTuple {
    type Items;

    fn values_at(&self, index: usize) -> Self::Items;
}

// Tuples forward each motion call to every member, in member order, without
// short-circuiting. Each member decides on its own whether the call is a no-op.
macro_rules! impl_walker_tuples {
    ($($w:ident : $idx:tt),+) => {
        impl<$($w: Motion),+> Motion for ($($w,)+) {
            fn walk(&mut self, axis: usize, steps: isize) {
                $(self.$idx.walk(axis, steps);)+
            }

            fn step(&mut self, axis: usize) {
                $(self.$idx.step(axis);)+
            }

            fn step_back(&mut self, axis: usize) {
                $(self.$idx.step_back(axis);)+
            }

            fn reset(&mut self, axis: usize) {
                $(self.$idx.reset(axis);)+
            }

            fn reset_back(&mut self, axis: usize) {
                $(self.$idx.reset_back(axis);)+
            }

            fn reset_back_all(&mut self) {
                $(self.$idx.reset_back_all();)+
            }

            fn update_offset(&mut self) {
                $(self.$idx.update_offset();)+
            }
        }

        impl<$($w: Walker),+> WalkerTuple for ($($w,)+) {
            type Items = ($($w::Item,)+);

            fn values(&self) -> Self::Items {
                ($(self.$idx.value(),)+)
            }
        }

        impl<$($w: Indexer),+> IndexerTuple for ($($w,)+) {
            type Items = ($($w::Item,)+);

            fn values_at(&self, index: usize) -> Self::Items {
                ($(self.$idx.get(index),)+)
            }
        }
    };
}

impl_walker_tuples!(W0: 0);
impl_walker_tuples!(W0: 0, W1: 1);
impl_walker_tuples!(W0: 0, W1: 1, W2: 2);
impl_walker_tuples!(W0: 0, W1: 1, W2: 2, W3: 3);
impl_walker_tuples!(W0: 0, W1: 1, W2: 2, W3: 3, W4: 4);
impl_walker_tuples!(W0: 0, W1: 1, W2: 2, W3: 3, W4: 4, W5: 5);
