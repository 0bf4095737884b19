//! Native walkers over strided CPU storage.

use smallvec::SmallVec;

use nd_tensor::prelude::*;
use nd_tensor::Descriptor;

/// Multi-index and element offset of a walker over one strided view.
///
/// Axes passed in are axes of the traversal (rank `max_dim`); this view's own
/// axes are the last `ndim` of them. Leading axes and axes of extent 1 are
/// degenerate here and motion along them is ignored.
#[derive(Debug, Clone)]
struct Cursor {
    dims: SmallVec<[usize; 6]>,
    strides: SmallVec<[isize; 6]>,
    index: SmallVec<[usize; 6]>,
    pad: usize,
    base: isize,
    offset: isize,
}

impl Cursor {
    fn new(shape: &Shape, strides: &Strides, base: usize, max_dim: usize) -> Self {
        debug_assert!(
            max_dim >= shape.ndim(),
            "walker rank {} is below operand rank {}",
            max_dim,
            shape.ndim()
        );
        Cursor {
            dims: shape.dims().iter().copied().collect(),
            strides: strides.as_slice().iter().copied().collect(),
            index: SmallVec::from_elem(0, shape.ndim()),
            pad: max_dim.saturating_sub(shape.ndim()),
            base: base as isize,
            offset: base as isize,
        }
    }

    /// Own axis behind traversal axis `axis`, if motion along it matters.
    #[inline]
    fn axis(&self, axis: usize) -> Option<usize> {
        let own = axis.checked_sub(self.pad)?;
        match self.dims.get(own) {
            Some(&d) if d > 1 => Some(own),
            _ => None,
        }
    }

    #[inline]
    fn walk(&mut self, axis: usize, steps: isize) {
        if let Some(a) = self.axis(axis) {
            self.index[a] = self.index[a].wrapping_add_signed(steps);
            self.offset += steps * self.strides[a];
        }
    }

    #[inline]
    fn reset(&mut self, axis: usize) {
        if let Some(a) = self.axis(axis) {
            self.offset -= self.index[a] as isize * self.strides[a];
            self.index[a] = 0;
        }
    }

    fn reset_back(&mut self, axis: usize) {
        if let Some(a) = self.axis(axis) {
            let last = self.dims[a] - 1;
            self.offset += (last as isize - self.index[a] as isize) * self.strides[a];
            self.index[a] = last;
        }
    }

    fn reset_back_all(&mut self) {
        for (i, &d) in self.index.iter_mut().zip(self.dims.iter()) {
            *i = d.saturating_sub(1);
        }
        self.update_offset();
    }

    fn update_offset(&mut self) {
        self.offset = self.base
            + self
                .index
                .iter()
                .zip(self.strides.iter())
                .map(|(&i, &s)| i as isize * s)
                .sum::<isize>();
    }

    #[inline]
    fn offset(&self) -> usize {
        self.offset as usize
    }
}

macro_rules! forward_motion {
    ($name:ident) => {
        impl<T> Motion for $name<'_, T> {
            #[inline]
            fn walk(&mut self, axis: usize, steps: isize) {
                self.cursor.walk(axis, steps);
            }

            #[inline]
            fn reset(&mut self, axis: usize) {
                self.cursor.reset(axis);
            }

            fn reset_back(&mut self, axis: usize) {
                self.cursor.reset_back(axis);
            }

            fn reset_back_all(&mut self) {
                self.cursor.reset_back_all();
            }

            fn update_offset(&mut self) {
                self.cursor.update_offset();
            }
        }
    };
}

/// Read walker over a strided view.
#[derive(Debug, Clone)]
pub struct StridedWalker<'a, T> {
    data: &'a [T],
    cursor: Cursor,
}

impl<'a, T> StridedWalker<'a, T> {
    pub fn new(data: &'a [T], shape: &Shape, strides: &Strides, offset: usize, max_dim: usize) -> Self {
        StridedWalker {
            data,
            cursor: Cursor::new(shape, strides, offset, max_dim),
        }
    }

    /// Element offset of the current position in the buffer.
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }
}

forward_motion!(StridedWalker);

impl<T: Copy> Walker for StridedWalker<'_, T> {
    type Item = T;

    #[inline]
    fn value(&self) -> T {
        self.data[self.cursor.offset()]
    }
}

/// Write walker over a strided view.
#[derive(Debug)]
pub struct StridedWalkerMut<'a, T> {
    data: &'a mut [T],
    cursor: Cursor,
}

impl<'a, T> StridedWalkerMut<'a, T> {
    pub fn new(
        data: &'a mut [T],
        shape: &Shape,
        strides: &Strides,
        offset: usize,
        max_dim: usize,
    ) -> Self {
        StridedWalkerMut {
            data,
            cursor: Cursor::new(shape, strides, offset, max_dim),
        }
    }
}

forward_motion!(StridedWalkerMut);

impl<T> WalkerMut for StridedWalkerMut<'_, T> {
    type Item = T;

    #[inline]
    fn value_mut(&mut self) -> &mut T {
        &mut self.data[self.cursor.offset()]
    }
}

/// Flat row-major access to a strided view.
#[derive(Debug, Clone)]
pub struct StridedIndexer<'a, T> {
    data: &'a [T],
    base: usize,
    layout: Option<(Descriptor, Strides)>,
}

impl<'a, T> StridedIndexer<'a, T> {
    /// Direct indexer over a contiguous run starting at `base`.
    pub fn contiguous(data: &'a [T], base: usize) -> Self {
        StridedIndexer {
            data,
            base,
            layout: None,
        }
    }

    /// Indexer that unravels each flat position through `shape`.
    pub fn strided(data: &'a [T], shape: &Shape, strides: &Strides, base: usize) -> Self {
        StridedIndexer {
            data,
            base,
            layout: Some((Descriptor::new(shape.clone()), strides.clone())),
        }
    }
}

impl<T: Copy> Indexer for StridedIndexer<'_, T> {
    type Item = T;

    #[inline]
    fn get(&self, index: usize) -> T {
        match &self.layout {
            None => self.data[self.base + index],
            Some((descriptor, strides)) => {
                let mut multi: SmallVec<[usize; 6]> = SmallVec::from_elem(0, descriptor.ndim());
                descriptor.unravel_into(index, &mut multi);
                let offset = self.base as isize + strides.index(&multi);
                self.data[offset as usize]
            }
        }
    }
}
