//! Strided CPU storage and backends for nd_tensor expressions.

use std::fmt;
use std::ops;
use std::sync::Arc;

use log::debug;
use nd_tensor::eval::{self, Elements};
use nd_tensor::frontend::{ElemOf, OperatorArgs, OperatorOutput, TensorKind};
use nd_tensor::prelude::*;
use nd_tensor::BindFirst;

mod walker;

pub use walker::{StridedIndexer, StridedWalker, StridedWalkerMut};

/// CPU tensor storage.
///
/// A strided view over a reference-counted buffer. Views created by
/// [`CpuTensor::transpose`], [`CpuTensor::slice_axis`], [`CpuTensor::reshape`]
/// and [`CpuTensor::broadcast_to`] share the buffer with their source for
/// reading. Writing into a handle whose buffer is still shared copies the
/// buffer first, so other handles keep their values.
///
/// To write into a region of a tensor in place, borrow it through
/// [`CpuTensor::view_mut`], [`CpuTensor::slice_axis_mut`] or
/// [`CpuTensor::transpose_mut`].
#[derive(Clone)]
pub struct CpuTensor<T> {
    data: Arc<Vec<T>>,
    shape: Shape,
    strides: Strides,
    offset: usize,
}

impl<T: Element> CpuTensor<T> {
    /// Create a tensor from row-major data and shape.
    pub fn from_vec(data: Vec<T>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::DataLength {
                len: data.len(),
                expected: shape.numel(),
                shape,
            });
        }
        Ok(Self::contiguous(data, shape))
    }

    /// Create a tensor filled with a constant value.
    pub fn full(shape: &Shape, value: T) -> Self {
        Self::contiguous(vec![value; shape.numel()], shape.clone())
    }

    /// Create a scalar (0-dim) tensor.
    pub fn scalar(value: T) -> Self {
        Self::contiguous(vec![value], Shape::scalar())
    }

    /// Evaluate any operand into a new contiguous tensor.
    pub fn from_expr<E>(operand: &E) -> Self
    where
        E: Operand<Elem = T> + ?Sized,
    {
        Self::from_expr_with(operand, Traversal::Auto)
    }

    /// [`CpuTensor::from_expr`] with an explicit traversal strategy.
    pub fn from_expr_with<E>(operand: &E, traversal: Traversal) -> Self
    where
        E: Operand<Elem = T> + ?Sized,
    {
        Self::contiguous(eval::collect(operand, traversal), operand.shape().clone())
    }

    fn contiguous(data: Vec<T>, shape: Shape) -> Self {
        let strides = shape.contiguous_strides();
        CpuTensor {
            data: Arc::new(data),
            shape,
            strides,
            offset: 0,
        }
    }

    // === Accessors ===

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    /// Position of the first element in the underlying buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Whether the elements occupy one row-major run of the buffer.
    /// Strides of extent-1 axes are ignored.
    pub fn is_contiguous(&self) -> bool {
        is_row_major(&self.shape, &self.strides)
    }

    /// Elements as one slice, when contiguous.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.is_contiguous()
            .then(|| &self.data[self.offset..self.offset + self.numel()])
    }

    /// Element at a multi-index, or `None` if the index is out of range.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.ndim() || index.iter().zip(self.shape.dims()).any(|(&i, &d)| i >= d) {
            return None;
        }
        let offset = self.offset as isize + self.strides.index(index);
        self.data.get(offset as usize).copied()
    }

    /// Elements in logical row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        eval::collect(self, Traversal::Auto)
    }

    /// Iterate over the elements in logical row-major order.
    pub fn iter(&self) -> Elements<'_, Self> {
        Elements::new(self)
    }

    /// Number of handles sharing this tensor's buffer.
    pub fn buffer_refs(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Whether two tensors share one buffer.
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    // === Views ===

    /// Permute axes. `None` reverses them.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<Self> {
        let (shape, strides) = permuted(&self.shape, &self.strides, axes)?;
        Ok(self.view(shape, strides, self.offset))
    }

    /// Select `start..end` with `step` along one axis.
    pub fn slice_axis(&self, axis: usize, start: usize, end: usize, step: usize) -> Result<Self> {
        let (shape, strides, offset) =
            sliced(&self.shape, &self.strides, self.offset, axis, start, end, step)?;
        Ok(self.view(shape, strides, offset))
    }

    /// View with a new shape of the same size. Only contiguous tensors can be
    /// reshaped without copying.
    pub fn reshape(&self, shape: &Shape) -> Result<Self> {
        if shape.numel() != self.numel() {
            return Err(TensorError::ReshapeSize {
                from: self.shape.clone(),
                to: shape.clone(),
            });
        }
        if !self.is_contiguous() {
            return Err(TensorError::NotContiguous {
                from: self.shape.clone(),
                to: shape.clone(),
            });
        }
        Ok(self.view(shape.clone(), shape.contiguous_strides(), self.offset))
    }

    /// Expand to a larger shape through zero strides.
    ///
    /// Expanded axes alias one element each, so assigning into the result
    /// writes the same location repeatedly. Materialize it first to get an
    /// independent destination.
    pub fn broadcast_to(&self, shape: &Shape) -> Result<Self> {
        let unified = self.shape.broadcast_with(shape)?;
        if &unified != shape {
            return Err(TensorError::BroadcastTo {
                from: self.shape.clone(),
                to: shape.clone(),
            });
        }

        let pad = shape.ndim() - self.ndim();
        let mut strides = vec![0isize; pad];
        strides.extend_from_slice(self.strides.as_slice());
        for axis in self.shape.broadcast_axes_in(shape) {
            strides[axis] = 0;
        }
        Ok(self.view(shape.clone(), Strides::new(strides), self.offset))
    }

    fn view(&self, shape: Shape, strides: Strides, offset: usize) -> Self {
        CpuTensor {
            data: Arc::clone(&self.data),
            shape,
            strides,
            offset,
        }
    }

    // === Mutable views ===

    /// Borrow the whole tensor as a writable view.
    pub fn view_mut(&mut self) -> CpuViewMut<'_, T> {
        let (shape, strides, offset) = (self.shape.clone(), self.strides.clone(), self.offset);
        CpuViewMut {
            data: make_unique(&mut self.data),
            shape,
            strides,
            offset,
        }
    }

    /// Writable counterpart of [`CpuTensor::slice_axis`].
    pub fn slice_axis_mut(
        &mut self,
        axis: usize,
        start: usize,
        end: usize,
        step: usize,
    ) -> Result<CpuViewMut<'_, T>> {
        self.view_mut().slice_axis(axis, start, end, step)
    }

    /// Writable counterpart of [`CpuTensor::transpose`].
    pub fn transpose_mut(&mut self, axes: Option<&[usize]>) -> Result<CpuViewMut<'_, T>> {
        self.view_mut().transpose(axes)
    }
}

/// Writable strided view into a [`CpuTensor`].
///
/// Holds the parent's buffer exclusively for its lifetime, so assignment
/// through the view writes the parent's elements at the viewed positions.
pub struct CpuViewMut<'a, T> {
    data: &'a mut [T],
    shape: Shape,
    strides: Strides,
    offset: usize,
}

impl<T: Element> CpuViewMut<'_, T> {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_contiguous(&self) -> bool {
        is_row_major(&self.shape, &self.strides)
    }

    pub fn to_vec(&self) -> Vec<T> {
        eval::collect(self, Traversal::Auto)
    }

    /// Narrow the view along one axis.
    pub fn slice_axis(self, axis: usize, start: usize, end: usize, step: usize) -> Result<Self> {
        let (shape, strides, offset) =
            sliced(&self.shape, &self.strides, self.offset, axis, start, end, step)?;
        Ok(CpuViewMut {
            data: self.data,
            shape,
            strides,
            offset,
        })
    }

    /// Permute the view's axes. `None` reverses them.
    pub fn transpose(self, axes: Option<&[usize]>) -> Result<Self> {
        let (shape, strides) = permuted(&self.shape, &self.strides, axes)?;
        Ok(CpuViewMut {
            data: self.data,
            shape,
            strides,
            offset: self.offset,
        })
    }
}

impl<T: Element> fmt::Debug for CpuViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuViewMut")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("data", &self.to_vec())
            .finish()
    }
}

// === Layout helpers shared by owned tensors and mutable views ===

/// Whether the elements occupy one row-major run of the buffer.
/// Strides of extent-1 axes are ignored.
fn is_row_major(shape: &Shape, strides: &Strides) -> bool {
    let mut expected = 1isize;
    for (&d, &s) in shape.dims().iter().zip(strides.as_slice()).rev() {
        if d == 1 {
            continue;
        }
        if s != expected {
            return false;
        }
        expected *= d as isize;
    }
    true
}

fn permuted(shape: &Shape, strides: &Strides, axes: Option<&[usize]>) -> Result<(Shape, Strides)> {
    let ndim = shape.ndim();
    let perm: Vec<usize> = match axes {
        Some(a) => a.to_vec(),
        None => (0..ndim).rev().collect(),
    };

    let mut seen = vec![false; ndim];
    let valid = perm.len() == ndim
        && perm
            .iter()
            .all(|&a| a < ndim && !std::mem::replace(&mut seen[a], true));
    if !valid {
        return Err(TensorError::InvalidPermutation { axes: perm, ndim });
    }

    Ok((
        Shape::new(perm.iter().map(|&a| shape.dim(a)).collect()),
        Strides::new(perm.iter().map(|&a| strides.0[a]).collect()),
    ))
}

fn sliced(
    shape: &Shape,
    strides: &Strides,
    offset: usize,
    axis: usize,
    start: usize,
    end: usize,
    step: usize,
) -> Result<(Shape, Strides, usize)> {
    let ndim = shape.ndim();
    if axis >= ndim {
        return Err(TensorError::InvalidAxis { axis, ndim });
    }
    let extent = shape.dim(axis);
    if step == 0 || start > end || end > extent {
        return Err(TensorError::InvalidSlice {
            axis,
            start,
            end,
            step,
            extent,
        });
    }

    let span = end - start;
    let mut dims = shape.0.clone();
    dims[axis] = span / step + usize::from(span % step != 0);
    let mut strides = strides.clone();
    let offset = if dims[axis] == 0 {
        offset
    } else {
        (offset as isize + start as isize * strides.0[axis]) as usize
    };
    // With two or more elements `step` is below `extent`; a single element
    // never moves along the axis.
    if dims[axis] > 1 {
        strides.0[axis] *= step as isize;
    }
    Ok((Shape::new(dims), strides, offset))
}

/// Exclusive access to a buffer, copying it first if it is shared.
fn make_unique<T: Clone>(data: &mut Arc<Vec<T>>) -> &mut Vec<T> {
    if Arc::strong_count(data) > 1 {
        debug!("copy-on-write: cloning a shared buffer of {} elements", data.len());
    }
    Arc::make_mut(data)
}

impl<T: Element + num_traits::Zero> CpuTensor<T> {
    pub fn zeros(shape: &Shape) -> Self {
        Self::full(shape, T::zero())
    }
}

impl<T: Element + num_traits::One> CpuTensor<T> {
    pub fn ones(shape: &Shape) -> Self {
        Self::full(shape, T::one())
    }
}

impl<T: Element> fmt::Debug for CpuTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuTensor")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("data", &self.to_vec())
            .finish()
    }
}

impl<T: Element + PartialEq> PartialEq for CpuTensor<T> {
    /// Logical equality: same shape and same elements, whatever the layout.
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.iter().eq(other.iter())
    }
}

impl<T: Element> Operand for CpuTensor<T> {
    type Elem = T;
    type Walker<'a> = StridedWalker<'a, T>;
    type Indexer<'a> = StridedIndexer<'a, T>;

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn create_walker(&self, max_dim: usize) -> StridedWalker<'_, T> {
        StridedWalker::new(&self.data, &self.shape, &self.strides, self.offset, max_dim)
    }

    fn create_indexer(&self) -> StridedIndexer<'_, T> {
        if self.is_contiguous() {
            StridedIndexer::contiguous(&self.data, self.offset)
        } else {
            StridedIndexer::strided(&self.data, &self.shape, &self.strides, self.offset)
        }
    }

    fn is_flat(&self) -> bool {
        self.is_contiguous()
    }
}

impl<T: Element> AssignTarget for CpuTensor<T> {
    type WalkerMut<'a> = StridedWalkerMut<'a, T>;

    fn create_walker_mut(&mut self, max_dim: usize) -> StridedWalkerMut<'_, T> {
        StridedWalkerMut::new(
            make_unique(&mut self.data),
            &self.shape,
            &self.strides,
            self.offset,
            max_dim,
        )
    }

    fn as_flat_mut(&mut self) -> Option<&mut [T]> {
        if !self.is_contiguous() {
            return None;
        }
        let (start, end) = (self.offset, self.offset + self.numel());
        Some(&mut make_unique(&mut self.data)[start..end])
    }
}

impl<T: Element> Operand for CpuViewMut<'_, T> {
    type Elem = T;

    type Walker<'a> = StridedWalker<'a, T>
    where
        Self: 'a;

    type Indexer<'a> = StridedIndexer<'a, T>
    where
        Self: 'a;

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn create_walker(&self, max_dim: usize) -> StridedWalker<'_, T> {
        StridedWalker::new(&*self.data, &self.shape, &self.strides, self.offset, max_dim)
    }

    fn create_indexer(&self) -> StridedIndexer<'_, T> {
        if self.is_contiguous() {
            StridedIndexer::contiguous(&*self.data, self.offset)
        } else {
            StridedIndexer::strided(&*self.data, &self.shape, &self.strides, self.offset)
        }
    }

    fn is_flat(&self) -> bool {
        self.is_contiguous()
    }
}

impl<T: Element> AssignTarget for CpuViewMut<'_, T> {
    type WalkerMut<'a> = StridedWalkerMut<'a, T>
    where
        Self: 'a;

    fn create_walker_mut(&mut self, max_dim: usize) -> StridedWalkerMut<'_, T> {
        StridedWalkerMut::new(&mut *self.data, &self.shape, &self.strides, self.offset, max_dim)
    }

    fn as_flat_mut(&mut self) -> Option<&mut [T]> {
        if !self.is_contiguous() {
            return None;
        }
        let (start, end) = (self.offset, self.offset + self.shape.numel());
        Some(&mut self.data[start..end])
    }
}

impl<T: Element> Argument for CpuTensor<T> {
    type Kind = TensorKind;
    type Operand = CpuTensor<T>;

    fn into_operand(self) -> Self {
        self
    }
}

impl<'v, T: Element> Argument for CpuViewMut<'v, T> {
    type Kind = TensorKind;
    type Operand = Self;

    fn into_operand(self) -> Self {
        self
    }
}

impl<T: Element> Argument for &CpuTensor<T> {
    type Kind = TensorKind;
    type Operand = CpuTensor<T>;

    fn into_operand(self) -> CpuTensor<T> {
        self.clone()
    }
}

// === Operator overloads ===

macro_rules! binary_overload {
    ($trait:ident, $method:ident) => {
        impl<T: Element, R> ops::$trait<R> for CpuTensor<T>
        where
            (CpuTensor<T>, R): OperatorArgs<functor::$trait>,
        {
            type Output = OperatorOutput<functor::$trait, (CpuTensor<T>, R)>;

            fn $method(self, rhs: R) -> Self::Output {
                n_operator(functor::$trait, (self, rhs)).unwrap_or_else(|e| panic!("{e}"))
            }
        }

        impl<T: Element, R> ops::$trait<R> for &CpuTensor<T>
        where
            (CpuTensor<T>, R): OperatorArgs<functor::$trait>,
        {
            type Output = OperatorOutput<functor::$trait, (CpuTensor<T>, R)>;

            fn $method(self, rhs: R) -> Self::Output {
                n_operator(functor::$trait, (self.clone(), rhs)).unwrap_or_else(|e| panic!("{e}"))
            }
        }
    };
}

binary_overload!(Add, add);
binary_overload!(Sub, sub);
binary_overload!(Mul, mul);
binary_overload!(Div, div);

// `scalar op &tensor`, one concrete impl per primitive so that ordinary
// arithmetic on the primitive never has to consider `OperatorArgs`.
macro_rules! scalar_lhs_overload {
    (@op $t:ty, $trait:ident, $method:ident) => {
        impl ops::$trait<&CpuTensor<$t>> for $t {
            type Output = Tensor<Expression<BindFirst<functor::$trait, $t>, (CpuTensor<$t>,)>>;

            fn $method(self, rhs: &CpuTensor<$t>) -> Self::Output {
                match Expression::new(BindFirst::new(functor::$trait, self), (rhs.clone(),)) {
                    Ok(expr) => Tensor::new(expr),
                    Err(e) => unreachable!("unary expression failed to build: {e}"),
                }
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

scalar_lhs_overload!(f32, f64, i32, i64, u32, u64, usize);

macro_rules! assign_overload {
    ($trait:ident, $method:ident) => {
        impl<T: Element, R> ops::$trait<R> for CpuTensor<T>
        where
            R: Argument,
            functor::$trait: AssignFn<T, ElemOf<R>>,
        {
            fn $method(&mut self, rhs: R) {
                if let Err(e) = a_operator(functor::$trait, self, rhs) {
                    panic!("{e}");
                }
            }
        }
    };
}

assign_overload!(AddAssign, add_assign);
assign_overload!(SubAssign, sub_assign);
assign_overload!(MulAssign, mul_assign);
assign_overload!(DivAssign, div_assign);

// === Backends ===

/// CPU backend marker type. Uses the flat path whenever operand layouts allow.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    type Storage<T: Element> = CpuTensor<T>;

    fn from_vec<T: Element>(data: Vec<T>, shape: Shape) -> Result<CpuTensor<T>> {
        CpuTensor::from_vec(data, shape)
    }

    fn full<T: Element>(shape: &Shape, value: T) -> CpuTensor<T> {
        CpuTensor::full(shape, value)
    }
}

/// CPU backend that always traverses through walkers.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuWalkerBackend;

impl Backend for CpuWalkerBackend {
    type Storage<T: Element> = CpuTensor<T>;

    fn from_vec<T: Element>(data: Vec<T>, shape: Shape) -> Result<CpuTensor<T>> {
        CpuTensor::from_vec(data, shape)
    }

    fn full<T: Element>(shape: &Shape, value: T) -> CpuTensor<T> {
        CpuTensor::full(shape, value)
    }

    fn traversal() -> Traversal {
        Traversal::Walker
    }
}
