//! Shape, stride and descriptor utilities, and the broadcast shape resolver.

use std::fmt;

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};

/// A tensor shape (dimensions).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape(pub Vec<usize>);

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// Create a scalar shape (0-dimensional).
    pub fn scalar() -> Self {
        Shape(vec![])
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Get dimension at index.
    pub fn dim(&self, idx: usize) -> usize {
        self.0[idx]
    }

    /// Get dimensions as slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements. Zero if any extent is zero, one for a scalar.
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Check if this is a scalar (0-dim tensor).
    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the shape holds no elements.
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// Extent of `axis` once this shape is right-aligned to `ndim` dimensions.
    /// Leading padding axes report 1.
    pub fn aligned_dim(&self, axis: usize, ndim: usize) -> usize {
        let pad = ndim - self.ndim();
        if axis < pad {
            1
        } else {
            self.0[axis - pad]
        }
    }

    /// Compute row-major (C-contiguous) strides for this shape.
    pub fn contiguous_strides(&self) -> Strides {
        let ndim = self.0.len();
        if ndim == 0 {
            return Strides(vec![]);
        }

        let mut strides = vec![1isize; ndim];
        for i in (0..ndim - 1).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1] as isize;
        }
        Strides(strides)
    }

    /// Broadcast this shape against another.
    pub fn broadcast_with(&self, other: &Shape) -> Result<Shape> {
        broadcast_shapes(&[self, other])
    }

    /// Axes that were broadcast when going from this shape to `broadcast_shape`:
    /// leading axes missing here, plus axes of extent 1 that were expanded.
    pub fn broadcast_axes_in(&self, broadcast_shape: &Shape) -> Vec<usize> {
        let offset = broadcast_shape.ndim() - self.ndim();
        let mut axes: Vec<usize> = (0..offset).collect();
        for i in 0..self.ndim() {
            if self.0[i] == 1 && broadcast_shape.0[offset + i] != 1 {
                axes.push(offset + i);
            }
        }
        axes
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(a: [usize; N]) -> Self {
        Shape(a.to_vec())
    }
}

/// Tensor strides in elements. Signed so views can step backwards, and zero
/// for axes expanded by broadcasting.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Strides(pub Vec<isize>);

impl Strides {
    pub fn new(strides: Vec<isize>) -> Self {
        Strides(strides)
    }

    pub fn as_slice(&self) -> &[isize] {
        &self.0
    }

    /// Compute the element offset of a multi-dimensional index.
    pub fn index(&self, indices: &[usize]) -> isize {
        debug_assert_eq!(self.0.len(), indices.len());
        self.0
            .iter()
            .zip(indices.iter())
            .map(|(s, &i)| s * i as isize)
            .sum()
    }
}

/// Unified shape of an expression plus the row-major strides that divide a
/// flat position back into a multi-index.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Descriptor {
    shape: Shape,
    strides: Strides,
}

impl Descriptor {
    pub fn new(shape: Shape) -> Self {
        let strides = shape.contiguous_strides();
        Descriptor { shape, strides }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Split a flat row-major position into `index`. `flat` must be below
    /// `numel()`.
    pub fn unravel_into(&self, mut flat: usize, index: &mut [usize]) {
        debug_assert_eq!(index.len(), self.ndim());
        for (slot, &stride) in index.iter_mut().zip(self.strides.0.iter()) {
            let stride = stride as usize;
            *slot = flat / stride;
            flat %= stride;
        }
    }
}

/// Resolve the common broadcast shape of any number of operand shapes.
///
/// Shapes are right-aligned and padded with leading 1s. On each axis the
/// distinct extents other than 1 must number at most one; that extent (or 1)
/// becomes the unified extent. A zero extent broadcasts only against 1.
/// The result, and the reported failure, do not depend on operand order.
pub fn broadcast_shapes(shapes: &[&Shape]) -> Result<Shape> {
    let ndim = shapes.iter().map(|s| s.ndim()).max().unwrap_or(0);
    let mut dims = Vec::with_capacity(ndim);

    for axis in 0..ndim {
        let mut extent: Option<usize> = None;
        let mut conflict = false;
        for shape in shapes {
            let d = shape.aligned_dim(axis, ndim);
            if d == 1 {
                continue;
            }
            match extent {
                None => extent = Some(d),
                Some(e) if e == d => {}
                Some(_) => conflict = true,
            }
        }

        if conflict {
            let mut extents: Vec<usize> = shapes
                .iter()
                .map(|s| s.aligned_dim(axis, ndim))
                .filter(|&d| d != 1)
                .collect();
            extents.sort_unstable();
            extents.dedup();
            debug!("broadcast failed at axis {axis}: extents {extents:?}");
            return Err(TensorError::Broadcast {
                axis,
                extents,
                shapes: shapes.iter().map(|&s| s.clone()).collect(),
            });
        }
        dims.push(extent.unwrap_or(1));
    }

    Ok(Shape(dims))
}
