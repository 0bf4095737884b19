//! End-to-end behaviour of lazy expressions over strided CPU storage.

use std::cell::Cell;

use nd_backend_cpu::{CpuBackend, CpuTensor};
use nd_tensor::prelude::*;
use nd_tensor::{BindSecond, Degenerate, Scalar};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tensor(data: Vec<f64>, dims: Vec<usize>) -> CpuTensor<f64> {
    CpuTensor::from_vec(data, Shape::new(dims)).unwrap()
}

fn range(n: usize, dims: Vec<usize>) -> CpuTensor<f64> {
    tensor((0..n).map(|i| i as f64).collect(), dims)
}

// ============================================================================
// Broadcasting
// ============================================================================

#[test]
fn test_column_plus_row() {
    init();
    let a = tensor(vec![1.0, 2.0, 3.0], vec![3, 1]);
    let b = tensor(vec![10.0, 20.0, 30.0, 40.0], vec![1, 4]);

    let c = n_operator(functor::Add, (&a, &b)).unwrap();
    assert_eq!(c.shape(), &Shape::new(vec![3, 4]));

    let stored = c.eval::<CpuBackend>().unwrap();
    for i in 0..3 {
        for j in 0..4 {
            assert_eq!(
                stored.get(&[i, j]),
                Some(a.get(&[i, 0]).unwrap() + b.get(&[0, j]).unwrap())
            );
        }
    }
}

#[test]
fn test_matrix_plus_trailing_vector() {
    init();
    let a = range(6, vec![2, 3]);
    let b = tensor(vec![100.0, 200.0, 300.0], vec![3]);

    let c = n_operator(functor::Add, (&a, &b)).unwrap();
    assert_eq!(c.shape(), &Shape::new(vec![2, 3]));
    assert_eq!(
        c.to_vec(),
        vec![100.0, 201.0, 302.0, 103.0, 204.0, 305.0]
    );
}

#[test]
fn test_zero_extent_broadcasts_against_one() {
    init();
    let a = tensor(vec![], vec![0, 5]);
    let b = range(5, vec![1, 5]);

    let calls = Cell::new(0);
    let add = |x: f64, y: f64| {
        calls.set(calls.get() + 1);
        x + y
    };
    let c = n_operator(add, (&a, &b)).unwrap();
    assert_eq!(c.shape(), &Shape::new(vec![0, 5]));
    assert_eq!(c.numel(), 0);

    assert_eq!(c.iter().count(), 0);
    assert!(c.to_vec().is_empty());
    assert!(c.eval::<CpuBackend>().unwrap().to_vec().is_empty());
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_incompatible_shapes_fail_at_construction() {
    init();
    let a = range(6, vec![2, 3]);
    let b = range(12, vec![4, 3]);

    let err = n_operator(functor::Add, (&a, &b)).unwrap_err();
    match err {
        TensorError::Broadcast {
            axis,
            extents,
            shapes,
        } => {
            assert_eq!(axis, 0);
            assert_eq!(extents, vec![2, 4]);
            assert_eq!(shapes, vec![Shape::new(vec![2, 3]), Shape::new(vec![4, 3])]);
        }
        other => panic!("expected broadcast error, got {other:?}"),
    }

    let handle = Tensor::new(a.clone());
    assert!(handle.try_add(&b).is_err());
}

#[test]
fn test_wide_fan_in_nests() {
    init();
    let a = range(3, vec![3]);
    let weights = tensor(vec![1.0, 10.0], vec![2, 1]);

    let six = n_operator(
        |u: f64, v: f64, w: f64, x: f64, y: f64, z: f64| u * v + w + x + y + z,
        (&a, &weights, 1.0f64, 2.0f64, Scalar(3.0f64), 4.0f64),
    )
    .unwrap();
    assert_eq!(six.shape(), &Shape::new(vec![2, 3]));
    assert_eq!(six.to_vec(), vec![10.0, 11.0, 12.0, 10.0, 20.0, 30.0]);

    // Seven inputs: fold the first six, then feed the result onward.
    let seven = n_operator(functor::Sub, (&six, &a)).unwrap();
    assert_eq!(seven.to_vec(), vec![10.0, 10.0, 10.0, 10.0, 19.0, 28.0]);
}

#[test]
fn test_many_operands_broadcast_together() {
    init();
    let a = range(2, vec![2, 1, 1]);
    let b = range(3, vec![3, 1]);
    let c = range(4, vec![4]);

    let fma = n_operator(
        |x: f64, y: f64, z: f64, w: f64| x * 100.0 + y * 10.0 + z + w,
        (&a, &b, &c, 0.5),
    )
    .unwrap();
    assert_eq!(fma.shape(), &Shape::new(vec![2, 3, 4]));

    let stored = fma.eval::<CpuBackend>().unwrap();
    assert_eq!(stored.get(&[1, 2, 3]), Some(123.5));
    assert_eq!(stored.get(&[0, 1, 0]), Some(10.5));
}

// ============================================================================
// Composition and laziness
// ============================================================================

#[test]
fn test_nested_expression_without_intermediate_buffer() {
    init();
    let a = range(5, vec![5]);
    let b = tensor(vec![1.0, 1.0, 2.0, 3.0, 5.0], vec![5]);

    let doubled: Tensor<Expression<BindSecond<functor::Mul, f64>, (CpuTensor<f64>,)>> =
        n_operator(functor::Mul, (&a, 2.0)).unwrap();
    assert!(doubled.expr().operands().0.shares_buffer(&a));

    let c = n_operator(functor::Add, (&doubled, &b)).unwrap();
    let expected: Vec<f64> = (0..5)
        .map(|i| a.get(&[i]).unwrap() * 2.0 + b.get(&[i]).unwrap())
        .collect();
    assert_eq!(c.to_vec(), expected);
}

#[test]
fn test_construction_reads_nothing() {
    init();
    // A billion logical elements backed by a single value.
    let big = CpuTensor::scalar(1.5f64)
        .broadcast_to(&Shape::new(vec![1000, 1000, 1000]))
        .unwrap();

    let calls = Cell::new(0);
    let mul = |x: f64, y: f64| {
        calls.set(calls.get() + 1);
        x * y
    };
    let e = n_operator(mul, (&big, &big)).unwrap();
    let nested = n_operator(functor::Sub, (&e, 1.0)).unwrap();
    assert_eq!(nested.numel(), 1_000_000_000);
    assert_eq!(calls.get(), 0);

    let first: Vec<f64> = nested.iter().take(3).collect();
    assert_eq!(first, vec![1.25, 1.25, 1.25]);
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_each_dereference_recomputes() {
    init();
    let a = range(4, vec![4]);
    let calls = Cell::new(0);
    let square = |x: f64| {
        calls.set(calls.get() + 1);
        x * x
    };
    let e = n_operator(square, (&a,)).unwrap();

    assert_eq!(e.to_vec(), vec![0.0, 1.0, 4.0, 9.0]);
    assert_eq!(e.to_vec(), vec![0.0, 1.0, 4.0, 9.0]);
    assert_eq!(calls.get(), 8);
}

#[test]
fn test_scalar_symmetry_for_non_commutative_functions() {
    init();
    let a = tensor(vec![1.0, 2.0, 4.0], vec![3]);

    let right = n_operator(functor::Sub, (&a, 10.0)).unwrap();
    let left = n_operator(functor::Sub, (10.0, &a)).unwrap();
    assert_eq!(right.to_vec(), vec![-9.0, -8.0, -6.0]);
    assert_eq!(left.to_vec(), vec![9.0, 8.0, 6.0]);

    let right = n_operator(functor::Div, (&a, Scalar(2.0))).unwrap();
    let left = n_operator(functor::Div, (Scalar(2.0), &a)).unwrap();
    assert_eq!(right.to_vec(), vec![0.5, 1.0, 2.0]);
    assert_eq!(left.to_vec(), vec![2.0, 1.0, 0.5]);

    // The operator overloads take the same paths.
    assert_eq!((&a - 10.0).to_vec(), vec![-9.0, -8.0, -6.0]);
    assert_eq!((10.0f64 - &a).to_vec(), vec![9.0, 8.0, 6.0]);
}

#[test]
fn test_primitive_arithmetic_beside_tensor_overloads() {
    init();
    let rows = 2usize;
    let cols = rows * 3 / 2 + 1;
    let numel = rows * cols;
    assert_eq!((numel - 1) / cols, rows - 1);

    let a = range(numel, vec![rows, cols]);
    let scale = 0.5 * cols as f64 - 1.0;
    let shifted = 2.0f64 * &a;
    let centered = &shifted - scale * 3.0;
    let expected: Vec<f64> = (0..numel).map(|i| 2.0 * i as f64 - 3.0).collect();
    assert_eq!(centered.to_vec(), expected);
    assert_eq!((12.0f64 / &CpuTensor::scalar(4.0f64)).to_vec(), vec![3.0]);

    let counts = CpuTensor::from_vec((0..cols).collect::<Vec<usize>>(), Shape::new(vec![cols])).unwrap();
    let remaining = rows * cols - &counts;
    assert_eq!(remaining.to_vec(), vec![8, 7, 6, 5]);
}

#[test]
fn test_all_scalar_arguments_are_rejected() {
    init();
    assert_eq!(
        n_operator(functor::Add, (1.0, 2.0)).unwrap_err(),
        TensorError::NoTensorOperand
    );
    assert_eq!(
        n_operator(|a: f64, b: f64, c: f64| a + b + c, (1.0, 2.0, Scalar(3.0))).unwrap_err(),
        TensorError::NoTensorOperand
    );
}

#[test]
fn test_mixed_operands_and_views() {
    init();
    let a = range(6, vec![2, 3]);
    let t = a.transpose(None).unwrap();
    let col = a.slice_axis(1, 0, 1, 1).unwrap();

    // A column slice has a non-unit stride on its only non-degenerate axis.
    let row = col.reshape(&Shape::new(vec![2])).unwrap_err();
    assert!(matches!(row, TensorError::NotContiguous { .. }));

    let e = -(&t + Degenerate::new(1.0));
    assert_eq!(e.to_vec(), vec![-1.0, -4.0, -2.0, -5.0, -3.0, -6.0]);

    let mixed = &e * &t;
    assert_eq!(mixed.to_vec(), vec![-0.0, -12.0, -2.0, -20.0, -6.0, -30.0]);
}

// ============================================================================
// Degenerate axes
// ============================================================================

#[test]
fn test_motion_along_degenerate_axis_is_noop() {
    init();
    let a = tensor(vec![1.0, 2.0, 3.0], vec![3, 1]);
    let e = n_operator(functor::Add, (&a, 0.5f64)).unwrap();

    for k in [-3isize, -1, 1, 2, 7] {
        let mut storage_walker = a.create_walker(2);
        storage_walker.step(0);
        let before = storage_walker.value();
        storage_walker.walk(1, k);
        assert_eq!(storage_walker.value(), before);

        let mut expr_walker = e.create_walker(4);
        expr_walker.step(2);
        let before = expr_walker.value();
        expr_walker.walk(3, k);
        expr_walker.walk(0, k);
        assert_eq!(expr_walker.value(), before);
        assert_eq!(before, 2.5);
    }
}

#[test]
fn test_nested_expression_inside_higher_rank_context() {
    init();
    let v = tensor(vec![1.0, 2.0, 3.0], vec![3]);
    let m = range(6, vec![2, 3]);

    let inner = n_operator(functor::Mul, (&v, 10.0)).unwrap();
    let outer = n_operator(functor::Add, (&m, &inner)).unwrap();
    assert_eq!(
        outer.to_vec(),
        vec![10.0, 21.0, 32.0, 13.0, 24.0, 35.0]
    );
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn test_compound_assignment_returns_destination() {
    init();
    let mut dest = tensor(vec![1.0, 2.0, 3.0], vec![3]);
    let rhs = tensor(vec![10.0, 20.0, 30.0], vec![3]);

    let returned: *const CpuTensor<f64> = a_operator(functor::AddAssign, &mut dest, &rhs).unwrap();
    assert!(std::ptr::eq(returned, &dest));
    assert_eq!(dest.to_vec(), vec![11.0, 22.0, 33.0]);
}

#[test]
fn test_assignment_visits_each_element_once() {
    init();
    let mut dest = range(6, vec![2, 3]);
    let before = dest.clone();
    let rhs = tensor(vec![1.0, 2.0, 3.0], vec![3]);

    let calls = Cell::new(0);
    let add_assign = |d: &mut f64, s: f64| {
        calls.set(calls.get() + 1);
        *d += s;
    };
    a_operator(add_assign, &mut dest, &rhs).unwrap();
    assert_eq!(calls.get(), 6);

    let eager = n_operator(functor::Add, (&before, &rhs)).unwrap().to_vec();
    assert_eq!(dest.to_vec(), eager);
}

#[test]
fn test_assignment_from_expression_reading_destination() {
    init();
    let mut x = tensor(vec![1.0, 2.0, 3.0], vec![3]);
    let scaled = n_operator(|v: f64| v * 3.0 - 1.0, (&x,)).unwrap();

    a_operator(functor::Assign, &mut x, &scaled).unwrap();
    assert_eq!(x.to_vec(), vec![2.0, 5.0, 8.0]);
    // The expression still sees the values it was built over.
    assert_eq!(scaled.to_vec(), vec![2.0, 5.0, 8.0]);
    assert_eq!(scaled.expr().operands().0.to_vec(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_assignment_shape_rules() {
    init();
    let mut dest = range(3, vec![3]);
    let wider = range(6, vec![2, 3]);
    assert_eq!(
        a_operator(functor::Assign, &mut dest, &wider).unwrap_err(),
        TensorError::AssignShape {
            dest: Shape::new(vec![3]),
            rhs: Shape::new(vec![2, 3]),
        }
    );

    let wrong = range(2, vec![2]);
    assert!(matches!(
        a_operator(functor::Assign, &mut dest, &wrong),
        Err(TensorError::Broadcast { .. })
    ));
    assert_eq!(dest.to_vec(), vec![0.0, 1.0, 2.0]);
}

#[test]
fn test_assignment_into_views_and_empty_tensors() {
    init();
    let mut base = range(6, vec![2, 3]);
    let mut t = base.transpose_mut(None).unwrap();
    a_operator(functor::MulAssign, &mut t, tensor(vec![1.0, -1.0], vec![2])).unwrap();
    assert_eq!(t.to_vec(), vec![0.0, -3.0, 1.0, -4.0, 2.0, -5.0]);
    assert_eq!(base.to_vec(), vec![0.0, 1.0, 2.0, -3.0, -4.0, -5.0]);

    // A shared view detaches on write instead.
    let mut detached = base.transpose(None).unwrap();
    a_operator(functor::Assign, &mut detached, 0.0f64).unwrap();
    assert_eq!(base.get(&[1, 2]), Some(-5.0));

    let mut empty = tensor(vec![], vec![0, 4]);
    let calls = Cell::new(0);
    a_operator(
        |d: &mut f64, s: f64| {
            calls.set(calls.get() + 1);
            *d = s;
        },
        &mut empty,
        7.0,
    )
    .unwrap();
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_assignment_through_row_view_reaches_source() {
    init();
    let mut x = CpuTensor::<f64>::zeros(&Shape::new(vec![2, 3]));
    let bias = tensor(vec![1.0, 2.0, 3.0], vec![3]);

    let mut row = x.slice_axis_mut(0, 1, 2, 1).unwrap();
    a_operator(functor::AddAssign, &mut row, 5.0f64).unwrap();
    a_operator(functor::AddAssign, &mut row, &bias).unwrap();
    assert_eq!(row.to_vec(), vec![6.0, 7.0, 8.0]);
    assert_eq!(x.to_vec(), vec![0.0, 0.0, 0.0, 6.0, 7.0, 8.0]);
}

#[test]
fn test_rank_zero_destination() {
    init();
    let mut s = CpuTensor::scalar(2i64);
    a_operator(functor::MulAssign, &mut s, 21i64).unwrap();
    assert_eq!(s.get(&[]), Some(42));
}
