//! Property-based checks of lazy evaluation against an eager reference.
//!
//! Operand shapes are derived from one common shape by dropping leading axes
//! and collapsing extents to 1, so every generated pair broadcasts.

use nd_backend_cpu::{CpuBackend, CpuTensor, CpuWalkerBackend};
use nd_tensor::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Case {
    lhs: CpuTensor<i64>,
    rhs: CpuTensor<i64>,
}

fn operand(dims: &[usize], drop: usize, collapse: &[bool], pool: &[i64]) -> CpuTensor<i64> {
    let own: Vec<usize> = (drop..dims.len())
        .map(|i| if collapse[i] { 1 } else { dims[i] })
        .collect();
    let shape = Shape::new(own);
    CpuTensor::from_vec(pool[..shape.numel()].to_vec(), shape).unwrap()
}

fn case_strategy() -> impl Strategy<Value = Case> {
    prop::collection::vec(1usize..5, 1..=3)
        .prop_flat_map(|dims| {
            let rank = dims.len();
            let operand_strategy = (
                0..=rank,
                prop::collection::vec(any::<bool>(), rank),
                prop::collection::vec(-20i64..20, 64),
            );
            (Just(dims), operand_strategy.clone(), operand_strategy)
        })
        .prop_map(|(dims, (ld, lc, lp), (rd, rc, rp))| Case {
            lhs: operand(&dims, ld, &lc, &lp),
            rhs: operand(&dims, rd, &rc, &rp),
        })
}

/// Every multi-index of `shape` in row-major order.
fn indices(shape: &Shape) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &d in shape.dims() {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..d).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    out
}

/// Element of `t` seen at `index` of a larger broadcast shape.
fn broadcast_get(t: &CpuTensor<i64>, index: &[usize]) -> i64 {
    let pad = index.len() - t.ndim();
    let own: Vec<usize> = t
        .shape()
        .dims()
        .iter()
        .enumerate()
        .map(|(k, &d)| if d == 1 { 0 } else { index[pad + k] })
        .collect();
    t.get(&own).unwrap()
}

fn reference<F: Fn(i64, i64) -> i64>(case: &Case, shape: &Shape, f: F) -> Vec<i64> {
    indices(shape)
        .iter()
        .map(|idx| f(broadcast_get(&case.lhs, idx), broadcast_get(&case.rhs, idx)))
        .collect()
}

proptest! {
    #[test]
    fn prop_binary_matches_reference(case in case_strategy()) {
        let e = n_operator(|a: i64, b: i64| a * 3 - b, (&case.lhs, &case.rhs)).unwrap();
        let expected = reference(&case, e.shape(), |a, b| a * 3 - b);
        prop_assert_eq!(e.to_vec(), expected);
    }

    #[test]
    fn prop_traversals_agree(case in case_strategy()) {
        let e = n_operator(functor::Mul, (&case.lhs, &case.rhs)).unwrap();
        let flat = CpuBackend::materialize(&e).unwrap();
        let walked = CpuWalkerBackend::materialize(&e).unwrap();
        prop_assert_eq!(flat.to_vec(), walked.to_vec());
        prop_assert_eq!(e.iter().collect::<Vec<_>>(), flat.to_vec());
    }

    #[test]
    fn prop_nesting_matches_materialized_intermediate(case in case_strategy()) {
        let inner = n_operator(functor::Sub, (&case.lhs, &case.rhs)).unwrap();
        let stored = inner.eval::<CpuBackend>().unwrap();

        let lazy = n_operator(functor::Maximum, (&inner, 0i64)).unwrap();
        let eager = n_operator(functor::Maximum, (&stored, 0i64)).unwrap();
        prop_assert_eq!(lazy.to_vec(), eager.to_vec());
    }

    #[test]
    fn prop_scalar_position_is_respected(case in case_strategy(), s in -5i64..5) {
        let right = n_operator(functor::Sub, (&case.lhs, s)).unwrap().to_vec();
        let left = n_operator(functor::Sub, (s, &case.lhs)).unwrap().to_vec();
        let base = case.lhs.to_vec();
        prop_assert_eq!(right, base.iter().map(|&x| x - s).collect::<Vec<_>>());
        prop_assert_eq!(left, base.iter().map(|&x| s - x).collect::<Vec<_>>());
    }

    #[test]
    fn prop_assignment_matches_lazy_sum(case in case_strategy()) {
        let shape = broadcast_shapes(&[case.lhs.shape(), case.rhs.shape()]).unwrap();
        let view = case.lhs.broadcast_to(&shape).unwrap();
        let mut dest = CpuBackend::materialize(&view).unwrap();
        let before = dest.clone();
        let expected = n_operator(functor::Add, (&before, &case.rhs)).unwrap().to_vec();

        a_operator(functor::AddAssign, &mut dest, &case.rhs).unwrap();
        prop_assert_eq!(dest.to_vec(), expected);
        prop_assert_eq!(before.to_vec(), reference(&case, &shape, |a, _| a));
    }
}
