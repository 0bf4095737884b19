//! Named elementwise functors.
//!
//! These are the functions behind the arithmetic operator overloads. Unlike
//! closures they are nameable types, so expressions built from them can be
//! spelled out in signatures.

use std::ops;

use crate::func::{AssignFn, ElementFn};

macro_rules! binary_functor {
    ($(#[$doc:meta])* $name:ident, $trait:ident, $method:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl<A, B> ElementFn<(A, B)> for $name
        where
            A: ops::$trait<B>,
        {
            type Output = <A as ops::$trait<B>>::Output;

            #[inline]
            fn apply(&self, (a, b): (A, B)) -> Self::Output {
                ops::$trait::$method(a, b)
            }
        }
    };
}

binary_functor!(
    /// `a + b`
    Add, Add, add
);
binary_functor!(
    /// `a - b`
    Sub, Sub, sub
);
binary_functor!(
    /// `a * b`
    Mul, Mul, mul
);
binary_functor!(
    /// `a / b`
    Div, Div, div
);
binary_functor!(
    /// `a % b`
    Rem, Rem, rem
);

/// `-a`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neg;

impl<A: ops::Neg> ElementFn<(A,)> for Neg {
    type Output = A::Output;

    #[inline]
    fn apply(&self, (a,): (A,)) -> A::Output {
        -a
    }
}

/// Larger of two values; the first wins ties and unordered pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Maximum;

impl<A: PartialOrd> ElementFn<(A, A)> for Maximum {
    type Output = A;

    #[inline]
    fn apply(&self, (a, b): (A, A)) -> A {
        if b > a {
            b
        } else {
            a
        }
    }
}

/// Smaller of two values; the first wins ties and unordered pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Minimum;

impl<A: PartialOrd> ElementFn<(A, A)> for Minimum {
    type Output = A;

    #[inline]
    fn apply(&self, (a, b): (A, A)) -> A {
        if b < a {
            b
        } else {
            a
        }
    }
}

/// Plain assignment: `dst = src`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Assign;

impl<T> AssignFn<T, T> for Assign {
    #[inline]
    fn assign(&self, dst: &mut T, src: T) {
        *dst = src;
    }
}

macro_rules! assign_functor {
    ($(#[$doc:meta])* $name:ident, $trait:ident, $method:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl<T, U> AssignFn<T, U> for $name
        where
            T: ops::$trait<U>,
        {
            #[inline]
            fn assign(&self, dst: &mut T, src: U) {
                ops::$trait::$method(dst, src);
            }
        }
    };
}

assign_functor!(
    /// `dst += src`
    AddAssign, AddAssign, add_assign
);
assign_functor!(
    /// `dst -= src`
    SubAssign, SubAssign, sub_assign
);
assign_functor!(
    /// `dst *= src`
    MulAssign, MulAssign, mul_assign
);
assign_functor!(
    /// `dst /= src`
    DivAssign, DivAssign, div_assign
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_functors() {
        assert_eq!(Add.apply((2i32, 3i32)), 5);
        assert_eq!(Sub.apply((2.0f64, 3.0f64)), -1.0);
        assert_eq!(Mul.apply((4u32, 5u32)), 20);
        assert_eq!(Div.apply((9i32, 2i32)), 4);
        assert_eq!(Rem.apply((9i32, 2i32)), 1);
        assert_eq!(Neg.apply((3i8,)), -3);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(Maximum.apply((1.0f64, 2.0f64)), 2.0);
        assert_eq!(Minimum.apply((1.0f64, 2.0f64)), 1.0);
        assert_eq!(Maximum.apply((4i32, 4i32)), 4);
    }

    #[test]
    fn test_assign_functors() {
        let mut x = 10.0f64;
        AddAssign.assign(&mut x, 2.0);
        MulAssign.assign(&mut x, 3.0);
        SubAssign.assign(&mut x, 6.0);
        DivAssign.assign(&mut x, 5.0);
        assert_eq!(x, 6.0);

        Assign.assign(&mut x, -1.0);
        assert_eq!(x, -1.0);
    }
}
