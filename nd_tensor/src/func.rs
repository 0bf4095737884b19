//! Function traits for elementwise operations.
//!
//! [`ElementFn`] is an N-ary pure function taking its arguments as a tuple. It
//! is implemented for every closure or `fn` of arity 1 to 6, for the named
//! functors in [`crate::functor`], and for the scalar binders in
//! [`crate::scalar`]. The output type of an expression is `F::Output`, decided
//! from types alone.
//!
//! Closures passed through these traits need annotated argument types:
//! `|a: f64, b: f64| a + b`.

/// Elementwise function over an argument tuple.
pub trait ElementFn<Args> {
    type Output;

    fn apply(&self, args: Args) -> Self::Output;
}

macro_rules! impl_element_fn {
    ($($arg:ident),+) => {
        impl<Func, Ret, $($arg),+> ElementFn<($($arg,)+)> for Func
        where
            Func: Fn($($arg),+) -> Ret,
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            #[inline]
            fn apply(&self, ($($arg,)+): ($($arg,)+)) -> Ret {
                self($($arg),+)
            }
        }
    };
}

impl_element_fn!(A0);
impl_element_fn!(A0, A1);
impl_element_fn!(A0, A1, A2);
impl_element_fn!(A0, A1, A2, A3);
impl_element_fn!(A0, A1, A2, A3, A4);
impl_element_fn!(A0, A1, A2, A3, A4, A5);

/// Compound-assignment function: updates a destination element in place
/// from one right-hand-side value.
pub trait AssignFn<T, U> {
    fn assign(&self, dst: &mut T, src: U);
}

impl<Func, T, U> AssignFn<T, U> for Func
where
    Func: Fn(&mut T, U),
{
    #[inline]
    fn assign(&self, dst: &mut T, src: U) {
        self(dst, src)
    }
}
