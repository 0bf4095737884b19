//! Operator frontend: `n_operator` (lazy construction) and `a_operator`
//! (eager assignment).
//!
//! Arguments are either tensors (anything that is an [`Operand`]) or scalars
//! (Rust primitives and [`Scalar`]). The binary case has a specialization:
//! a scalar is bound into the function with [`BindFirst`] / [`BindSecond`], so
//! `tensor op scalar` and `scalar op tensor` become single-operand nodes.
//! Every other arity promotes scalars to rank-0 [`Degenerate`] operands.
//!
//! Tuples of one to six arguments are accepted. A scalar argument must have a
//! concrete type (`2.0f64` rather than `2.0`) whenever nothing else in the call
//! fixes it.

use log::debug;

use crate::error::{Result, TensorError};
use crate::eval::{self, Traversal};
use crate::expr::Expression;
use crate::func::{AssignFn, ElementFn};
use crate::node::Tensor;
use crate::scalar::{BindFirst, BindSecond, Degenerate, Scalar};
use crate::shape::broadcast_shapes;
use crate::tensor::{AssignTarget, Element, Operand};

/// Marker for arguments that carry a shape.
#[derive(Debug, Clone, Copy)]
pub struct TensorKind;

/// Marker for plain values with no shape.
#[derive(Debug, Clone, Copy)]
pub struct ScalarKind;

pub trait ArgumentKind {
    const IS_TENSOR: bool;
}

impl ArgumentKind for TensorKind {
    const IS_TENSOR: bool = true;
}

impl ArgumentKind for ScalarKind {
    const IS_TENSOR: bool = false;
}

/// A value accepted by [`n_operator`] and [`a_operator`].
pub trait Argument {
    /// [`TensorKind`] or [`ScalarKind`].
    type Kind: ArgumentKind;

    /// What the argument becomes inside an expression node.
    type Operand: Operand;

    fn into_operand(self) -> Self::Operand;
}

/// A scalar argument, which may instead be bound directly into a function.
pub trait ScalarArgument: Argument<Kind = ScalarKind> {
    type Value: Element;

    fn into_value(self) -> Self::Value;
}

/// Element type an argument contributes.
pub type ElemOf<A> = <<A as Argument>::Operand as Operand>::Elem;

impl<E: Operand> Argument for Tensor<E> {
    type Kind = TensorKind;
    type Operand = Tensor<E>;

    fn into_operand(self) -> Tensor<E> {
        self
    }
}

impl<E: Operand> Argument for &Tensor<E> {
    type Kind = TensorKind;
    type Operand = Tensor<E>;

    fn into_operand(self) -> Tensor<E> {
        self.clone()
    }
}

impl<F, Ops> Argument for Expression<F, Ops>
where
    Expression<F, Ops>: Operand,
{
    type Kind = TensorKind;
    type Operand = Expression<F, Ops>;

    fn into_operand(self) -> Self {
        self
    }
}

impl<T: Element> Argument for Degenerate<T> {
    type Kind = TensorKind;
    type Operand = Degenerate<T>;

    fn into_operand(self) -> Self {
        self
    }
}

impl<T: Element> Argument for Scalar<T> {
    type Kind = ScalarKind;
    type Operand = Degenerate<T>;

    fn into_operand(self) -> Degenerate<T> {
        Degenerate::new(self.0)
    }
}

impl<T: Element> ScalarArgument for Scalar<T> {
    type Value = T;

    fn into_value(self) -> T {
        self.0
    }
}

macro_rules! scalar_argument {
    ($($t:ty),*) => {
        $(
            impl Argument for $t {
                type Kind = ScalarKind;
                type Operand = Degenerate<$t>;

                fn into_operand(self) -> Degenerate<$t> {
                    Degenerate::new(self)
                }
            }

            impl ScalarArgument for $t {
                type Value = $t;

                fn into_value(self) -> $t {
                    self
                }
            }
        )*
    };
}

scalar_argument!(f32, f64, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool);

/// An argument tuple that [`n_operator`] can turn into an expression node
/// for the function `F`.
pub trait OperatorArgs<F> {
    type Expr: Operand;

    fn build(self, func: F) -> Result<Self::Expr>;
}

/// Handle type produced by `n_operator(F, Args)`.
pub type OperatorOutput<F, Args> = Tensor<<Args as OperatorArgs<F>>::Expr>;

/// Binary construction, selected by the kinds of the two arguments.
pub trait BinaryDispatch<F, A, B> {
    type Expr: Operand;

    fn build(func: F, a: A, b: B) -> Result<Self::Expr>;
}

impl<F, A, B> BinaryDispatch<F, A, B> for (TensorKind, TensorKind)
where
    A: Argument<Kind = TensorKind>,
    B: Argument<Kind = TensorKind>,
    F: ElementFn<(ElemOf<A>, ElemOf<B>)>,
    F::Output: Element,
{
    type Expr = Expression<F, (A::Operand, B::Operand)>;

    fn build(func: F, a: A, b: B) -> Result<Self::Expr> {
        Expression::new(func, (a.into_operand(), b.into_operand()))
    }
}

impl<F, A, B> BinaryDispatch<F, A, B> for (TensorKind, ScalarKind)
where
    A: Argument<Kind = TensorKind>,
    B: ScalarArgument,
    BindSecond<F, B::Value>: ElementFn<(ElemOf<A>,)>,
    <BindSecond<F, B::Value> as ElementFn<(ElemOf<A>,)>>::Output: Element,
{
    type Expr = Expression<BindSecond<F, B::Value>, (A::Operand,)>;

    fn build(func: F, a: A, b: B) -> Result<Self::Expr> {
        Expression::new(BindSecond::new(func, b.into_value()), (a.into_operand(),))
    }
}

impl<F, A, B> BinaryDispatch<F, A, B> for (ScalarKind, TensorKind)
where
    A: ScalarArgument,
    B: Argument<Kind = TensorKind>,
    BindFirst<F, A::Value>: ElementFn<(ElemOf<B>,)>,
    <BindFirst<F, A::Value> as ElementFn<(ElemOf<B>,)>>::Output: Element,
{
    type Expr = Expression<BindFirst<F, A::Value>, (B::Operand,)>;

    fn build(func: F, a: A, b: B) -> Result<Self::Expr> {
        Expression::new(BindFirst::new(func, a.into_value()), (b.into_operand(),))
    }
}

impl<F, A, B> BinaryDispatch<F, A, B> for (ScalarKind, ScalarKind)
where
    A: Argument<Kind = ScalarKind>,
    B: Argument<Kind = ScalarKind>,
    F: ElementFn<(ElemOf<A>, ElemOf<B>)>,
    F::Output: Element,
{
    type Expr = Expression<F, (A::Operand, B::Operand)>;

    fn build(_func: F, _a: A, _b: B) -> Result<Self::Expr> {
        Err(TensorError::NoTensorOperand)
    }
}

impl<F, A, B> OperatorArgs<F> for (A, B)
where
    A: Argument,
    B: Argument,
    (A::Kind, B::Kind): BinaryDispatch<F, A, B>,
{
    type Expr = <(A::Kind, B::Kind) as BinaryDispatch<F, A, B>>::Expr;

    fn build(self, func: F) -> Result<Self::Expr> {
        <(A::Kind, B::Kind) as BinaryDispatch<F, A, B>>::build(func, self.0, self.1)
    }
}

// Unary and 3- to 6-ary arguments: promote scalars, keep the function as is.
macro_rules! promoted_operator_args {
    ($($arg:ident : $idx:tt),+) => {
        impl<F, $($arg),+> OperatorArgs<F> for ($($arg,)+)
        where
            $($arg: Argument,)+
            F: ElementFn<($(ElemOf<$arg>,)+)>,
            F::Output: Element,
        {
            type Expr = Expression<F, ($($arg::Operand,)+)>;

            fn build(self, func: F) -> Result<Self::Expr> {
                if !(false $(|| <$arg::Kind as ArgumentKind>::IS_TENSOR)+) {
                    return Err(TensorError::NoTensorOperand);
                }
                Expression::new(func, ($(self.$idx.into_operand(),)+))
            }
        }
    };
}

promoted_operator_args!(A0: 0);
promoted_operator_args!(A0: 0, A1: 1, A2: 2);
promoted_operator_args!(A0: 0, A1: 1, A2: 2, A3: 3);
promoted_operator_args!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
promoted_operator_args!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);

/// Build a lazy elementwise expression `func(args...)` and wrap it in a
/// [`Tensor`] handle.
///
/// `args` is a tuple of one to six arguments, at least one of which must be
/// a tensor. Shapes are broadcast together immediately, so an incompatible
/// combination fails here rather than during traversal. No element is read.
///
/// For a wider fan-in, nest: the result is itself an argument, so
/// `n_operator(g, (&n_operator(f, (a, b, c, d, e, h))?, i, j))` stays lazy
/// end to end.
///
/// Scalar arguments need a concrete type. An unsuffixed literal such as
/// `0.5` may leave the argument kind undecided when nothing else pins it, so
/// write `0.5f64` or `Scalar(0.5f64)` where the compiler asks for annotations.
///
/// ```ignore
/// let c = n_operator(|x: f64, y: f64| x.max(y) * 2.0, (&a, &b))?;
/// let d = n_operator(functor::Sub, (1.0f64, &c))?; // 1 - c
/// ```
pub fn n_operator<F, Args>(func: F, args: Args) -> Result<Tensor<Args::Expr>>
where
    Args: OperatorArgs<F>,
{
    args.build(func).map(Tensor::new)
}

/// Apply `func(&mut dest[i], rhs[i])` to every element of `dest`, in
/// row-major order, and return `dest`.
///
/// `rhs` is broadcast against `dest`; the result must have exactly
/// `dest`'s shape. Every element is visited once before this returns.
pub fn a_operator<'d, F, D, R>(func: F, dest: &'d mut D, rhs: R) -> Result<&'d mut D>
where
    D: AssignTarget,
    R: Argument,
    F: AssignFn<D::Elem, ElemOf<R>>,
{
    a_operator_with(Traversal::Auto, func, dest, rhs)
}

/// [`a_operator`] with an explicit traversal strategy.
pub fn a_operator_with<'d, F, D, R>(
    traversal: Traversal,
    func: F,
    dest: &'d mut D,
    rhs: R,
) -> Result<&'d mut D>
where
    D: AssignTarget,
    R: Argument,
    F: AssignFn<D::Elem, ElemOf<R>>,
{
    let rhs = rhs.into_operand();
    let shape = broadcast_shapes(&[dest.shape(), rhs.shape()])?;
    if &shape != dest.shape() {
        debug!("assign rejected: {} does not fit into {}", rhs.shape(), dest.shape());
        return Err(TensorError::AssignShape {
            dest: dest.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }

    eval::assign(traversal, &func, dest, &rhs);
    Ok(dest)
}
