use core::fmt::Debug;
use core::hash::Hash;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A signed integer type used for ranks, positions, lengths and extents.
///
/// Implemented for `i32` and `i64`; the width bounds the total extent a
/// collection can hold.
pub trait Position:
    Copy
    + Ord
    + Default
    + Debug
    + Hash
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    /// The origin of every axis.
    const ZERO: Self;
    /// The unit length.
    const ONE: Self;
    /// The largest representable position.
    const MAX: Self;

    /// Addition that returns `None` on overflow.
    fn checked_add(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_position {
    ($($t:ty),*) => {
        $(
            impl Position for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;
                const MAX: Self = <$t>::MAX;

                #[inline]
                fn checked_add(self, rhs: Self) -> Option<Self> {
                    <$t>::checked_add(self, rhs)
                }
            }
        )*
    };
}

impl_position!(i32, i64);

// Per-axis arithmetic on offset arrays. `N` is 0, 1 or 2.

#[inline]
pub(crate) fn add_axes<P: Position, const N: usize>(a: [P; N], b: [P; N]) -> [P; N] {
    core::array::from_fn(|i| a[i] + b[i])
}

#[inline]
pub(crate) fn sub_axes<P: Position, const N: usize>(a: [P; N], b: [P; N]) -> [P; N] {
    core::array::from_fn(|i| a[i] - b[i])
}

#[inline]
pub(crate) fn neg_axes<P: Position, const N: usize>(a: [P; N]) -> [P; N] {
    core::array::from_fn(|i| -a[i])
}

pub(crate) fn checked_add_axes<P: Position, const N: usize>(a: [P; N], b: [P; N]) -> Option<[P; N]> {
    let mut out = a;
    for (slot, delta) in out.iter_mut().zip(b) {
        *slot = slot.checked_add(delta)?;
    }
    Some(out)
}

/// The coordinate on the first axis, which orders the shift operator.
#[inline]
pub(crate) fn lead<P: Position, const N: usize>(axes: &[P; N]) -> P {
    axes.first().copied().unwrap_or(P::ZERO)
}
