//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign,
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    let mut sum = T::zero();

    for (a, b) in point_0.iter().zip(point_1.iter()) {
        sum += (*a - *b).powi(2);
    }

    Some(sum.sqrt())
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle in degrees into the range [0, 360).
pub fn wrap_360<T>(value_deg: T) -> T
where
    T: Float,
{
    let full_turn = T::from(360.0).unwrap_or_else(T::nan);
    let wrapped = rem_euclid(value_deg, full_turn);

    // Round-off can land exactly on the upper bound
    if wrapped >= full_turn {
        T::zero()
    } else {
        wrapped
    }
}
