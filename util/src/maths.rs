//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Normalise an angle in degrees into the range (-180, 180].
///
/// The function is idempotent, values already inside the range are returned
/// unchanged.
pub fn norm_angle_deg(angle: f64) -> f64 {
    // `%` keeps the sign of the dividend, so this lands in (-360, 360)
    let mut a = angle % 360.0;

    if a > 180.0 {
        a -= 360.0;
    }
    else if a <= -180.0 {
        a += 360.0;
    }

    a
}

/// Map an angle in degrees into the compass range [0, 360).
pub fn compass_deg(angle: f64) -> f64 {
    let a = rem_euclid(angle, 360.0);

    // Round-off can give exactly 360 for tiny negative inputs
    if a >= 360.0 { a - 360.0 } else { a }
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
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}
