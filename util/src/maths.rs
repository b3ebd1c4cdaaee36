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

/// Piecewise linear interpolation over a table of `(x, y)` points sorted by ascending `x`.
///
/// Values of `x` outside the table are clamped to the first or last `y` value. Returns `None`
/// only if the table is empty.
pub fn interp_clamped<T>(table: &[(T, T)], x: T) -> Option<T>
where
    T: Float
{
    let first = table.first()?;
    let last = table.last()?;

    if x <= first.0 {
        return Some(first.1)
    }
    if x >= last.0 {
        return Some(last.1)
    }

    // Find the segment containing x, the checks above guarantee there is one
    for pair in table.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];

        if x <= x1 {
            // Duplicate x values would divide by zero, take the upper point
            if x1 == x0 {
                return Some(y1)
            }
            return Some(lin_map((x0, x1), (y0, y1), x))
        }
    }

    Some(last.1)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range [-pi, pi).
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    rem_euclid(angle + pi_t, tau_t) - pi_t
}

/// Get the shortest signed angular distance to go from `from` to `to`.
///
/// Positive results are anticlockwise (right hand rule about Z+). The magnitude of the result
/// never exceeds pi.
pub fn get_ang_dist<T>(from: T, to: T) -> T
where
    T: Float
{
    wrap_pi(to - from)
}
