//! Angle and polynomial helpers shared by the road network and the engine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Values with a magnitude below this are treated as zero in geometric calculations.
pub const SMALL_NUMBER: f64 = 1e-10;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Evaluate the cubic `a + b*ds + c*ds^2 + d*ds^3`.
pub fn poly3<T: Float>(ds: T, a: T, b: T, c: T, d: T) -> T {
    a + ds * (b + ds * (c + ds * d))
}

/// Derivative of [`poly3`] with respect to `ds`.
pub fn poly3_prime<T: Float>(ds: T, b: T, c: T, d: T) -> T {
    let two = T::one() + T::one();
    let three = two + T::one();

    b + ds * (two * c + three * d * ds)
}

/// Limit `value` to `[min, max]`. NaN is passed through.
pub fn clamp<T: Float>(value: T, min: T, max: T) -> T {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// Wrap an angle into `[0, 2pi)`.
pub fn wrap_2pi<T: Float + FloatConst>(angle: T) -> T {
    let tau = T::PI() + T::PI();

    let mut r = angle % tau;
    if r < T::zero() {
        r = r + tau;
    }

    // Adding tau to a tiny negative remainder can round up to tau itself
    if r >= tau {
        T::zero()
    } else {
        r
    }
}

/// Wrap an angle into `[-pi, pi)`.
pub fn wrap_pi<T: Float + FloatConst>(angle: T) -> T {
    wrap_2pi(angle + T::PI()) - T::PI()
}

/// Signed change of heading going from `from` to `to`, the shortest way round.
///
/// Positive for an anticlockwise (left) turn, in `[-pi, pi)`.
pub fn heading_diff<T: Float + FloatConst>(from: T, to: T) -> T {
    wrap_pi(to - from)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
