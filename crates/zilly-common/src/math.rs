//! Deterministic math helpers shared by collision and simulation.
//!
//! Every function here must produce bit-identical results on client and
//! server, so they are written with plain `f32` arithmetic in a fixed order.

use glam::Vec2;

/// Rounds half away from zero and truncates to `i32`.
///
/// This is the rounding used for network quantization and for mapping
/// world positions to tiles.
#[must_use]
#[inline]
pub fn round_to_int(f: f32) -> i32 {
    if f > 0.0 {
        (f + 0.5) as i32
    } else {
        (f - 0.5) as i32
    }
}

/// Adds `modifier` to `current` without pushing it past `min`/`max`.
///
/// A value already beyond the bound in the direction of the modifier is
/// returned unchanged, so external boosts are never cut down.
#[must_use]
pub fn saturated_add(min: f32, max: f32, current: f32, modifier: f32) -> f32 {
    if modifier < 0.0 {
        if current < min {
            return current;
        }
        (current + modifier).max(min)
    } else {
        if current > max {
            return current;
        }
        (current + modifier).min(max)
    }
}

/// Exponential dampening factor applied above `start`.
///
/// Returns 1.0 below the threshold, `1 / curvature^((value - start) / range)`
/// above it.
#[must_use]
pub fn velocity_ramp(value: f32, start: f32, range: f32, curvature: f32) -> f32 {
    if value < start {
        return 1.0;
    }
    1.0 / curvature.powf((value - start) / range)
}

/// Linear interpolation between two points.
#[must_use]
#[inline]
pub fn mix(a: Vec2, b: Vec2, amount: f32) -> Vec2 {
    a + (b - a) * amount
}

/// Angle of a vector in radians (`atan2(y, x)`).
#[must_use]
#[inline]
pub fn angle(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Point on segment `a..b` closest to `p`.
#[must_use]
pub fn closest_point_on_line(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq > 0.0 {
        let t = (p - a).dot(ab) / len_sq;
        a + ab * t.clamp(0.0, 1.0)
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_saturated_add_clamps() {
        assert_eq!(saturated_add(-10.0, 10.0, 9.0, 2.0), 10.0);
        assert_eq!(saturated_add(-10.0, 10.0, -9.0, -2.0), -10.0);
        assert_eq!(saturated_add(-10.0, 10.0, 0.0, 2.0), 2.0);
    }

    #[test]
    fn test_saturated_add_keeps_external_speed() {
        // Already faster than the cap: acceleration must not slow it down.
        assert_eq!(saturated_add(-10.0, 10.0, 25.0, 2.0), 25.0);
        assert_eq!(saturated_add(-10.0, 10.0, -25.0, -2.0), -25.0);
    }

    #[test]
    fn test_velocity_ramp() {
        assert_eq!(velocity_ramp(100.0, 550.0, 2000.0, 1.4), 1.0);
        let r = velocity_ramp(2550.0, 550.0, 2000.0, 1.4);
        assert!((r - 1.0 / 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_closest_point_on_line() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(closest_point_on_line(a, b, Vec2::new(5.0, 3.0)), Vec2::new(5.0, 0.0));
        assert_eq!(closest_point_on_line(a, b, Vec2::new(-5.0, 3.0)), a);
        assert_eq!(closest_point_on_line(a, a, Vec2::new(1.0, 1.0)), a);
    }

    #[test]
    fn test_angle() {
        assert!((angle(Vec2::new(0.0, 1.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_round_to_int_within_half(f in -1.0e6f32..1.0e6f32) {
            let r = round_to_int(f) as f32;
            prop_assert!((r - f).abs() <= 0.5 + f.abs() * f32::EPSILON);
        }

        #[test]
        fn prop_round_to_int_symmetric(f in 0.0f32..1.0e6f32) {
            prop_assert_eq!(round_to_int(-f), -round_to_int(f));
        }
    }
}
