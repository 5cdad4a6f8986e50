use serde::{Deserialize, Serialize};

use crate::matrix::Scalar;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    SquaredL2,
}

impl Metric {
    #[inline]
    pub fn distance<T: Scalar>(self, a: &[T], b: &[T]) -> f64 {
        match self {
            Metric::SquaredL2 => l2_squared(a, b),
        }
    }
}

/// Sum of squared per-dimension differences, accumulated in f64.
/// Exact for u8/i16-range samples at any practical width.
#[inline]
pub fn l2_squared<T: Scalar>(a: &[T], b: &[T]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut s = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let d = x.to_f64() - y.to_f64();
        s += d * d;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_not_rooted() {
        assert_eq!(l2_squared(&[0.0f32, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn symmetric_and_zero_on_equal() {
        let a = [1u8, 200, 7, 0];
        let b = [255u8, 3, 7, 9];
        assert_eq!(l2_squared(&a, &b), l2_squared(&b, &a));
        assert_eq!(l2_squared(&a, &a), 0.0);
        assert!(l2_squared(&a, &b) > 0.0);
        assert_eq!(Metric::SquaredL2.distance(&[1i32, 2], &[2, 2]), 1.0);
    }

    #[test]
    fn distinguishes_values_past_f32_precision() {
        let zero = vec![0i32; 3072];
        let mut near = zero.clone();
        near[0] = 4096; // 2^24
        let mut far = near.clone();
        far[1] = 1; // 2^24 + 1
        assert_eq!(l2_squared(&zero, &near), 16_777_216.0);
        assert_eq!(l2_squared(&zero, &far), 16_777_217.0);
        assert!(l2_squared(&zero, &near) < l2_squared(&zero, &far));

        // full-scale tiny images stay exact too
        let black = vec![0u8; 3072];
        let white = vec![255u8; 3072];
        assert_eq!(l2_squared(&black, &white), 3072.0 * 65025.0);
    }
}
