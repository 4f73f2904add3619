//! Distances for primitive comparisons and boolean operators.

use super::{FALSE, K, TRUE};

/// Squashes a nonzero difference into `[-K, K]`, rounding away from zero.
/// The result has the sign of `diff` and is never zero.
fn scaled_difference(diff: f64) -> i32 {
    let squashed = diff / (1.0 + diff.abs());
    let scaled = i32::MAX as f64 * squashed;
    let rounded = if scaled < 0.0 { scaled.floor() } else { scaled.ceil() };
    let clamped = rounded.clamp(-(K as f64), K as f64) as i32;
    if clamped == 0 {
        diff.signum() as i32
    } else {
        clamped
    }
}

/// `a - b` without overflow, saturated at `±K`.
pub fn int_sub(a: i32, b: i32) -> i32 {
    let sub = a as i64 - b as i64;
    sub.clamp(-(K as i64), K as i64) as i32
}

/// Replacement for `lcmp`.
pub fn long_sub(a: i64, b: i64) -> i32 {
    if a == b {
        return 0;
    }
    // exact sign even where the f64 difference would round to zero
    let diff = (a as i128 - b as i128) as f64;
    scaled_difference(diff)
}

fn float_sub(a: f64, b: f64, nan: i32) -> i32 {
    if a == b {
        return 0;
    }
    if a.is_nan() || b.is_nan() {
        return nan;
    }
    if a.is_infinite() || b.is_infinite() {
        return if a > b { 1 } else { -1 };
    }
    scaled_difference(a - b)
}

/// Replacement for `dcmpg`: NaN compares greater.
pub fn double_sub_g(a: f64, b: f64) -> i32 {
    float_sub(a, b, 1)
}

/// Replacement for `dcmpl`: NaN compares lesser.
pub fn double_sub_l(a: f64, b: f64) -> i32 {
    float_sub(a, b, -1)
}

/// Replacement for `fcmpg`.
pub fn float_sub_g(a: f32, b: f32) -> i32 {
    float_sub(a as f64, b as f64, 1)
}

/// Replacement for `fcmpl`.
pub fn float_sub_l(a: f32, b: f32) -> i32 {
    float_sub(a as f64, b as f64, -1)
}

/// Boolean `&`: both must hold, so the weaker operand decides.
pub fn iand(a: i32, b: i32) -> i32 {
    a.min(b)
}

/// Boolean `|`: the operand furthest into truth (or closest to it) decides.
pub fn ior(a: i32, b: i32) -> i32 {
    a.max(b)
}

/// Boolean `^`.
pub fn ixor(a: i32, b: i32) -> i32 {
    if a > 0 && b <= 0 {
        a
    } else if b > 0 && a <= 0 {
        b
    } else {
        let gap = (a as i64 - b as i64).abs().min(K as i64);
        -(gap as i32)
    }
}

pub fn boolean_to_int(b: bool) -> i32 {
    if b {
        TRUE
    } else {
        FALSE
    }
}

pub fn int_to_boolean(x: i32) -> bool {
    x > 0
}

/// Distance of `a == b` over two distance-encoded booleans.
pub fn compare_boolean(a: i32, b: i32) -> i32 {
    let gap = (a as i64 - b as i64).abs().min(K as i64) as i32;
    if (a > 0) == (b > 0) {
        gap
    } else {
        -gap
    }
}

/// `instanceof`: `None` stands for a null operand.
pub fn instance_of(assignable: Option<bool>) -> i32 {
    match assignable {
        Some(true) => TRUE,
        Some(false) | None => FALSE,
    }
}

/// JVM opcode of `ifnull`.
pub const IFNULL: i32 = 0xc6;
/// JVM opcode of `if_acmpeq`.
pub const IF_ACMPEQ: i32 = 0xa5;

/// Null test for `ifnull` / `ifnonnull`, selected by the jump opcode.
pub fn is_null(is_null: bool, opcode: i32) -> i32 {
    if opcode == IFNULL {
        boolean_to_int(is_null)
    } else {
        boolean_to_int(!is_null)
    }
}

/// Reference comparison for `if_acmpeq` / `if_acmpne`.
pub fn is_equal(same: bool, opcode: i32) -> i32 {
    if opcode == IF_ACMPEQ {
        boolean_to_int(same)
    } else {
        boolean_to_int(!same)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_sub_clamps() {
        assert_eq!(int_sub(5, 3), 2);
        assert_eq!(int_sub(i32::MAX, i32::MIN), K);
        assert_eq!(int_sub(i32::MIN, 1), -K);
        assert_eq!(int_sub(-K, 0), -K);
    }

    #[test]
    fn test_double_sub_nan_and_infinity() {
        assert_eq!(double_sub_g(f64::NAN, 1.0), 1);
        assert_eq!(double_sub_l(1.0, f64::NAN), -1);
        assert_eq!(double_sub_g(f64::INFINITY, 3.0), 1);
        assert_eq!(double_sub_l(f64::NEG_INFINITY, 3.0), -1);
        assert_eq!(double_sub_g(f64::INFINITY, f64::INFINITY), 0);
        assert_eq!(double_sub_g(0.0, -0.0), 0);
    }

    #[test]
    fn test_small_differences_keep_sign() {
        assert!(double_sub_g(1.0 + 1e-12, 1.0) > 0);
        assert!(double_sub_l(1.0, 1.0 + 1e-12) < 0);
        assert!(float_sub_g(0.5, 0.25) > 0);
        assert_eq!(long_sub(i64::MAX, i64::MAX - 1).signum(), 1);
        assert_eq!(long_sub(i64::MIN, i64::MAX), -K);
    }

    #[test]
    fn test_monotonic_in_difference() {
        assert!(double_sub_g(10.0, 0.0) > double_sub_g(1.0, 0.0));
        assert!(long_sub(-100, 0) < long_sub(-1, 0));
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(iand(TRUE, -5), -5);
        assert_eq!(ior(-7, -5), -5);
        assert_eq!(ior(-7, 9), 9);
        assert_eq!(ixor(3, -4), 3);
        assert_eq!(ixor(-4, 3), 3);
        assert_eq!(ixor(3, 5), -2);
        assert_eq!(ixor(K, -K), K);
        assert_eq!(ixor(-K, K), K);
        assert_eq!(ixor(i32::MIN, K), K);
        assert_eq!(ixor(i32::MIN, 0), -K);
    }

    #[test]
    fn test_reference_tests() {
        assert_eq!(is_null(true, IFNULL), TRUE);
        assert_eq!(is_null(true, 0xc7), FALSE);
        assert_eq!(is_equal(false, IF_ACMPEQ), FALSE);
        assert_eq!(is_equal(false, 0xa6), TRUE);
        assert_eq!(instance_of(None), FALSE);
        assert_eq!(compare_boolean(TRUE, 5), K - 5);
        assert_eq!(compare_boolean(TRUE, -5), -K);
    }
}
