//! Runtime side of the transformation: the distance functions the rewritten
//! code calls, and the state they share during one evaluation.
//!
//! Every function returns an integer branch distance: positive means the
//! predicate holds, zero or negative means it does not, and the magnitude says
//! how far the operands are from flipping the outcome. Magnitudes never
//! exceed [`K`].

pub mod containers;
pub mod context;
pub mod numeric;
pub mod params;
pub mod regex_distance;
pub mod strings;
pub mod tracker;

pub use self::context::ExecutionContext;
pub use self::params::{ObjectRef, ParameterStack};
pub use self::tracker::DistanceTracker;
pub use crate::config::{FALSE, K, TRUE};

/// A concrete operand seen while computing a distance.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// Receives literals observed during distance computation, e.g. to seed a
/// search's constant pool. Fire and forget.
pub trait LiteralSink {
    fn record(&mut self, literal: Literal);
}

/// Drops every literal.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LiteralSink for NoopSink {
    fn record(&mut self, _literal: Literal) {}
}

impl LiteralSink for Vec<Literal> {
    fn record(&mut self, literal: Literal) {
        self.push(literal);
    }
}

/// Maps a non-negative fraction to a distance magnitude in `[1, K]`.
///
/// Shared by every place that scales a real-valued closeness into the integer
/// range: rounds up, and a nonzero input never yields zero.
pub fn scale_to_distance(fraction: f64) -> i32 {
    if fraction.is_nan() || fraction <= 0.0 {
        return 1;
    }
    let scaled = (K as f64 * fraction).ceil();
    if scaled >= K as f64 {
        K
    } else {
        (scaled as i32).max(1)
    }
}

/// `x / (x + 1)`: squashes a non-negative distance into `[0, 1)`.
pub fn squash(x: f64) -> f64 {
    x / (x + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_to_distance_bounds() {
        assert_eq!(scale_to_distance(0.0), 1);
        assert_eq!(scale_to_distance(f64::NAN), 1);
        assert_eq!(scale_to_distance(1e-300), 1);
        assert_eq!(scale_to_distance(1.0), K);
        assert_eq!(scale_to_distance(7.5), K);
        let half = scale_to_distance(0.5);
        assert!(half > 1 && half < K);
    }
}
