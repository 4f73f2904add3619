use super::numeric;
use super::params::ParameterStack;
use super::strings;
use super::tracker::DistanceTracker;
use super::{Literal, LiteralSink, NoopSink};
use crate::config::DEFAULT_MAX_INT;
use crate::error::DistanceError;

/// Everything one evaluation of instrumented code touches: the predicate
/// history, the parameter staging stacks and the literal sink.
///
/// The comparison wrappers report each concrete operand to the sink before
/// computing the distance.
#[derive(Debug)]
pub struct ExecutionContext<S: LiteralSink = NoopSink> {
    pub tracker: DistanceTracker,
    pub params: ParameterStack,
    sink: S,
}

impl Default for ExecutionContext<NoopSink> {
    fn default() -> Self {
        ExecutionContext::new(DEFAULT_MAX_INT, NoopSink)
    }
}

impl<S: LiteralSink> ExecutionContext<S> {
    pub fn new(max_int: i32, sink: S) -> Self {
        ExecutionContext {
            tracker: DistanceTracker::new(max_int),
            params: ParameterStack::new(),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Resets predicate history and staged parameters before evaluating a
    /// new top-level expression.
    pub fn clear(&mut self) {
        self.tracker.clear();
        self.params.clear();
    }

    pub fn push_predicate(&mut self, distance: i32, branch_id: i32) {
        self.tracker.push_predicate(distance, branch_id);
    }

    pub fn get_distance(&self, branch_id: i32, level: i32, value: i32) -> i32 {
        self.tracker.get_distance(branch_id, level, value)
    }

    pub fn int_sub(&mut self, a: i32, b: i32) -> i32 {
        self.sink.record(Literal::Int(a));
        self.sink.record(Literal::Int(b));
        numeric::int_sub(a, b)
    }

    pub fn long_sub(&mut self, a: i64, b: i64) -> i32 {
        self.sink.record(Literal::Long(a));
        self.sink.record(Literal::Long(b));
        numeric::long_sub(a, b)
    }

    pub fn float_sub_g(&mut self, a: f32, b: f32) -> i32 {
        self.record_floats(a, b);
        numeric::float_sub_g(a, b)
    }

    pub fn float_sub_l(&mut self, a: f32, b: f32) -> i32 {
        self.record_floats(a, b);
        numeric::float_sub_l(a, b)
    }

    pub fn double_sub_g(&mut self, a: f64, b: f64) -> i32 {
        self.record_doubles(a, b);
        numeric::double_sub_g(a, b)
    }

    pub fn double_sub_l(&mut self, a: f64, b: f64) -> i32 {
        self.record_doubles(a, b);
        numeric::double_sub_l(a, b)
    }

    fn record_floats(&mut self, a: f32, b: f32) {
        self.sink.record(Literal::Float(a));
        self.sink.record(Literal::Float(b));
    }

    fn record_doubles(&mut self, a: f64, b: f64) {
        self.sink.record(Literal::Double(a));
        self.sink.record(Literal::Double(b));
    }

    fn record_str(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            self.sink.record(Literal::String(value.to_string()));
        }
    }

    pub fn string_equals(
        &mut self,
        first: Option<&str>,
        second: Option<&str>,
    ) -> Result<i32, DistanceError> {
        self.record_str(first);
        self.record_str(second);
        strings::string_equals(first, second)
    }

    pub fn string_equals_ignore_case(
        &mut self,
        first: Option<&str>,
        second: Option<&str>,
    ) -> Result<i32, DistanceError> {
        self.record_str(first);
        self.record_str(second);
        strings::string_equals_ignore_case(first, second)
    }

    pub fn string_starts_with(
        &mut self,
        value: Option<&str>,
        prefix: &str,
        offset: i32,
    ) -> Result<i32, DistanceError> {
        self.record_str(Some(prefix));
        strings::string_starts_with(value, prefix, offset)
    }

    pub fn string_ends_with(&mut self, value: Option<&str>, suffix: &str) -> Result<i32, DistanceError> {
        self.record_str(Some(suffix));
        strings::string_ends_with(value, suffix)
    }

    pub fn string_matches(&mut self, value: Option<&str>, regex: &str) -> Result<i32, DistanceError> {
        self.record_str(value);
        strings::string_matches(value, regex)
    }

    /// `pushParameter` followed later by `popParameterBooleanFromInt`: a
    /// distance staged for a boolean parameter.
    pub fn stage_distance(&mut self, distance: i32) {
        self.params.push_int(distance);
    }

    pub fn restore_boolean(&mut self) -> Result<bool, DistanceError> {
        self.params.pop_boolean_from_int()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::K;

    #[test]
    fn test_literals_are_recorded() {
        let mut ctx = ExecutionContext::new(2048, Vec::new());
        assert_eq!(ctx.int_sub(3, 10), -7);
        assert_eq!(ctx.string_equals(Some("ab"), Some("ab")), Ok(K));
        assert_eq!(
            ctx.sink(),
            &vec![
                Literal::Int(3),
                Literal::Int(10),
                Literal::String("ab".into()),
                Literal::String("ab".into()),
            ]
        );
    }

    #[test]
    fn test_clear_resets_state() {
        let mut ctx = ExecutionContext::default();
        ctx.push_predicate(-40, 2);
        ctx.stage_distance(5);
        ctx.clear();
        assert_eq!(ctx.tracker.last_distance(2), None);
        assert!(ctx.params.is_empty());
        assert_eq!(ctx.get_distance(2, 0, 1), K);
    }

    #[test]
    fn test_staged_distance_round_trip() {
        let mut ctx = ExecutionContext::default();
        ctx.stage_distance(-3);
        assert_eq!(ctx.restore_boolean(), Ok(false));
        assert!(ctx.restore_boolean().is_err());
    }
}
