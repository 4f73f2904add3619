use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use super::scale_to_distance;
use crate::config::DEFAULT_MAX_INT;

static GLOBAL_TRACKER: Lazy<Mutex<DistanceTracker>> =
    Lazy::new(|| Mutex::new(DistanceTracker::default()));

/// Last observed distance per branch, consulted when a boolean definition is
/// replaced by the distance of the branch it is control dependent on.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceTracker {
    last_distance: HashMap<i32, i32>,
    max_int: i32,
}

impl Default for DistanceTracker {
    fn default() -> Self {
        DistanceTracker::new(DEFAULT_MAX_INT)
    }
}

impl DistanceTracker {
    pub fn new(max_int: i32) -> Self {
        DistanceTracker {
            last_distance: HashMap::new(),
            max_int,
        }
    }

    /// The process-wide tracker shared by instrumented code that has no
    /// context of its own.
    pub fn global() -> &'static Mutex<DistanceTracker> {
        &GLOBAL_TRACKER
    }

    pub fn max_int(&self) -> i32 {
        self.max_int
    }

    /// Forgets every recorded predicate.
    pub fn clear(&mut self) {
        self.last_distance.clear();
    }

    /// Records `|distance|` for `branch_id`, overwriting earlier values.
    pub fn push_predicate(&mut self, distance: i32, branch_id: i32) {
        self.last_distance.insert(branch_id, distance.saturating_abs());
    }

    pub fn last_distance(&self, branch_id: i32) -> Option<i32> {
        self.last_distance.get(&branch_id).copied()
    }

    fn normalize(&self, distance: i32) -> f64 {
        let d = distance as f64;
        d / (d + 0.5 * self.max_int as f64)
    }

    /// Distance for a boolean definition guarded by `branch_id` at the given
    /// approximation level. The sign follows `value`.
    pub fn get_distance(&self, branch_id: i32, level: i32, value: i32) -> i32 {
        let distance = if branch_id > 0 {
            self.last_distance(branch_id).unwrap_or(i32::MAX)
        } else {
            i32::MAX
        };
        let attenuated = (1.0 + self.normalize(distance)) / 2f64.powi(level);
        let magnitude = scale_to_distance(attenuated);
        if value <= 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::K;

    #[test]
    fn test_push_and_clear() {
        let mut tracker = DistanceTracker::new(2048);
        tracker.push_predicate(-17, 3);
        assert_eq!(tracker.last_distance(3), Some(17));
        tracker.push_predicate(i32::MIN, 4);
        assert_eq!(tracker.last_distance(4), Some(i32::MAX));
        tracker.clear();
        assert_eq!(tracker.last_distance(3), None);
    }

    #[test]
    fn test_level_zero_saturates() {
        let tracker = DistanceTracker::default();
        assert_eq!(tracker.get_distance(0, 0, 1), K);
        assert_eq!(tracker.get_distance(0, 0, 0), -K);
        assert_eq!(tracker.get_distance(-5, 0, -3), -K);
    }

    #[test]
    fn test_deeper_levels_shrink() {
        let mut tracker = DistanceTracker::new(2048);
        tracker.push_predicate(1024, 7);
        let l1 = tracker.get_distance(7, 1, 1);
        let l2 = tracker.get_distance(7, 2, 1);
        assert!(l1 > l2 && l2 > 0);
        // normalize(1024) = 0.5, so level 1 gives 0.75 of K
        assert_eq!(l1, scale_to_distance(0.75));
        assert_eq!(tracker.get_distance(7, 1, -1), -l1);
    }

    #[test]
    fn test_closer_predicate_gives_smaller_magnitude() {
        let mut tracker = DistanceTracker::new(2048);
        tracker.push_predicate(1, 1);
        tracker.push_predicate(100_000, 2);
        assert!(tracker.get_distance(1, 3, 1) < tracker.get_distance(2, 3, 1));
    }

    #[test]
    fn test_global_is_shared() {
        let mut tracker = DistanceTracker::global().lock().unwrap();
        tracker.push_predicate(9, 991);
        assert_eq!(tracker.last_distance(991), Some(9));
    }
}
