//! Distances replacing the boolean `String` predicates.
//!
//! The receiver of every predicate is `Option<&str>` so that a null receiver
//! can be reported instead of silently mapped to a distance.

use super::regex_distance::regex_distance;
use super::{scale_to_distance, squash, K};
use crate::error::DistanceError;

type DistanceResult = Result<i32, DistanceError>;

fn receiver<'a>(value: Option<&'a str>, predicate: &'static str) -> Result<&'a str, DistanceError> {
    value.ok_or(DistanceError::NullReceiver { predicate })
}

/// Length difference plus, for every differing position of the common
/// prefix length, one plus the squashed character difference. A strict
/// prefix of `a` is therefore closer than any string of `a`'s length that
/// differs everywhere. Zero only for equal strings.
pub fn left_align_distance(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let min = a.len().min(b.len());
    let max = a.len().max(b.len());
    let mut distance = (max - min) as f64;
    for (x, y) in a.iter().zip(b.iter()) {
        if x != y {
            let gap = (*x as i64 - *y as i64).unsigned_abs() as f64;
            distance += 1.0 + squash(gap);
        }
    }
    distance
}

/// Levenshtein distance over chars.
pub fn edit_distance(s: &str, t: &str) -> usize {
    let s: Vec<char> = s.chars().collect();
    let t: Vec<char> = t.chars().collect();
    if s.is_empty() {
        return t.len();
    }
    if t.is_empty() {
        return s.len();
    }
    let mut prev: Vec<usize> = (0..=t.len()).collect();
    let mut curr = vec![0; t.len() + 1];
    for (i, sc) in s.iter().enumerate() {
        curr[0] = i + 1;
        for (j, tc) in t.iter().enumerate() {
            let cost = usize::from(sc != tc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[t.len()]
}

fn equals_distance(first: &str, second: &str) -> i32 {
    if first == second {
        return K;
    }
    let distance = left_align_distance(first, second);
    -scale_to_distance(distance / (1.0 + distance))
}

/// `first.equals(second)`.
pub fn string_equals(first: Option<&str>, second: Option<&str>) -> DistanceResult {
    let first = receiver(first, "equals")?;
    Ok(match second {
        None => -K,
        Some(second) => equals_distance(first, second),
    })
}

/// `first.equalsIgnoreCase(second)`.
pub fn string_equals_ignore_case(first: Option<&str>, second: Option<&str>) -> DistanceResult {
    let first = receiver(first, "equalsIgnoreCase")?;
    Ok(match second {
        None => -K,
        Some(second) => equals_distance(&first.to_lowercase(), &second.to_lowercase()),
    })
}

/// `value.startsWith(prefix, offset)`.
pub fn string_starts_with(value: Option<&str>, prefix: &str, offset: i32) -> DistanceResult {
    let value: Vec<char> = receiver(value, "startsWith")?.chars().collect();
    if offset < 0 || offset as usize > value.len() {
        return Ok(-K);
    }
    let start = offset as usize;
    let len = prefix.chars().count().min(value.len());
    let end = (start + len).min(value.len());
    let window: String = value[start..end].iter().collect();
    Ok(equals_distance(&window, prefix))
}

/// `value.endsWith(suffix)`.
pub fn string_ends_with(value: Option<&str>, suffix: &str) -> DistanceResult {
    let value: Vec<char> = receiver(value, "endsWith")?.chars().collect();
    let len = suffix.chars().count().min(value.len());
    let window: String = value[value.len() - len..].iter().collect();
    Ok(equals_distance(&window, suffix))
}

/// `value.isEmpty()`: `K`, or minus the length.
pub fn string_is_empty(value: Option<&str>) -> DistanceResult {
    let len = receiver(value, "isEmpty")?.chars().count();
    Ok(if len == 0 { K } else { -(len.min(K as usize) as i32) })
}

/// `value.regionMatches(ignore_case, this_start, other, start, len)`.
pub fn string_region_matches(
    value: Option<&str>,
    ignore_case: bool,
    this_start: i32,
    other: Option<&str>,
    start: i32,
    len: i32,
) -> DistanceResult {
    let value = receiver(value, "regionMatches")?;
    let Some(other) = other else {
        return Err(DistanceError::NullReceiver { predicate: "regionMatches" });
    };
    let (value, other) = if ignore_case {
        (value.to_lowercase(), other.to_lowercase())
    } else {
        (value.to_string(), other.to_string())
    };
    let value: Vec<char> = value.chars().collect();
    let other: Vec<char> = other.chars().collect();
    if start < 0 || (other.len() as i64) - (start as i64) < len as i64 {
        return Ok(-K);
    }
    if this_start < 0 || (value.len() as i64) - (this_start as i64) < len as i64 {
        return Ok(-K);
    }
    if len <= 0 {
        return Ok(K);
    }
    let (this_start, start, len) = (this_start as usize, start as usize, len as usize);
    let left: String = value[this_start..this_start + len].iter().collect();
    let right: String = other[start..start + len].iter().collect();
    Ok(equals_distance(&left, &right))
}

/// `value.matches(regex)`: `K` on a full match, otherwise minus the edit
/// distance to the closest member of the language (at least 1).
pub fn string_matches(value: Option<&str>, regex: &str) -> DistanceResult {
    let value = receiver(value, "matches")?;
    let distance = regex_distance(value, regex);
    Ok(if distance <= 0.0 {
        K
    } else {
        -(distance.ceil().clamp(1.0, K as f64) as i32)
    })
}
