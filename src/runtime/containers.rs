//! Distances replacing collection and map predicates.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::{scale_to_distance, K, TRUE};

/// An element that may carry a numeric value, used to say how close a
/// missing element is to one that is present.
pub trait ElementDistance: PartialEq {
    fn numeric(&self) -> Option<f64> {
        None
    }
}

macro_rules! numeric_element {
    ($($t:ty),*) => {
        $(
            impl ElementDistance for $t {
                fn numeric(&self) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

numeric_element!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl ElementDistance for char {}
impl ElementDistance for bool {}
impl ElementDistance for String {}
impl ElementDistance for &str {}

impl<T: ElementDistance> ElementDistance for Option<T> {
    fn numeric(&self) -> Option<f64> {
        self.as_ref().and_then(ElementDistance::numeric)
    }
}

fn saturating_len(len: usize) -> i32 {
    len.min(K as usize) as i32
}

/// `collection.isEmpty()`.
pub fn collection_is_empty<T>(collection: &[T]) -> i32 {
    if collection.is_empty() {
        TRUE
    } else {
        -saturating_len(collection.len())
    }
}

fn contains_in<'a, T, I>(elements: I, size: usize, target: &T) -> i32
where
    T: ElementDistance + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut matching = 0usize;
    let mut min_distance: Option<f64> = None;
    for element in elements {
        if element == target {
            matching += 1;
            continue;
        }
        if let (Some(a), Some(b)) = (element.numeric(), target.numeric()) {
            let gap = (a - b).abs();
            min_distance = Some(min_distance.map_or(gap, |m| m.min(gap)));
        }
    }
    if matching > 0 {
        return saturating_len(matching);
    }
    match min_distance {
        Some(d) => -scale_to_distance(d / (d + 1.0)),
        None => -saturating_len(size.saturating_add(1)),
    }
}

/// `collection.contains(target)`: the number of matches, or how far the
/// closest element is from the target.
pub fn collection_contains<T: ElementDistance>(collection: &[T], target: &T) -> i32 {
    contains_in(collection.iter(), collection.len(), target)
}

/// `collection.containsAll(targets)`: `K` when every target is present,
/// otherwise minus the number of missing targets.
pub fn collection_contains_all<T: ElementDistance>(collection: &[T], targets: &[T]) -> i32 {
    let missing = targets.iter().filter(|t| !collection.contains(t)).count();
    if missing == 0 {
        TRUE
    } else {
        -saturating_len(missing)
    }
}

/// Read-only view over map types so the map helpers cover both the hashed
/// and the ordered map.
pub trait MapView<Key, Value> {
    fn entry_count(&self) -> usize;
    fn key_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Key> + 'a>;
    fn value_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Value> + 'a>;
}

impl<Key: Eq + Hash, Value> MapView<Key, Value> for HashMap<Key, Value> {
    fn entry_count(&self) -> usize {
        self.len()
    }
    fn key_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Key> + 'a> {
        Box::new(self.keys())
    }
    fn value_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
        Box::new(self.values())
    }
}

impl<Key: Ord, Value> MapView<Key, Value> for BTreeMap<Key, Value> {
    fn entry_count(&self) -> usize {
        self.len()
    }
    fn key_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Key> + 'a> {
        Box::new(self.keys())
    }
    fn value_iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
        Box::new(self.values())
    }
}

/// `map.isEmpty()`.
pub fn map_is_empty<Key, Value, M: MapView<Key, Value>>(map: &M) -> i32 {
    match map.entry_count() {
        0 => TRUE,
        n => -saturating_len(n),
    }
}

/// `map.containsKey(key)`.
pub fn map_contains_key<Key, Value, M>(map: &M, key: &Key) -> i32
where
    Key: ElementDistance,
    M: MapView<Key, Value>,
{
    contains_in(map.key_iter(), map.entry_count(), key)
}

/// `map.containsValue(value)`.
pub fn map_contains_value<Key, Value, M>(map: &M, value: &Value) -> i32
where
    Value: ElementDistance,
    M: MapView<Key, Value>,
{
    contains_in(map.value_iter(), map.entry_count(), value)
}
