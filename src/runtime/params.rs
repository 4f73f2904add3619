//! Staging area for call arguments.
//!
//! When a transformed caller invokes a method that still takes `boolean`
//! parameters, the arguments after the first boolean are parked here so the
//! distance on top of the operand stack can be converted, then restored in
//! order.

use super::numeric::boolean_to_int;
use crate::error::DistanceError;

/// An opaque object reference as seen by the parameter stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    #[default]
    Null,
    Handle(u64),
}

impl ObjectRef {
    pub fn is_null(&self) -> bool {
        matches!(self, ObjectRef::Null)
    }
}

/// Declares one LIFO lane per parameter kind together with its push and pop
/// operations.
macro_rules! parameter_lanes {
    ($($lane:ident: $t:ty => $push:ident, $pop:ident, $label:expr;)+) => {
        /// Typed LIFO stacks, one per JVM parameter kind.
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct ParameterStack {
            $($lane: Vec<$t>,)+
        }

        impl ParameterStack {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $push(&mut self, value: $t) {
                    self.$lane.push(value);
                }

                pub fn $pop(&mut self) -> Result<$t, DistanceError> {
                    self.$lane.pop().ok_or(DistanceError::EmptyParameterStack($label))
                }
            )+

            /// Number of staged values across all lanes.
            pub fn len(&self) -> usize {
                0 $(+ self.$lane.len())+
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn clear(&mut self) {
                $(self.$lane.clear();)+
            }
        }
    };
}

parameter_lanes! {
    booleans: bool => push_boolean, pop_boolean, "boolean";
    chars: u16 => push_char, pop_char, "char";
    bytes: i8 => push_byte, pop_byte, "byte";
    shorts: i16 => push_short, pop_short, "short";
    ints: i32 => push_int, pop_int, "int";
    floats: f32 => push_float, pop_float, "float";
    longs: i64 => push_long, pop_long, "long";
    doubles: f64 => push_double, pop_double, "double";
    objects: ObjectRef => push_object, pop_object, "object";
}

impl ParameterStack {
    /// Pops a distance staged as an int and turns it back into a boolean.
    pub fn pop_boolean_from_int(&mut self) -> Result<bool, DistanceError> {
        self.pop_int().map(|distance| distance > 0)
    }

    /// Pops a staged boolean as its distance encoding.
    pub fn pop_int_from_boolean(&mut self) -> Result<i32, DistanceError> {
        self.pop_boolean().map(boolean_to_int)
    }
}
