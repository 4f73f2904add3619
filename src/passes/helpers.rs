//! Static methods of the runtime helper class that rewritten code calls.
//!
//! Each helper mirrors a function of [`crate::runtime`]; the names and
//! descriptors here are the calling convention between the two.

use crate::code_attribute::{Insn, MethodRef};
use crate::descriptor::JvmType;

/// A call target in the helper class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Helper {
    PushPredicate,
    GetDistance,
    IntToBoolean,
    BooleanToInt,
    IntSub,
    LongSub,
    FloatSubG,
    FloatSubL,
    DoubleSubG,
    DoubleSubL,
    Iand,
    Ior,
    Ixor,
    InstanceOf,
    IsNull,
    IsEqual,
    StringEquals,
    StringEqualsIgnoreCase,
    StringStartsWith,
    StringEndsWith,
    StringIsEmpty,
    StringMatches,
    StringRegionMatches,
    StringRegionMatchesIgnoreCase,
    StringMatchRegex,
    CollectionIsEmpty,
    CollectionContains,
    CollectionContainsAll,
    MapIsEmpty,
    MapContainsKey,
    MapContainsValue,
    PushParameter(Lane),
    PopParameter(Lane),
}

impl Helper {
    pub fn name(&self) -> &'static str {
        self.signature().0
    }

    pub fn desc(&self) -> &'static str {
        self.signature().1
    }

    fn signature(&self) -> (&'static str, &'static str) {
        match self {
            Helper::PushPredicate => ("pushPredicate", "(II)V"),
            Helper::GetDistance => ("getDistance", "(III)I"),
            Helper::IntToBoolean => ("intToBoolean", "(I)Z"),
            Helper::BooleanToInt => ("booleanToInt", "(Z)I"),
            Helper::IntSub => ("intSub", "(II)I"),
            Helper::LongSub => ("longSub", "(JJ)I"),
            Helper::FloatSubG => ("floatSubG", "(FF)I"),
            Helper::FloatSubL => ("floatSubL", "(FF)I"),
            Helper::DoubleSubG => ("doubleSubG", "(DD)I"),
            Helper::DoubleSubL => ("doubleSubL", "(DD)I"),
            Helper::Iand => ("iand", "(II)I"),
            Helper::Ior => ("ior", "(II)I"),
            Helper::Ixor => ("ixor", "(II)I"),
            Helper::InstanceOf => ("instanceOf", "(Ljava/lang/Object;Ljava/lang/Class;)I"),
            Helper::IsNull => ("isNull", "(Ljava/lang/Object;I)I"),
            Helper::IsEqual => ("isEqual", "(Ljava/lang/Object;Ljava/lang/Object;I)I"),
            Helper::StringEquals => ("StringEquals", "(Ljava/lang/String;Ljava/lang/Object;)I"),
            Helper::StringEqualsIgnoreCase => ("StringEqualsIgnoreCase", "(Ljava/lang/String;Ljava/lang/String;)I"),
            Helper::StringStartsWith => ("StringStartsWith", "(Ljava/lang/String;Ljava/lang/String;I)I"),
            Helper::StringEndsWith => ("StringEndsWith", "(Ljava/lang/String;Ljava/lang/String;)I"),
            Helper::StringIsEmpty => ("StringIsEmpty", "(Ljava/lang/String;)I"),
            Helper::StringMatches => ("StringMatches", "(Ljava/lang/String;Ljava/lang/String;)I"),
            Helper::StringRegionMatches => ("StringRegionMatches", "(Ljava/lang/String;ILjava/lang/String;II)I"),
            Helper::StringRegionMatchesIgnoreCase => {
                ("StringRegionMatches", "(Ljava/lang/String;IILjava/lang/String;II)I")
            }
            Helper::StringMatchRegex => ("StringMatchRegex", "(Ljava/lang/String;Ljava/lang/CharSequence;)I"),
            Helper::CollectionIsEmpty => ("collectionIsEmpty", "(Ljava/util/Collection;)I"),
            Helper::CollectionContains => ("collectionContains", "(Ljava/util/Collection;Ljava/lang/Object;)I"),
            Helper::CollectionContainsAll => ("collectionContainsAll", "(Ljava/util/Collection;Ljava/util/Collection;)I"),
            Helper::MapIsEmpty => ("mapIsEmpty", "(Ljava/util/Map;)I"),
            Helper::MapContainsKey => ("mapContainsKey", "(Ljava/util/Map;Ljava/lang/Object;)I"),
            Helper::MapContainsValue => ("mapContainsValue", "(Ljava/util/Map;Ljava/lang/Object;)I"),
            Helper::PushParameter(lane) => lane.push_signature(),
            Helper::PopParameter(lane) => lane.pop_signature(),
        }
    }

    /// `invokestatic` of this helper on `helper_class`.
    pub fn call(&self, helper_class: &str) -> Insn {
        Insn::Invokestatic(MethodRef::new(helper_class, self.name(), self.desc()))
    }
}

/// Parameter stack lane an argument is staged in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    /// A boolean argument, staged as its distance.
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Float,
    Long,
    Double,
    Object,
}

impl Lane {
    pub fn of(ty: &JvmType) -> Lane {
        match ty {
            JvmType::Boolean => Lane::Boolean,
            JvmType::Char => Lane::Char,
            JvmType::Byte => Lane::Byte,
            JvmType::Short => Lane::Short,
            JvmType::Int => Lane::Int,
            JvmType::Float => Lane::Float,
            JvmType::Long => Lane::Long,
            JvmType::Double => Lane::Double,
            JvmType::Reference(_) | JvmType::Array(_) | JvmType::Void => Lane::Object,
        }
    }

    fn push_signature(&self) -> (&'static str, &'static str) {
        let desc = match self {
            Lane::Boolean | Lane::Int => "(I)V",
            Lane::Char => "(C)V",
            Lane::Byte => "(B)V",
            Lane::Short => "(S)V",
            Lane::Float => "(F)V",
            Lane::Long => "(J)V",
            Lane::Double => "(D)V",
            Lane::Object => "(Ljava/lang/Object;)V",
        };
        ("pushParameter", desc)
    }

    fn pop_signature(&self) -> (&'static str, &'static str) {
        match self {
            Lane::Boolean => ("popParameterBooleanFromInt", "()Z"),
            Lane::Char => ("popParameterChar", "()C"),
            Lane::Byte => ("popParameterByte", "()B"),
            Lane::Short => ("popParameterShort", "()S"),
            Lane::Int => ("popParameterInt", "()I"),
            Lane::Float => ("popParameterFloat", "()F"),
            Lane::Long => ("popParameterLong", "()J"),
            Lane::Double => ("popParameterDouble", "()D"),
            Lane::Object => ("popParameterObject", "()Ljava/lang/Object;"),
        }
    }
}
