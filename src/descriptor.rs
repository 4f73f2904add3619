//! JVM type and method descriptors, and the boolean-to-int retyping applied
//! to member signatures.

/// Represents a JVM type from a descriptor string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    Short,
    Boolean,
    Void,
    Reference(String),
    Array(Box<JvmType>),
}

impl JvmType {
    /// Returns true if this type occupies two slots on the JVM stack.
    pub fn is_wide(&self) -> bool {
        matches!(self, JvmType::Long | JvmType::Double)
    }

    /// Number of operand stack / local variable slots a value of this type uses.
    pub fn slot_size(&self) -> u16 {
        match self {
            JvmType::Void => 0,
            t if t.is_wide() => 2,
            _ => 1,
        }
    }

    /// Returns the JVM descriptor string for this type.
    pub fn to_descriptor(&self) -> String {
        match self {
            JvmType::Int => "I".into(),
            JvmType::Long => "J".into(),
            JvmType::Float => "F".into(),
            JvmType::Double => "D".into(),
            JvmType::Byte => "B".into(),
            JvmType::Char => "C".into(),
            JvmType::Short => "S".into(),
            JvmType::Boolean => "Z".into(),
            JvmType::Void => "V".into(),
            JvmType::Reference(name) => format!("L{};", name),
            JvmType::Array(inner) => format!("[{}", inner.to_descriptor()),
        }
    }

    /// Innermost element type of an array, or the type itself.
    pub fn element_type(&self) -> &JvmType {
        match self {
            JvmType::Array(inner) => inner.element_type(),
            other => other,
        }
    }

    /// `boolean`, `boolean[]`, `boolean[][]`, ...
    pub fn is_boolean_like(&self) -> bool {
        *self.element_type() == JvmType::Boolean
    }

    /// Replaces the boolean scalar or array element type with `int`.
    pub fn to_int_if_boolean(&self) -> JvmType {
        match self {
            JvmType::Boolean => JvmType::Int,
            JvmType::Array(inner) => JvmType::Array(Box::new(inner.to_int_if_boolean())),
            other => other.clone(),
        }
    }
}

/// Parse a single type descriptor starting at position `pos` in `desc`.
/// Returns (JvmType, next_position).
pub fn parse_type_at(desc: &str, pos: usize) -> Option<(JvmType, usize)> {
    let bytes = desc.as_bytes();
    if pos >= bytes.len() {
        return None;
    }
    match bytes[pos] {
        b'B' => Some((JvmType::Byte, pos + 1)),
        b'C' => Some((JvmType::Char, pos + 1)),
        b'D' => Some((JvmType::Double, pos + 1)),
        b'F' => Some((JvmType::Float, pos + 1)),
        b'I' => Some((JvmType::Int, pos + 1)),
        b'J' => Some((JvmType::Long, pos + 1)),
        b'S' => Some((JvmType::Short, pos + 1)),
        b'Z' => Some((JvmType::Boolean, pos + 1)),
        b'V' => Some((JvmType::Void, pos + 1)),
        b'L' => {
            let semi = desc[pos + 1..].find(';')?;
            let class_name = &desc[pos + 1..pos + 1 + semi];
            Some((JvmType::Reference(class_name.to_string()), pos + 1 + semi + 1))
        }
        b'[' => {
            let (inner, next) = parse_type_at(desc, pos + 1)?;
            Some((JvmType::Array(Box::new(inner)), next))
        }
        _ => None,
    }
}

/// Parse a full type descriptor string. Trailing characters are rejected.
pub fn parse_type_descriptor(desc: &str) -> Option<JvmType> {
    let (ty, next) = parse_type_at(desc, 0)?;
    if next != desc.len() {
        return None;
    }
    Some(ty)
}

/// Parse a method descriptor, e.g. "(II)V" -> ([Int, Int], Void)
pub fn parse_method_descriptor(desc: &str) -> Option<(Vec<JvmType>, JvmType)> {
    if !desc.starts_with('(') {
        return None;
    }
    let close = desc.find(')')?;
    let mut params = Vec::new();
    let mut pos = 1;
    while pos < close {
        let (ty, next) = parse_type_at(desc, pos)?;
        params.push(ty);
        pos = next;
    }
    let (ret, end) = parse_type_at(desc, close + 1)?;
    if end != desc.len() {
        return None;
    }
    Some((params, ret))
}

/// Build a method descriptor from its parts.
pub fn method_descriptor(params: &[JvmType], ret: &JvmType) -> String {
    let mut desc = String::from("(");
    for param in params {
        desc.push_str(&param.to_descriptor());
    }
    desc.push(')');
    desc.push_str(&ret.to_descriptor());
    desc
}

/// Return type of a method descriptor.
pub fn return_type(desc: &str) -> Option<JvmType> {
    parse_method_descriptor(desc).map(|(_, ret)| ret)
}

/// Total slots taken by the arguments of a method descriptor.
pub fn argument_slots(desc: &str) -> Option<u16> {
    let (params, _) = parse_method_descriptor(desc)?;
    Some(params.iter().map(JvmType::slot_size).sum())
}

/// True if any parameter or the return type is boolean or a boolean array.
pub fn is_boolean_method(desc: &str) -> bool {
    match parse_method_descriptor(desc) {
        Some((params, ret)) => ret.is_boolean_like() || params.iter().any(JvmType::is_boolean_like),
        None => false,
    }
}

/// True if a field descriptor is boolean or a boolean array.
pub fn is_boolean_field(desc: &str) -> bool {
    parse_type_descriptor(desc).is_some_and(|t| t.is_boolean_like())
}

/// True if any parameter (not the return type) is boolean-like.
pub fn has_boolean_parameters(desc: &str) -> bool {
    parse_method_descriptor(desc).is_some_and(|(params, _)| params.iter().any(JvmType::is_boolean_like))
}

/// `(ZI[Z)Z` -> `(II[I)I`. Malformed descriptors are returned unchanged.
pub fn transform_method_descriptor(desc: &str) -> String {
    match parse_method_descriptor(desc) {
        Some((params, ret)) => {
            let params: Vec<JvmType> = params.iter().map(JvmType::to_int_if_boolean).collect();
            method_descriptor(&params, &ret.to_int_if_boolean())
        }
        None => desc.to_string(),
    }
}

/// `Z` -> `I`, `[[Z` -> `[[I`. Malformed descriptors are returned unchanged.
pub fn transform_field_descriptor(desc: &str) -> String {
    match parse_type_descriptor(desc) {
        Some(ty) => ty.to_int_if_boolean().to_descriptor(),
        None => desc.to_string(),
    }
}

/// Rewrites the element type of an array or class operand of a type
/// instruction (`anewarray`, `checkcast`, `multianewarray`). Plain internal
/// class names are left alone.
pub fn transform_type_operand(desc: &str) -> String {
    if desc.starts_with('[') {
        transform_field_descriptor(desc)
    } else {
        desc.to_string()
    }
}

/// Field descriptor of a type instruction operand: `a/B` -> `La/B;`, arrays
/// unchanged.
pub fn operand_descriptor(operand: &str) -> String {
    if operand.starts_with('[') {
        operand.to_string()
    } else {
        format!("L{};", operand)
    }
}

/// `newarray` element type codes.
pub const T_BOOLEAN: u8 = 4;
pub const T_INT: u8 = 10;

/// Convert a newarray type code to JvmType.
pub fn newarray_type(atype: u8) -> Option<JvmType> {
    match atype {
        4 => Some(JvmType::Boolean),
        5 => Some(JvmType::Char),
        6 => Some(JvmType::Float),
        7 => Some(JvmType::Double),
        8 => Some(JvmType::Byte),
        9 => Some(JvmType::Short),
        10 => Some(JvmType::Int),
        11 => Some(JvmType::Long),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse_type_descriptor("I"), Some(JvmType::Int));
        assert_eq!(parse_type_descriptor("J"), Some(JvmType::Long));
        assert_eq!(parse_type_descriptor("Z"), Some(JvmType::Boolean));
        assert_eq!(parse_type_descriptor("ZZ"), None);
    }

    #[test]
    fn test_parse_method_descriptor() {
        let (params, ret) = parse_method_descriptor("(Ljava/lang/String;I)[B").unwrap();
        assert_eq!(params, vec![JvmType::Reference("java/lang/String".into()), JvmType::Int]);
        assert_eq!(ret, JvmType::Array(Box::new(JvmType::Byte)));
        assert_eq!(parse_method_descriptor("(I"), None);
        assert_eq!(parse_method_descriptor("()VX"), None);
    }

    #[test]
    fn test_boolean_detection() {
        assert!(is_boolean_method("(I)Z"));
        assert!(is_boolean_method("([[ZJ)V"));
        assert!(!is_boolean_method("(Ljava/lang/Boolean;)I"));
        assert!(has_boolean_parameters("(ZI)V"));
        assert!(!has_boolean_parameters("(I)Z"));
        assert!(is_boolean_field("[Z"));
        assert!(!is_boolean_field("B"));
    }

    #[test]
    fn test_transform_descriptors() {
        assert_eq!(transform_method_descriptor("(ZJ[ZLjava/lang/String;)Z"), "(IJ[ILjava/lang/String;)I");
        assert_eq!(transform_method_descriptor("()V"), "()V");
        assert_eq!(transform_field_descriptor("[[Z"), "[[I");
        assert_eq!(transform_field_descriptor("LZebra;"), "LZebra;");
        assert_eq!(transform_type_operand("Zebra"), "Zebra");
        assert_eq!(transform_type_operand("[Z"), "[I");
        assert_eq!(operand_descriptor("a/B"), "La/B;");
        assert_eq!(operand_descriptor("[[Z"), "[[Z");
    }

    #[test]
    fn test_argument_slots() {
        assert_eq!(argument_slots("(IJZ[D)V"), Some(5));
        assert_eq!(argument_slots("()V"), Some(0));
    }
}
