use std::collections::HashMap;
use std::fmt;

/// A position in an instruction list, bound by an [`Insn::Label`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Operand of `ldc`.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Class literal, internal name or array descriptor.
    Class(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        MethodRef {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        FieldRef {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }
}

/// One JVM instruction with symbolic operands. Short forms (`iload_0`,
/// `goto_w`, `wide`) are folded into their general variant.
#[derive(Clone, Debug, PartialEq)]
pub enum Insn {
    Nop,
    Aconstnull,
    Iconstm1,
    Iconst0,
    Iconst1,
    Iconst2,
    Iconst3,
    Iconst4,
    Iconst5,
    Lconst0,
    Lconst1,
    Fconst0,
    Fconst1,
    Fconst2,
    Dconst0,
    Dconst1,
    Bipush(i8),
    Sipush(i16),
    Ldc(Constant),
    Iload(u16),
    Lload(u16),
    Fload(u16),
    Dload(u16),
    Aload(u16),
    Iaload,
    Laload,
    Faload,
    Daload,
    Aaload,
    Baload,
    Caload,
    Saload,
    Istore(u16),
    Lstore(u16),
    Fstore(u16),
    Dstore(u16),
    Astore(u16),
    Iastore,
    Lastore,
    Fastore,
    Dastore,
    Aastore,
    Bastore,
    Castore,
    Sastore,
    Pop,
    Pop2,
    Dup,
    Dupx1,
    Dupx2,
    Dup2,
    Dup2x1,
    Dup2x2,
    Swap,
    Iadd,
    Ladd,
    Fadd,
    Dadd,
    Isub,
    Lsub,
    Fsub,
    Dsub,
    Imul,
    Lmul,
    Fmul,
    Dmul,
    Idiv,
    Ldiv,
    Fdiv,
    Ddiv,
    Irem,
    Lrem,
    Frem,
    Drem,
    Ineg,
    Lneg,
    Fneg,
    Dneg,
    Ishl,
    Lshl,
    Ishr,
    Lshr,
    Iushr,
    Lushr,
    Iand,
    Land,
    Ior,
    Lor,
    Ixor,
    Lxor,
    Iinc { index: u16, value: i16 },
    I2l,
    I2f,
    I2d,
    L2i,
    L2f,
    L2d,
    F2i,
    F2l,
    F2d,
    D2i,
    D2l,
    D2f,
    I2b,
    I2c,
    I2s,
    Lcmp,
    Fcmpl,
    Fcmpg,
    Dcmpl,
    Dcmpg,
    Ifeq(Label),
    Ifne(Label),
    Iflt(Label),
    Ifge(Label),
    Ifgt(Label),
    Ifle(Label),
    IfIcmpeq(Label),
    IfIcmpne(Label),
    IfIcmplt(Label),
    IfIcmpge(Label),
    IfIcmpgt(Label),
    IfIcmple(Label),
    IfAcmpeq(Label),
    IfAcmpne(Label),
    Goto(Label),
    Jsr(Label),
    Ret(u16),
    Tableswitch {
        default: Label,
        low: i32,
        high: i32,
        labels: Vec<Label>,
    },
    Lookupswitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
    Ireturn,
    Lreturn,
    Freturn,
    Dreturn,
    Areturn,
    Return,
    Getstatic(FieldRef),
    Putstatic(FieldRef),
    Getfield(FieldRef),
    Putfield(FieldRef),
    Invokevirtual(MethodRef),
    Invokespecial(MethodRef),
    Invokestatic(MethodRef),
    Invokeinterface(MethodRef),
    Invokedynamic { name: String, desc: String },
    New(String),
    Newarray(u8),
    Anewarray(String),
    Arraylength,
    Athrow,
    Checkcast(String),
    Instanceof(String),
    Monitorenter,
    Monitorexit,
    Multianewarray { desc: String, dimensions: u8 },
    Ifnull(Label),
    Ifnonnull(Label),
    /// Binds a label to the next instruction.
    Label(Label),
    LineNumber { line: u16, start: Label },
}

impl Insn {
    /// JVM opcode byte; `None` for pseudo-instructions.
    pub fn opcode(&self) -> Option<u8> {
        let op = match self {
            Insn::Nop => 0x00,
            Insn::Aconstnull => 0x01,
            Insn::Iconstm1 => 0x02,
            Insn::Iconst0 => 0x03,
            Insn::Iconst1 => 0x04,
            Insn::Iconst2 => 0x05,
            Insn::Iconst3 => 0x06,
            Insn::Iconst4 => 0x07,
            Insn::Iconst5 => 0x08,
            Insn::Lconst0 => 0x09,
            Insn::Lconst1 => 0x0a,
            Insn::Fconst0 => 0x0b,
            Insn::Fconst1 => 0x0c,
            Insn::Fconst2 => 0x0d,
            Insn::Dconst0 => 0x0e,
            Insn::Dconst1 => 0x0f,
            Insn::Bipush(_) => 0x10,
            Insn::Sipush(_) => 0x11,
            Insn::Ldc(Constant::Long(_)) | Insn::Ldc(Constant::Double(_)) => 0x14,
            Insn::Ldc(_) => 0x12,
            Insn::Iload(_) => 0x15,
            Insn::Lload(_) => 0x16,
            Insn::Fload(_) => 0x17,
            Insn::Dload(_) => 0x18,
            Insn::Aload(_) => 0x19,
            Insn::Iaload => 0x2e,
            Insn::Laload => 0x2f,
            Insn::Faload => 0x30,
            Insn::Daload => 0x31,
            Insn::Aaload => 0x32,
            Insn::Baload => 0x33,
            Insn::Caload => 0x34,
            Insn::Saload => 0x35,
            Insn::Istore(_) => 0x36,
            Insn::Lstore(_) => 0x37,
            Insn::Fstore(_) => 0x38,
            Insn::Dstore(_) => 0x39,
            Insn::Astore(_) => 0x3a,
            Insn::Iastore => 0x4f,
            Insn::Lastore => 0x50,
            Insn::Fastore => 0x51,
            Insn::Dastore => 0x52,
            Insn::Aastore => 0x53,
            Insn::Bastore => 0x54,
            Insn::Castore => 0x55,
            Insn::Sastore => 0x56,
            Insn::Pop => 0x57,
            Insn::Pop2 => 0x58,
            Insn::Dup => 0x59,
            Insn::Dupx1 => 0x5a,
            Insn::Dupx2 => 0x5b,
            Insn::Dup2 => 0x5c,
            Insn::Dup2x1 => 0x5d,
            Insn::Dup2x2 => 0x5e,
            Insn::Swap => 0x5f,
            Insn::Iadd => 0x60,
            Insn::Ladd => 0x61,
            Insn::Fadd => 0x62,
            Insn::Dadd => 0x63,
            Insn::Isub => 0x64,
            Insn::Lsub => 0x65,
            Insn::Fsub => 0x66,
            Insn::Dsub => 0x67,
            Insn::Imul => 0x68,
            Insn::Lmul => 0x69,
            Insn::Fmul => 0x6a,
            Insn::Dmul => 0x6b,
            Insn::Idiv => 0x6c,
            Insn::Ldiv => 0x6d,
            Insn::Fdiv => 0x6e,
            Insn::Ddiv => 0x6f,
            Insn::Irem => 0x70,
            Insn::Lrem => 0x71,
            Insn::Frem => 0x72,
            Insn::Drem => 0x73,
            Insn::Ineg => 0x74,
            Insn::Lneg => 0x75,
            Insn::Fneg => 0x76,
            Insn::Dneg => 0x77,
            Insn::Ishl => 0x78,
            Insn::Lshl => 0x79,
            Insn::Ishr => 0x7a,
            Insn::Lshr => 0x7b,
            Insn::Iushr => 0x7c,
            Insn::Lushr => 0x7d,
            Insn::Iand => 0x7e,
            Insn::Land => 0x7f,
            Insn::Ior => 0x80,
            Insn::Lor => 0x81,
            Insn::Ixor => 0x82,
            Insn::Lxor => 0x83,
            Insn::Iinc { .. } => 0x84,
            Insn::I2l => 0x85,
            Insn::I2f => 0x86,
            Insn::I2d => 0x87,
            Insn::L2i => 0x88,
            Insn::L2f => 0x89,
            Insn::L2d => 0x8a,
            Insn::F2i => 0x8b,
            Insn::F2l => 0x8c,
            Insn::F2d => 0x8d,
            Insn::D2i => 0x8e,
            Insn::D2l => 0x8f,
            Insn::D2f => 0x90,
            Insn::I2b => 0x91,
            Insn::I2c => 0x92,
            Insn::I2s => 0x93,
            Insn::Lcmp => 0x94,
            Insn::Fcmpl => 0x95,
            Insn::Fcmpg => 0x96,
            Insn::Dcmpl => 0x97,
            Insn::Dcmpg => 0x98,
            Insn::Ifeq(_) => 0x99,
            Insn::Ifne(_) => 0x9a,
            Insn::Iflt(_) => 0x9b,
            Insn::Ifge(_) => 0x9c,
            Insn::Ifgt(_) => 0x9d,
            Insn::Ifle(_) => 0x9e,
            Insn::IfIcmpeq(_) => 0x9f,
            Insn::IfIcmpne(_) => 0xa0,
            Insn::IfIcmplt(_) => 0xa1,
            Insn::IfIcmpge(_) => 0xa2,
            Insn::IfIcmpgt(_) => 0xa3,
            Insn::IfIcmple(_) => 0xa4,
            Insn::IfAcmpeq(_) => 0xa5,
            Insn::IfAcmpne(_) => 0xa6,
            Insn::Goto(_) => 0xa7,
            Insn::Jsr(_) => 0xa8,
            Insn::Ret(_) => 0xa9,
            Insn::Tableswitch { .. } => 0xaa,
            Insn::Lookupswitch { .. } => 0xab,
            Insn::Ireturn => 0xac,
            Insn::Lreturn => 0xad,
            Insn::Freturn => 0xae,
            Insn::Dreturn => 0xaf,
            Insn::Areturn => 0xb0,
            Insn::Return => 0xb1,
            Insn::Getstatic(_) => 0xb2,
            Insn::Putstatic(_) => 0xb3,
            Insn::Getfield(_) => 0xb4,
            Insn::Putfield(_) => 0xb5,
            Insn::Invokevirtual(_) => 0xb6,
            Insn::Invokespecial(_) => 0xb7,
            Insn::Invokestatic(_) => 0xb8,
            Insn::Invokeinterface(_) => 0xb9,
            Insn::Invokedynamic { .. } => 0xba,
            Insn::New(_) => 0xbb,
            Insn::Newarray(_) => 0xbc,
            Insn::Anewarray(_) => 0xbd,
            Insn::Arraylength => 0xbe,
            Insn::Athrow => 0xbf,
            Insn::Checkcast(_) => 0xc0,
            Insn::Instanceof(_) => 0xc1,
            Insn::Monitorenter => 0xc2,
            Insn::Monitorexit => 0xc3,
            Insn::Multianewarray { .. } => 0xc5,
            Insn::Ifnull(_) => 0xc6,
            Insn::Ifnonnull(_) => 0xc7,
            Insn::Label(_) | Insn::LineNumber { .. } => return None,
        };
        Some(op)
    }

    /// Labels and line numbers.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Insn::Label(_) | Insn::LineNumber { .. })
    }

    /// `ifeq` .. `ifle`: pops one int.
    pub fn is_unary_int_jump(&self) -> bool {
        matches!(
            self,
            Insn::Ifeq(_) | Insn::Ifne(_) | Insn::Iflt(_) | Insn::Ifge(_) | Insn::Ifgt(_) | Insn::Ifle(_)
        )
    }

    /// `if_icmpeq` .. `if_icmple`: pops two ints.
    pub fn is_binary_int_jump(&self) -> bool {
        matches!(
            self,
            Insn::IfIcmpeq(_)
                | Insn::IfIcmpne(_)
                | Insn::IfIcmplt(_)
                | Insn::IfIcmpge(_)
                | Insn::IfIcmpgt(_)
                | Insn::IfIcmple(_)
        )
    }

    pub fn is_null_jump(&self) -> bool {
        matches!(self, Insn::Ifnull(_) | Insn::Ifnonnull(_))
    }

    pub fn is_reference_jump(&self) -> bool {
        matches!(self, Insn::IfAcmpeq(_) | Insn::IfAcmpne(_))
    }

    /// Any two-way test.
    pub fn is_conditional_jump(&self) -> bool {
        self.is_unary_int_jump() || self.is_binary_int_jump() || self.is_null_jump() || self.is_reference_jump()
    }

    /// Target of a conditional jump, `goto` or `jsr`.
    pub fn jump_target(&self) -> Option<Label> {
        match self {
            Insn::Ifeq(l)
            | Insn::Ifne(l)
            | Insn::Iflt(l)
            | Insn::Ifge(l)
            | Insn::Ifgt(l)
            | Insn::Ifle(l)
            | Insn::IfIcmpeq(l)
            | Insn::IfIcmpne(l)
            | Insn::IfIcmplt(l)
            | Insn::IfIcmpge(l)
            | Insn::IfIcmpgt(l)
            | Insn::IfIcmple(l)
            | Insn::IfAcmpeq(l)
            | Insn::IfAcmpne(l)
            | Insn::Ifnull(l)
            | Insn::Ifnonnull(l)
            | Insn::Goto(l)
            | Insn::Jsr(l) => Some(*l),
            _ => None,
        }
    }

    /// Points a jump at a different label. Returns false for non-jumps.
    pub fn retarget(&mut self, target: Label) -> bool {
        match self {
            Insn::Ifeq(l)
            | Insn::Ifne(l)
            | Insn::Iflt(l)
            | Insn::Ifge(l)
            | Insn::Ifgt(l)
            | Insn::Ifle(l)
            | Insn::IfIcmpeq(l)
            | Insn::IfIcmpne(l)
            | Insn::IfIcmplt(l)
            | Insn::IfIcmpge(l)
            | Insn::IfIcmpgt(l)
            | Insn::IfIcmple(l)
            | Insn::IfAcmpeq(l)
            | Insn::IfAcmpne(l)
            | Insn::Ifnull(l)
            | Insn::Ifnonnull(l)
            | Insn::Goto(l)
            | Insn::Jsr(l) => {
                *l = target;
                true
            }
            _ => false,
        }
    }

    /// All labels a switch may transfer to, default first.
    pub fn switch_targets(&self) -> Vec<Label> {
        match self {
            Insn::Tableswitch { default, labels, .. } => {
                let mut targets = vec![*default];
                targets.extend(labels.iter().copied());
                targets
            }
            Insn::Lookupswitch { default, pairs } => {
                let mut targets = vec![*default];
                targets.extend(pairs.iter().map(|(_, l)| *l));
                targets
            }
            _ => Vec::new(),
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(
            self,
            Insn::Ireturn | Insn::Lreturn | Insn::Freturn | Insn::Dreturn | Insn::Areturn | Insn::Return
        )
    }

    /// Control never falls through to the next instruction.
    pub fn ends_block(&self) -> bool {
        self.is_return()
            || matches!(
                self,
                Insn::Goto(_) | Insn::Athrow | Insn::Ret(_) | Insn::Tableswitch { .. } | Insn::Lookupswitch { .. }
            )
    }

    pub fn method_ref(&self) -> Option<&MethodRef> {
        match self {
            Insn::Invokevirtual(m) | Insn::Invokespecial(m) | Insn::Invokestatic(m) | Insn::Invokeinterface(m) => Some(m),
            _ => None,
        }
    }

    pub fn field_ref(&self) -> Option<&FieldRef> {
        match self {
            Insn::Getstatic(f) | Insn::Putstatic(f) | Insn::Getfield(f) | Insn::Putfield(f) => Some(f),
            _ => None,
        }
    }

    /// Local variable slot read or written by a load/store.
    pub fn var_index(&self) -> Option<u16> {
        match self {
            Insn::Iload(i)
            | Insn::Lload(i)
            | Insn::Fload(i)
            | Insn::Dload(i)
            | Insn::Aload(i)
            | Insn::Istore(i)
            | Insn::Lstore(i)
            | Insn::Fstore(i)
            | Insn::Dstore(i)
            | Insn::Astore(i)
            | Insn::Ret(i) => Some(*i),
            Insn::Iinc { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Push of the int constant, if this is a plain int literal.
    pub fn int_constant(&self) -> Option<i32> {
        match self {
            Insn::Iconstm1 => Some(-1),
            Insn::Iconst0 => Some(0),
            Insn::Iconst1 => Some(1),
            Insn::Iconst2 => Some(2),
            Insn::Iconst3 => Some(3),
            Insn::Iconst4 => Some(4),
            Insn::Iconst5 => Some(5),
            Insn::Bipush(v) => Some(*v as i32),
            Insn::Sipush(v) => Some(*v as i32),
            Insn::Ldc(Constant::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Shortest instruction pushing `value`.
    pub fn push_int(value: i32) -> Insn {
        match value {
            -1 => Insn::Iconstm1,
            0 => Insn::Iconst0,
            1 => Insn::Iconst1,
            2 => Insn::Iconst2,
            3 => Insn::Iconst3,
            4 => Insn::Iconst4,
            5 => Insn::Iconst5,
            v if (i8::MIN as i32..=i8::MAX as i32).contains(&v) => Insn::Bipush(v as i8),
            v if (i16::MIN as i32..=i16::MAX as i32).contains(&v) => Insn::Sipush(v as i16),
            v => Insn::Ldc(Constant::Int(v)),
        }
    }
}

/// A LocalVariableTable entry; `start..end` is the live range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub desc: String,
    pub index: u16,
    pub start: Label,
    pub end: Label,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TryCatchBlock {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// `None` catches everything (`finally`).
    pub catch_type: Option<String>,
}

/// Index of the `Insn::Label` binding each label.
pub fn label_positions(insns: &[Insn]) -> HashMap<Label, usize> {
    insns
        .iter()
        .enumerate()
        .filter_map(|(i, insn)| match insn {
            Insn::Label(l) => Some((*l, i)),
            _ => None,
        })
        .collect()
}

/// One past the largest label id used anywhere in `insns`, for minting fresh labels.
pub fn next_label_id(insns: &[Insn]) -> u32 {
    let mut max = None;
    let mut see = |l: Label| max = Some(max.map_or(l.0, |m: u32| m.max(l.0)));
    for insn in insns {
        match insn {
            Insn::Label(l) => see(*l),
            Insn::LineNumber { start, .. } => see(*start),
            other => {
                if let Some(l) = other.jump_target() {
                    see(l);
                }
                for l in other.switch_targets() {
                    see(l);
                }
            }
        }
    }
    max.map_or(0, |m| m + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes() {
        assert_eq!(Insn::Ifnull(Label(0)).opcode(), Some(198));
        assert_eq!(Insn::IfAcmpne(Label(0)).opcode(), Some(0xa6));
        assert_eq!(Insn::Ldc(Constant::Long(1)).opcode(), Some(0x14));
        assert_eq!(Insn::Label(Label(3)).opcode(), None);
    }

    #[test]
    fn test_push_int() {
        assert_eq!(Insn::push_int(1), Insn::Iconst1);
        assert_eq!(Insn::push_int(-100), Insn::Bipush(-100));
        assert_eq!(Insn::push_int(1000), Insn::Sipush(1000));
        assert_eq!(Insn::push_int(i32::MAX - 2), Insn::Ldc(Constant::Int(i32::MAX - 2)));
        for v in [-1, 0, 5, 127, -32768, 70000] {
            assert_eq!(Insn::push_int(v).int_constant(), Some(v));
        }
    }

    #[test]
    fn test_retarget_and_labels() {
        let mut jump = Insn::IfIcmplt(Label(1));
        assert!(jump.retarget(Label(7)));
        assert_eq!(jump.jump_target(), Some(Label(7)));
        assert!(!Insn::Iadd.clone().retarget(Label(7)));

        let insns = vec![
            Insn::Label(Label(2)),
            Insn::Iload(0),
            Insn::Tableswitch { default: Label(2), low: 0, high: 0, labels: vec![Label(9)] },
        ];
        assert_eq!(next_label_id(&insns), 10);
        assert_eq!(label_positions(&insns).get(&Label(2)), Some(&0));
    }
}
