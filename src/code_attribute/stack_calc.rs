use super::{Constant, Insn};
use crate::descriptor::{argument_slots, parse_type_descriptor, return_type};

/// Compute max_stack by walking instructions and tracking stack depth.
pub fn compute_max_stack(instructions: &[Insn]) -> u16 {
    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;

    for instr in instructions {
        depth += stack_delta(instr);
        if depth > max_depth {
            max_depth = depth;
        }
        // Clamp to prevent underflow from unreachable code
        if depth < 0 {
            depth = 0;
        }
    }

    // The linear walk does not follow control flow: one slot for a caught
    // exception plus one for merge points it misjudges.
    let result = max_depth + 2;
    result.clamp(1, u16::MAX as i32) as u16
}

fn field_slots(desc: &str) -> i32 {
    parse_type_descriptor(desc).map_or(1, |t| t.slot_size() as i32)
}

fn invoke_delta(desc: &str, has_receiver: bool) -> i32 {
    let args = argument_slots(desc).map_or(0, |s| s as i32);
    let ret = return_type(desc).map_or(0, |t| t.slot_size() as i32);
    ret - args - i32::from(has_receiver)
}

/// Returns the net stack depth change (in slots) for an instruction.
pub fn stack_delta(instr: &Insn) -> i32 {
    match instr {
        Insn::Label(_) | Insn::LineNumber { .. } | Insn::Nop => 0,

        // Constants: push 1
        Insn::Aconstnull
        | Insn::Iconstm1
        | Insn::Iconst0
        | Insn::Iconst1
        | Insn::Iconst2
        | Insn::Iconst3
        | Insn::Iconst4
        | Insn::Iconst5
        | Insn::Fconst0
        | Insn::Fconst1
        | Insn::Fconst2
        | Insn::Bipush(_)
        | Insn::Sipush(_) => 1,
        Insn::Ldc(Constant::Long(_)) | Insn::Ldc(Constant::Double(_)) => 2,
        Insn::Ldc(_) => 1,

        // long/double use 2 stack slots
        Insn::Lconst0 | Insn::Lconst1 | Insn::Dconst0 | Insn::Dconst1 => 2,

        Insn::Iload(_) | Insn::Fload(_) | Insn::Aload(_) => 1,
        Insn::Lload(_) | Insn::Dload(_) => 2,

        // Array loads: pop arrayref + index, push element
        Insn::Iaload | Insn::Faload | Insn::Aaload | Insn::Baload | Insn::Caload | Insn::Saload => -1,
        Insn::Laload | Insn::Daload => 0,

        Insn::Istore(_) | Insn::Fstore(_) | Insn::Astore(_) => -1,
        Insn::Lstore(_) | Insn::Dstore(_) => -2,

        // Array stores: pop arrayref + index + value
        Insn::Iastore | Insn::Fastore | Insn::Aastore | Insn::Bastore | Insn::Castore | Insn::Sastore => -3,
        Insn::Lastore | Insn::Dastore => -4,

        Insn::Pop => -1,
        Insn::Pop2 => -2,
        Insn::Dup | Insn::Dupx1 | Insn::Dupx2 => 1,
        Insn::Dup2 | Insn::Dup2x1 | Insn::Dup2x2 => 2,
        Insn::Swap => 0,

        Insn::Iadd
        | Insn::Isub
        | Insn::Imul
        | Insn::Idiv
        | Insn::Irem
        | Insn::Ishl
        | Insn::Ishr
        | Insn::Iushr
        | Insn::Iand
        | Insn::Ior
        | Insn::Ixor
        | Insn::Fadd
        | Insn::Fsub
        | Insn::Fmul
        | Insn::Fdiv
        | Insn::Frem => -1,

        Insn::Ladd
        | Insn::Lsub
        | Insn::Lmul
        | Insn::Ldiv
        | Insn::Lrem
        | Insn::Land
        | Insn::Lor
        | Insn::Lxor
        | Insn::Dadd
        | Insn::Dsub
        | Insn::Dmul
        | Insn::Ddiv
        | Insn::Drem => -2,

        // pop long + int shift amount, push long
        Insn::Lshl | Insn::Lshr | Insn::Lushr => -1,

        Insn::Ineg | Insn::Fneg | Insn::Lneg | Insn::Dneg => 0,
        Insn::Iinc { .. } => 0,

        Insn::I2l | Insn::I2d | Insn::F2l | Insn::F2d => 1,
        Insn::L2i | Insn::L2f | Insn::D2i | Insn::D2f => -1,
        Insn::I2f | Insn::I2b | Insn::I2c | Insn::I2s | Insn::F2i => 0,
        Insn::L2d | Insn::D2l => 0,

        Insn::Lcmp | Insn::Dcmpl | Insn::Dcmpg => -3,
        Insn::Fcmpl | Insn::Fcmpg => -1,

        Insn::Ifeq(_)
        | Insn::Ifne(_)
        | Insn::Iflt(_)
        | Insn::Ifge(_)
        | Insn::Ifgt(_)
        | Insn::Ifle(_)
        | Insn::Ifnull(_)
        | Insn::Ifnonnull(_) => -1,

        Insn::IfIcmpeq(_)
        | Insn::IfIcmpne(_)
        | Insn::IfIcmplt(_)
        | Insn::IfIcmpge(_)
        | Insn::IfIcmpgt(_)
        | Insn::IfIcmple(_)
        | Insn::IfAcmpeq(_)
        | Insn::IfAcmpne(_) => -2,

        Insn::Goto(_) => 0,
        Insn::Jsr(_) => 1,
        Insn::Ret(_) => 0,
        Insn::Tableswitch { .. } | Insn::Lookupswitch { .. } => -1,

        Insn::Return => 0,
        Insn::Ireturn | Insn::Freturn | Insn::Areturn => -1,
        Insn::Lreturn | Insn::Dreturn => -2,

        Insn::Getstatic(f) => field_slots(&f.desc),
        Insn::Putstatic(f) => -field_slots(&f.desc),
        Insn::Getfield(f) => field_slots(&f.desc) - 1,
        Insn::Putfield(f) => -field_slots(&f.desc) - 1,

        Insn::Invokevirtual(m) | Insn::Invokespecial(m) | Insn::Invokeinterface(m) => invoke_delta(&m.desc, true),
        Insn::Invokestatic(m) => invoke_delta(&m.desc, false),
        Insn::Invokedynamic { desc, .. } => invoke_delta(desc, false),

        Insn::New(_) => 1,
        Insn::Newarray(_) | Insn::Anewarray(_) | Insn::Arraylength => 0,
        Insn::Athrow => -1,
        Insn::Checkcast(_) | Insn::Instanceof(_) => 0,
        Insn::Monitorenter | Insn::Monitorexit => -1,
        // pop N counts, push arrayref
        Insn::Multianewarray { dimensions, .. } => 1 - (*dimensions as i32),
    }
}
