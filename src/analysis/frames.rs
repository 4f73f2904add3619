//! Fixed-point abstract interpretation tagging the operand stack and locals
//! with the kind of value they hold, in particular which ints are logical
//! booleans.

use std::collections::{HashMap, VecDeque};

use crate::code_attribute::{label_positions, Constant, FieldRef, Insn, Label, MethodRef, TryCatchBlock};
use crate::descriptor::{
    newarray_type, operand_descriptor, parse_method_descriptor, parse_type_descriptor, return_type,
    transform_field_descriptor, JvmType,
};
use crate::error::AnalyzerError;
use crate::mapping::DescriptorMapping;

/// Abstract value of one stack entry or local slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Uninit,
    Int,
    /// An int that carries a truth value.
    Boolean,
    Float,
    Long,
    Double,
    /// Field descriptor after boolean retyping, when known.
    Reference(Option<String>),
    ReturnAddress,
}

impl Value {
    pub fn is_wide(&self) -> bool {
        matches!(self, Value::Long | Value::Double)
    }

    pub fn is_boolean(&self) -> bool {
        *self == Value::Boolean
    }

    /// Descriptor of a reference value, if known.
    pub fn descriptor(&self) -> Option<&str> {
        match self {
            Value::Reference(Some(desc)) => Some(desc),
            _ => None,
        }
    }

    fn of_type(ty: &JvmType) -> Value {
        match ty {
            JvmType::Boolean => Value::Boolean,
            JvmType::Int | JvmType::Byte | JvmType::Char | JvmType::Short => Value::Int,
            JvmType::Float => Value::Float,
            JvmType::Long => Value::Long,
            JvmType::Double => Value::Double,
            JvmType::Void => Value::Uninit,
            JvmType::Reference(_) | JvmType::Array(_) => Value::Reference(Some(ty.to_descriptor())),
        }
    }

    fn merge(&self, other: &Value) -> Value {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (Value::Boolean, Value::Int) | (Value::Int, Value::Boolean) => Value::Int,
            (Value::Reference(None), Value::Reference(d)) | (Value::Reference(d), Value::Reference(None)) => {
                Value::Reference(d.clone())
            }
            (Value::Reference(_), Value::Reference(_)) => Value::Reference(None),
            _ => Value::Uninit,
        }
    }
}

/// Locals and operand stack before an instruction executes. The stack holds
/// one entry per value, so longs and doubles take one entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub locals: Vec<Value>,
    pub stack: Vec<Value>,
}

impl Frame {
    /// Stack entry `depth` values below the top.
    pub fn peek(&self, depth: usize) -> Option<&Value> {
        self.stack.len().checked_sub(depth + 1).map(|i| &self.stack[i])
    }

    pub fn local(&self, index: u16) -> Option<&Value> {
        self.locals.get(index as usize)
    }

    fn pop(&mut self, at: usize) -> Result<Value, AnalyzerError> {
        self.stack.pop().ok_or(AnalyzerError::StackUnderflow(at))
    }

    fn pop_n(&mut self, n: usize, at: usize) -> Result<(), AnalyzerError> {
        for _ in 0..n {
            self.pop(at)?;
        }
        Ok(())
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn load(&self, index: u16, at: usize) -> Result<Value, AnalyzerError> {
        self.locals
            .get(index as usize)
            .cloned()
            .ok_or(AnalyzerError::LocalOutOfRange { at, index })
    }

    fn store(&mut self, index: u16, value: Value, at: usize) -> Result<(), AnalyzerError> {
        let i = index as usize;
        let end = if value.is_wide() { i + 1 } else { i };
        if end >= self.locals.len() {
            return Err(AnalyzerError::LocalOutOfRange { at, index });
        }
        if i > 0 && self.locals[i - 1].is_wide() {
            self.locals[i - 1] = Value::Uninit;
        }
        if value.is_wide() {
            self.locals[i + 1] = Value::Uninit;
        }
        self.locals[i] = value;
        Ok(())
    }

    /// Pops values from the top until `slots` slots are taken; bottom first.
    fn take_slots(&mut self, slots: usize, at: usize) -> Result<Vec<Value>, AnalyzerError> {
        let mut taken = Vec::new();
        let mut count = 0;
        while count < slots {
            let value = self.pop(at)?;
            count += if value.is_wide() { 2 } else { 1 };
            taken.push(value);
        }
        taken.reverse();
        Ok(taken)
    }

    /// The `dup` family: copies the top `copy` slots below the next `skip`
    /// slots.
    fn dup_over(&mut self, copy: usize, skip: usize, at: usize) -> Result<(), AnalyzerError> {
        let top = self.take_slots(copy, at)?;
        let below = self.take_slots(skip, at)?;
        self.stack.extend(top.iter().cloned());
        self.stack.extend(below);
        self.stack.extend(top);
        Ok(())
    }

    fn merge_from(&mut self, other: &Frame, at: usize) -> Result<bool, AnalyzerError> {
        if self.stack.len() != other.stack.len() {
            return Err(AnalyzerError::StackHeightMismatch {
                at,
                left: self.stack.len(),
                right: other.stack.len(),
            });
        }
        let mut changed = false;
        for (mine, theirs) in self
            .locals
            .iter_mut()
            .zip(&other.locals)
            .chain(self.stack.iter_mut().zip(&other.stack))
        {
            let merged = mine.merge(theirs);
            if merged != *mine {
                *mine = merged;
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Result of an analysis: the frame before each instruction, `None` where
/// the instruction is unreachable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frames {
    frames: Vec<Option<Frame>>,
}

impl Frames {
    pub fn get(&self, at: usize) -> Option<&Frame> {
        self.frames.get(at).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Post-rewrite types of the members an instruction list refers to.
pub trait MemberTypes {
    fn field_desc(&self, field: &FieldRef) -> String;
    fn method_desc(&self, method: &MethodRef) -> String;

    /// The method returned `boolean` before any rewriting, even when the
    /// reference already carries its rewritten descriptor.
    fn returns_boolean(&self, method: &MethodRef) -> bool {
        return_type(&method.desc) == Some(JvmType::Boolean)
    }

    /// The field was a scalar `boolean` before any rewriting.
    fn is_boolean_field(&self, field: &FieldRef) -> bool {
        field.desc == "Z"
    }
}

/// Member types as written in the instructions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unmapped;

impl MemberTypes for Unmapped {
    fn field_desc(&self, field: &FieldRef) -> String {
        field.desc.clone()
    }

    fn method_desc(&self, method: &MethodRef) -> String {
        method.desc.clone()
    }
}

impl MemberTypes for DescriptorMapping {
    fn field_desc(&self, field: &FieldRef) -> String {
        self.resolve_field(&field.owner, &field.name, &field.desc)
            .unwrap_or_else(|_| field.desc.clone())
    }

    fn method_desc(&self, method: &MethodRef) -> String {
        self.resolve_method(&method.owner, &method.name, &method.desc)
            .map(|resolved| resolved.desc)
            .unwrap_or_else(|_| method.desc.clone())
    }

    fn returns_boolean(&self, method: &MethodRef) -> bool {
        self.is_transformed_or_boolean_return(&method.owner, &method.name, &method.desc)
    }

    fn is_boolean_field(&self, field: &FieldRef) -> bool {
        self.is_transformed_or_boolean_field(&field.owner, &field.name, &field.desc)
            && self.original_descriptor(&field.owner, &field.name, &field.desc) == "Z"
    }
}

/// What the interpreter needs to know about the method besides its code.
#[derive(Clone, Copy, Debug)]
pub struct MethodShape<'a> {
    pub owner: &'a str,
    pub is_static: bool,
    /// Descriptor before retyping; decides which parameters are booleans.
    pub original_desc: &'a str,
    /// Descriptor after retyping; decides parameter reference types.
    pub desc: &'a str,
    pub max_locals: u16,
    pub try_catch_blocks: &'a [TryCatchBlock],
}

struct Interpreter<'a> {
    shape: &'a MethodShape<'a>,
    types: &'a dyn MemberTypes,
    labels: HashMap<Label, usize>,
}

/// Runs the analysis to a fixed point.
pub fn analyze(shape: &MethodShape<'_>, insns: &[Insn], types: &dyn MemberTypes) -> Result<Frames, AnalyzerError> {
    let interpreter = Interpreter {
        shape,
        types,
        labels: label_positions(insns),
    };
    interpreter.run(insns)
}

impl Interpreter<'_> {
    fn entry_frame(&self) -> Result<Frame, AnalyzerError> {
        let malformed = || AnalyzerError::MalformedDescriptor {
            at: 0,
            desc: self.shape.original_desc.to_string(),
        };
        let (original, _) = parse_method_descriptor(self.shape.original_desc).ok_or_else(malformed)?;
        let (rewritten, _) = parse_method_descriptor(self.shape.desc).ok_or_else(malformed)?;
        let param_slots: usize = rewritten.iter().map(|t| t.slot_size() as usize).sum();
        let receiver = usize::from(!self.shape.is_static);
        let size = (self.shape.max_locals as usize).max(param_slots + receiver);
        let mut frame = Frame {
            locals: vec![Value::Uninit; size],
            stack: Vec::new(),
        };
        let mut slot = 0;
        if !self.shape.is_static {
            frame.locals[0] = Value::Reference(Some(operand_descriptor(self.shape.owner)));
            slot = 1;
        }
        for (i, ty) in rewritten.iter().enumerate() {
            let value = match original.get(i) {
                Some(JvmType::Boolean) => Value::Boolean,
                _ => Value::of_type(ty),
            };
            frame.locals[slot] = value;
            slot += ty.slot_size() as usize;
        }
        Ok(frame)
    }

    fn target(&self, label: Label, at: usize) -> Result<usize, AnalyzerError> {
        self.labels
            .get(&label)
            .copied()
            .ok_or(AnalyzerError::UnknownLabel { at, label: label.0 })
    }

    fn field_value(&self, field: &FieldRef) -> Value {
        if self.types.is_boolean_field(field) {
            return Value::Boolean;
        }
        parse_type_descriptor(&self.types.field_desc(field)).map_or(Value::Reference(None), |t| Value::of_type(&t))
    }

    fn invoke(&self, frame: &mut Frame, method: &MethodRef, has_receiver: bool, at: usize) -> Result<(), AnalyzerError> {
        let malformed = || AnalyzerError::MalformedDescriptor {
            at,
            desc: method.desc.clone(),
        };
        let (params, ret) = parse_method_descriptor(&method.desc).ok_or_else(malformed)?;
        frame.pop_n(params.len() + usize::from(has_receiver), at)?;
        let value = if ret == JvmType::Void {
            return Ok(());
        } else if self.types.returns_boolean(method) {
            Value::Boolean
        } else {
            return_type(&self.types.method_desc(method)).map_or(Value::Reference(None), |t| Value::of_type(&t))
        };
        frame.push(value);
        Ok(())
    }

    fn handlers_covering(&self, at: usize) -> impl Iterator<Item = (usize, Value)> + '_ {
        self.shape.try_catch_blocks.iter().filter_map(move |block| {
            let start = *self.labels.get(&block.start)?;
            let end = *self.labels.get(&block.end)?;
            let handler = *self.labels.get(&block.handler)?;
            if start <= at && at < end {
                let caught = block.catch_type.as_deref().unwrap_or("java/lang/Throwable");
                Some((handler, Value::Reference(Some(operand_descriptor(caught)))))
            } else {
                None
            }
        })
    }

    fn run(&self, insns: &[Insn]) -> Result<Frames, AnalyzerError> {
        let mut frames: Vec<Option<Frame>> = vec![None; insns.len()];
        if insns.is_empty() {
            return Ok(Frames { frames });
        }
        frames[0] = Some(self.entry_frame()?);
        let mut worklist = VecDeque::from([0usize]);
        let mut queued = vec![false; insns.len()];
        queued[0] = true;

        while let Some(at) = worklist.pop_front() {
            queued[at] = false;
            let Some(before) = frames[at].clone() else {
                continue;
            };
            let mut edges: Vec<(usize, Frame)> = Vec::new();

            for (handler, caught) in self.handlers_covering(at) {
                edges.push((
                    handler,
                    Frame {
                        locals: before.locals.clone(),
                        stack: vec![caught],
                    },
                ));
            }

            let insn = &insns[at];
            let after = self.execute(insn, &before, at)?;
            let falls_through = !insn.ends_block();
            match insn {
                Insn::Jsr(label) => {
                    edges.push((self.target(*label, at)?, after));
                    edges.push((at + 1, before.clone()));
                }
                _ => {
                    if let Some(label) = insn.jump_target() {
                        edges.push((self.target(label, at)?, after.clone()));
                    }
                    for label in insn.switch_targets() {
                        edges.push((self.target(label, at)?, after.clone()));
                    }
                    if falls_through {
                        edges.push((at + 1, after));
                    }
                }
            }

            for (next, frame) in edges {
                if next >= insns.len() {
                    return Err(AnalyzerError::FallOffEnd);
                }
                let changed = match &mut frames[next] {
                    Some(existing) => existing.merge_from(&frame, next)?,
                    slot @ None => {
                        *slot = Some(frame);
                        true
                    }
                };
                if changed && !queued[next] {
                    queued[next] = true;
                    worklist.push_back(next);
                }
            }
        }
        Ok(Frames { frames })
    }

    fn execute(&self, insn: &Insn, before: &Frame, at: usize) -> Result<Frame, AnalyzerError> {
        let mut f = before.clone();
        match insn {
            Insn::Nop | Insn::Label(_) | Insn::LineNumber { .. } | Insn::Goto(_) | Insn::Return => {}
            Insn::Aconstnull => f.push(Value::Reference(None)),
            Insn::Iconst0 | Insn::Iconst1 => f.push(Value::Boolean),
            Insn::Iconstm1
            | Insn::Iconst2
            | Insn::Iconst3
            | Insn::Iconst4
            | Insn::Iconst5
            | Insn::Bipush(_)
            | Insn::Sipush(_) => f.push(Value::Int),
            Insn::Lconst0 | Insn::Lconst1 => f.push(Value::Long),
            Insn::Fconst0 | Insn::Fconst1 | Insn::Fconst2 => f.push(Value::Float),
            Insn::Dconst0 | Insn::Dconst1 => f.push(Value::Double),
            Insn::Ldc(constant) => f.push(match constant {
                Constant::Int(_) => Value::Int,
                Constant::Long(_) => Value::Long,
                Constant::Float(_) => Value::Float,
                Constant::Double(_) => Value::Double,
                Constant::String(_) => Value::Reference(Some("Ljava/lang/String;".into())),
                Constant::Class(_) => Value::Reference(Some("Ljava/lang/Class;".into())),
            }),
            Insn::Iload(i) => {
                let value = f.load(*i, at)?;
                f.push(if value.is_boolean() { Value::Boolean } else { Value::Int });
            }
            Insn::Lload(i) => {
                f.load(*i, at)?;
                f.push(Value::Long);
            }
            Insn::Fload(i) => {
                f.load(*i, at)?;
                f.push(Value::Float);
            }
            Insn::Dload(i) => {
                f.load(*i, at)?;
                f.push(Value::Double);
            }
            Insn::Aload(i) => {
                let value = f.load(*i, at)?;
                f.push(match value {
                    Value::Reference(_) | Value::ReturnAddress => value,
                    _ => Value::Reference(None),
                });
            }
            Insn::Iaload | Insn::Caload | Insn::Saload => {
                f.pop_n(2, at)?;
                f.push(Value::Int);
            }
            Insn::Baload => {
                f.pop(at)?;
                let array = f.pop(at)?;
                let boolean = matches!(array.descriptor(), Some("[I") | Some("[Z"));
                f.push(if boolean { Value::Boolean } else { Value::Int });
            }
            Insn::Laload => {
                f.pop_n(2, at)?;
                f.push(Value::Long);
            }
            Insn::Faload => {
                f.pop_n(2, at)?;
                f.push(Value::Float);
            }
            Insn::Daload => {
                f.pop_n(2, at)?;
                f.push(Value::Double);
            }
            Insn::Aaload => {
                f.pop(at)?;
                let array = f.pop(at)?;
                let element = array.descriptor().and_then(|d| d.strip_prefix('[')).map(str::to_string);
                f.push(Value::Reference(element));
            }
            Insn::Istore(i) => {
                let value = f.pop(at)?;
                let value = if value.is_boolean() { Value::Boolean } else { Value::Int };
                f.store(*i, value, at)?;
            }
            Insn::Lstore(i) => {
                f.pop(at)?;
                f.store(*i, Value::Long, at)?;
            }
            Insn::Fstore(i) => {
                f.pop(at)?;
                f.store(*i, Value::Float, at)?;
            }
            Insn::Dstore(i) => {
                f.pop(at)?;
                f.store(*i, Value::Double, at)?;
            }
            Insn::Astore(i) => {
                let value = f.pop(at)?;
                f.store(*i, value, at)?;
            }
            Insn::Iastore
            | Insn::Lastore
            | Insn::Fastore
            | Insn::Dastore
            | Insn::Aastore
            | Insn::Bastore
            | Insn::Castore
            | Insn::Sastore => f.pop_n(3, at)?,
            Insn::Pop => {
                f.pop(at)?;
            }
            Insn::Pop2 => {
                if !f.pop(at)?.is_wide() {
                    f.pop(at)?;
                }
            }
            Insn::Dup => f.dup_over(1, 0, at)?,
            Insn::Dupx1 => f.dup_over(1, 1, at)?,
            Insn::Dupx2 => f.dup_over(1, 2, at)?,
            Insn::Dup2 => f.dup_over(2, 0, at)?,
            Insn::Dup2x1 => f.dup_over(2, 1, at)?,
            Insn::Dup2x2 => f.dup_over(2, 2, at)?,
            Insn::Swap => {
                let a = f.pop(at)?;
                let b = f.pop(at)?;
                f.push(a);
                f.push(b);
            }
            Insn::Iadd
            | Insn::Isub
            | Insn::Imul
            | Insn::Idiv
            | Insn::Irem
            | Insn::Ishl
            | Insn::Ishr
            | Insn::Iushr
            | Insn::Lcmp
            | Insn::Fcmpl
            | Insn::Fcmpg
            | Insn::Dcmpl
            | Insn::Dcmpg => {
                f.pop_n(2, at)?;
                f.push(Value::Int);
            }
            Insn::Iand | Insn::Ior | Insn::Ixor => {
                let b = f.pop(at)?;
                let a = f.pop(at)?;
                let both = a.is_boolean() && b.is_boolean();
                f.push(if both { Value::Boolean } else { Value::Int });
            }
            Insn::Ladd
            | Insn::Lsub
            | Insn::Lmul
            | Insn::Ldiv
            | Insn::Lrem
            | Insn::Lshl
            | Insn::Lshr
            | Insn::Lushr
            | Insn::Land
            | Insn::Lor
            | Insn::Lxor => {
                f.pop_n(2, at)?;
                f.push(Value::Long);
            }
            Insn::Fadd | Insn::Fsub | Insn::Fmul | Insn::Fdiv | Insn::Frem => {
                f.pop_n(2, at)?;
                f.push(Value::Float);
            }
            Insn::Dadd | Insn::Dsub | Insn::Dmul | Insn::Ddiv | Insn::Drem => {
                f.pop_n(2, at)?;
                f.push(Value::Double);
            }
            Insn::Ineg | Insn::L2i | Insn::F2i | Insn::D2i | Insn::I2b | Insn::I2c | Insn::I2s | Insn::Arraylength => {
                f.pop(at)?;
                f.push(Value::Int);
            }
            Insn::Lneg | Insn::I2l | Insn::F2l | Insn::D2l => {
                f.pop(at)?;
                f.push(Value::Long);
            }
            Insn::Fneg | Insn::I2f | Insn::L2f | Insn::D2f => {
                f.pop(at)?;
                f.push(Value::Float);
            }
            Insn::Dneg | Insn::I2d | Insn::L2d | Insn::F2d => {
                f.pop(at)?;
                f.push(Value::Double);
            }
            Insn::Iinc { index, .. } => {
                f.load(*index, at)?;
                f.store(*index, Value::Int, at)?;
            }
            Insn::Ifeq(_)
            | Insn::Ifne(_)
            | Insn::Iflt(_)
            | Insn::Ifge(_)
            | Insn::Ifgt(_)
            | Insn::Ifle(_)
            | Insn::Ifnull(_)
            | Insn::Ifnonnull(_)
            | Insn::Tableswitch { .. }
            | Insn::Lookupswitch { .. }
            | Insn::Ireturn
            | Insn::Lreturn
            | Insn::Freturn
            | Insn::Dreturn
            | Insn::Areturn
            | Insn::Athrow
            | Insn::Monitorenter
            | Insn::Monitorexit
            | Insn::Putstatic(_) => {
                f.pop(at)?;
            }
            Insn::IfIcmpeq(_)
            | Insn::IfIcmpne(_)
            | Insn::IfIcmplt(_)
            | Insn::IfIcmpge(_)
            | Insn::IfIcmpgt(_)
            | Insn::IfIcmple(_)
            | Insn::IfAcmpeq(_)
            | Insn::IfAcmpne(_)
            | Insn::Putfield(_) => f.pop_n(2, at)?,
            Insn::Jsr(_) => f.push(Value::ReturnAddress),
            Insn::Ret(i) => {
                f.load(*i, at)?;
            }
            Insn::Getstatic(field) => f.push(self.field_value(field)),
            Insn::Getfield(field) => {
                f.pop(at)?;
                f.push(self.field_value(field));
            }
            Insn::Invokevirtual(m) | Insn::Invokespecial(m) | Insn::Invokeinterface(m) => {
                self.invoke(&mut f, m, true, at)?;
            }
            Insn::Invokestatic(m) => self.invoke(&mut f, m, false, at)?,
            Insn::Invokedynamic { desc, .. } => {
                let (params, ret) = parse_method_descriptor(desc).ok_or_else(|| AnalyzerError::MalformedDescriptor {
                    at,
                    desc: desc.clone(),
                })?;
                f.pop_n(params.len(), at)?;
                if ret != JvmType::Void {
                    f.push(Value::of_type(&ret));
                }
            }
            Insn::New(class) => f.push(Value::Reference(Some(operand_descriptor(class)))),
            Insn::Newarray(atype) => {
                f.pop(at)?;
                let element = newarray_type(*atype).map(|t| t.to_int_if_boolean().to_descriptor());
                f.push(Value::Reference(element.map(|e| format!("[{}", e))));
            }
            Insn::Anewarray(class) => {
                f.pop(at)?;
                let element = transform_field_descriptor(&operand_descriptor(class));
                f.push(Value::Reference(Some(format!("[{}", element))));
            }
            Insn::Checkcast(class) => {
                f.pop(at)?;
                f.push(Value::Reference(Some(transform_field_descriptor(&operand_descriptor(class)))));
            }
            Insn::Instanceof(_) => {
                f.pop(at)?;
                f.push(Value::Boolean);
            }
            Insn::Multianewarray { desc, dimensions } => {
                f.pop_n(*dimensions as usize, at)?;
                f.push(Value::Reference(Some(transform_field_descriptor(desc))));
            }
        }
        Ok(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape<'a>(desc: &'a str, max_locals: u16) -> MethodShape<'a> {
        MethodShape {
            owner: "a/Flags",
            is_static: true,
            original_desc: desc,
            desc,
            max_locals,
            try_catch_blocks: &[],
        }
    }

    #[test]
    fn test_boolean_tags_flow_through_locals() {
        let insns = vec![
            Insn::Iconst1,
            Insn::Istore(1),
            Insn::Iload(1),
            Insn::Iload(0),
            Insn::Iand,
            Insn::Ireturn,
        ];
        let frames = analyze(&shape("(Z)Z", 2), &insns, &Unmapped).unwrap();
        assert_eq!(frames.get(2).unwrap().local(1), Some(&Value::Boolean));
        let at_and = frames.get(4).unwrap();
        assert_eq!(at_and.peek(0), Some(&Value::Boolean));
        assert_eq!(at_and.peek(1), Some(&Value::Boolean));
        assert_eq!(frames.get(5).unwrap().peek(0), Some(&Value::Boolean));
    }

    #[test]
    fn test_merge_of_boolean_and_int_is_int() {
        let insns = vec![
            Insn::Iload(0),
            Insn::Ifeq(Label(1)),
            Insn::Iconst1,
            Insn::Goto(Label(2)),
            Insn::Label(Label(1)),
            Insn::Bipush(7),
            Insn::Label(Label(2)),
            Insn::Ireturn,
        ];
        let frames = analyze(&shape("(I)I", 1), &insns, &Unmapped).unwrap();
        assert_eq!(frames.get(7).unwrap().peek(0), Some(&Value::Int));
    }

    #[test]
    fn test_flag_pattern_stays_boolean() {
        let insns = vec![
            Insn::Iload(0),
            Insn::Ifle(Label(1)),
            Insn::Iconst1,
            Insn::Goto(Label(2)),
            Insn::Label(Label(1)),
            Insn::Iconst0,
            Insn::Label(Label(2)),
            Insn::Ireturn,
        ];
        let frames = analyze(&shape("(I)Z", 1), &insns, &Unmapped).unwrap();
        assert_eq!(frames.get(7).unwrap().peek(0), Some(&Value::Boolean));
    }

    #[test]
    fn test_boolean_arrays_are_int_arrays() {
        let insns = vec![
            Insn::Iconst3,
            Insn::Newarray(4),
            Insn::Iconst0,
            Insn::Baload,
            Insn::Ireturn,
        ];
        let frames = analyze(&shape("()Z", 0), &insns, &Unmapped).unwrap();
        assert_eq!(frames.get(3).unwrap().peek(1), Some(&Value::Reference(Some("[I".into()))));
        assert_eq!(frames.get(4).unwrap().peek(0), Some(&Value::Boolean));
    }

    #[test]
    fn test_wide_values_and_dup2() {
        let insns = vec![Insn::Lload(0), Insn::Dup2, Insn::Lcmp, Insn::Ireturn];
        let frames = analyze(&shape("(J)I", 2), &insns, &Unmapped).unwrap();
        let at_cmp = frames.get(2).unwrap();
        assert_eq!(at_cmp.stack, vec![Value::Long, Value::Long]);
    }

    #[test]
    fn test_exception_handler_gets_caught_reference() {
        let blocks = vec![TryCatchBlock {
            start: Label(0),
            end: Label(1),
            handler: Label(2),
            catch_type: Some("java/io/IOException".into()),
        }];
        let insns = vec![
            Insn::Label(Label(0)),
            Insn::Iconst1,
            Insn::Ireturn,
            Insn::Label(Label(1)),
            Insn::Label(Label(2)),
            Insn::Pop,
            Insn::Iconst0,
            Insn::Ireturn,
        ];
        let shape = MethodShape {
            try_catch_blocks: &blocks,
            ..shape("()Z", 0)
        };
        let frames = analyze(&shape, &insns, &Unmapped).unwrap();
        assert_eq!(
            frames.get(5).unwrap().peek(0),
            Some(&Value::Reference(Some("Ljava/io/IOException;".into())))
        );
        assert!(frames.get(3).is_none());
    }

    #[test]
    fn test_errors() {
        let underflow = analyze(&shape("()V", 0), &[Insn::Pop, Insn::Return], &Unmapped);
        assert_eq!(underflow, Err(AnalyzerError::StackUnderflow(0)));

        let unknown = analyze(&shape("()V", 0), &[Insn::Goto(Label(9))], &Unmapped);
        assert_eq!(unknown, Err(AnalyzerError::UnknownLabel { at: 0, label: 9 }));

        let fall = analyze(&shape("()V", 0), &[Insn::Nop], &Unmapped);
        assert_eq!(fall, Err(AnalyzerError::FallOffEnd));

        let mismatch = analyze(
            &shape("(I)V", 1),
            &[
                Insn::Iload(0),
                Insn::Ifeq(Label(1)),
                Insn::Iconst1,
                Insn::Label(Label(1)),
                Insn::Return,
            ],
            &Unmapped,
        );
        assert!(matches!(mismatch, Err(AnalyzerError::StackHeightMismatch { .. })));
    }
}
