//! Conditional jumps test the sign of a distance and report it first.
//!
//! `ifne`/`ifeq` on a boolean become `ifgt`/`ifle`. Every integer jump is
//! preceded by a `pushPredicate` of the value it tests (the difference of
//! the operands for two-operand jumps). The three-valued `lcmp`, `fcmpx` and
//! `dcmpx` become distance computations.

use super::helpers::Helper;
use super::{Node, Pass, PassContext};
use crate::code_attribute::Insn;
use crate::error::Result;

fn comparison_helper(insn: &Insn) -> Option<Helper> {
    match insn {
        Insn::Lcmp => Some(Helper::LongSub),
        Insn::Fcmpg => Some(Helper::FloatSubG),
        Insn::Fcmpl => Some(Helper::FloatSubL),
        Insn::Dcmpg => Some(Helper::DoubleSubG),
        Insn::Dcmpl => Some(Helper::DoubleSubL),
        _ => None,
    }
}

pub struct Conditional;

impl Pass for Conditional {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(helper) = comparison_helper(&node.insn) {
                out.push(node.replaced(helper.call(cx.helper_class)));
                continue;
            }
            let frame = cx.frame(node.origin);
            let boolean_at = |depth: usize| frame.and_then(|f| f.peek(depth)).is_some_and(|v| v.is_boolean());

            if node.insn.is_unary_int_jump() {
                let insn = match (&node.insn, boolean_at(0)) {
                    (Insn::Ifne(l), true) => Insn::Ifgt(*l),
                    (Insn::Ifeq(l), true) => Insn::Ifle(*l),
                    (other, _) => other.clone(),
                };
                if let Some(id) = cx.branch_id(node.origin) {
                    out.push(Node::inserted(Insn::Dup));
                    out.push(Node::inserted(Insn::push_int(id)));
                    out.push(cx.call(Helper::PushPredicate));
                }
                out.push(node.replaced(insn));
            } else if node.insn.is_binary_int_jump() {
                if let Some(id) = cx.branch_id(node.origin) {
                    out.push(Node::inserted(Insn::Dup2));
                    out.push(cx.call(Helper::IntSub));
                    out.push(Node::inserted(Insn::push_int(id)));
                    out.push(cx.call(Helper::PushPredicate));
                }
                let equality = matches!(node.insn, Insn::IfIcmpeq(_) | Insn::IfIcmpne(_));
                if equality && boolean_at(0) && boolean_at(1) {
                    // two distances agree when their signs do
                    out.push(cx.call(Helper::IntToBoolean));
                    out.push(Node::inserted(Insn::Swap));
                    out.push(cx.call(Helper::IntToBoolean));
                    out.push(Node::inserted(Insn::Swap));
                }
                out.push(node);
            } else {
                out.push(node);
            }
        }
        Ok(out)
    }
}
