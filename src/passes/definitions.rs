//! Boolean definitions carry the distance of the branch guarding them.
//!
//! A literal `true`/`false` about to land in a boolean location, and a
//! self-assignment left by implicit-else expansion, are wrapped in
//! `getDistance(branch, level, value)`.

use super::helpers::Helper;
use super::{Node, Pass, PassContext};
use crate::code_attribute::Insn;
use crate::descriptor::JvmType;
use crate::error::Result;

/// Instruction that consumes the value pushed at `at`, skipping code that
/// only moves control or pushes another literal.
fn consumer(nodes: &[Node], at: usize) -> Option<&Node> {
    nodes[at + 1..].iter().find(|n| {
        !matches!(
            n.insn,
            Insn::Goto(_) | Insn::Iconst0 | Insn::Iconst1 | Insn::Label(_) | Insn::LineNumber { .. } | Insn::Nop
        )
    })
}

fn is_boolean_consumer(node: &Node, cx: &PassContext<'_>) -> bool {
    match &node.insn {
        Insn::Putfield(f) | Insn::Putstatic(f) => cx.mapping.original_descriptor(&f.owner, &f.name, &f.desc) == "Z",
        Insn::Istore(v) => node.origin.is_some_and(|at| cx.locals.is_boolean(*v, at)),
        Insn::Ireturn => cx.returned_boolean(),
        Insn::Bastore => cx
            .frame(node.origin)
            .and_then(|f| f.peek(2))
            .and_then(|array| array.descriptor())
            .is_some_and(|desc| desc == "[I" || desc == "[Z"),
        Insn::Invokevirtual(m) | Insn::Invokespecial(m) | Insn::Invokestatic(m) | Insn::Invokeinterface(m) => {
            m.owner != cx.helper_class
                && cx.mapping.is_transformed_or_boolean_method(&m.owner, &m.name, &m.desc)
                && cx.mapping.original_types(&m.owner, &m.name, &m.desc).last() == Some(&JvmType::Boolean)
        }
        _ => false,
    }
}

/// `getfield f; putfield f` or `getstatic f; putstatic f`.
fn is_field_self_assignment(previous: &Insn, put: &Insn) -> bool {
    match (previous, put) {
        (Insn::Getfield(a), Insn::Putfield(b)) | (Insn::Getstatic(a), Insn::Putstatic(b)) => a == b && b.desc == "Z",
        _ => false,
    }
}

pub struct Definitions;

impl Pass for Definitions {
    fn name(&self) -> &'static str {
        "definitions"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        let mut out = Vec::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            let wrap_value = match &node.insn {
                Insn::Iconst0 | Insn::Iconst1 => {
                    node.origin.is_some() && consumer(&nodes, i).is_some_and(|c| is_boolean_consumer(c, cx))
                }
                Insn::Iload(v) => nodes.get(i + 1).is_some_and(|next| {
                    next.insn == Insn::Istore(*v) && next.origin.is_some_and(|at| cx.locals.is_boolean(*v, at))
                }),
                _ => false,
            };
            if wrap_value {
                let cd = cx.control_dependency(node.origin);
                out.push(Node::inserted(Insn::push_int(cd.branch_id)));
                out.push(Node::inserted(Insn::push_int(cd.depth)));
                out.push(node.clone());
                out.push(cx.call(Helper::GetDistance));
                continue;
            }

            if i > 0 && is_field_self_assignment(&nodes[i - 1].insn, &node.insn) {
                let cd = cx.control_dependency(node.origin);
                out.push(Node::inserted(Insn::push_int(cd.branch_id)));
                out.push(Node::inserted(Insn::Swap));
                out.push(Node::inserted(Insn::push_int(cd.depth)));
                out.push(Node::inserted(Insn::Swap));
                out.push(cx.call(Helper::GetDistance));
            }
            out.push(node.clone());
        }
        Ok(out)
    }
}
