//! `&`, `|` and `^` on two booleans become distance-preserving helper calls.

use super::helpers::Helper;
use super::{Node, Pass, PassContext};
use crate::code_attribute::Insn;
use crate::error::Result;

pub struct Bitwise;

impl Pass for Bitwise {
    fn name(&self) -> &'static str {
        "bitwise"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        Ok(nodes
            .into_iter()
            .map(|node| {
                let helper = match node.insn {
                    Insn::Iand => Helper::Iand,
                    Insn::Ior => Helper::Ior,
                    Insn::Ixor => Helper::Ixor,
                    _ => return node,
                };
                let on_booleans = cx
                    .frame(node.origin)
                    .is_some_and(|f| f.peek(0).is_some_and(|v| v.is_boolean()) && f.peek(1).is_some_and(|v| v.is_boolean()));
                if on_booleans {
                    node.replaced(helper.call(cx.helper_class))
                } else {
                    node
                }
            })
            .collect())
    }
}
