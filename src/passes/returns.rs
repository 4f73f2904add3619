//! A method that keeps its `boolean` return converts the distance back on
//! the way out.

use super::helpers::Helper;
use super::{Node, Pass, PassContext};
use crate::code_attribute::Insn;
use crate::error::Result;

pub struct Returns;

impl Pass for Returns {
    fn name(&self) -> &'static str {
        "returns"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        if !cx.returns_boolean() {
            return Ok(nodes);
        }
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.insn == Insn::Ireturn {
                out.push(cx.call(Helper::IntToBoolean));
            }
            out.push(node);
        }
        Ok(out)
    }
}
