//! The per-method rewrite pipeline.
//!
//! Passes run in a fixed order over a working copy of the method body. Each
//! node remembers its position in the analyzed snapshot so that frames and
//! branch ids stay addressable while earlier passes insert code around it.

pub mod arrays;
pub mod bitwise;
pub mod call_sites;
pub mod conditional;
pub mod definitions;
pub mod helpers;
pub mod implicit_else;
pub mod returns;

use log::{debug, warn};

use crate::analysis::{analyze, BooleanLocals, BranchOracle, ControlDependency, Frame, Frames, MethodShape};
use crate::code_attribute::stack_calc::compute_max_stack;
use crate::code_attribute::{next_label_id, Insn, Label};
use crate::config::PIPELINE_STACK_SLACK;
use crate::descriptor::{argument_slots, return_type, JvmType};
use crate::error::{AnalyzerError, Result, TransformError};
use crate::mapping::DescriptorMapping;
use crate::method_info::MethodNode;

use self::helpers::Helper;

/// One instruction of the working copy. `origin` is its index in the
/// analyzed snapshot; inserted instructions have none.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub insn: Insn,
    pub origin: Option<usize>,
}

impl Node {
    pub fn original(insn: Insn, at: usize) -> Self {
        Node { insn, origin: Some(at) }
    }

    pub fn inserted(insn: Insn) -> Self {
        Node { insn, origin: None }
    }

    /// Same origin, different instruction.
    pub fn replaced(&self, insn: Insn) -> Self {
        Node {
            insn,
            origin: self.origin,
        }
    }
}

/// Tags every instruction with its own index.
pub fn snapshot(insns: Vec<Insn>) -> Vec<Node> {
    insns
        .into_iter()
        .enumerate()
        .map(|(at, insn)| Node::original(insn, at))
        .collect()
}

pub fn instructions(nodes: Vec<Node>) -> Vec<Insn> {
    nodes.into_iter().map(|n| n.insn).collect()
}

/// A rewrite of the working copy.
pub trait Pass {
    fn name(&self) -> &'static str;

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>>;
}

/// What the passes know about the method under rewrite.
pub struct PassContext<'a> {
    pub owner: &'a str,
    /// Name before any rename.
    pub method_name: &'a str,
    pub original_desc: &'a str,
    /// Descriptor the method ends up with.
    pub desc: &'a str,
    pub is_static: bool,
    pub mapping: &'a DescriptorMapping,
    pub oracle: &'a dyn BranchOracle,
    pub helper_class: &'a str,
    /// Frames of the snapshot.
    pub frames: Frames,
    pub locals: BooleanLocals,
    next_label: u32,
}

impl<'a> PassContext<'a> {
    /// Key of the method for the branch oracle: name plus original descriptor.
    pub fn method_key(&self) -> String {
        format!("{}{}", self.method_name, self.original_desc)
    }

    /// Frame before the snapshot instruction `origin`.
    pub fn frame(&self, origin: Option<usize>) -> Option<&Frame> {
        self.frames.get(origin?)
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn call(&self, helper: Helper) -> Node {
        Node::inserted(helper.call(self.helper_class))
    }

    pub fn branch_id(&self, origin: Option<usize>) -> Option<i32> {
        self.oracle.branch_id(self.owner, &self.method_key(), origin?)
    }

    /// Branch and nesting depth guarding `origin`, or
    /// [`ControlDependency::NONE`].
    pub fn control_dependency(&self, origin: Option<usize>) -> ControlDependency {
        origin
            .and_then(|at| self.oracle.control_dependency(self.owner, &self.method_key(), at))
            .unwrap_or(ControlDependency::NONE)
    }

    /// The method returned `boolean` before rewriting.
    pub fn returned_boolean(&self) -> bool {
        return_type(self.original_desc) == Some(JvmType::Boolean)
    }

    /// The method still returns `boolean` after rewriting.
    pub fn returns_boolean(&self) -> bool {
        return_type(self.desc) == Some(JvmType::Boolean)
    }
}

/// Where a method body comes from and what it turns into.
pub struct MethodTarget<'a> {
    pub owner: &'a str,
    pub original_name: &'a str,
    pub original_desc: &'a str,
    pub desc: &'a str,
}

fn shape<'a>(target: &'a MethodTarget<'a>, method: &'a MethodNode) -> MethodShape<'a> {
    MethodShape {
        owner: target.owner,
        is_static: method.is_static(),
        original_desc: target.original_desc,
        desc: target.desc,
        max_locals: method.max_locals,
        try_catch_blocks: &method.try_catch_blocks,
    }
}

fn analysis_failure(target: &MethodTarget<'_>, source: AnalyzerError) -> TransformError {
    let e = TransformError::Analysis {
        method: format!("{}.{}{}", target.owner, target.original_name, target.original_desc),
        source,
    };
    warn!("{}, body left as written", e);
    e
}

/// Runs the whole pipeline over the body of `method` and swaps the result
/// in. On any error, including frames that cannot be computed before or
/// after the else expansion, the body is left untouched.
pub fn rewrite_method(
    method: &mut MethodNode,
    target: &MethodTarget<'_>,
    mapping: &DescriptorMapping,
    oracle: &dyn BranchOracle,
    helper_class: &str,
) -> Result<()> {
    let original = method.instructions.clone();

    // First analysis, on the body as written
    let frames = analyze(&shape(target, method), &original, mapping).map_err(|e| analysis_failure(target, e))?;
    let parameter_slots = argument_slots(target.desc).unwrap_or(0) + u16::from(!method.is_static());
    let locals = BooleanLocals::new(&method.local_variables, &original, Some(&frames), parameter_slots);
    let mut cx = PassContext {
        owner: target.owner,
        method_name: target.original_name,
        original_desc: target.original_desc,
        desc: target.desc,
        is_static: method.is_static(),
        mapping,
        oracle,
        helper_class,
        frames,
        locals,
        next_label: next_label_id(&original),
    };

    let expanded = instructions(run_pass(&implicit_else::ImplicitElse, snapshot(original), &mut cx)?);

    // Second analysis: the expansion moved every offset
    cx.frames = analyze(&shape(target, method), &expanded, mapping).map_err(|e| analysis_failure(target, e))?;
    cx.locals = BooleanLocals::new(&method.local_variables, &expanded, Some(&cx.frames), parameter_slots);
    oracle.register(target.owner, &cx.method_key(), &expanded);

    let passes: [&dyn Pass; 7] = [
        &bitwise::Bitwise,
        &conditional::Conditional,
        &definitions::Definitions,
        &reference_tests::ReferenceTests,
        &call_sites::CallSites,
        &arrays::Arrays,
        &returns::Returns,
    ];
    let mut nodes = snapshot(expanded);
    for pass in passes {
        nodes = run_pass(pass, nodes, &mut cx)?;
    }

    let rewritten = instructions(nodes);
    method.max_stack = (method.max_stack + PIPELINE_STACK_SLACK).max(compute_max_stack(&rewritten));
    method.instructions = rewritten;
    Ok(())
}

fn run_pass(pass: &dyn Pass, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
    let before = nodes.len();
    let nodes = pass.run(nodes, cx)?;
    debug!(
        "{}.{}{}: {} pass, {} -> {} instructions",
        cx.owner,
        cx.method_name,
        cx.original_desc,
        pass.name(),
        before,
        nodes.len()
    );
    Ok(nodes)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::StructuralOracle;
    use crate::config::{Scope, DEFAULT_HELPER_CLASS};
    use crate::hierarchy::InMemoryHierarchy;

    pub const HELPER: &str = DEFAULT_HELPER_CLASS;

    pub fn mapping() -> DescriptorMapping {
        DescriptorMapping::new(Scope::All, Arc::new(InMemoryHierarchy::new()))
    }

    pub fn helper(h: Helper) -> Insn {
        h.call(HELPER)
    }

    /// Context over `insns` of a static method `a/A.m<desc>` with frames
    /// and a structural oracle registered on `insns`.
    pub fn with_context<R>(
        desc: &str,
        insns: &[Insn],
        max_locals: u16,
        f: impl FnOnce(&mut PassContext<'_>) -> R,
    ) -> R {
        let mapping = mapping();
        let oracle = StructuralOracle::new();
        let resolved = mapping
            .resolve_method("a/A", "m", desc)
            .map(|r| r.desc)
            .unwrap_or_else(|_| desc.to_string());
        let shape = MethodShape {
            owner: "a/A",
            is_static: true,
            original_desc: desc,
            desc: &resolved,
            max_locals,
            try_catch_blocks: &[],
        };
        // pass tests may run over fragments the analyzer rejects
        let analyzed = analyze(&shape, insns, &mapping).ok();
        let locals = BooleanLocals::new(&[], insns, analyzed.as_ref(), argument_slots(&resolved).unwrap_or(0));
        oracle.register("a/A", &format!("m{}", desc), insns);
        let mut cx = PassContext {
            owner: "a/A",
            method_name: "m",
            original_desc: desc,
            desc: &resolved,
            is_static: true,
            mapping: &mapping,
            oracle: &oracle,
            helper_class: HELPER,
            frames: analyzed.unwrap_or_default(),
            locals,
            next_label: next_label_id(insns),
        };
        f(&mut cx)
    }

    pub fn run(pass: &dyn Pass, desc: &str, insns: Vec<Insn>, max_locals: u16) -> Vec<Insn> {
        with_context(desc, &insns.clone(), max_locals, |cx| {
            instructions(pass.run(snapshot(insns), cx).unwrap())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::StructuralOracle;
    use crate::code_attribute::{FieldRef, MethodRef};
    use crate::config::{Scope, DEFAULT_HELPER_CLASS};
    use crate::hierarchy::InMemoryHierarchy;
    use crate::method_info::MethodAccessFlags;

    fn static_method(desc: &str, insns: Vec<Insn>, max_locals: u16) -> MethodNode {
        MethodNode::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC, "check", desc)
            .with_code(insns, 2, max_locals)
    }

    #[test]
    fn test_pipeline_on_boolean_method() {
        let mapping = DescriptorMapping::new(Scope::All, Arc::new(InMemoryHierarchy::new()));
        let oracle = StructuralOracle::new();
        // return x > 0;
        let mut method = static_method(
            "(I)Z",
            vec![
                Insn::Iload(0),
                Insn::Ifle(Label(0)),
                Insn::Iconst1,
                Insn::Ireturn,
                Insn::Label(Label(0)),
                Insn::Iconst0,
                Insn::Ireturn,
            ],
            1,
        );
        let target = MethodTarget {
            owner: "a/A",
            original_name: "check",
            original_desc: "(I)Z",
            desc: "(I)I",
        };
        rewrite_method(&mut method, &target, &mapping, &oracle, DEFAULT_HELPER_CLASS).unwrap();

        let push = Helper::PushPredicate.call(DEFAULT_HELPER_CLASS);
        let get = Helper::GetDistance.call(DEFAULT_HELPER_CLASS);
        assert_eq!(
            method.instructions,
            vec![
                Insn::Iload(0),
                Insn::Dup,
                Insn::Iconst1,
                push,
                Insn::Ifle(Label(0)),
                Insn::Iconst1,
                Insn::Iconst1,
                Insn::Iconst1,
                get.clone(),
                Insn::Ireturn,
                Insn::Label(Label(0)),
                Insn::Iconst0,
                Insn::Iconst0,
                Insn::Iconst0,
                get,
                Insn::Ireturn,
            ]
        );
        assert!(method.max_stack >= 6);
    }

    #[test]
    fn test_unanalyzable_body_is_left_as_written() {
        let mapping = DescriptorMapping::new(Scope::All, Arc::new(InMemoryHierarchy::new()));
        let oracle = StructuralOracle::new();
        let flag = FieldRef::new("a/A", "flag", "Z");
        let ready = MethodRef::new("a/A", "ready", "()Z");
        // a boolean call tested with ifeq, then the body falls off the end
        let body = vec![
            Insn::Invokestatic(ready),
            Insn::Ifeq(Label(0)),
            Insn::Iconst1,
            Insn::Putstatic(flag),
            Insn::Label(Label(0)),
            Insn::Iconst0,
        ];
        let mut method = static_method("()V", body.clone(), 0);
        let target = MethodTarget {
            owner: "a/A",
            original_name: "check",
            original_desc: "()V",
            desc: "()V",
        };
        let result = rewrite_method(&mut method, &target, &mapping, &oracle, DEFAULT_HELPER_CLASS);
        assert!(matches!(result, Err(TransformError::Analysis { .. })));
        assert_eq!(method.instructions, body);
        assert_eq!(method.max_stack, 2);
    }

    #[test]
    fn test_unknown_label_leaves_body_untouched() {
        let mapping = DescriptorMapping::new(Scope::All, Arc::new(InMemoryHierarchy::new()));
        let oracle = StructuralOracle::new();
        let body = vec![
            Insn::Iload(0),
            Insn::Ifeq(Label(9)),
            Insn::Invokestatic(MethodRef::new("a/A", "f", "()V")),
            Insn::Return,
        ];
        let mut method = static_method("(Z)V", body.clone(), 1);
        let target = MethodTarget {
            owner: "a/A",
            original_name: "check",
            original_desc: "(Z)V",
            desc: "(I)V",
        };
        let result = rewrite_method(&mut method, &target, &mapping, &oracle, DEFAULT_HELPER_CLASS);
        assert!(matches!(
            result,
            Err(TransformError::Analysis {
                source: AnalyzerError::UnknownLabel { label: 9, .. },
                ..
            })
        ));
        assert_eq!(method.instructions, body);
    }
}
