//! Implicit-else expansion.
//!
//! `if (c) flag = x;` only defines `flag` on one outcome of `c`. The other
//! outcome gets an explicit `flag = flag`, so that the definition pass can
//! attach a distance to both.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::trace;

use super::{Node, Pass, PassContext};
use crate::analysis::{conditional_regions, Region};
use crate::code_attribute::{label_positions, FieldRef, Insn, Label};
use crate::error::{AnalyzerError, Result, TransformError};

/// A boolean location written inside a branch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum StoreTarget {
    Local(u16),
    Field(FieldRef),
    Static(FieldRef),
}

impl StoreTarget {
    /// Stack-neutral code writing the location back to itself.
    fn self_assignment(&self) -> Vec<Insn> {
        match self {
            StoreTarget::Local(v) => vec![Insn::Iload(*v), Insn::Istore(*v)],
            StoreTarget::Field(f) => vec![
                Insn::Aload(0),
                Insn::Aload(0),
                Insn::Getfield(f.clone()),
                Insn::Putfield(f.clone()),
            ],
            StoreTarget::Static(f) => vec![Insn::Getstatic(f.clone()), Insn::Putstatic(f.clone())],
        }
    }
}

fn eligible_store(insn: &Insn, at: usize, jump: usize, cx: &PassContext<'_>) -> Option<StoreTarget> {
    match insn {
        Insn::Istore(v) if cx.locals.is_boolean(*v, at) && cx.locals.is_defined_before(*v, jump) => {
            Some(StoreTarget::Local(*v))
        }
        // `this` is only usable as a receiver once the constructor has run
        Insn::Putfield(f)
            if f.desc == "Z" && f.owner == cx.owner && !cx.is_static && cx.method_name != "<init>" =>
        {
            Some(StoreTarget::Field(f.clone()))
        }
        Insn::Putstatic(f) if f.desc == "Z" => Some(StoreTarget::Static(f.clone())),
        _ => None,
    }
}

fn stores_in(insns: &[Insn], range: std::ops::Range<usize>, jump: usize, cx: &PassContext<'_>) -> Vec<StoreTarget> {
    let mut found = Vec::new();
    for at in range {
        if let Some(target) = eligible_store(&insns[at], at, jump, cx) {
            if !found.contains(&target) {
                found.push(target);
            }
        }
    }
    found
}

/// First position of the run of labels and line numbers that ends at `at`.
fn pseudo_run_start(insns: &[Insn], at: usize) -> usize {
    let mut start = at;
    while start > 0 && insns[start - 1].is_pseudo() {
        start -= 1;
    }
    start
}

fn region_error(e: AnalyzerError, cx: &PassContext<'_>) -> TransformError {
    match e {
        AnalyzerError::UnknownLabel { label, .. } => TransformError::UnknownLabel(label),
        source => TransformError::Analysis {
            method: format!("{}.{}", cx.owner, cx.method_key()),
            source,
        },
    }
}

pub struct ImplicitElse;

impl Pass for ImplicitElse {
    fn name(&self) -> &'static str {
        "implicit-else"
    }

    fn run(&self, nodes: Vec<Node>, cx: &mut PassContext<'_>) -> Result<Vec<Node>> {
        let insns: Vec<Insn> = nodes.iter().map(|n| n.insn.clone()).collect();
        let regions = conditional_regions(&insns).map_err(|e| region_error(e, cx))?;

        // jump -> locations the jump target must assign
        let mut on_jump: BTreeMap<usize, Vec<StoreTarget>> = BTreeMap::new();
        // jump -> locations the fall-through must assign
        let mut on_fall_through: BTreeMap<usize, Vec<StoreTarget>> = BTreeMap::new();
        let mut seen: HashSet<(usize, StoreTarget)> = HashSet::new();
        for region in &regions {
            let then_stores = stores_in(&insns, region.then_range.clone(), region.jump, cx);
            let else_stores = match &region.else_range {
                Some(range) => stores_in(&insns, range.clone(), region.jump, cx),
                None => Vec::new(),
            };
            for target in &then_stores {
                if !else_stores.contains(target) && seen.insert((region.jump, target.clone())) {
                    on_jump.entry(region.jump).or_default().push(target.clone());
                }
            }
            for target in &else_stores {
                if !then_stores.contains(target) && seen.insert((region.jump, target.clone())) {
                    on_fall_through.entry(region.jump).or_default().push(target.clone());
                }
            }
        }
        if on_jump.is_empty() && on_fall_through.is_empty() {
            return Ok(nodes);
        }

        let labels = label_positions(&insns);
        let by_jump: HashMap<usize, &Region> = regions.iter().map(|r| (r.jump, r)).collect();
        // insertion point -> (fresh label, original target, locations)
        let mut blocks: BTreeMap<usize, Vec<(Label, Label, Vec<StoreTarget>)>> = BTreeMap::new();
        let mut retarget: HashMap<usize, Label> = HashMap::new();
        for (jump, targets) in on_jump {
            let (Some(region), Some(label)) = (by_jump.get(&jump), insns[jump].jump_target()) else {
                continue;
            };
            debug_assert_eq!(labels.get(&label), Some(&region.target));
            let fresh = cx.new_label();
            trace!("{}.{}: jump {} gets else block {}", cx.owner, cx.method_key(), jump, fresh);
            retarget.insert(jump, fresh);
            blocks
                .entry(pseudo_run_start(&insns, region.target))
                .or_default()
                .push((fresh, label, targets));
        }

        let mut out: Vec<Node> = Vec::with_capacity(nodes.len() + 8);
        for (at, mut node) in nodes.into_iter().enumerate() {
            if let Some(group) = blocks.remove(&at) {
                let mut falls_through = out
                    .iter()
                    .rev()
                    .find(|n| !n.insn.is_pseudo())
                    .is_some_and(|n| !n.insn.ends_block());
                for (fresh, target, locations) in group {
                    if falls_through {
                        out.push(Node::inserted(Insn::Goto(target)));
                    }
                    out.push(Node::inserted(Insn::Label(fresh)));
                    for location in &locations {
                        out.extend(location.self_assignment().into_iter().map(Node::inserted));
                    }
                    falls_through = true;
                }
            }
            if let Some(fresh) = retarget.get(&at) {
                node.insn.retarget(*fresh);
            }
            out.push(node);
            if let Some(locations) = on_fall_through.get(&at) {
                for location in locations {
                    out.extend(location.self_assignment().into_iter().map(Node::inserted));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::{run, with_context};
    use crate::passes::{instructions, snapshot};

    fn flag() -> FieldRef {
        FieldRef::new("a/A", "flag", "Z")
    }

    #[test]
    fn test_then_store_gets_else_block() {
        let out = run(
            &ImplicitElse,
            "(I)V",
            vec![
                Insn::Iload(0),
                Insn::Ifle(Label(0)),
                Insn::Iconst1,
                Insn::Putstatic(flag()),
                Insn::Label(Label(0)),
                Insn::Return,
            ],
            1,
        );
        assert_eq!(
            out,
            vec![
                Insn::Iload(0),
                Insn::Ifle(Label(1)),
                Insn::Iconst1,
                Insn::Putstatic(flag()),
                Insn::Goto(Label(0)),
                Insn::Label(Label(1)),
                Insn::Getstatic(flag()),
                Insn::Putstatic(flag()),
                Insn::Label(Label(0)),
                Insn::Return,
            ]
        );
    }

    #[test]
    fn test_else_store_gets_then_assignment() {
        let out = run(
            &ImplicitElse,
            "(I)V",
            vec![
                Insn::Iload(0),
                Insn::Ifle(Label(0)),
                Insn::Goto(Label(1)),
                Insn::Label(Label(0)),
                Insn::Iconst1,
                Insn::Putstatic(flag()),
                Insn::Label(Label(1)),
                Insn::Return,
            ],
            1,
        );
        assert_eq!(
            out,
            vec![
                Insn::Iload(0),
                Insn::Ifle(Label(0)),
                Insn::Getstatic(flag()),
                Insn::Putstatic(flag()),
                Insn::Goto(Label(1)),
                Insn::Label(Label(0)),
                Insn::Iconst1,
                Insn::Putstatic(flag()),
                Insn::Label(Label(1)),
                Insn::Return,
            ]
        );
    }

    #[test]
    fn test_shared_target_and_locals() {
        let g = FieldRef::new("a/A", "g", "Z");
        let out = run(
            &ImplicitElse,
            "(ZZ)V",
            vec![
                Insn::Getstatic(g.clone()),
                Insn::Istore(2),
                Insn::Iload(0),
                Insn::Ifeq(Label(0)),
                Insn::Iload(1),
                Insn::Ifeq(Label(0)),
                Insn::Getstatic(g.clone()),
                Insn::Istore(2),
                Insn::Label(Label(0)),
                Insn::Return,
            ],
            3,
        );
        assert_eq!(
            out,
            vec![
                Insn::Getstatic(g.clone()),
                Insn::Istore(2),
                Insn::Iload(0),
                Insn::Ifeq(Label(1)),
                Insn::Iload(1),
                Insn::Ifeq(Label(2)),
                Insn::Getstatic(g),
                Insn::Istore(2),
                Insn::Goto(Label(0)),
                Insn::Label(Label(1)),
                Insn::Iload(2),
                Insn::Istore(2),
                Insn::Goto(Label(0)),
                Insn::Label(Label(2)),
                Insn::Iload(2),
                Insn::Istore(2),
                Insn::Label(Label(0)),
                Insn::Return,
            ]
        );
    }

    #[test]
    fn test_undefined_local_is_left_alone() {
        let g = FieldRef::new("a/A", "g", "Z");
        let body = vec![
            Insn::Iload(0),
            Insn::Ifeq(Label(0)),
            Insn::Getstatic(g),
            Insn::Istore(1),
            Insn::Label(Label(0)),
            Insn::Return,
        ];
        assert_eq!(run(&ImplicitElse, "(Z)V", body.clone(), 2), body);
    }

    #[test]
    fn test_unknown_label() {
        let body = vec![Insn::Iload(0), Insn::Ifeq(Label(3)), Insn::Return];
        let result = with_context("(Z)V", &body, 1, |cx| {
            ImplicitElse.run(snapshot(body.clone()), cx).map(instructions)
        });
        assert!(matches!(result, Err(TransformError::UnknownLabel(3))));
    }
}
