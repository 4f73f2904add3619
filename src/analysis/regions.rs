use std::ops::Range;

use crate::code_attribute::{label_positions, Insn};
use crate::error::AnalyzerError;

/// The code a forward conditional jump guards.
///
/// `then_range` is the fall-through side, executed when the jump is not
/// taken. `else_range` exists when the fall-through side ends with a forward
/// `goto` past the jump target, the shape of an `if .. else`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub jump: usize,
    pub target: usize,
    pub then_range: Range<usize>,
    pub else_range: Option<Range<usize>>,
}

impl Region {
    pub fn in_then(&self, at: usize) -> bool {
        self.then_range.contains(&at)
    }

    pub fn in_else(&self, at: usize) -> bool {
        self.else_range.as_ref().is_some_and(|r| r.contains(&at))
    }

    pub fn contains(&self, at: usize) -> bool {
        self.in_then(at) || self.in_else(at)
    }

    /// Size of the arm holding `at`, used to rank nesting.
    fn span_at(&self, at: usize) -> Option<usize> {
        if self.in_then(at) {
            Some(self.then_range.len())
        } else {
            self.else_range.as_ref().filter(|r| r.contains(&at)).map(|r| r.len())
        }
    }
}

/// Regions of every forward conditional jump, in instruction order.
pub fn conditional_regions(insns: &[Insn]) -> Result<Vec<Region>, AnalyzerError> {
    let labels = label_positions(insns);
    let mut regions = Vec::new();
    for (jump, insn) in insns.iter().enumerate() {
        if !insn.is_conditional_jump() {
            continue;
        }
        let Some(label) = insn.jump_target() else {
            continue;
        };
        let target = *labels
            .get(&label)
            .ok_or(AnalyzerError::UnknownLabel { at: jump, label: label.0 })?;
        if target <= jump {
            continue;
        }
        let then_range = jump + 1..target;
        let last = insns[then_range.clone()].iter().rposition(|i| !i.is_pseudo());
        let else_range = match last.map(|offset| &insns[jump + 1 + offset]) {
            Some(Insn::Goto(end)) => match labels.get(end) {
                Some(&end) if end > target => Some(target..end),
                _ => None,
            },
            _ => None,
        };
        regions.push(Region {
            jump,
            target,
            then_range,
            else_range,
        });
    }
    Ok(regions)
}

/// Region whose arm most tightly encloses `at`.
pub fn innermost(regions: &[Region], at: usize) -> Option<&Region> {
    regions
        .iter()
        .filter_map(|r| r.span_at(at).map(|span| (span, r)))
        .min_by_key(|(span, _)| *span)
        .map(|(_, r)| r)
}

/// Number of regions enclosing `at`.
pub fn nesting_depth(regions: &[Region], at: usize) -> usize {
    regions.iter().filter(|r| r.contains(at)).count()
}
