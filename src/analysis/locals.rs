//! Which local variable slots hold logical booleans.

use std::collections::{HashMap, HashSet};

use log::trace;

use super::frames::Frames;
use crate::code_attribute::{label_positions, Insn, LocalVariable};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Scoped {
    index: u16,
    boolean: bool,
    start: usize,
    end: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Source {
    /// Debug information is present.
    Table(Vec<Scoped>),
    /// Slots inferred from the stores in the method body.
    Inferred(HashSet<u16>),
}

/// Boolean local variable slots of one method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BooleanLocals {
    source: Source,
    /// `(position, slot)` of every store.
    stores: Vec<(usize, u16)>,
    parameter_slots: u16,
}

impl BooleanLocals {
    /// Uses the local variable table when there is one. Without it a slot is
    /// boolean when every `istore` to it stores a boolean-tagged value, at
    /// least one of those values is computed rather than a literal `0`/`1`,
    /// and the slot is never incremented.
    pub fn new(
        local_variables: &[LocalVariable],
        insns: &[Insn],
        frames: Option<&Frames>,
        parameter_slots: u16,
    ) -> Self {
        let stores = insns
            .iter()
            .enumerate()
            .filter_map(|(i, insn)| match insn {
                Insn::Istore(v) | Insn::Lstore(v) | Insn::Fstore(v) | Insn::Dstore(v) | Insn::Astore(v) => Some((i, *v)),
                _ => None,
            })
            .collect();
        let source = if local_variables.is_empty() {
            Source::Inferred(infer(insns, frames))
        } else {
            let labels = label_positions(insns);
            Source::Table(
                local_variables
                    .iter()
                    .filter_map(|lv| {
                        Some(Scoped {
                            index: lv.index,
                            boolean: lv.desc == "Z",
                            start: *labels.get(&lv.start)?,
                            end: *labels.get(&lv.end)?,
                        })
                    })
                    .collect(),
            )
        };
        BooleanLocals {
            source,
            stores,
            parameter_slots,
        }
    }

    /// Whether slot `index` holds a boolean at instruction `at`. A store
    /// just before a variable's scope opens belongs to that variable.
    pub fn is_boolean(&self, index: u16, at: usize) -> bool {
        match &self.source {
            Source::Inferred(slots) => slots.contains(&index),
            Source::Table(entries) => {
                let slot = entries.iter().filter(|e| e.index == index);
                if let Some(live) = slot.clone().find(|e| e.start <= at && at < e.end) {
                    return live.boolean;
                }
                slot.filter(|e| e.start > at)
                    .min_by_key(|e| e.start)
                    .is_some_and(|next| next.boolean)
            }
        }
    }

    /// Whether slot `index` may hold a value when `at` executes: it is a
    /// parameter, a variable scope covers `at`, or some earlier instruction
    /// stores to it.
    pub fn is_defined_before(&self, index: u16, at: usize) -> bool {
        if index < self.parameter_slots {
            return true;
        }
        if let Source::Table(entries) = &self.source {
            if entries.iter().any(|e| e.index == index && e.start <= at && at <= e.end) {
                return true;
            }
        }
        self.stores.iter().any(|&(pos, slot)| slot == index && pos < at)
    }
}

fn infer(insns: &[Insn], frames: Option<&Frames>) -> HashSet<u16> {
    let Some(frames) = frames else {
        return HashSet::new();
    };
    struct Evidence {
        all_boolean: bool,
        computed: bool,
    }
    let mut evidence: HashMap<u16, Evidence> = HashMap::new();
    let mut incremented = HashSet::new();
    for (i, insn) in insns.iter().enumerate() {
        match insn {
            Insn::Istore(v) => {
                let Some(frame) = frames.get(i) else {
                    continue;
                };
                let entry = evidence.entry(*v).or_insert(Evidence {
                    all_boolean: true,
                    computed: false,
                });
                entry.all_boolean &= frame.peek(0).is_some_and(|value| value.is_boolean());
                let literal = i > 0 && matches!(insns[i - 1], Insn::Iconst0 | Insn::Iconst1);
                entry.computed |= !literal;
            }
            Insn::Iinc { index, .. } => {
                incremented.insert(*index);
            }
            _ => {}
        }
    }
    let slots: HashSet<u16> = evidence
        .into_iter()
        .filter(|(slot, e)| e.all_boolean && e.computed && !incremented.contains(slot))
        .map(|(slot, _)| slot)
        .collect();
    trace!("inferred boolean locals {:?}", slots);
    slots
}
