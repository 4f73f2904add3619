//! Branch identities and control dependencies.
//!
//! Instrumented predicates report their distance under a branch id, and
//! boolean definitions are weighted by the branch they depend on. Both come
//! from a [`BranchOracle`]; [`StructuralOracle`] derives them from the shape
//! of the instruction list, [`FixedOracle`] serves a precomputed table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use super::regions::{conditional_regions, innermost, nesting_depth};
use crate::code_attribute::Insn;

/// The branch a position is control dependent on and how deeply it is
/// nested. Positions outside any branch use [`ControlDependency::NONE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControlDependency {
    pub branch_id: i32,
    pub depth: i32,
}

impl ControlDependency {
    pub const NONE: ControlDependency = ControlDependency {
        branch_id: 0,
        depth: 0,
    };
}

/// Source of branch ids. `method` is name and original descriptor
/// concatenated, positions index the instruction list passed to
/// [`BranchOracle::register`].
pub trait BranchOracle: Send + Sync {
    /// Announces the instruction list positions will refer to.
    fn register(&self, _owner: &str, _method: &str, _insns: &[Insn]) {}

    /// Id of the conditional jump at `at`.
    fn branch_id(&self, owner: &str, method: &str, at: usize) -> Option<i32>;

    fn control_dependency(&self, owner: &str, method: &str, at: usize) -> Option<ControlDependency>;
}

#[derive(Debug, Default)]
struct MethodBranches {
    /// Ids in instruction order.
    ids: Vec<i32>,
    by_position: HashMap<usize, i32>,
    dependencies: HashMap<usize, ControlDependency>,
}

#[derive(Debug, Default)]
struct OracleState {
    methods: HashMap<(String, String), MethodBranches>,
    next_id: i32,
}

/// Numbers the forward and backward conditional jumps of each registered
/// method with ids unique to the oracle and attributes each position to the
/// innermost region enclosing it.
#[derive(Debug, Default)]
pub struct StructuralOracle {
    state: Mutex<OracleState>,
}

impl StructuralOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OracleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of ids handed out so far.
    pub fn branch_count(&self) -> usize {
        self.lock().methods.values().map(|m| m.ids.len()).sum()
    }
}

impl BranchOracle for StructuralOracle {
    /// Registering a method again keeps the ids it already has.
    fn register(&self, owner: &str, method: &str, insns: &[Insn]) {
        let regions = match conditional_regions(insns) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("no branch information for {}.{}: {}", owner, method, e);
                return;
            }
        };
        let jumps: Vec<usize> = insns
            .iter()
            .enumerate()
            .filter(|(_, insn)| insn.is_conditional_jump())
            .map(|(i, _)| i)
            .collect();

        let mut state = self.lock();
        let key = (owner.to_string(), method.to_string());
        let mut ids = state.methods.remove(&key).map(|m| m.ids).unwrap_or_default();
        while ids.len() < jumps.len() {
            state.next_id += 1;
            ids.push(state.next_id);
        }

        let by_position: HashMap<usize, i32> = jumps.iter().copied().zip(ids.iter().copied()).collect();
        let mut dependencies = HashMap::new();
        for at in 0..insns.len() {
            let Some(region) = innermost(&regions, at) else {
                continue;
            };
            if let Some(&branch_id) = by_position.get(&region.jump) {
                dependencies.insert(
                    at,
                    ControlDependency {
                        branch_id,
                        depth: nesting_depth(&regions, at) as i32,
                    },
                );
            }
        }
        debug!("{}.{}: {} branches", owner, method, jumps.len());
        state.methods.insert(
            key,
            MethodBranches {
                ids,
                by_position,
                dependencies,
            },
        );
    }

    fn branch_id(&self, owner: &str, method: &str, at: usize) -> Option<i32> {
        let state = self.lock();
        state
            .methods
            .get(&(owner.to_string(), method.to_string()))?
            .by_position
            .get(&at)
            .copied()
    }

    fn control_dependency(&self, owner: &str, method: &str, at: usize) -> Option<ControlDependency> {
        let state = self.lock();
        state
            .methods
            .get(&(owner.to_string(), method.to_string()))?
            .dependencies
            .get(&at)
            .copied()
    }
}

/// A precomputed oracle, handy when branch ids come from an external
/// control flow analysis.
#[derive(Clone, Debug, Default)]
pub struct FixedOracle {
    branches: HashMap<(String, String, usize), i32>,
    dependencies: HashMap<(String, String, usize), ControlDependency>,
}

impl FixedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, owner: &str, method: &str, at: usize, branch_id: i32) -> Self {
        self.branches.insert((owner.to_string(), method.to_string(), at), branch_id);
        self
    }

    pub fn with_dependency(mut self, owner: &str, method: &str, at: usize, dependency: ControlDependency) -> Self {
        self.dependencies.insert((owner.to_string(), method.to_string(), at), dependency);
        self
    }
}

impl BranchOracle for FixedOracle {
    fn branch_id(&self, owner: &str, method: &str, at: usize) -> Option<i32> {
        self.branches.get(&(owner.to_string(), method.to_string(), at)).copied()
    }

    fn control_dependency(&self, owner: &str, method: &str, at: usize) -> Option<ControlDependency> {
        self.dependencies.get(&(owner.to_string(), method.to_string(), at)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_attribute::Label;

    fn body() -> Vec<Insn> {
        vec![
            Insn::Iload(0),             // 0
            Insn::Ifeq(Label(0)),       // 1
            Insn::Iload(1),             // 2
            Insn::Ifeq(Label(0)),       // 3
            Insn::Iconst1,              // 4
            Insn::Ireturn,              // 5
            Insn::Label(Label(0)),      // 6
            Insn::Iconst0,              // 7
            Insn::Ireturn,              // 8
        ]
    }

    #[test]
    fn test_structural_ids() {
        let oracle = StructuralOracle::new();
        oracle.register("a/A", "f(ZZ)Z", &body());
        oracle.register("a/A", "g(ZZ)Z", &body());
        assert_eq!(oracle.branch_id("a/A", "f(ZZ)Z", 1), Some(1));
        assert_eq!(oracle.branch_id("a/A", "f(ZZ)Z", 3), Some(2));
        assert_eq!(oracle.branch_id("a/A", "g(ZZ)Z", 1), Some(3));
        assert_eq!(oracle.branch_id("a/A", "f(ZZ)Z", 2), None);
        assert_eq!(oracle.branch_id("a/B", "f(ZZ)Z", 1), None);

        oracle.register("a/A", "f(ZZ)Z", &body());
        assert_eq!(oracle.branch_id("a/A", "f(ZZ)Z", 3), Some(2));
        assert_eq!(oracle.branch_count(), 4);
    }

    #[test]
    fn test_structural_dependencies() {
        let oracle = StructuralOracle::new();
        oracle.register("a/A", "f(ZZ)Z", &body());
        assert_eq!(
            oracle.control_dependency("a/A", "f(ZZ)Z", 4),
            Some(ControlDependency { branch_id: 2, depth: 2 })
        );
        assert_eq!(
            oracle.control_dependency("a/A", "f(ZZ)Z", 2),
            Some(ControlDependency { branch_id: 1, depth: 1 })
        );
        assert_eq!(oracle.control_dependency("a/A", "f(ZZ)Z", 7), None);
    }

    #[test]
    fn test_fixed_oracle() {
        let oracle = FixedOracle::new()
            .with_branch("a/A", "m()V", 3, 17)
            .with_dependency("a/A", "m()V", 5, ControlDependency { branch_id: 17, depth: 1 });
        assert_eq!(oracle.branch_id("a/A", "m()V", 3), Some(17));
        assert_eq!(oracle.control_dependency("a/A", "m()V", 5).map(|d| d.branch_id), Some(17));
        assert_eq!(oracle.control_dependency("a/A", "m()V", 6), None);
    }
}
