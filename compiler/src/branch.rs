// branch.rs — Branch registry and start/stop generation
//
// Use-cases and state assignments are grouped by branch number. The external
// control layer calls `branch<N>Start()` when the branch's conditions become
// true and `branch<N>Stop()` when they stop holding; branch 0 is the
// unconditional default and always exists.
//
// Members are held by identity (component id + use-case index, or state id),
// never by reference, so the session keeps sole ownership of use-cases.
//
// Preconditions: members are inserted in declaration order.
// Postconditions: every branch emits one Start and one Stop function.
// Failure modes: divergent condition lists within a branch produce W0001.
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::diag::{codes, Diagnostic};
use crate::id::{ComponentId, StateId};

/// Numeric branch id; 0 is the default branch.
pub type BranchId = u32;

/// Condition id: `N > 0` requires condition N, `N < 0` requires it to fail.
pub type Condition = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchMember {
    UseCase { component: ComponentId, index: usize },
    State(StateId),
}

#[derive(Debug, Clone, Default)]
pub struct Branch {
    pub members: Vec<BranchMember>,
    /// Conditions of the first member.
    conditions: Vec<Condition>,
}

/// Emits the enter/exit code of a single branch member.
pub trait MemberEmitter {
    fn emit_enter(&self, member: BranchMember, out: &mut String);
    fn emit_exit(&self, member: BranchMember, out: &mut String);
}

#[derive(Debug, Clone)]
pub struct BranchCollection {
    branches: BTreeMap<BranchId, Branch>,
}

impl Default for BranchCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchCollection {
    pub fn new() -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(0, Branch::default());
        BranchCollection { branches }
    }

    pub fn add(
        &mut self,
        id: BranchId,
        member: BranchMember,
        conditions: &[Condition],
        diags: &mut Vec<Diagnostic>,
    ) {
        let branch = self.branches.entry(id).or_default();
        if branch.members.is_empty() {
            branch.conditions = conditions.to_vec();
        } else if branch.conditions != conditions {
            diags.push(
                Diagnostic::warning(
                    codes::W0001,
                    format!(
                        "branch {} mixes condition sets {:?} and {:?}",
                        id, branch.conditions, conditions
                    ),
                )
                .with_hint("only the conditions of the first declaration in a branch are used"),
            );
        }
        branch.members.push(member);
    }

    /// Conditions that must hold for the branch to be active.
    ///
    /// Panics if the branch has no members: the caller asked about a branch
    /// nothing was ever declared in.
    pub fn conditions(&self, id: BranchId) -> &[Condition] {
        let branch = self
            .branches
            .get(&id)
            .filter(|b| !b.members.is_empty())
            .unwrap_or_else(|| panic!("internal: conditions requested for empty branch {}", id));
        &branch.conditions
    }

    pub fn get(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = BranchId> + '_ {
        self.branches.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn generate(&self, emitter: &impl MemberEmitter, out: &mut String) {
        for (id, branch) in &self.branches {
            let _ = writeln!(out, "void branch{}Start(void)", id);
            out.push_str("{\n");
            for &m in &branch.members {
                emitter.emit_enter(m, out);
            }
            out.push_str("}\n\n");

            let _ = writeln!(out, "void branch{}Stop(void)", id);
            out.push_str("{\n");
            for &m in &branch.members {
                emitter.emit_exit(m, out);
            }
            out.push_str("}\n\n");
        }
    }
}
