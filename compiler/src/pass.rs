// pass.rs — Pass descriptor module: metadata, dependency resolution
//
// Declares the generator's passes, their dependency edges and the session
// state they establish. Used by the pipeline runner to compute the minimal
// pass subset for a requested terminal pass.

use std::collections::HashSet;

// ── Pass identifiers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Load,
    DeclarePresets,
    ResolveVirtual,
    Declare,
    AssignCache,
    LowerReferences,
    AssignPackets,
    AssignReadFunctions,
    Codegen,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a pass.
pub struct PassDescriptor {
    /// Human-readable name for logs.
    pub name: &'static str,
    /// Passes whose results this pass consumes.
    pub inputs: &'static [PassId],
    /// What holds once the pass has run (documentation only).
    pub invariants: &'static str,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Load => PassDescriptor {
            name: "load",
            inputs: &[],
            invariants: "one component per platform specification and kind",
        },
        PassId::DeclarePresets => PassDescriptor {
            name: "declare_presets",
            inputs: &[PassId::Load],
            invariants: "presets, patterns and virtual declarations registered",
        },
        PassId::ResolveVirtual => PassDescriptor {
            name: "resolve_virtual",
            inputs: &[PassId::DeclarePresets],
            invariants: "every resolved virtual component materialized",
        },
        PassId::Declare => PassDescriptor {
            name: "declare",
            inputs: &[PassId::ResolveVirtual],
            invariants: "use-cases and state assignments attached to branches",
        },
        PassId::AssignCache => PassDescriptor {
            name: "assign_cache",
            inputs: &[PassId::Declare],
            invariants: "sensors sampled below their minimum period hold a cache slot",
        },
        PassId::LowerReferences => PassDescriptor {
            name: "lower_references",
            inputs: &[PassId::AssignCache],
            invariants: "component references rendered through the cache",
        },
        PassId::AssignPackets => PassDescriptor {
            name: "assign_packets",
            inputs: &[PassId::Declare],
            invariants: "aggregate outputs hold their packet fields",
        },
        PassId::AssignReadFunctions => PassDescriptor {
            name: "assign_read_functions",
            inputs: &[PassId::Declare],
            invariants: "per-use-case read functions numbered",
        },
        PassId::Codegen => PassDescriptor {
            name: "codegen",
            inputs: &[
                PassId::LowerReferences,
                PassId::AssignPackets,
                PassId::AssignReadFunctions,
            ],
            invariants: "C sections emitted",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 9] = [
    PassId::Load,
    PassId::DeclarePresets,
    PassId::ResolveVirtual,
    PassId::Declare,
    PassId::AssignCache,
    PassId::LowerReferences,
    PassId::AssignPackets,
    PassId::AssignReadFunctions,
    PassId::Codegen,
];

/// Compute the minimal ordered set of passes needed to run `terminal`.
/// Returns passes in execution order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
