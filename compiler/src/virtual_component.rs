// virtual_component.rs — Virtual component declaration and resolution
//
// A virtual component is a user-defined alias over a chain of base
// components with parameter overrides, e.g.
// `define HotTemp Temp (threshold = 30)`. Resolution flattens the chain into
// a concrete base component plus a merged parameter dictionary; the session
// then materializes a real component from it.
//
// Declarations live in an arena indexed by `VirtualId`. Each entry carries an
// explicit resolution state, so shared ancestors resolve once and cycles of
// any length are detected by meeting an entry that is still in progress.
//
// Preconditions: concrete components are loaded before resolution.
// Postconditions: every declaration ends `Resolved` or `Failed`.
// Failure modes: self-reference and indirect cycles (E0301), unknown bases
//                (E0302), malformed constant bases (E0305) and failed bases
//                (E0306) mark the declaration failed; others still resolve.
// Side effects: none (materialization is done by the session).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::ProcessTree;
use crate::diag::{codes, Diagnostic};
use crate::id::{ComponentId, IdAllocator, VirtualId};
use crate::usecase::ParamEntry;
use crate::value::{parse_int_literal, Value};

/// Prefix of numeric pseudo-bases (`constant:42`).
pub const CONSTANT_PREFIX: &str = "constant:";
/// Concrete component numeric pseudo-bases redirect to.
pub const CONSTANT_COMPONENT: &str = "constant";

/// A virtual component as declared by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualDecl {
    pub name: String,
    /// Base names; the first one is the immediate base.
    pub bases: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParamEntry>,
    #[serde(default)]
    pub process: Option<ProcessTree>,
}

#[derive(Debug, Clone, PartialEq)]
enum Resolution {
    Pending,
    InProgress,
    Resolved {
        base: ComponentId,
        merged: BTreeMap<String, Value>,
    },
    Failed,
}

#[derive(Debug, Clone)]
pub struct VirtualComponent {
    pub id: VirtualId,
    pub decl: VirtualDecl,
    resolution: Resolution,
    materialized: bool,
}

impl VirtualComponent {
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }

    pub fn is_failed(&self) -> bool {
        self.resolution == Resolution::Failed
    }

    /// Concrete base and merged parameters of a resolved declaration.
    pub fn resolved(&self) -> Option<(ComponentId, &BTreeMap<String, Value>)> {
        match &self.resolution {
            Resolution::Resolved { base, merged } => Some((*base, merged)),
            _ => None,
        }
    }
}

/// One base name after pseudo-base expansion.
struct BaseRef {
    name: String,
    constant: Option<i64>,
}

fn parse_base(basename: &str) -> Result<BaseRef, ()> {
    match basename.strip_prefix(CONSTANT_PREFIX) {
        Some(literal) => parse_int_literal(literal)
            .map(|n| BaseRef {
                name: CONSTANT_COMPONENT.to_string(),
                constant: Some(n),
            })
            .ok_or(()),
        None => Ok(BaseRef {
            name: basename.to_string(),
            constant: None,
        }),
    }
}

// ── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct VirtualArena {
    items: Vec<VirtualComponent>,
    by_name: BTreeMap<String, VirtualId>,
}

impl VirtualArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration. `shadows_concrete` tells whether a concrete
    /// component of the same name exists.
    pub fn declare(
        &mut self,
        decl: VirtualDecl,
        shadows_concrete: bool,
        ids: &mut IdAllocator,
        diags: &mut Vec<Diagnostic>,
    ) -> Option<VirtualId> {
        let key = decl.name.to_lowercase();
        if self.by_name.contains_key(&key) {
            diags.push(
                Diagnostic::error(
                    codes::E0303,
                    format!("virtual component '{}' duplicated, ignoring", decl.name),
                )
                .with_subject(decl.name),
            );
            return None;
        }
        if shadows_concrete {
            diags.push(
                Diagnostic::error(
                    codes::E0304,
                    format!(
                        "virtual component '{}' duplicated with real one, ignoring",
                        decl.name
                    ),
                )
                .with_subject(decl.name),
            );
            return None;
        }
        let id = ids.alloc_virtual();
        self.by_name.insert(key, id);
        self.items.push(VirtualComponent {
            id,
            decl,
            resolution: Resolution::Pending,
            materialized: false,
        });
        Some(id)
    }

    pub fn get(&self, id: VirtualId) -> &VirtualComponent {
        &self.items[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<VirtualId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = VirtualId> + '_ {
        self.items.iter().map(|v| v.id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mark as materialized; returns false if it already was.
    pub fn take_for_materialization(&mut self, id: VirtualId) -> bool {
        let v = &mut self.items[id.index()];
        if v.materialized || !v.is_resolved() {
            return false;
        }
        v.materialized = true;
        true
    }

    /// Resolve every declaration in declaration order.
    pub fn resolve_all(
        &mut self,
        concrete: &impl Fn(&str) -> Option<ComponentId>,
        diags: &mut Vec<Diagnostic>,
    ) {
        for i in 0..self.items.len() {
            self.resolve(VirtualId(i as u32), concrete, diags);
        }
    }

    /// Resolve one declaration (and, first, every virtual base it depends
    /// on). Returns whether it resolved.
    pub fn resolve(
        &mut self,
        id: VirtualId,
        concrete: &impl Fn(&str) -> Option<ComponentId>,
        diags: &mut Vec<Diagnostic>,
    ) -> bool {
        match self.items[id.index()].resolution {
            Resolution::Resolved { .. } => return true,
            Resolution::Failed => return false,
            Resolution::InProgress => {
                panic!("internal: virtual component re-entered while resolving")
            }
            Resolution::Pending => {}
        }
        self.items[id.index()].resolution = Resolution::InProgress;

        match self.resolve_chain(id, concrete, diags) {
            Some((base, merged)) => {
                self.items[id.index()].resolution = Resolution::Resolved { base, merged };
                true
            }
            None => {
                self.items[id.index()].resolution = Resolution::Failed;
                false
            }
        }
    }

    fn resolve_chain(
        &mut self,
        id: VirtualId,
        concrete: &impl Fn(&str) -> Option<ComponentId>,
        diags: &mut Vec<Diagnostic>,
    ) -> Option<(ComponentId, BTreeMap<String, Value>)> {
        let decl = self.items[id.index()].decl.clone();
        let fail = |code, message: String| {
            Diagnostic::error(code, message).with_subject(decl.name.clone())
        };

        if decl.bases.is_empty() {
            diags.push(fail(
                codes::E0302,
                format!("virtual component '{}' has no base component", decl.name),
            ));
            return None;
        }
        if decl.bases.iter().any(|b| b.eq_ignore_ascii_case(&decl.name)) {
            diags.push(fail(
                codes::E0301,
                format!("virtual component '{}' depends on itself, ignoring", decl.name),
            ));
            return None;
        }

        let mut constant = None;
        let mut immediate: Option<Result<ComponentId, VirtualId>> = None;
        for basename in &decl.bases {
            let Ok(base) = parse_base(basename) else {
                diags.push(fail(
                    codes::E0305,
                    format!(
                        "virtual component '{}' has malformed constant base '{}'",
                        decl.name, basename
                    ),
                ));
                return None;
            };
            if base.constant.is_some() {
                constant = base.constant;
            }

            let found = if let Some(cid) = concrete(&base.name) {
                Ok(cid)
            } else if let Some(vid) = self.lookup(&base.name) {
                if self.items[vid.index()].resolution == Resolution::InProgress {
                    diags.push(fail(
                        codes::E0301,
                        format!(
                            "virtual component '{}' is part of a dependency cycle through '{}'",
                            decl.name, base.name
                        ),
                    ));
                    return None;
                }
                if !self.resolve(vid, concrete, diags) {
                    diags.push(fail(
                        codes::E0306,
                        format!(
                            "base '{}' of virtual component '{}' could not be resolved",
                            base.name, decl.name
                        ),
                    ));
                    return None;
                }
                Err(vid)
            } else {
                diags.push(fail(
                    codes::E0302,
                    format!(
                        "virtual component '{}' has unknown base component '{}', ignoring",
                        decl.name, base.name
                    ),
                ));
                return None;
            };
            immediate.get_or_insert(found);
        }

        let (base, mut merged) = match immediate {
            Some(Ok(cid)) => (cid, BTreeMap::new()),
            Some(Err(vid)) => {
                let (cid, inherited) = self.items[vid.index()]
                    .resolved()
                    .expect("internal: resolved virtual base has no concrete base");
                (cid, inherited.clone())
            }
            None => unreachable!("internal: bases checked non-empty"),
        };

        for p in &decl.parameters {
            merged.insert(
                p.name.clone(),
                p.value.clone().unwrap_or(Value::Bool(true)),
            );
        }
        if let Some(n) = constant {
            merged.insert("value".to_string(), Value::Int(n));
        }
        Some((base, merged))
    }
}
