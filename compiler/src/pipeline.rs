// pipeline.rs — Compilation state and pass orchestration
//
// Holds the platform, the parsed declarations, the session and the generated
// code, and runs the minimal set of passes for a given terminal PassId.
//
// Preconditions: the platform description has been loaded and validated.
// Postconditions: every pass in `required_passes(terminal)` has run;
//                 `has_error` tells whether any user error was reported.
// Failure modes: none; user errors are collected and the run continues.
// Side effects: calls on_pass_complete after each pass; emits `tracing`
//               debug events with pass timings.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::branch::{BranchId, Condition};
use crate::codegen::{CodegenOptions, GeneratedCode};
use crate::diag::{has_errors, Diagnostic};
use crate::pass::{descriptor, required_passes, PassId};
use crate::platform::{PlatformError, PlatformSpec};
use crate::session::Session;
use crate::usecase::ParamEntry;
use crate::value::Value;
use crate::virtual_component::VirtualDecl;

// ── Program ────────────────────────────────────────────────────────────────

/// One parsed top-level declaration of an application description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    /// `use|read|output <component> (<params>)` under a branch.
    Use {
        #[serde(default = "default_keyword")]
        keyword: String,
        component: String,
        #[serde(default)]
        parameters: Vec<ParamEntry>,
        #[serde(default)]
        conditions: Vec<Condition>,
        #[serde(default)]
        branch: BranchId,
    },
    /// `set <name> = <value>` under a branch.
    SetState {
        name: String,
        value: Value,
        #[serde(default)]
        conditions: Vec<Condition>,
        #[serde(default)]
        branch: BranchId,
    },
    Virtual(VirtualDecl),
    /// Named parameter preset.
    ParameterDefine {
        name: String,
        parameters: Vec<ParamEntry>,
    },
    Pattern {
        name: String,
        intervals: Vec<Value>,
    },
}

fn default_keyword() -> String {
    "use".to_string()
}

/// Ordered declarations handed over by the front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds.
///
/// `platform_fingerprint`: SHA-256 of `PlatformSpec::canonical_json()`.
/// `output_hash`: SHA-256 of the combined C source.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub platform_fingerprint: [u8; 32],
    pub output_hash: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    /// Hex string of the platform fingerprint (64 characters).
    pub fn platform_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.platform_fingerprint)
    }

    /// Hex string of the output hash (64 characters).
    pub fn output_hash_hex(&self) -> String {
        bytes_to_hex(&self.output_hash)
    }

    pub fn to_json(&self) -> String {
        format!(
            "{{\n  \"platform_fingerprint\": \"{}\",\n  \"output_hash\": \"{}\",\n  \"compiler_version\": \"{}\"\n}}\n",
            self.platform_fingerprint_hex(),
            self.output_hash_hex(),
            self.compiler_version,
        )
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(text: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

pub fn compute_provenance(platform: &PlatformSpec, c_source: &str) -> Provenance {
    Provenance {
        platform_fingerprint: sha256(&platform.canonical_json()),
        output_hash: sha256(c_source),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Compilation state ──────────────────────────────────────────────────────

/// Holds the inputs, the session, generated code and diagnostics.
pub struct CompilationState {
    pub platform: PlatformSpec,
    pub program: Program,
    pub session: Session,
    pub generated: Option<GeneratedCode>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
    pub provenance: Option<Provenance>,
}

impl CompilationState {
    pub fn new(platform: PlatformSpec, program: Program, options: CodegenOptions) -> Self {
        Self {
            platform,
            program,
            session: Session::new(options),
            generated: None,
            diagnostics: Vec::new(),
            has_error: false,
            provenance: None,
        }
    }
}

/// Per-pass post-processing: callback, accumulate, log.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) {
    let diags = state.session.take_diagnostics();
    on_pass_complete(pass_id, &diags);
    if has_errors(&diags) {
        state.has_error = true;
    }
    tracing::debug!(
        pass = descriptor(pass_id).name,
        diagnostics = diags.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "pass complete"
    );
    state.diagnostics.extend(diags);
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to reach `terminal`.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → log.
/// User errors never stop the run.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        run_pass(state, pass_id);
        finish_pass(state, pass_id, t.elapsed(), &mut on_pass_complete);
    }
}

fn run_pass(state: &mut CompilationState, pass_id: PassId) {
    let session = &mut state.session;
    match pass_id {
        PassId::Load => session.load(&state.platform),
        PassId::DeclarePresets => {
            for decl in &state.program.declarations {
                match decl {
                    Declaration::ParameterDefine { name, parameters } => {
                        session.define_parameters(name, parameters.clone())
                    }
                    Declaration::Pattern { name, intervals } => {
                        session.add_pattern(name, intervals)
                    }
                    Declaration::Virtual(v) => session.add_virtual_component(v.clone()),
                    Declaration::Use { .. } | Declaration::SetState { .. } => {}
                }
            }
        }
        PassId::ResolveVirtual => session.resolve_virtual_components(),
        PassId::Declare => {
            for decl in &state.program.declarations {
                match decl {
                    Declaration::Use {
                        keyword,
                        component,
                        parameters,
                        conditions,
                        branch,
                    } => session.use_component(keyword, component, parameters, conditions, *branch),
                    Declaration::SetState {
                        name,
                        value,
                        conditions,
                        branch,
                    } => session.set_state(name, value.clone(), conditions, *branch),
                    Declaration::Virtual(_)
                    | Declaration::ParameterDefine { .. }
                    | Declaration::Pattern { .. } => {}
                }
            }
        }
        PassId::AssignCache => session.mark_cached_sensors(),
        PassId::LowerReferences => session.lower_references(),
        PassId::AssignPackets => session.assign_packets(),
        PassId::AssignReadFunctions => session.assign_read_functions(),
        PassId::Codegen => {
            let result = crate::codegen::codegen(session);
            state.provenance = Some(compute_provenance(
                &state.platform,
                &result.generated.c_source,
            ));
            session.push_diagnostics(result.diagnostics);
            state.generated = Some(result.generated);
        }
    }
}

/// Load `platform_json`, run every pass over `program` and return the
/// final state. Fails only if the platform description is invalid.
pub fn compile(
    platform_json: &str,
    program: Program,
    options: CodegenOptions,
) -> Result<CompilationState, PlatformError> {
    let platform = PlatformSpec::from_json(platform_json)?;
    let mut state = CompilationState::new(platform, program, options);
    run_pipeline(&mut state, PassId::Codegen, |_, _| {});
    Ok(state)
}
