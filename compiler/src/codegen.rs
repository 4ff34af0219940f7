// codegen.rs — C code generation for SEAL applications
//
// Walks a prepared session and emits the firmware sources section by
// section: includes, constants, variables, callbacks, branch start/stop
// functions and main-init statements, plus the build configuration text.
// Components are visited sensors first, then actuators, then outputs, each
// in name order, so output is deterministic.
//
// Preconditions: cache slots, packet fields, read-function suffixes and
//                lowered references have been assigned on the session.
// Postconditions: returns `CodegenResult` with every section and the
//                 combined C source.
// Failure modes: missing read/use functions, unresolved placeholders and
//                unknown transforms produce diagnostics; fallback code is
//                still emitted.
// Side effects: none.

use std::fmt::Write as _;

use serde::Deserialize;

use crate::component::{Component, KindState};
use crate::diag::Diagnostic;
use crate::session::Session;

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CodegenResult {
    pub generated: GeneratedCode,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generated text, one field per section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    pub includes: String,
    pub constants: String,
    pub variables: String,
    pub callbacks: String,
    pub branches: String,
    /// Statements of `appMainInit`, without the function frame.
    pub main_init: String,
    /// Build configuration fragment (`extraConfig` of used components).
    pub config: String,
    /// All C sections combined into one translation unit.
    pub c_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Period at which the control layer re-evaluates branch conditions.
    pub condition_eval_period_ms: u64,
    /// Minimum sensor update period when the platform declares none.
    pub default_min_update_period_ms: u64,
    /// Separate sections of the combined source with banner comments.
    pub section_comments: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            condition_eval_period_ms: 1000,
            default_min_update_period_ms: 1000,
            section_comments: true,
        }
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn codegen(session: &Session) -> CodegenResult {
    let mut ctx = CodegenCtx::new(session);
    ctx.emit_all();
    ctx.build_result()
}

// ── Internal context ────────────────────────────────────────────────────────

struct CodegenCtx<'a> {
    session: &'a Session,
    generated: GeneratedCode,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CodegenCtx<'a> {
    fn new(session: &'a Session) -> Self {
        CodegenCtx {
            session,
            generated: GeneratedCode::default(),
            diagnostics: Vec::new(),
        }
    }

    fn build_result(mut self) -> CodegenResult {
        self.generated.c_source = self.combine();
        CodegenResult {
            generated: self.generated,
            diagnostics: self.diagnostics,
        }
    }

    fn emit_all(&mut self) {
        self.emit_includes();
        self.emit_constants();
        self.emit_variables();
        self.emit_callbacks();
        self.emit_branches();
        self.emit_main_init();
        self.emit_config();
    }

    // ── Sections ────────────────────────────────────────────────────────

    fn emit_includes(&mut self) {
        let out = &mut self.generated.includes;
        for c in self.session.all_components() {
            if let Some(text) = build_text(c, "extraIncludes") {
                let _ = writeln!(out, "{}", text);
            }
        }
    }

    fn emit_config(&mut self) {
        let out = &mut self.generated.config;
        for c in self.session.all_components() {
            if let Some(text) = build_text(c, "extraConfig") {
                let _ = writeln!(out, "{}", text);
            }
        }
    }

    fn emit_constants(&mut self) {
        let out = &mut self.generated.constants;
        for c in self.session.all_components() {
            c.generate_constants(out);
        }
    }

    fn emit_variables(&mut self) {
        let session = self.session;
        let out = &mut self.generated.variables;
        for o in session.outputs() {
            o.generate_packet_type(out);
        }
        for s in session.state_declarations() {
            s.generate_variables(out);
        }
        for p in session.patterns() {
            p.generate_variables(out);
        }
        for c in session.all_components() {
            for uc in &c.use_cases {
                uc.generate_variables(c, out);
            }
            if let KindState::Output(_) = c.state {
                c.generate_packet_variables(out);
            }
        }
    }

    fn emit_callbacks(&mut self) {
        let session = self.session;
        let used_outputs: Vec<&Component> = session.outputs().filter(|o| o.is_used()).collect();
        let reporting: Vec<&Component> = session
            .sensors()
            .filter(|s| s.use_cases.iter().any(|uc| uc.generates_alarm))
            .collect();

        let out = &mut self.generated.callbacks;
        for o in &used_outputs {
            o.generate_output_code(&reporting, out);
        }

        for s in session.sensors() {
            s.generate_read_functions(out, &mut self.diagnostics);
            for uc in &s.use_cases {
                let cc = s.name_cc();
                let mut body = format!(
                    "    {} {}Value = {}ReadProcess{}();\n",
                    s.data_type(),
                    cc,
                    cc,
                    uc.read_function_suffix
                );
                for o in &used_outputs {
                    o.generate_callback_code(s, &mut body);
                }
                uc.generate_callback(s, &body, out);
            }
        }

        for a in session.actuators() {
            for uc in &a.use_cases {
                if !uc.generates_alarm {
                    continue;
                }
                let body = uc.actuator_body(a, &mut self.diagnostics);
                uc.generate_callback(a, &body, out);
            }
        }
    }

    fn emit_branches(&mut self) {
        self.session
            .branches()
            .generate(self.session, &mut self.generated.branches);
    }

    fn emit_main_init(&mut self) {
        let out = &mut self.generated.main_init;
        for c in self.session.all_components() {
            c.generate_app_main_code(out);
        }
    }

    // ── Combined source ─────────────────────────────────────────────────

    fn combine(&self) -> String {
        let g = &self.generated;
        let banners = self.session.options().section_comments;
        let mut src = String::with_capacity(
            g.includes.len()
                + g.constants.len()
                + g.variables.len()
                + g.callbacks.len()
                + g.branches.len()
                + g.main_init.len()
                + 256,
        );
        let _ = writeln!(src, "// Generated by sealc for platform '{}'", self.session.platform());
        src.push('\n');

        let sections = [
            ("includes", &g.includes),
            ("constants", &g.constants),
            ("variables", &g.variables),
            ("callbacks", &g.callbacks),
            ("branches", &g.branches),
        ];
        for (title, text) in sections {
            if text.is_empty() {
                continue;
            }
            if banners {
                let _ = writeln!(src, "// ---- {} ----", title);
            }
            src.push_str(text);
            if !text.ends_with("\n\n") {
                src.push('\n');
            }
        }

        if banners {
            src.push_str("// ---- main init ----\n");
        }
        src.push_str("void appMainInit(void)\n{\n");
        src.push_str(&g.main_init);
        src.push_str("}\n");
        src
    }
}

/// Build-integration text of a used component.
fn build_text(c: &Component, parameter: &str) -> Option<String> {
    if !c.is_used() {
        return None;
    }
    c.parameters
        .get(parameter)
        .and_then(Option::as_ref)
        .filter(|v| v.is_truthy())
        .map(|v| v.as_name())
}
