// component.rs — Sensor / actuator / output model
//
// A `Component` is one instance of a platform `ComponentSpec`: its parameter
// map (spec defaults, possibly overridden by virtual-component resolution),
// its use-cases, and kind-specific state. Kinds form a closed tagged variant;
// every generation routine matches on it exhaustively.
//
// Preconditions: components are created by the session from a validated
//                platform spec.
// Postconditions: generation helpers emit nothing for unused components.
// Failure modes: missing read functions, unresolved template placeholders and
//                unknown transform functions produce diagnostics and fall
//                back to `0` / no processing.
// Side effects: none (diagnostics are returned to the caller).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::branch::{BranchId, Condition};
use crate::diag::{codes, Diagnostic};
use crate::id::ComponentId;
use crate::platform::{ComponentKind, ComponentSpec};
use crate::usecase::{ParamEntry, Pattern, UseCase};
use crate::value::Value;

/// Sensor data width used when neither the platform nor the user sets
/// `dataSize`.
pub const DEFAULT_DATA_SIZE: u32 = 2;

// ── Processing trees ────────────────────────────────────────────────────────

/// A nested transform applied to every sensor read, e.g. `max(min(temp))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTree {
    pub function: String,
    #[serde(default)]
    pub arguments: Vec<ProcessArg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessArg {
    Tree(ProcessTree),
    Value(Value),
}

// ── Kind state ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SensorState {
    /// Minimum interval between hardware reads, in milliseconds.
    pub min_update_period: u64,
    /// Assigned read-cache slot; `Some` once the sensor needs caching.
    pub cache_slot: Option<u32>,
    /// Counter for per-use-case read function suffixes.
    pub read_function_num: u32,
}

/// One field of an aggregate output packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketField {
    /// Width in bytes.
    pub width: u32,
    /// Name of the sensor that fills the field.
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputState {
    pub fields: Vec<PacketField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindState {
    Sensor(SensorState),
    Actuator,
    Output(OutputState),
}

// ── Component ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    pub spec: Rc<ComponentSpec>,
    /// Every parameter the component supports; `None` when supported but unset.
    pub parameters: BTreeMap<String, Option<Value>>,
    pub use_cases: Vec<UseCase>,
    pub marked_used: bool,
    pub process: Option<ProcessTree>,
    pub state: KindState,
}

impl Component {
    pub fn new(
        id: ComponentId,
        name: impl Into<String>,
        spec: Rc<ComponentSpec>,
        default_min_update_period: u64,
    ) -> Self {
        let parameters = spec
            .parameters
            .iter()
            .map(|(name, p)| (name.clone(), p.default.clone()))
            .collect();
        let state = match spec.kind {
            ComponentKind::Sensor => KindState::Sensor(SensorState {
                min_update_period: spec.min_update_period.unwrap_or(default_min_update_period),
                cache_slot: None,
                read_function_num: 0,
            }),
            ComponentKind::Actuator => KindState::Actuator,
            ComponentKind::Output => KindState::Output(OutputState::default()),
        };
        Component {
            id,
            name: name.into(),
            spec,
            parameters,
            use_cases: Vec::new(),
            marked_used: false,
            process: None,
            state,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self.state {
            KindState::Sensor(_) => ComponentKind::Sensor,
            KindState::Actuator => ComponentKind::Actuator,
            KindState::Output(_) => ComponentKind::Output,
        }
    }

    pub fn sensor(&self) -> Option<&SensorState> {
        match &self.state {
            KindState::Sensor(s) => Some(s),
            _ => None,
        }
    }

    pub fn sensor_mut(&mut self) -> Option<&mut SensorState> {
        match &mut self.state {
            KindState::Sensor(s) => Some(s),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&OutputState> {
        match &self.state {
            KindState::Output(o) => Some(o),
            _ => None,
        }
    }

    pub fn output_mut(&mut self) -> Option<&mut OutputState> {
        match &mut self.state {
            KindState::Output(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.marked_used || !self.use_cases.is_empty()
    }

    pub fn mark_used(&mut self) {
        self.marked_used = true;
    }

    // ── Names ───────────────────────────────────────────────────────────

    pub fn name_uc(&self) -> String {
        self.name.to_uppercase()
    }

    /// camelCase form: first character lowered.
    pub fn name_cc(&self) -> String {
        camel_case(&self.name)
    }

    // ── Parameters ──────────────────────────────────────────────────────

    /// Effective value of a parameter. Outputs let their first use-case
    /// override the component defaults (`output radio (crc)`).
    pub fn parameter_value(&self, name: &str) -> Option<&Value> {
        if let KindState::Output(_) = self.state {
            if let Some(v) = self.use_cases.first().and_then(|uc| uc.parameters.get(name)) {
                return Some(v);
            }
        }
        self.parameters.get(name).and_then(Option::as_ref)
    }

    pub fn parameter_is_set(&self, name: &str) -> bool {
        self.parameter_value(name).is_some_and(Value::is_truthy)
    }

    /// Value of a code parameter after substituting `{param}` placeholders,
    /// first from `use_case_params`, then from the component's own values.
    ///
    /// Returns `Ok(None)` if the parameter is not set at all and
    /// `Err(placeholder)` for the first placeholder that cannot be resolved.
    pub fn dependent_parameter_value(
        &self,
        name: &str,
        use_case_params: &BTreeMap<String, Value>,
    ) -> Result<Option<String>, String> {
        let template = match use_case_params
            .get(name)
            .or_else(|| self.parameters.get(name).and_then(Option::as_ref))
        {
            Some(v) => v.as_name(),
            None => return Ok(None),
        };
        substitute_placeholders(&template, |key| {
            use_case_params
                .get(key)
                .or_else(|| self.parameters.get(key).and_then(Option::as_ref))
                .map(Value::as_string)
        })
        .map(Some)
    }

    // ── Use-cases ───────────────────────────────────────────────────────

    /// Attach a new use-case. A `parameters` entry is expanded from the
    /// named preset; a parameter given twice keeps its first value.
    /// Returns the index of the new use-case.
    pub fn add_use_case(
        &mut self,
        parameters: &[ParamEntry],
        conditions: &[Condition],
        branch: BranchId,
        presets: &BTreeMap<String, Vec<ParamEntry>>,
        patterns: &BTreeMap<String, Pattern>,
        diags: &mut Vec<Diagnostic>,
    ) -> usize {
        let num_in_branch = self
            .use_cases
            .iter()
            .filter(|uc| uc.branch == branch)
            .count() as u32;

        let mut merged: Vec<ParamEntry> = Vec::with_capacity(parameters.len());
        let mut push = |entry: &ParamEntry, diags: &mut Vec<Diagnostic>| {
            if merged.iter().any(|p| p.name == entry.name) {
                diags.push(
                    Diagnostic::error(
                        codes::E0103,
                        format!(
                            "parameter '{}' already specified for component '{}'",
                            entry.name, self.name
                        ),
                    )
                    .with_subject(self.name.clone()),
                );
            } else {
                merged.push(entry.clone());
            }
        };

        for p in parameters {
            if !p.name.eq_ignore_ascii_case("parameters") {
                push(p, diags);
                continue;
            }
            let preset_name = p.value.as_ref().map(Value::as_name).unwrap_or_default();
            match presets.get(&preset_name) {
                Some(entries) => {
                    for entry in entries {
                        push(entry, diags);
                    }
                }
                None => diags.push(
                    Diagnostic::error(
                        codes::E0105,
                        format!(
                            "no parameter define with name '{}' is present (for component '{}')",
                            preset_name, self.name
                        ),
                    )
                    .with_subject(self.name.clone()),
                ),
            }
        }

        let uc = UseCase::new(self, &merged, conditions, branch, num_in_branch, patterns, diags);
        self.use_cases.push(uc);
        self.use_cases.len() - 1
    }

    // ── Sensor data ─────────────────────────────────────────────────────

    /// Data width in bytes.
    pub fn data_size(&self) -> u32 {
        self.parameter_value("dataSize")
            .and_then(Value::as_int)
            .filter(|n| (1..=8).contains(n))
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_DATA_SIZE)
    }

    pub fn data_bits(&self) -> u32 {
        self.data_size() * 8
    }

    pub fn data_type(&self) -> String {
        match self.parameter_value("dataType") {
            Some(t) => t.as_name(),
            None => format!("uint{}_t", self.data_bits()),
        }
    }

    pub fn max_value(&self) -> String {
        format!("0x{}", "ff".repeat(self.data_size() as usize))
    }

    pub fn min_value(&self) -> String {
        "0".to_string()
    }

    /// All-ones sentinel marking "no reading yet".
    pub fn no_value(&self) -> String {
        self.max_value()
    }

    /// Expression reading the raw sensor value. Goes through the read cache
    /// once the sensor has a cache slot; per-use-case read functions
    /// (non-empty suffix) always read directly.
    pub fn raw_read_function(&self, suffix: &str) -> String {
        let raw = format!("{}ReadRaw{}", self.name_cc(), suffix);
        match self.sensor() {
            Some(SensorState {
                cache_slot: Some(slot),
                min_update_period,
                ..
            }) if suffix.is_empty() => format!(
                "cacheReadSensorU{}({}, &{}, {})",
                self.data_bits(),
                slot,
                raw,
                min_update_period
            ),
            _ => format!("{}()", raw),
        }
    }

    /// Lower a transform tree into C statements operating on `value`,
    /// innermost transform first, one static state variable per node.
    pub fn data_process(&self, tree: &ProcessTree, diags: &mut Vec<Diagnostic>) -> Vec<String> {
        let mut lines = Vec::new();
        let mut next_var = 0u32;
        self.lower_transform(tree, &mut next_var, &mut lines, diags);
        lines
    }

    fn lower_transform(
        &self,
        tree: &ProcessTree,
        next_var: &mut u32,
        lines: &mut Vec<String>,
        diags: &mut Vec<Diagnostic>,
    ) {
        for arg in &tree.arguments {
            if let ProcessArg::Tree(inner) = arg {
                self.lower_transform(inner, next_var, lines, diags);
            }
        }

        let (init, cmp) = match tree.function.as_str() {
            "min" => (self.max_value(), '>'),
            "max" => (self.min_value(), '<'),
            other => {
                diags.push(
                    Diagnostic::error(
                        codes::E0406,
                        format!(
                            "unknown processing function '{}' for component '{}'",
                            other, self.name
                        ),
                    )
                    .with_subject(self.name.clone())
                    .with_hint("supported functions: min, max"),
                );
                return;
            }
        };
        let var = format!("{}Value{}", tree.function, next_var);
        *next_var += 1;
        lines.push(format!("static {} {} = {};", self.data_type(), var, init));
        lines.push(format!("if ({} {} value) {} = value;", var, cmp, var));
        lines.push(format!("else value = {};", var));
    }

    // ── Generation ──────────────────────────────────────────────────────

    /// `#define`s: use-case periods, sensor no-value sentinel, packet size.
    pub fn generate_constants(&self, out: &mut String) {
        for uc in &self.use_cases {
            uc.generate_constants(self, out);
        }
        if !self.is_used() {
            return;
        }
        match &self.state {
            KindState::Sensor(_) => {
                let _ = writeln!(out, "#define {}_NO_VALUE    {}", self.name_uc(), self.no_value());
            }
            KindState::Actuator => {}
            KindState::Output(o) => {
                if !o.fields.is_empty() {
                    let _ = writeln!(
                        out,
                        "#define {}_PACKET_NUM_FIELDS    {}",
                        self.name_uc(),
                        o.fields.len()
                    );
                }
            }
        }
    }

    /// Raw-read and read-process functions of a used sensor.
    pub fn generate_read_functions(&self, out: &mut String, diags: &mut Vec<Diagnostic>) {
        if self.sensor().is_none() || !self.is_used() {
            return;
        }
        let no_params = BTreeMap::new();
        let process = match &self.process {
            Some(tree) => self.data_process(tree, diags),
            None => Vec::new(),
        };
        if self.spec.read_function_depends_on_params {
            for uc in &self.use_cases {
                self.generate_read_pair(
                    &uc.read_function_suffix,
                    &uc.parameters,
                    &process,
                    out,
                    diags,
                );
            }
            if self.marked_used {
                self.generate_read_pair("", &no_params, &process, out, diags);
            }
        } else {
            self.generate_read_pair("", &no_params, &process, out, diags);
        }
    }

    fn generate_read_pair(
        &self,
        suffix: &str,
        params: &BTreeMap<String, Value>,
        process: &[String],
        out: &mut String,
        diags: &mut Vec<Diagnostic>,
    ) {
        let bits = self.data_bits();
        let cc = self.name_cc();

        let read = match self.dependent_parameter_value("readFunction", params) {
            Ok(Some(code)) if !code.is_empty() => code,
            Ok(_) => {
                diags.push(
                    Diagnostic::error(
                        codes::E0404,
                        format!("sensor '{}' has no valid read function", self.name),
                    )
                    .with_subject(self.name.clone()),
                );
                "0".to_string()
            }
            Err(placeholder) => {
                diags.push(
                    Diagnostic::error(
                        codes::E0405,
                        format!(
                            "read function of sensor '{}' uses '{{{}}}', which is not set",
                            self.name, placeholder
                        ),
                    )
                    .with_subject(self.name.clone()),
                );
                "0".to_string()
            }
        };

        let _ = writeln!(out, "static inline uint{}_t {}ReadRaw{}(void)", bits, cc, suffix);
        out.push_str("{\n");
        let _ = writeln!(out, "    return {};", read);
        out.push_str("}\n\n");

        let _ = writeln!(out, "static inline uint{}_t {}ReadProcess{}(void)", bits, cc, suffix);
        out.push_str("{\n");
        let _ = writeln!(out, "    uint{}_t value;", bits);
        let _ = writeln!(out, "    value = {};", self.raw_read_function(suffix));
        for line in process {
            let _ = writeln!(out, "    {}", line);
        }
        out.push_str("    return value;\n");
        out.push_str("}\n\n");
    }

    /// Statements for the main-init function.
    pub fn generate_app_main_code(&self, out: &mut String) {
        for uc in &self.use_cases {
            uc.generate_app_main_code(self, out);
        }
        if let KindState::Output(o) = &self.state {
            if self.is_used() && self.is_aggregate() && !o.fields.is_empty() {
                let _ = writeln!(out, "    {}PacketInit();", self.name_cc());
            }
        }
    }
}

/// First character lowered: `Light` → `light`, `tempMin` unchanged.
pub fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Replace every `{key}` in `template` through `lookup`. Returns the first
/// key `lookup` cannot resolve as the error.
pub fn substitute_placeholders(
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start + 1..].find('}') else {
            break;
        };
        let key = &rest[start + 1..start + 1 + len];
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            // Not a placeholder (e.g. a C block); copy through.
            out.push_str(&rest[..start + 1]);
            rest = &rest[start + 1..];
            continue;
        }
        out.push_str(&rest[..start]);
        out.push_str(&lookup(key).ok_or_else(|| key.to_string())?);
        rest = &rest[start + 2 + len..];
    }
    out.push_str(rest);
    Ok(out)
}
