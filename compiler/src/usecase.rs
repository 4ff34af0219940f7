// usecase.rs — Use-cases, scheduling modes and state assignments
//
// A `UseCase` binds one component to resolved parameters, a condition list
// and a branch, and derives at most one scheduling mode from the parameters.
// It owns the naming of everything generated per use-case (alarm, callback,
// period constant) and the small C fragments around the callback body.
//
// Preconditions: the owning component exists and outlives its use-cases.
// Postconditions: `schedule` holds exactly one mode or `Schedule::None`.
// Failure modes: unknown parameters, conflicting modes, non-duration periods
//                and unknown patterns are reported; the use-case is still built.
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::branch::{BranchId, Condition};
use crate::component::Component;
use crate::diag::{codes, Diagnostic};
use crate::id::StateId;
use crate::platform::ComponentKind;
use crate::value::Value;

/// One `name` or `name = value` entry of a parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl ParamEntry {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        ParamEntry {
            name: name.into(),
            value: Some(value),
        }
    }

    /// Bare `name`: present without a value, read as `true`.
    pub fn flag(name: impl Into<String>) -> Self {
        ParamEntry {
            name: name.into(),
            value: None,
        }
    }
}

// ── Patterns ────────────────────────────────────────────────────────────────

/// Named sequence of intervals (milliseconds) walked by a wrap-around cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub intervals: Vec<u64>,
}

impl Pattern {
    pub fn array_name(&self) -> String {
        format!("__pattern_{}", self.name)
    }

    pub fn cursor_name(&self) -> String {
        format!("__pattern_{}Cursor", self.name)
    }

    pub fn generate_variables(&self, out: &mut String) {
        let values: Vec<String> = self.intervals.iter().map(u64::to_string).collect();
        let _ = writeln!(
            out,
            "static const uint32_t {}[] = {{{}}};",
            self.array_name(),
            values.join(", ")
        );
        let _ = writeln!(out, "uint_t {};", self.cursor_name());
    }
}

// ── Scheduling ──────────────────────────────────────────────────────────────

/// How a use-case callback is re-triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    None,
    Once,
    /// Fixed interval in milliseconds.
    Period(u64),
    /// Name of a declared pattern.
    Pattern(String),
}

// ── UseCase ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UseCase {
    /// Component defaults overridden by explicit parameters.
    pub parameters: BTreeMap<String, Value>,
    pub conditions: Vec<Condition>,
    pub branch: BranchId,
    /// Ordinal among this component's use-cases in the same branch.
    pub num_in_branch: u32,
    pub schedule: Schedule,
    /// False for outputs, which are driven by the sensors feeding them.
    pub generates_alarm: bool,
    pub read_function_suffix: String,
    /// Parameter values rendered to C once references can be resolved.
    pub lowered: BTreeMap<String, String>,
}

impl UseCase {
    /// Resolve `explicit` over the component defaults and derive the
    /// scheduling mode. Presets must already be expanded.
    pub fn new(
        component: &Component,
        explicit: &[ParamEntry],
        conditions: &[Condition],
        branch: BranchId,
        num_in_branch: u32,
        patterns: &BTreeMap<String, Pattern>,
        diags: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut parameters: BTreeMap<String, Value> = component
            .parameters
            .iter()
            .filter_map(|(k, v)| v.clone().map(|v| (k.clone(), v)))
            .collect();

        for entry in explicit {
            if !component.parameters.contains_key(&entry.name) {
                diags.push(
                    Diagnostic::error(
                        codes::E0102,
                        format!(
                            "parameter '{}' not known for component '{}'",
                            entry.name, component.name
                        ),
                    )
                    .with_subject(component.name.clone()),
                );
                continue;
            }
            let value = entry.value.clone().unwrap_or(Value::Bool(true));
            parameters.insert(entry.name.clone(), value);
        }
        for (name, value) in &parameters {
            if value.is_overflowing_duration() {
                diags.push(overflow_error(name, &component.name));
            }
        }

        let schedule = derive_schedule(component, &parameters, patterns, diags);
        let generates_alarm =
            schedule != Schedule::None && component.kind() != ComponentKind::Output;

        UseCase {
            parameters,
            conditions: conditions.to_vec(),
            branch,
            num_in_branch,
            schedule,
            generates_alarm,
            read_function_suffix: String::new(),
            lowered: BTreeMap::new(),
        }
    }

    // ── Names ───────────────────────────────────────────────────────────

    /// `""` for the first use-case in a branch, then `"1"`, `"2"`, ...
    pub fn suffix(&self) -> String {
        if self.num_in_branch == 0 {
            String::new()
        } else {
            self.num_in_branch.to_string()
        }
    }

    pub fn branch_name(&self) -> String {
        if self.branch == 0 {
            String::new()
        } else {
            format!("Branch{}", self.branch)
        }
    }

    pub fn alarm_name(&self, component: &Component) -> String {
        format!(
            "{}{}Alarm{}",
            component.name_cc(),
            self.branch_name(),
            self.suffix()
        )
    }

    pub fn callback_name(&self, component: &Component) -> String {
        format!(
            "{}{}Callback{}",
            component.name_cc(),
            self.branch_name(),
            self.suffix()
        )
    }

    pub fn period_constant(&self, component: &Component) -> String {
        format!(
            "{}{}_PERIOD{}",
            component.name_uc(),
            self.branch_name().to_uppercase(),
            self.suffix()
        )
    }

    /// Rendered value of a parameter: the lowered text if references were
    /// resolved, else the literal text.
    pub fn rendered(&self, name: &str) -> Option<String> {
        self.lowered
            .get(name)
            .cloned()
            .or_else(|| self.parameters.get(name).map(Value::as_string))
    }

    // ── Generation ──────────────────────────────────────────────────────

    pub fn generate_constants(&self, component: &Component, out: &mut String) {
        if let (true, Schedule::Period(ms)) = (self.generates_alarm, &self.schedule) {
            let _ = writeln!(out, "#define {}    {}", self.period_constant(component), ms);
        }
    }

    pub fn generate_variables(&self, component: &Component, out: &mut String) {
        if self.generates_alarm {
            let _ = writeln!(out, "Alarm_t {};", self.alarm_name(component));
        }
    }

    /// Full callback function around `body` (already indented statements).
    pub fn generate_callback(&self, component: &Component, body: &str, out: &mut String) {
        if !self.generates_alarm {
            return;
        }
        let _ = writeln!(out, "void {}(void *__unused)", self.callback_name(component));
        out.push_str("{\n");
        out.push_str(body);
        self.generate_reschedule(component, out);
        out.push_str("}\n\n");
    }

    fn generate_reschedule(&self, component: &Component, out: &mut String) {
        let alarm = self.alarm_name(component);
        match &self.schedule {
            Schedule::Period(_) => {
                let _ = writeln!(
                    out,
                    "    alarmSchedule(&{}, {});",
                    alarm,
                    self.period_constant(component)
                );
            }
            Schedule::Pattern(name) => {
                let array = format!("__pattern_{}", name);
                let cursor = format!("{}Cursor", array);
                let _ = writeln!(out, "    alarmSchedule(&{}, {}[{}]);", alarm, array, cursor);
                let _ = writeln!(out, "    {}++;", cursor);
                let _ = writeln!(
                    out,
                    "    {} %= sizeof({}) / sizeof(*{});",
                    cursor, array, array
                );
            }
            Schedule::Once | Schedule::None => {}
        }
    }

    /// Body of an actuator callback: the use function, or a `PRINTF` for
    /// the print actuator.
    pub fn actuator_body(&self, component: &Component, diags: &mut Vec<Diagnostic>) -> String {
        if component.name.eq_ignore_ascii_case("print") {
            return self.print_body();
        }
        match component.dependent_parameter_value("useFunction", &self.parameters) {
            Ok(Some(code)) if !code.is_empty() => format!("    {};\n", code),
            Ok(_) => {
                diags.push(
                    Diagnostic::error(
                        codes::E0107,
                        format!("actuator '{}' has no use function", component.name),
                    )
                    .with_subject(component.name.clone()),
                );
                String::new()
            }
            Err(placeholder) => {
                diags.push(
                    Diagnostic::error(
                        codes::E0405,
                        format!(
                            "use function of actuator '{}' uses '{{{}}}', which is not set",
                            component.name, placeholder
                        ),
                    )
                    .with_subject(component.name.clone()),
                );
                String::new()
            }
        }
    }

    fn print_body(&self) -> String {
        let format = match self.parameters.get("format") {
            Some(v @ Value::Str(_)) => v.as_string(),
            Some(other) => format!("\"{}\"", other.as_name()),
            None => "\"\"".to_string(),
        };
        let mut line = format!("    PRINTF({}", format);
        for i in 0..crate::platform::MAX_PRINT_ARGS {
            let key = format!("arg{}", i);
            if let Some(arg) = self.rendered(&key) {
                let _ = write!(line, ", {}", arg);
            }
        }
        line.push_str(");\n");
        line
    }

    pub fn generate_app_main_code(&self, component: &Component, out: &mut String) {
        if self.generates_alarm {
            let _ = writeln!(
                out,
                "    alarmInit(&{}, {}, NULL);",
                self.alarm_name(component),
                self.callback_name(component)
            );
        }
    }

    /// Entering the branch samples immediately.
    pub fn generate_branch_enter(&self, component: &Component, out: &mut String) {
        if self.generates_alarm {
            let _ = writeln!(out, "    {}(NULL);", self.callback_name(component));
        }
    }

    pub fn generate_branch_exit(&self, component: &Component, out: &mut String) {
        if !self.generates_alarm {
            return;
        }
        let _ = writeln!(out, "    alarmRemove(&{});", self.alarm_name(component));
        if let Schedule::Pattern(name) = &self.schedule {
            let _ = writeln!(out, "    __pattern_{}Cursor = 0;", name);
        }
    }
}

fn derive_schedule(
    component: &Component,
    parameters: &BTreeMap<String, Value>,
    patterns: &BTreeMap<String, Pattern>,
    diags: &mut Vec<Diagnostic>,
) -> Schedule {
    let period = truthy(parameters, "period");
    let pattern = truthy(parameters, "pattern").map(Value::as_name);
    let once = truthy(parameters, "once").is_some();

    match (period.is_some(), pattern.is_some(), once) {
        (true, true, _) => diags.push(
            Diagnostic::error(
                codes::E0201,
                format!(
                    "both 'period' and 'pattern' specified for component '{}' use case",
                    component.name
                ),
            )
            .with_subject(component.name.clone()),
        ),
        (true, false, true) | (false, true, true) => diags.push(
            Diagnostic::error(
                codes::E0201,
                format!(
                    "both 'once' and 'period' or 'pattern' specified for component '{}' use case",
                    component.name
                ),
            )
            .with_subject(component.name.clone()),
        ),
        _ => {}
    }

    // overflowing duration literals are reported with the parameter
    let period = period.and_then(|v| match v.to_milliseconds() {
        Some(ms) => Some(ms),
        None if v.is_overflowing_duration() => None,
        None => {
            diags.push(
                Diagnostic::error(
                    codes::E0204,
                    format!(
                        "period '{}' of component '{}' is not a duration",
                        v, component.name
                    ),
                )
                .with_subject(component.name.clone()),
            );
            None
        }
    });

    if let Some(ms) = period {
        return Schedule::Period(ms);
    }
    if let Some(name) = pattern {
        if patterns.contains_key(&name) {
            return Schedule::Pattern(name);
        }
        diags.push(
            Diagnostic::error(
                codes::E0202,
                format!("pattern '{}' is not defined", name),
            )
            .with_subject(component.name.clone())
            .with_hint("declare the pattern before using it"),
        );
        return Schedule::None;
    }
    if once {
        Schedule::Once
    } else {
        Schedule::None
    }
}

fn truthy<'a>(parameters: &'a BTreeMap<String, Value>, name: &str) -> Option<&'a Value> {
    parameters.get(name).filter(|v| v.is_truthy())
}

/// A duration literal on `name` that does not fit in milliseconds.
pub(crate) fn overflow_error(name: &str, subject: &str) -> Diagnostic {
    Diagnostic::error(
        codes::E0204,
        format!("duration '{}' of '{}' does not fit in milliseconds", name, subject),
    )
    .with_subject(subject.to_string())
}

// ── State use-cases ─────────────────────────────────────────────────────────

/// `set <name> = <value>` under a branch: entering the branch assigns the
/// state variable, leaving it does nothing.
#[derive(Debug, Clone)]
pub struct StateUseCase {
    pub id: StateId,
    pub name: String,
    pub value: Value,
    pub conditions: Vec<Condition>,
    pub branch: BranchId,
    pub lowered: Option<String>,
    /// C type of the referenced sensor value, for `set x = temp.value`.
    pub c_type: Option<String>,
}

impl StateUseCase {
    fn rendered(&self) -> String {
        self.lowered
            .clone()
            .unwrap_or_else(|| self.value.as_string())
    }

    pub fn type_name(&self) -> String {
        self.c_type
            .clone()
            .unwrap_or_else(|| self.value.type_name().to_string())
    }

    /// File-scope declaration of the state variable. References are read
    /// when the branch is entered, so they start out as `0`.
    pub fn generate_variables(&self, out: &mut String) {
        let init = match self.value {
            Value::Ref { .. } => "0".to_string(),
            _ => self.value.as_string(),
        };
        let _ = writeln!(out, "{} {} = {};", self.type_name(), self.name, init);
    }

    pub fn generate_branch_enter(&self, out: &mut String) {
        let _ = writeln!(out, "    {} = {};", self.name, self.rendered());
    }
}
