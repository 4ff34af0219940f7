// platform.rs — Component specifications for one target platform
//
// A platform description lists every sensor, actuator and output the target
// supports, with a statically declared parameter schema: parameter name →
// default literal + capability tag. Descriptions are JSON documents; loading
// validates the schema against the fixed registry of well-known parameters.
//
// Duplicate component names are NOT rejected here. The session reports them
// as user errors when it instantiates components, so one bad entry does not
// prevent the rest of the platform from loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ── Data types ──────────────────────────────────────────────────────────────

/// Closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Sensor,
    Actuator,
    Output,
}

/// What a parameter is used for by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamTag {
    /// `period`, `pattern`, `once`.
    Schedule,
    /// C code spliced into generated functions (`readFunction`, ...).
    Code,
    /// Sensor data layout (`dataSize`, `dataType`).
    Layout,
    /// Output packet behaviour (`aggregate`, `crc`).
    Output,
    /// Arguments of the print actuator.
    Print,
    /// Build integration text (`extraIncludes`, `extraConfig`).
    Build,
    /// Literal value of constant components.
    Value,
    /// Platform-specific argument referenced from code templates.
    Argument,
}

/// Schema entry for one component parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(default)]
    pub default: Option<Value>,
    pub tag: ParamTag,
}

/// Specification of one component, shared by every component instantiated
/// from it (including materialized virtual components).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub kind: ComponentKind,
    /// Minimum interval between two hardware reads, in milliseconds.
    #[serde(default)]
    pub min_update_period: Option<u64>,
    /// Read function template references use-case parameters; each
    /// use-case then gets its own read function.
    #[serde(default)]
    pub read_function_depends_on_params: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
}

/// All component specifications of one target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub name: String,
    pub components: Vec<ComponentSpec>,
}

/// Errors that can occur while loading a platform description.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("malformed platform description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid component name: '{0}'")]
    InvalidName(String),

    #[error("component '{component}': parameter '{parameter}' must be tagged {expected:?}, found {found:?}")]
    WrongTag {
        component: String,
        parameter: String,
        expected: ParamTag,
        found: ParamTag,
    },

    #[error("component '{component}': parameter '{parameter}' is not a known parameter and must be tagged argument")]
    UnknownParameter { component: String, parameter: String },
}

// ── Parameter registry ──────────────────────────────────────────────────────

/// Number of positional arguments the print actuator accepts (`arg0..arg99`).
pub const MAX_PRINT_ARGS: usize = 100;

/// Capability tag of a well-known parameter name, or `None` for
/// platform-specific arguments.
pub fn well_known_tag(name: &str) -> Option<ParamTag> {
    let tag = match name {
        "period" | "pattern" | "once" => ParamTag::Schedule,
        "useFunction" | "readFunction" | "errorFunction" => ParamTag::Code,
        "dataSize" | "dataType" => ParamTag::Layout,
        "aggregate" | "crc" => ParamTag::Output,
        "format" => ParamTag::Print,
        "extraIncludes" | "extraConfig" => ParamTag::Build,
        "value" => ParamTag::Value,
        _ => {
            let index = name.strip_prefix("arg")?.parse::<usize>().ok()?;
            if index >= MAX_PRINT_ARGS {
                return None;
            }
            ParamTag::Print
        }
    };
    Some(tag)
}

// ── Loading ─────────────────────────────────────────────────────────────────

impl PlatformSpec {
    /// Parse and validate a JSON platform description.
    pub fn from_json(source: &str) -> Result<Self, PlatformError> {
        let mut platform: PlatformSpec = serde_json::from_str(source)?;
        for spec in &mut platform.components {
            validate_component(spec)?;
            normalize_code_defaults(spec);
        }
        Ok(platform)
    }

    /// Case-insensitive lookup of the first specification with this name.
    pub fn lookup(&self, name: &str) -> Option<&ComponentSpec> {
        self.components
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentSpec> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Compact JSON with sorted parameter keys; stable across runs and used
    /// for the platform fingerprint.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).expect("internal: platform spec is always serializable")
    }
}

fn validate_component(spec: &ComponentSpec) -> Result<(), PlatformError> {
    let name = spec.name.as_str();
    if name.is_empty()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || name.starts_with(|c: char| c.is_ascii_digit())
    {
        return Err(PlatformError::InvalidName(spec.name.clone()));
    }

    for (param, entry) in &spec.parameters {
        match well_known_tag(param) {
            Some(expected) if expected != entry.tag => {
                return Err(PlatformError::WrongTag {
                    component: spec.name.clone(),
                    parameter: param.clone(),
                    expected,
                    found: entry.tag,
                });
            }
            None if entry.tag != ParamTag::Argument => {
                return Err(PlatformError::UnknownParameter {
                    component: spec.name.clone(),
                    parameter: param.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// JSON has no way to tell code from text; the tag decides. Plain strings in
/// code and build parameters are C source, not string literals.
fn normalize_code_defaults(spec: &mut ComponentSpec) {
    for entry in spec.parameters.values_mut() {
        if !matches!(entry.tag, ParamTag::Code | ParamTag::Build) {
            continue;
        }
        if let Some(Value::Str(text)) = &entry.default {
            entry.default = Some(Value::code(text.clone()));
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
