// diag.rs — Unified diagnostics model
//
// User errors never abort a run: every phase pushes `Diagnostic`s into the
// session and carries on with a safe fallback, so one compile surfaces as
// many problems as possible. Invariant violations inside the compiler are
// not diagnostics; they panic with an `internal:` message.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0001`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered diagnostic codes, grouped by the phase that reports them.
pub mod codes {
    use super::DiagCode;

    // Components and parameters
    pub const E0101: DiagCode = DiagCode("E0101"); // unknown component
    pub const E0102: DiagCode = DiagCode("E0102"); // unknown parameter
    pub const E0103: DiagCode = DiagCode("E0103"); // parameter given twice
    pub const E0104: DiagCode = DiagCode("E0104"); // duplicate component in platform
    pub const E0105: DiagCode = DiagCode("E0105"); // unknown parameter preset
    pub const E0106: DiagCode = DiagCode("E0106"); // duplicate parameter preset
    pub const E0107: DiagCode = DiagCode("E0107"); // actuator without use function

    // Scheduling
    pub const E0201: DiagCode = DiagCode("E0201"); // conflicting once/period/pattern
    pub const E0202: DiagCode = DiagCode("E0202"); // unknown pattern
    pub const E0203: DiagCode = DiagCode("E0203"); // duplicate pattern
    pub const E0204: DiagCode = DiagCode("E0204"); // value is not a duration

    // Virtual components
    pub const E0301: DiagCode = DiagCode("E0301"); // cyclic base chain
    pub const E0302: DiagCode = DiagCode("E0302"); // unknown base
    pub const E0303: DiagCode = DiagCode("E0303"); // duplicate virtual component
    pub const E0304: DiagCode = DiagCode("E0304"); // virtual shadows a real component
    pub const E0305: DiagCode = DiagCode("E0305"); // malformed constant base
    pub const E0306: DiagCode = DiagCode("E0306"); // base failed to resolve

    // Reads and value references
    pub const E0401: DiagCode = DiagCode("E0401"); // value of a non-sensor
    pub const E0402: DiagCode = DiagCode("E0402"); // no error attribute
    pub const E0403: DiagCode = DiagCode("E0403"); // unknown component property
    pub const E0404: DiagCode = DiagCode("E0404"); // missing read function
    pub const E0405: DiagCode = DiagCode("E0405"); // unresolved placeholder
    pub const E0406: DiagCode = DiagCode("E0406"); // unknown transform function

    // Packets
    pub const E0501: DiagCode = DiagCode("E0501"); // aggregate packet without fields

    // Warnings
    pub const W0001: DiagCode = DiagCode("W0001"); // divergent branch conditions
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    /// Name of the component, state, preset or pattern the diagnostic is about.
    pub subject: Option<String>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, subject or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            subject: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(code: DiagCode, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message).with_code(code)
    }

    pub fn warning(code: DiagCode, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message).with_code(code)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the name of the construct this diagnostic is about.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// True if any diagnostic in the slice is error-level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}
