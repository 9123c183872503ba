//! Trace output formatters.
//!
//! Provides human-readable and JSON formatters for trace records.

use std::fmt::Write;

use ember_engine::{Bindings, EngineEvent};
use ember_foundation::{Error, Value};

use super::record::TraceRecord;

// =============================================================================
// Trace Formatter Trait
// =============================================================================

/// Trait for formatting trace records.
pub trait TraceFormatter {
    /// Formats a single trace record to a string.
    fn format(&self, record: &TraceRecord) -> String;

    /// Formats multiple records.
    fn format_many(&self, records: &[&TraceRecord]) -> String {
        records
            .iter()
            .map(|r| self.format(r))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Human-Readable Formatter
// =============================================================================

/// Formats trace records as one line each.
///
/// ```text
/// [000004] S00006     12us    activation-fired discount activation 3
/// [000005] S00007     15us !! guard-error discount (/ ?t ?n): division by zero
/// ```
#[derive(Clone, Debug, Default)]
pub struct HumanFormatter {
    /// Whether to include timestamps.
    pub show_timestamps: bool,
    /// Whether to include record ids.
    pub show_ids: bool,
}

impl HumanFormatter {
    /// Creates a new human formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to show timestamps.
    #[must_use]
    pub fn with_timestamps(mut self) -> Self {
        self.show_timestamps = true;
        self
    }

    /// Builder method to show record ids.
    #[must_use]
    pub fn with_ids(mut self) -> Self {
        self.show_ids = true;
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn format_timestamp(ns: u64) -> String {
        let us = ns / 1000;
        if us >= 1_000_000 {
            format!("{:.3}s", us as f64 / 1_000_000.0)
        } else if us >= 1000 {
            format!("{:.3}ms", us as f64 / 1000.0)
        } else {
            format!("{us}us")
        }
    }

    fn indent(event: &EngineEvent) -> &'static str {
        match event {
            EngineEvent::DefinitionAdded { .. }
            | EngineEvent::DefinitionRemoved { .. }
            | EngineEvent::FactAsserted { .. }
            | EngineEvent::FactRetracted { .. }
            | EngineEvent::QueryStarted { .. }
            | EngineEvent::QueryCompleted { .. } => "",
            _ => "  ",
        }
    }
}

impl TraceFormatter for HumanFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        let mut line = String::new();

        if self.show_ids {
            let _ = write!(line, "[{:06}] ", record.id);
        }

        let _ = write!(line, "S{:05} ", record.sequence);

        if self.show_timestamps {
            let _ = write!(
                line,
                "{:>10} ",
                Self::format_timestamp(record.timestamp_ns)
            );
        }

        let marker = if record.is_error() { "!!" } else { "  " };
        let _ = write!(
            line,
            "{marker} {}{}",
            Self::indent(&record.event),
            record.event
        );
        line
    }
}

// =============================================================================
// JSON Formatter
// =============================================================================

/// Formats trace records as JSON objects.
#[derive(Clone, Debug, Default)]
pub struct JsonFormatter {
    /// Whether to put each record of a list on its own line.
    pub pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method for pretty printing.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn escape_string(s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(out, "\\u{:04x}", u32::from(c));
                }
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }

    /// Formats a value as JSON. Non-finite numbers become strings.
    fn format_value(value: &Value) -> String {
        match value {
            Value::Undefined | Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.is_finite() => n.to_string(),
            Value::Number(n) => Self::escape_string(&n.to_string()),
            Value::String(s) => Self::escape_string(s),
            Value::Date(_) => Self::escape_string(&format!("{value:?}")),
            Value::Vec(items) => {
                let items: Vec<_> = items.iter().map(Self::format_value).collect();
                format!("[{}]", items.join(","))
            }
            Value::Map(fields) => {
                let fields: Vec<_> = fields
                    .iter()
                    .map(|(k, v)| format!("{}:{}", Self::escape_string(k), Self::format_value(v)))
                    .collect();
                format!("{{{}}}", fields.join(","))
            }
            Value::Fact(fact) => format!(
                "{{\"kind\":{},\"id\":{}}}",
                Self::escape_string(fact.kind()),
                fact.id().get()
            ),
        }
    }

    fn format_bindings(bindings: &Bindings) -> String {
        let fields: Vec<_> = bindings
            .iter()
            .map(|(k, v)| format!("{}:{}", Self::escape_string(k), Self::format_value(v)))
            .collect();
        format!("{{{}}}", fields.join(","))
    }

    fn format_error(error: &Error) -> String {
        format!(
            "{{\"kind\":{},\"message\":{}}}",
            Self::escape_string(error.kind_name()),
            Self::escape_string(&error.to_string())
        )
    }

    #[allow(clippy::too_many_lines)]
    fn event_fields(event: &EngineEvent) -> String {
        let s = Self::escape_string;
        match event {
            EngineEvent::DefinitionAdded { id, kind, replaced } => format!(
                "\"id\":{},\"definition\":\"{kind}\",\"replaced\":{replaced}",
                s(id)
            ),
            EngineEvent::DefinitionRemoved { id, kind } => {
                format!("\"id\":{},\"definition\":\"{kind}\"", s(id))
            }
            EngineEvent::FactAsserted {
                fact,
                logical,
                produced_by,
            } => {
                let produced = produced_by
                    .map(|a| format!(",\"produced_by\":{}", a.0))
                    .unwrap_or_default();
                format!(
                    "\"fact\":{},\"logical\":{logical}{produced}",
                    Self::format_value(&Value::Fact(fact.clone()))
                )
            }
            EngineEvent::FactRetracted { fact } => format!(
                "\"fact\":{}",
                Self::format_value(&Value::Fact(fact.clone()))
            ),
            EngineEvent::SchemaError { error } => {
                format!("\"error\":{}", Self::format_error(error))
            }
            EngineEvent::ActivationsFound { trigger, count } => {
                format!("\"trigger\":{},\"count\":{count}", trigger.get())
            }
            EngineEvent::ActivationSelected { rule, bindings } => format!(
                "\"rule\":{},\"bindings\":{}",
                s(rule),
                Self::format_bindings(bindings)
            ),
            EngineEvent::PreConditionPassed { rule } => format!("\"rule\":{}", s(rule)),
            EngineEvent::PreConditionFailed { rule, error } => {
                let error = error
                    .as_ref()
                    .map(|e| format!(",\"error\":{}", Self::format_error(e)))
                    .unwrap_or_default();
                format!("\"rule\":{}{error}", s(rule))
            }
            EngineEvent::GuardError {
                source,
                guard,
                error,
            } => format!(
                "\"source\":{},\"guard\":{},\"error\":{}",
                s(source),
                s(guard),
                Self::format_error(error)
            ),
            EngineEvent::ActivationFired {
                activation,
                rule,
                failed,
            } => format!(
                "\"activation\":{},\"rule\":{},\"failed\":{failed}",
                activation.0,
                s(rule)
            ),
            EngineEvent::ActionErrorHandled { rule, error } => format!(
                "\"rule\":{},\"error\":{}",
                s(rule),
                Self::format_error(error)
            ),
            EngineEvent::PostConditionFailed { rule, index } => {
                format!("\"rule\":{},\"index\":{index}", s(rule))
            }
            EngineEvent::HookError { rule, hook, error } => format!(
                "\"rule\":{},\"hook\":{},\"error\":{}",
                s(rule),
                s(hook),
                Self::format_error(error)
            ),
            EngineEvent::EngineError { source, error } => {
                let source = source
                    .as_ref()
                    .map(|src| format!("\"source\":{},", s(src)))
                    .unwrap_or_default();
                format!("{source}\"error\":{}", Self::format_error(error))
            }
            EngineEvent::ProjectionError {
                query,
                field,
                error,
            } => format!(
                "\"query\":{},\"field\":{},\"error\":{}",
                s(query),
                s(field),
                Self::format_error(error)
            ),
            EngineEvent::QueryStarted { query } => format!("\"query\":{}", s(query)),
            EngineEvent::QueryCompleted { query, rows } => {
                format!("\"query\":{},\"rows\":{rows}", s(query))
            }
            EngineEvent::ActivationInvalidated {
                activation,
                rule,
                cause,
            } => format!(
                "\"activation\":{},\"rule\":{},\"cause\":{}",
                activation.0,
                s(rule),
                cause.get()
            ),
            EngineEvent::LogicalRetracted { fact, activation } => format!(
                "\"fact\":{},\"activation\":{}",
                fact.get(),
                activation.0
            ),
        }
    }
}

impl TraceFormatter for JsonFormatter {
    fn format(&self, record: &TraceRecord) -> String {
        format!(
            "{{\"id\":{},\"sequence\":{},\"timestamp_ns\":{},\"type\":\"{}\",\"is_error\":{},{}}}",
            record.id,
            record.sequence,
            record.timestamp_ns,
            record.event_name(),
            record.is_error(),
            Self::event_fields(&record.event)
        )
    }

    fn format_many(&self, records: &[&TraceRecord]) -> String {
        let items: Vec<_> = records.iter().map(|r| self.format(r)).collect();
        if self.pretty {
            format!("[\n  {}\n]", items.join(",\n  "))
        } else {
            format!("[{}]", items.join(","))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
