//! Per-invocation translation between operation descriptors and the host's
//! field representation.
//!
//! The adapter is built from one descriptor and does three jobs:
//! - `job_params` renders the declared parameter schema for parse-only mode;
//! - `coerce` turns raw string values into typed fields per declared kind;
//! - `launch` assembles the final field map (defaults, required checks,
//!   unknown-key passthrough), executes, and filters the outputs.

use serde::Serialize;
use serde_json::Value;

use crate::bridge::DispatchError;
use crate::registry::{OperationInfo, ParamKind};
use crate::roi::Polygon;
use crate::session::{ExecRequest, FieldMap, HostSession};
use crate::{log_debug, log_trace};

/// Host-native declaration of an operation's parameters, reported to the
/// caller in parse-only mode.
#[derive(Debug, Serialize)]
pub struct JobParams {
    pub identifier: String,
    pub inputs: Vec<JobField>,
    pub outputs: Vec<JobField>,
}

#[derive(Debug, Serialize)]
pub struct JobField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl JobField {
    fn from_spec(spec: &crate::registry::ParamSpec) -> Self {
        JobField {
            name: spec.name.clone(),
            kind: spec.kind,
            required: spec.required,
            description: spec.description.clone(),
            default: spec.default.clone(),
        }
    }
}

/// Coerce a raw string value into a typed field according to the declared
/// parameter kind. Values that do not parse fall back to strings; region
/// values are the exception and must be well-formed vertex arrays.
pub fn coerce(name: &str, kind: ParamKind, raw: &str) -> Result<Value, DispatchError> {
    let value = match kind {
        ParamKind::String => Value::String(raw.to_string()),
        ParamKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        ParamKind::Number => match raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            Some(n) => Value::Number(n),
            None => Value::String(raw.to_string()),
        },
        ParamKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        ParamKind::Array => coerce_array(raw),
        ParamKind::Roi => {
            let value: Value =
                serde_json::from_str(raw).map_err(|e| DispatchError::InvalidParam {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            validate_roi(name, &value)?;
            value
        }
    };
    Ok(value)
}

/// JSON array syntax when present, comma-split strings otherwise.
fn coerce_array(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(Value::Array(items)) = serde_json::from_str(trimmed) {
            return Value::Array(items);
        }
    }
    Value::Array(
        trimmed
            .split(',')
            .map(|item| Value::String(item.trim().to_string()))
            .collect(),
    )
}

/// A region value is an array of vertices, each either an `[x, y]` pair or an
/// `{x, y}` object. Validation runs the vertices through `Polygon`.
fn validate_roi(name: &str, value: &Value) -> Result<(), DispatchError> {
    let invalid = |reason: &str| DispatchError::InvalidParam {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    let items = value
        .as_array()
        .ok_or_else(|| invalid("expected an array of vertices"))?;
    let mut vertices = Vec::with_capacity(items.len());
    for item in items {
        let pair = match item {
            Value::Array(xy) if xy.len() == 2 => xy[0].as_f64().zip(xy[1].as_f64()),
            Value::Object(fields) => fields
                .get("x")
                .and_then(Value::as_f64)
                .zip(fields.get("y").and_then(Value::as_f64)),
            _ => None,
        };
        let (x, y) = pair.ok_or_else(|| invalid("vertices must be [x, y] pairs or {x, y} objects"))?;
        vertices.push((x, y));
    }
    let polygon = Polygon::from_xy(vertices);
    log_trace!("region parameter {} has {} vertices", name, polygon.vertex_count());
    Ok(())
}

/// Translation layer for one invocation of one operation.
pub struct InvocationAdapter<'a> {
    op: &'a dyn OperationInfo,
}

impl<'a> InvocationAdapter<'a> {
    pub fn new(op: &'a dyn OperationInfo) -> Self {
        InvocationAdapter { op }
    }

    /// Declared parameter schema in the host-native form.
    pub fn job_params(&self) -> JobParams {
        JobParams {
            identifier: self.op.identifier().unwrap_or_default().to_string(),
            inputs: self.op.inputs().iter().map(JobField::from_spec).collect(),
            outputs: self.op.outputs().iter().map(JobField::from_spec).collect(),
        }
    }

    /// Assemble the input fields, execute on the session, and filter the
    /// outputs down to the declared set.
    ///
    /// Declared inputs provided as strings are coerced per kind; pre-typed
    /// values pass through (region values are still validated). Absent inputs
    /// get their declared default, or fail when required. Unknown provided
    /// keys are forwarded untouched.
    pub fn launch(
        &self,
        session: &mut dyn HostSession,
        provided: &FieldMap,
    ) -> Result<FieldMap, DispatchError> {
        let mut fields = FieldMap::new();
        for spec in self.op.inputs() {
            match provided.get(&spec.name) {
                Some(Value::String(raw)) => {
                    fields.insert(spec.name.clone(), coerce(&spec.name, spec.kind, raw)?);
                }
                Some(other) => {
                    if spec.kind == ParamKind::Roi {
                        validate_roi(&spec.name, other)?;
                    }
                    fields.insert(spec.name.clone(), other.clone());
                }
                None => match &spec.default {
                    Some(default) => {
                        fields.insert(spec.name.clone(), default.clone());
                    }
                    None if spec.required => {
                        return Err(DispatchError::MissingInput(spec.name.clone()));
                    }
                    None => {}
                },
            }
        }
        for (name, value) in provided {
            if !self.op.inputs().iter().any(|spec| spec.name == *name) {
                fields.insert(name.clone(), value.clone());
            }
        }

        let request = ExecRequest {
            identifier: self.op.identifier().unwrap_or_default(),
            inputs: &fields,
        };
        let outputs = session.execute(&request)?;

        let declared = self.op.outputs();
        if declared.is_empty() {
            return Ok(outputs);
        }
        let mut filtered = FieldMap::new();
        for (name, value) in outputs {
            if declared.iter().any(|spec| spec.name == name) {
                filtered.insert(name, value);
            } else {
                log_debug!("dropping undeclared output field: {name}");
            }
        }
        Ok(filtered)
    }
}
