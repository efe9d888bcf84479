//! Command dispatch: resolve the command, open a session, then either report
//! the declared parameters (parse-only mode) or execute.
//!
//! The session is owned by `invoke` and dropped on every exit path, so
//! release happens exactly once per invocation regardless of how dispatch
//! ends.

use thiserror::Error;

use crate::adapter::{InvocationAdapter, JobParams};
use crate::log_debug;
use crate::registry::OperationRegistry;
use crate::session::{ExecError, ExecutionHost, FieldMap, PARSE_PROPERTY, SessionError};
use crate::utils::env_snapshot;
use crate::utils::logging::{LogLevel, current_log_level};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing required input: {0}")]
    MissingInput(String),
    #[error("invalid value for parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Outcome of one dispatched invocation.
#[derive(Debug)]
pub enum Dispatch {
    /// Parse-only mode: the declared parameters, nothing executed.
    Params(JobParams),
    /// Full invocation: the operation's output fields.
    Completed(FieldMap),
}

/// Dispatch one command against the registry and host.
///
/// Resolution happens before any session exists; an unknown command never
/// touches the host. Once a session is created it lives exactly as long as
/// this call.
pub fn invoke(
    registry: &dyn OperationRegistry,
    host: &dyn ExecutionHost,
    command: &str,
    provided: &FieldMap,
) -> Result<Dispatch, DispatchError> {
    log_debug!("invoking command: {command}");
    if current_log_level() >= LogLevel::Debug {
        for (key, value) in env_snapshot() {
            log_debug!("env {key}={value}");
        }
    }

    let op = registry
        .find(command)
        .ok_or_else(|| DispatchError::UnknownCommand(command.to_string()))?;

    let mut session = host.create_session()?;
    let adapter = InvocationAdapter::new(op);

    if !session.property(PARSE_PROPERTY).is_empty() {
        log_debug!("parse-only invocation, reporting declared parameters");
        return Ok(Dispatch::Params(adapter.job_params()));
    }

    let outputs = adapter.launch(session.as_mut(), provided)?;
    Ok(Dispatch::Completed(outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CatalogOperation, CatalogRegistry, ParamKind, ParamSpec};
    use crate::session::{ExecRequest, HostSession};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn test_registry() -> CatalogRegistry {
        CatalogRegistry::new(vec![CatalogOperation {
            identifier: Some("op:blur".to_string()),
            title: "Gaussian Blur".to_string(),
            inputs: vec![ParamSpec {
                name: "label".to_string(),
                kind: ParamKind::String,
                required: true,
                description: String::new(),
                default: None,
            }],
            ..Default::default()
        }])
    }

    #[derive(Clone, Default)]
    struct Counters {
        created: Rc<Cell<usize>>,
        released: Rc<Cell<usize>>,
        executed: Rc<Cell<usize>>,
    }

    struct CountingHost {
        counters: Counters,
        fail_create: bool,
        parse_mode: bool,
        fail_exec: bool,
    }

    impl CountingHost {
        fn new(counters: &Counters) -> Self {
            CountingHost {
                counters: counters.clone(),
                fail_create: false,
                parse_mode: false,
                fail_exec: false,
            }
        }
    }

    impl ExecutionHost for CountingHost {
        fn create_session(&self) -> Result<Box<dyn HostSession>, SessionError> {
            if self.fail_create {
                return Err(SessionError::Connect("refused".to_string()));
            }
            self.counters.created.set(self.counters.created.get() + 1);
            Ok(Box::new(CountingSession {
                counters: self.counters.clone(),
                parse_mode: self.parse_mode,
                fail_exec: self.fail_exec,
            }))
        }
    }

    struct CountingSession {
        counters: Counters,
        parse_mode: bool,
        fail_exec: bool,
    }

    impl HostSession for CountingSession {
        fn property(&self, key: &str) -> String {
            if self.parse_mode && key == PARSE_PROPERTY {
                "true".to_string()
            } else {
                String::new()
            }
        }

        fn execute(&mut self, _request: &ExecRequest<'_>) -> Result<FieldMap, ExecError> {
            self.counters.executed.set(self.counters.executed.get() + 1);
            if self.fail_exec {
                return Err(ExecError::Failed {
                    status: 1,
                    stderr: "boom".to_string(),
                });
            }
            let mut outputs = FieldMap::new();
            outputs.insert("done".to_string(), json!(true));
            Ok(outputs)
        }
    }

    impl Drop for CountingSession {
        fn drop(&mut self) {
            self.counters.released.set(self.counters.released.get() + 1);
        }
    }

    fn label_params() -> FieldMap {
        let mut provided = FieldMap::new();
        provided.insert("label".to_string(), json!("cells"));
        provided
    }

    #[test]
    fn unknown_command_opens_no_session() {
        let registry = test_registry();
        let counters = Counters::default();
        let host = CountingHost::new(&counters);
        let err = invoke(&registry, &host, "op:missing", &FieldMap::new()).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownCommand(_)));
        assert_eq!(counters.created.get(), 0);
    }

    #[test]
    fn successful_dispatch_releases_session_once() {
        let registry = test_registry();
        let counters = Counters::default();
        let host = CountingHost::new(&counters);
        let outcome = invoke(&registry, &host, "op:blur", &label_params()).unwrap();
        match outcome {
            Dispatch::Completed(outputs) => {
                assert_eq!(outputs.get("done"), Some(&json!(true)));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(counters.created.get(), 1);
        assert_eq!(counters.executed.get(), 1);
        assert_eq!(counters.released.get(), 1);
    }

    #[test]
    fn parse_property_reports_params_without_executing() {
        let registry = test_registry();
        let counters = Counters::default();
        let mut host = CountingHost::new(&counters);
        host.parse_mode = true;
        let outcome = invoke(&registry, &host, "op:blur", &FieldMap::new()).unwrap();
        match outcome {
            Dispatch::Params(params) => {
                assert_eq!(params.identifier, "op:blur");
                assert_eq!(params.inputs.len(), 1);
            }
            other => panic!("expected Params, got {other:?}"),
        }
        assert_eq!(counters.executed.get(), 0);
        assert_eq!(counters.released.get(), 1);
    }

    #[test]
    fn create_session_failure_is_distinct() {
        let registry = test_registry();
        let counters = Counters::default();
        let mut host = CountingHost::new(&counters);
        host.fail_create = true;
        let err = invoke(&registry, &host, "op:blur", &label_params()).unwrap_err();
        assert!(matches!(err, DispatchError::Session(_)));
        assert_eq!(counters.created.get(), 0);
        assert_eq!(counters.released.get(), 0);
    }

    #[test]
    fn execute_failure_still_releases_session() {
        let registry = test_registry();
        let counters = Counters::default();
        let mut host = CountingHost::new(&counters);
        host.fail_exec = true;
        let err = invoke(&registry, &host, "op:blur", &label_params()).unwrap_err();
        assert!(matches!(err, DispatchError::Exec(_)));
        assert_eq!(counters.executed.get(), 1);
        assert_eq!(counters.released.get(), 1);
    }

    #[test]
    fn missing_input_releases_session_without_execute() {
        let registry = test_registry();
        let counters = Counters::default();
        let host = CountingHost::new(&counters);
        let err = invoke(&registry, &host, "op:blur", &FieldMap::new()).unwrap_err();
        assert!(matches!(err, DispatchError::MissingInput(_)));
        assert_eq!(counters.created.get(), 1);
        assert_eq!(counters.executed.get(), 0);
        assert_eq!(counters.released.get(), 1);
    }
}
