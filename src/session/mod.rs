//! Execution host and session seams (application command vs gateway URL).
//!
//! parse_host_spec -> HostSpec { AppCommand | GatewayUrl }
//! `AppHost` runs operations by spawning the imaging application headlessly;
//! gateway URLs are recognized but their transport is not implemented, so
//! session creation against them fails cleanly.
//!
//! A session is created per invocation and released when it drops, on every
//! exit path.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use shell_words::split as shell_split;
use thiserror::Error;
use url::Url;

use crate::{log_debug, log_trace};

/// Host-native field representation: named JSON values on both the input and
/// output side of an invocation.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Environment prefix for session properties and host configuration.
pub const PROPERTY_ENV_PREFIX: &str = "SCRIPT_BRIDGE_";

/// Session property consulted by the dispatcher to detect parse-only mode.
pub const PARSE_PROPERTY: &str = "scripts.parse";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid host spec: {0}")]
    InvalidSpec(String),
    #[error("cannot create session: {0}")]
    Connect(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to launch application: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("operation failed (exit {status}): {stderr}")]
    Failed { status: i32, stderr: String },
    #[error("malformed output from application: {0}")]
    InvalidOutput(String),
}

/// A parsed representation of a user-supplied host location.
///
/// It retains the original input for diagnostics and resolves to either a
/// local application command line or a remote gateway URL.
#[derive(Debug, Clone)]
pub enum HostSpec {
    /// The imaging application, spawned headlessly per execution.
    AppCommand {
        original: String,
        program: String,
        args: Vec<String>,
    },
    /// Remote gateway endpoint (http/https or ws/wss).
    GatewayUrl { original: String, url: Url },
}

impl HostSpec {
    /// Returns the original user-supplied form.
    pub fn original(&self) -> &str {
        match self {
            HostSpec::AppCommand { original, .. } => original,
            HostSpec::GatewayUrl { original, .. } => original,
        }
    }

    pub fn is_app(&self) -> bool {
        matches!(self, HostSpec::AppCommand { .. })
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self, HostSpec::GatewayUrl { .. })
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSpec::AppCommand { program, args, .. } => {
                if args.is_empty() {
                    write!(f, "app: {}", program)
                } else {
                    write!(f, "app: {} {}", program, args.join(" "))
                }
            }
            HostSpec::GatewayUrl { url, .. } => write!(f, "gateway: {}", url),
        }
    }
}

/// Parse a `--host` value into a structured `HostSpec`.
///
/// Strategy:
/// 1. Try to parse as URL. If the scheme is http/https/ws/wss, treat as a
///    remote gateway.
/// 2. Otherwise treat as an application command line and split with
///    shell-style rules.
/// 3. Reject empty specs and empty program names.
pub fn parse_host_spec(raw: &str) -> Result<HostSpec, SessionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidSpec("host spec is empty".into()));
    }

    if let Ok(url) = Url::parse(trimmed) {
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => {
                return Ok(HostSpec::GatewayUrl {
                    original: raw.to_string(),
                    url,
                });
            }
            _ => {
                // Non-gateway scheme; fall through to command parsing.
            }
        }
    }

    let parts = shell_split(trimmed)
        .map_err(|e| SessionError::InvalidSpec(format!("cannot split command line: {e}")))?;
    if parts.is_empty() {
        return Err(SessionError::InvalidSpec(
            "no tokens produced when parsing application command".into(),
        ));
    }
    let program = parts[0].clone();
    if program.is_empty() {
        return Err(SessionError::InvalidSpec(
            "empty program name in application command".into(),
        ));
    }
    Ok(HostSpec::AppCommand {
        original: raw.to_string(),
        program,
        args: parts[1..].to_vec(),
    })
}

/// Request handed to a session for execution: the operation's identifier and
/// its adapted input fields.
pub struct ExecRequest<'a> {
    pub identifier: &'a str,
    pub inputs: &'a FieldMap,
}

/// A connection point able to grant sessions.
pub trait ExecutionHost {
    fn create_session(&self) -> Result<Box<dyn HostSession>, SessionError>;
}

/// One granted session. Released when dropped.
pub trait HostSession {
    /// Session-scoped string property lookup; empty string when unset.
    fn property(&self, key: &str) -> String;
    /// Execute one operation, returning its output fields.
    fn execute(&mut self, request: &ExecRequest<'_>) -> Result<FieldMap, ExecError>;
}

/// Environment variable name for a dotted property key, e.g. `scripts.parse`
/// becomes `SCRIPT_BRIDGE_SCRIPTS_PARSE`.
pub fn property_env_key(key: &str) -> String {
    let mut name = String::with_capacity(PROPERTY_ENV_PREFIX.len() + key.len());
    name.push_str(PROPERTY_ENV_PREFIX);
    for c in key.chars() {
        match c {
            '.' => name.push('_'),
            c => name.push(c.to_ascii_uppercase()),
        }
    }
    name
}

fn collect_properties() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(PROPERTY_ENV_PREFIX))
        .collect()
}

/// Host that runs operations by spawning the imaging application headlessly.
pub struct AppHost {
    program: String,
    args: Vec<String>,
    /// Session properties, keyed by environment-style name.
    properties: HashMap<String, String>,
}

impl AppHost {
    /// Build from a parsed app-command spec, capturing session properties
    /// from the current environment.
    pub fn new(program: String, args: Vec<String>) -> Self {
        AppHost {
            program,
            args,
            properties: collect_properties(),
        }
    }

    /// Build with an explicit property set instead of the environment.
    pub fn with_properties(
        program: String,
        args: Vec<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        AppHost {
            program,
            args,
            properties,
        }
    }
}

impl ExecutionHost for AppHost {
    fn create_session(&self) -> Result<Box<dyn HostSession>, SessionError> {
        let resolved = resolve_program(&self.program).ok_or_else(|| {
            SessionError::Connect(format!("application not found: {}", self.program))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let executable = std::fs::metadata(&resolved)
                .map(|m| m.permissions().mode() & 0o111 != 0)
                .unwrap_or(false);
            if !executable {
                return Err(SessionError::PermissionDenied(format!(
                    "application is not executable: {}",
                    resolved.display()
                )));
            }
        }

        log_debug!(
            "session opened at {} (app: {})",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            resolved.display()
        );

        Ok(Box::new(AppSession {
            program: resolved,
            args: self.args.clone(),
            properties: self.properties.clone(),
            opened: Instant::now(),
        }))
    }
}

/// Resolve a program name to an existing file, searching PATH for bare names.
fn resolve_program(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

struct AppSession {
    program: PathBuf,
    args: Vec<String>,
    properties: HashMap<String, String>,
    opened: Instant,
}

impl AppSession {
    fn build_argv(&self, request: &ExecRequest<'_>) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 3 + request.inputs.len());
        argv.extend(self.args.iter().cloned());
        argv.push("--headless".to_string());
        argv.push("--run".to_string());
        argv.push(request.identifier.to_string());
        for (name, value) in request.inputs {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            argv.push(format!("{name}={rendered}"));
        }
        argv
    }
}

impl HostSession for AppSession {
    fn property(&self, key: &str) -> String {
        self.properties
            .get(&property_env_key(key))
            .cloned()
            .unwrap_or_default()
    }

    fn execute(&mut self, request: &ExecRequest<'_>) -> Result<FieldMap, ExecError> {
        let argv = self.build_argv(request);
        log_trace!("spawning {} {}", self.program.display(), argv.join(" "));

        let output = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(FieldMap::new());
        }
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| ExecError::InvalidOutput(e.to_string()))?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ExecError::InvalidOutput(format!(
                "expected an output object, got {other}"
            ))),
        }
    }
}

impl Drop for AppSession {
    fn drop(&mut self) {
        log_debug!(
            "session released after {} ms",
            self.opened.elapsed().as_millis()
        );
    }
}

/// Host for a remote gateway endpoint. No transport is implemented yet, so
/// creating a session always fails with a connect error.
pub struct GatewayHost {
    url: Url,
}

impl GatewayHost {
    pub fn new(url: Url) -> Self {
        GatewayHost { url }
    }
}

impl ExecutionHost for GatewayHost {
    fn create_session(&self) -> Result<Box<dyn HostSession>, SessionError> {
        Err(SessionError::Connect(format!(
            "gateway transport not implemented: {}",
            self.url
        )))
    }
}

/// Build the host for a parsed spec.
pub fn host_from_spec(spec: HostSpec) -> Box<dyn ExecutionHost> {
    match spec {
        HostSpec::AppCommand { program, args, .. } => Box::new(AppHost::new(program, args)),
        HostSpec::GatewayUrl { url, .. } => Box::new(GatewayHost::new(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_gateway_http() {
        let spec = parse_host_spec("https://data.example.org/gateway").unwrap();
        assert!(spec.is_gateway());
    }

    #[test]
    fn parse_gateway_ws() {
        let spec = parse_host_spec("wss://data.example.org/ws").unwrap();
        assert!(spec.is_gateway());
    }

    #[test]
    fn parse_app_simple() {
        let spec = parse_host_spec("imaging-app --plugins /opt/plugins").unwrap();
        assert!(spec.is_app());
        if let HostSpec::AppCommand { program, args, .. } = spec {
            assert_eq!(program, "imaging-app");
            assert_eq!(args, vec!["--plugins", "/opt/plugins"]);
        } else {
            panic!("expected AppCommand variant");
        }
    }

    #[test]
    fn parse_app_quoted() {
        let spec = parse_host_spec(r#"imaging-app --data "/srv/my data""#).unwrap();
        if let HostSpec::AppCommand { args, .. } = spec {
            assert_eq!(args, vec!["--data", "/srv/my data"]);
        } else {
            panic!("expected AppCommand variant");
        }
    }

    #[test]
    fn unknown_scheme_falls_back_to_command() {
        let spec = parse_host_spec("ftp://example.com/resource").unwrap();
        assert!(spec.is_app(), "unknown scheme should fall back to app");
    }

    #[test]
    fn empty_spec_rejected() {
        let err = parse_host_spec("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn property_env_key_mapping() {
        assert_eq!(property_env_key("scripts.parse"), "SCRIPT_BRIDGE_SCRIPTS_PARSE");
        assert_eq!(property_env_key("parse"), "SCRIPT_BRIDGE_PARSE");
    }

    #[test]
    fn session_property_lookup() {
        let mut props = HashMap::new();
        props.insert("SCRIPT_BRIDGE_SCRIPTS_PARSE".to_string(), "true".to_string());
        let session = AppSession {
            program: PathBuf::from("/bin/app"),
            args: Vec::new(),
            properties: props,
            opened: Instant::now(),
        };
        assert_eq!(session.property("scripts.parse"), "true");
        assert_eq!(session.property("scripts.unknown"), "");
    }

    #[test]
    fn create_session_fails_for_missing_program() {
        let host = AppHost::with_properties(
            "definitely-not-a-real-program-7c1f".to_string(),
            Vec::new(),
            HashMap::new(),
        );
        let err = host.create_session().err().expect("session must fail");
        assert!(matches!(err, SessionError::Connect(_)));
        assert!(err.to_string().contains("application not found"));
    }

    #[test]
    fn gateway_session_creation_fails_cleanly() {
        let url = Url::parse("https://data.example.org/gateway").unwrap();
        let err = GatewayHost::new(url).create_session().err().unwrap();
        assert!(err.to_string().contains("not implemented"));
    }

    #[test]
    fn build_argv_renders_fields() {
        let mut inputs = FieldMap::new();
        inputs.insert("sigma".to_string(), serde_json::json!(2.5));
        inputs.insert("label".to_string(), serde_json::json!("cells"));
        let session = AppSession {
            program: PathBuf::from("/bin/app"),
            args: vec!["--plugins".to_string(), "/opt/plugins".to_string()],
            properties: HashMap::new(),
            opened: Instant::now(),
        };
        let argv = session.build_argv(&ExecRequest {
            identifier: "op:blur",
            inputs: &inputs,
        });
        assert_eq!(
            argv,
            vec![
                "--plugins",
                "/opt/plugins",
                "--headless",
                "--run",
                "op:blur",
                "label=cells",
                "sigma=2.5",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn execute_parses_output_object() {
        let host = AppHost::with_properties(
            "sh".to_string(),
            vec!["-c".to_string(), r#"printf '{"ok": true}'"#.to_string()],
            HashMap::new(),
        );
        let mut session = host.create_session().unwrap();
        let inputs = FieldMap::new();
        let outputs = session
            .execute(&ExecRequest {
                identifier: "op:noop",
                inputs: &inputs,
            })
            .unwrap();
        assert_eq!(outputs.get("ok"), Some(&serde_json::json!(true)));
    }

    #[cfg(unix)]
    #[test]
    fn execute_maps_nonzero_exit_to_failed() {
        let host = AppHost::with_properties(
            "sh".to_string(),
            vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()],
            HashMap::new(),
        );
        let mut session = host.create_session().unwrap();
        let inputs = FieldMap::new();
        let err = session
            .execute(&ExecRequest {
                identifier: "op:noop",
                inputs: &inputs,
            })
            .unwrap_err();
        match err {
            ExecError::Failed { status, stderr } => {
                assert_eq!(status, 3);
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn execute_rejects_non_object_output() {
        let host = AppHost::with_properties(
            "sh".to_string(),
            vec!["-c".to_string(), "printf 'not json'".to_string()],
            HashMap::new(),
        );
        let mut session = host.create_session().unwrap();
        let inputs = FieldMap::new();
        let err = session
            .execute(&ExecRequest {
                identifier: "op:noop",
                inputs: &inputs,
            })
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidOutput(_)));
    }
}
