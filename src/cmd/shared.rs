/*!
shared.rs - helpers shared by the subcommands.

Focus:
  - resolve_catalog / load_registry: --catalog flag with SCRIPT_BRIDGE_CATALOG fallback
  - resolve_host: --host flag with SCRIPT_BRIDGE_HOST fallback, parsed into a HostSpec
  - collect_params: --param KEY=VALUE pairs merged over a JSON/YAML parameter file
  - output helpers honoring --json mode

Values collected from --param stay raw strings here; typed coercion happens
against the declared parameter schema at dispatch time.
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::adapter::JobField;
use crate::registry::CatalogRegistry;
use crate::session::{FieldMap, HostSpec, parse_host_spec};

/// Environment fallback for the catalog path.
pub const CATALOG_ENV: &str = "SCRIPT_BRIDGE_CATALOG";
/// Environment fallback for the execution host spec.
pub const HOST_ENV: &str = "SCRIPT_BRIDGE_HOST";

/* ---- Catalog / Host Resolution ---- */

/// Resolve the catalog path (CLI flag > environment).
pub fn resolve_catalog(cli_catalog: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_catalog {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(CATALOG_ENV)
        && !env_path.trim().is_empty()
    {
        return Ok(PathBuf::from(env_path));
    }
    anyhow::bail!("no catalog specified (use --catalog or {CATALOG_ENV})")
}

/// Load the operation registry from the resolved catalog file.
pub fn load_registry(cli_catalog: Option<&Path>) -> Result<CatalogRegistry> {
    let path = resolve_catalog(cli_catalog)?;
    let registry = CatalogRegistry::from_path(&path)
        .with_context(|| format!("failed to load catalog: {}", path.display()))?;
    Ok(registry)
}

/// Resolve and parse the execution host (CLI flag > environment).
pub fn resolve_host(cli_host: Option<&str>) -> Result<HostSpec> {
    let raw = match cli_host {
        Some(spec) if !spec.trim().is_empty() => spec.to_string(),
        _ => std::env::var(HOST_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("no execution host specified (use --host or {HOST_ENV})")
            })?,
    };
    let spec = parse_host_spec(&raw).with_context(|| format!("failed to parse host: '{raw}'"))?;
    Ok(spec)
}

/* ---- Parameter Collection ---- */

/// Parse repeatable `--param KEY=VALUE` pairs into raw string fields.
pub fn parse_params(pairs: &[String]) -> Result<FieldMap> {
    let mut provided = FieldMap::new();
    for kv in pairs {
        let Some((k, v)) = kv.split_once('=') else {
            anyhow::bail!("invalid --param (expected KEY=VALUE): {kv}");
        };
        let key = k.trim();
        if key.is_empty() {
            anyhow::bail!("invalid --param (empty key): {kv}");
        }
        provided.insert(
            key.to_string(),
            serde_json::Value::String(v.trim().to_string()),
        );
    }
    Ok(provided)
}

/// Load a parameter file (JSON or YAML object) and merge it under the
/// already-provided entries. Explicit `--param` values win; file values keep
/// their native JSON types.
pub fn load_param_file_into(path: &Path, provided: &mut FieldMap) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {}", path.display()))?;
    let lower = path.to_string_lossy().to_ascii_lowercase();

    let value: serde_json::Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml_v: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml_v).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let Some(obj) = value.as_object() else {
        anyhow::bail!("param file root must be an object");
    };
    for (k, v) in obj {
        if provided.contains_key(k) {
            continue; // CLI overrides file
        }
        provided.insert(k.clone(), v.clone());
    }
    Ok(())
}

/// Collect parameters from CLI pairs and an optional parameter file.
pub fn collect_params(pairs: &[String], param_file: Option<&Path>) -> Result<FieldMap> {
    let mut provided = parse_params(pairs)?;
    if let Some(path) = param_file {
        load_param_file_into(path, &mut provided)?;
    }
    Ok(provided)
}

/* ---- Output Helpers ---- */

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Report a command failure, honoring `--json` mode, then fail the command.
pub fn output_error(json: bool, msg: &str) -> Result<()> {
    if json {
        print_json(&serde_json::json!({"status": "error", "error": msg}));
    } else {
        crate::utils::logging::error(msg);
    }
    anyhow::bail!(msg.to_string())
}

/// Render a field value for human-readable output.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One human-readable line describing a declared parameter.
pub fn describe_field(field: &JobField) -> String {
    let mut line = format!("{} ({}", field.name, field.kind.as_str());
    if field.required {
        line.push_str(", required");
    }
    line.push(')');
    if let Some(default) = &field.default {
        line.push_str(&format!(" [default: {}]", display_value(default)));
    }
    if !field.description.is_empty() {
        line.push_str(&format!(" - {}", field.description));
    }
    line
}

/* ---- Tests (basic) ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamKind;
    use serde_json::json;

    #[test]
    fn parse_params_splits_pairs() {
        let provided =
            parse_params(&["sigma=2.5".to_string(), "label=one two".to_string()]).unwrap();
        assert_eq!(provided.get("sigma"), Some(&json!("2.5")));
        assert_eq!(provided.get("label"), Some(&json!("one two")));
    }

    #[test]
    fn parse_params_rejects_malformed_pairs() {
        assert!(parse_params(&["no-equals".to_string()]).is_err());
        assert!(parse_params(&["=value".to_string()]).is_err());
    }

    #[test]
    fn param_file_merge_keeps_cli_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "a": 1, "b": "x" }"#).unwrap();
        let mut provided = parse_params(&["b=override".to_string()]).unwrap();
        load_param_file_into(&path, &mut provided).unwrap();
        assert_eq!(provided.get("a"), Some(&json!(1)), "file value keeps its type");
        assert_eq!(provided.get("b"), Some(&json!("override")));
    }

    #[test]
    fn param_file_yaml_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "sigma: 2.5\nlabel: cells\n").unwrap();
        let mut provided = FieldMap::new();
        load_param_file_into(&path, &mut provided).unwrap();
        assert_eq!(provided.get("sigma"), Some(&json!(2.5)));
        assert_eq!(provided.get("label"), Some(&json!("cells")));
    }

    #[test]
    fn param_file_rejects_non_object_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"[1, 2]"#).unwrap();
        let mut provided = FieldMap::new();
        let err = load_param_file_into(&path, &mut provided).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn resolve_host_parses_cli_value() {
        let spec = resolve_host(Some("imaging-app --headless")).unwrap();
        assert!(spec.is_app());
    }

    #[test]
    fn resolve_catalog_prefers_cli_path() {
        let path = Path::new("/tmp/catalog.json");
        assert_eq!(resolve_catalog(Some(path)).unwrap(), path);
    }

    #[test]
    fn describe_field_lists_kind_and_default() {
        let field = JobField {
            name: "sigma".to_string(),
            kind: ParamKind::Number,
            required: false,
            description: "Blur radius".to_string(),
            default: Some(json!(2.0)),
        };
        assert_eq!(
            describe_field(&field),
            "sigma (number) [default: 2.0] - Blur radius"
        );
    }
}
