//! Operation registry: descriptor abstraction plus the catalog-file backing.
//!
//! The imaging application exports its operation catalog as a JSON or YAML
//! document; `CatalogRegistry` loads it and serves lookups. The dispatcher
//! and generator only ever see the `OperationInfo` / `OperationRegistry`
//! traits, so another registry backing can be dropped in without touching
//! them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Menu root of operations presented in the application's own menu tree.
/// Operations rooted elsewhere (context menus, other frontends) are not
/// eligible for stub generation.
pub const APPLICATION_MENU_ROOT: &str = "app";

/// Declared type of one operation parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Roi,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Roi => "roi",
        }
    }
}

/// One declared input or output parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParamKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// One catalog entry describing an invocable operation.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogOperation {
    /// Stable identifier embedded into generated stubs. Entries without one
    /// are listed but can be neither dispatched nor stubbed.
    #[serde(default)]
    pub identifier: Option<String>,
    pub title: String,
    /// Menu hierarchy segments, outermost first. Empty for operations that
    /// are not menu-reachable.
    #[serde(default)]
    pub menu_path: Vec<String>,
    #[serde(default = "default_menu_root")]
    pub menu_root: String,
    /// Whether the operation runs without an interactive display.
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub inputs: Vec<ParamSpec>,
    #[serde(default)]
    pub outputs: Vec<ParamSpec>,
}

fn default_menu_root() -> String {
    APPLICATION_MENU_ROOT.to_string()
}

impl Default for CatalogOperation {
    fn default() -> Self {
        CatalogOperation {
            identifier: None,
            title: String::new(),
            menu_path: Vec::new(),
            menu_root: default_menu_root(),
            headless: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// Read-only view of one operation descriptor.
pub trait OperationInfo {
    /// Stable identifier, when the operation has one.
    fn identifier(&self) -> Option<&str>;
    fn title(&self) -> &str;
    fn menu_path(&self) -> &[String];
    fn menu_root(&self) -> &str;
    fn can_run_headless(&self) -> bool;
    fn inputs(&self) -> &[ParamSpec];
    fn outputs(&self) -> &[ParamSpec];
}

impl OperationInfo for CatalogOperation {
    fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn menu_path(&self) -> &[String] {
        &self.menu_path
    }

    fn menu_root(&self) -> &str {
        &self.menu_root
    }

    fn can_run_headless(&self) -> bool {
        self.headless
    }

    fn inputs(&self) -> &[ParamSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[ParamSpec] {
        &self.outputs
    }
}

/// Lookup surface the dispatcher and generator depend on.
pub trait OperationRegistry {
    /// Exact-match lookup by stable identifier.
    fn find(&self, identifier: &str) -> Option<&dyn OperationInfo>;
    /// All known operations, in catalog order.
    fn operations(&self) -> Vec<&dyn OperationInfo>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse catalog file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Top-level catalog document shape.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    operations: Vec<CatalogOperation>,
}

/// Registry backed by a catalog export.
#[derive(Debug)]
pub struct CatalogRegistry {
    operations: Vec<CatalogOperation>,
}

impl CatalogRegistry {
    pub fn new(operations: Vec<CatalogOperation>) -> Self {
        CatalogRegistry { operations }
    }

    /// Load a catalog file. `.yaml` / `.yml` parse as YAML, anything else as
    /// JSON.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let lower = path.to_string_lossy().to_ascii_lowercase();
        let doc: CatalogDocument = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            serde_yaml::from_str(&raw).map_err(|e| CatalogError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&raw).map_err(|e| CatalogError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        Ok(CatalogRegistry::new(doc.operations))
    }
}

impl OperationRegistry for CatalogRegistry {
    fn find(&self, identifier: &str) -> Option<&dyn OperationInfo> {
        self.operations
            .iter()
            .find(|op| op.identifier.as_deref() == Some(identifier))
            .map(|op| op as &dyn OperationInfo)
    }

    fn operations(&self) -> Vec<&dyn OperationInfo> {
        self.operations
            .iter()
            .map(|op| op as &dyn OperationInfo)
            .collect()
    }
}
