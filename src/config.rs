use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{BlocksmithError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Graph traversal settings
    pub walk: WalkConfig,

    /// Which namespaces lie outside the examined library
    pub boundary: BoundaryConfig,

    /// Import path rewriting
    pub naming: NamingConfig,

    /// Block generation settings
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Graph snapshot exported from the host runtime
    pub graph: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Root modules by name; empty means the roots listed in the snapshot
    pub roots: Vec<String>,

    /// Walk members named like the traversal sentinel too
    pub force_show_everything: bool,

    /// Member name skipped during traversal
    pub sentinel_name: String,

    /// Sub-module bindings that are never followed
    pub ignored_submodules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Top-level namespaces treated as foreign
    pub foreign_namespaces: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Private module name -> public module name
    pub module_renames: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Public module prefixes that get no generated units
    pub excluded_prefixes: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed Library".to_string(),
            graph: PathBuf::from("graph.json"),
            output_dir: PathBuf::from("generated"),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            roots: vec![],
            force_show_everything: false,
            sentinel_name: "_".to_string(),
            ignored_submodules: vec![
                "_impl".to_string(),
                "deployinfo".to_string(),
                "version".to_string(),
            ],
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        let foreign_namespaces = [
            "builtins",
            "pybind11_builtins",
            "typing",
            "__future__",
            "abc",
            "collections",
            "enum",
            "functools",
            "logging",
            "os",
            "sys",
            "types",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self { foreign_namespaces }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            walk: WalkConfig::default(),
            boundary: BoundaryConfig::default(),
            naming: NamingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| BlocksmithError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BlocksmithError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Blocksmith.toml",
                    "blocksmith.toml",
                    ".blocksmith.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
