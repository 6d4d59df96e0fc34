use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Identity of an entity in the host runtime
pub type HostId = u64;

/// Introspected object graph exported from the host runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Modules the walk starts from, in order
    #[serde(default)]
    pub roots: Vec<HostId>,

    pub nodes: Vec<HostNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostNode {
    pub id: HostId,

    #[serde(flatten)]
    pub kind: HostKind,

    /// Documentation text attached to the entity
    #[serde(default)]
    pub doc: Option<String>,

    /// Named attributes (modules and classes only)
    #[serde(default)]
    pub members: BTreeMap<String, HostId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostKind {
    Module {
        name: String,
    },
    Class {
        module: String,
        qualname: String,
        /// Resolution order after the class itself, most-derived first
        #[serde(default)]
        bases: Vec<HostId>,
        #[serde(default)]
        foreign: bool,
    },
    Routine {
        name: String,
        flavor: RoutineFlavor,
    },
    Descriptor {
        #[serde(default)]
        property: bool,
        #[serde(default)]
        getter: Option<HostId>,
        #[serde(default)]
        setter: Option<HostId>,
    },
    Value {
        #[serde(rename = "type")]
        type_id: HostId,
    },
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineFlavor {
    /// Free function or static method implemented natively
    Builtin,
    /// Method looked up through an instance
    MethodDescriptor,
    /// Plain interpreted function
    Function,
}

impl GraphSnapshot {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// SHA256 of the snapshot text, used to tie generated output to its input
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
