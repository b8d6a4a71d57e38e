//! Operation definitions of the knowledge base

use serde::{Deserialize, Serialize};

use super::tools::ToolId;

/// Operation identifier (e.g. `face_milling`, `drilling`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    /// Identifier of the face milling operation
    pub const FACE_MILLING: &'static str = "face_milling";
    /// Identifier of the drilling operation
    pub const DRILLING: &'static str = "drilling";

    /// Create an operation identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::borrow::Borrow<str> for OperationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// An operation and the tool used when nothing more specific matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Tool used when no better match exists
    #[serde(alias = "default_tool")]
    pub default_tool: ToolId,
}

impl Operation {
    /// Create an operation definition
    pub fn new(description: impl Into<String>, default_tool: ToolId) -> Self {
        Self {
            description: description.into(),
            default_tool,
        }
    }
}
