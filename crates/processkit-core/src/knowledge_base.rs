//! Knowledge base of materials, tools and operations
//!
//! The knowledge base is read-only reference data. It is parsed and checked
//! once, then shared by reference; nothing in the planning pipeline holds a
//! mutable reference to it.
//!
//! A process-wide instance is available through [`load_knowledge_base`] and
//! [`knowledge_base`]. Loading is serialized by a mutex so the first caller
//! performs the load while concurrent callers wait and then share the result.
//! Reads after initialization take no lock.

use parking_lot::{const_mutex, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::data::{Material, MaterialId, Operation, OperationId, Tool, ToolId};
use crate::error::{KnowledgeBaseError, KnowledgeBaseResult};

/// Knowledge base document shipped with the crate
pub const BUNDLED_DOCUMENT: &str = include_str!("../data/machining_db.json");

/// Immutable lookup of materials, tools and operation definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    materials: BTreeMap<MaterialId, Material>,
    #[serde(default)]
    tools: BTreeMap<ToolId, Tool>,
    #[serde(default)]
    operations: BTreeMap<OperationId, Operation>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a material
    pub fn with_material(mut self, id: impl Into<String>, material: Material) -> Self {
        self.materials.insert(MaterialId::new(id), material);
        self
    }

    /// Builder method to add a tool
    pub fn with_tool(mut self, id: impl Into<String>, tool: Tool) -> Self {
        self.tools.insert(ToolId::new(id), tool);
        self
    }

    /// Builder method to add an operation
    pub fn with_operation(mut self, id: impl Into<String>, operation: Operation) -> Self {
        self.operations.insert(OperationId::new(id), operation);
        self
    }

    /// Parse and check a persisted knowledge base document
    pub fn from_json_str(text: &str) -> KnowledgeBaseResult<Self> {
        let kb: Self = serde_json::from_str(text)?;
        kb.validate()?;
        Ok(kb)
    }

    /// Load and check a knowledge base document from disk
    pub fn load_from_file(path: &Path) -> KnowledgeBaseResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| KnowledgeBaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let kb = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            materials = kb.materials.len(),
            tools = kb.tools.len(),
            operations = kb.operations.len(),
            "Loaded knowledge base"
        );
        Ok(kb)
    }

    /// Parse the document shipped with the crate
    pub fn bundled() -> KnowledgeBaseResult<Self> {
        Self::from_json_str(BUNDLED_DOCUMENT)
    }

    /// Check the structural rules of the document
    ///
    /// Every material needs a positive spindle speed and feed rate, every tool
    /// a positive diameter (and positive overrides when present), and every
    /// operation's default tool must exist.
    pub fn validate(&self) -> KnowledgeBaseResult<()> {
        for (id, material) in &self.materials {
            if material.recommended_rpm == 0 {
                return Err(KnowledgeBaseError::invalid(format!(
                    "material '{}' has recommendedRpm 0",
                    id
                )));
            }
            if !(material.recommended_feed_rate.is_finite() && material.recommended_feed_rate > 0.0)
            {
                return Err(KnowledgeBaseError::invalid(format!(
                    "material '{}' has non-positive recommendedFeedRate {}",
                    id, material.recommended_feed_rate
                )));
            }
        }

        for (id, tool) in &self.tools {
            if !(tool.diameter.is_finite() && tool.diameter > 0.0) {
                return Err(KnowledgeBaseError::invalid(format!(
                    "tool '{}' has non-positive diameter {}",
                    id, tool.diameter
                )));
            }
            if tool.recommended_rpm == Some(0) {
                return Err(KnowledgeBaseError::invalid(format!(
                    "tool '{}' overrides recommendedRpm with 0",
                    id
                )));
            }
            if let Some(feed) = tool.recommended_feed_rate {
                if !(feed.is_finite() && feed > 0.0) {
                    return Err(KnowledgeBaseError::invalid(format!(
                        "tool '{}' overrides recommendedFeedRate with {}",
                        id, feed
                    )));
                }
            }
        }

        for (id, operation) in &self.operations {
            if !self.tools.contains_key(&operation.default_tool) {
                return Err(KnowledgeBaseError::invalid(format!(
                    "operation '{}' references unknown default tool '{}'",
                    id, operation.default_tool
                )));
            }
        }

        Ok(())
    }

    /// Look up a material by exact identifier
    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Look up a tool by exact identifier
    pub fn tool(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    /// Look up an operation by exact identifier
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Find a drill whose diameter matches within tolerance
    ///
    /// When several drills match, the lexicographically first identifier wins.
    pub fn drill_for_diameter(&self, diameter: f64) -> Option<(&ToolId, &Tool)> {
        self.tools.iter().find(|(_, tool)| tool.is_drill_of(diameter))
    }

    /// Default tool declared by an operation, if the operation and tool exist
    pub fn default_tool(&self, operation: &str) -> Option<(&ToolId, &Tool)> {
        let operation = self.operations.get(operation)?;
        self.tools.get_key_value(&operation.default_tool)
    }

    /// All materials in identifier order
    pub fn materials(&self) -> &BTreeMap<MaterialId, Material> {
        &self.materials
    }

    /// All tools in identifier order
    pub fn tools(&self) -> &BTreeMap<ToolId, Tool> {
        &self.tools
    }

    /// All operations in identifier order
    pub fn operations(&self) -> &BTreeMap<OperationId, Operation> {
        &self.operations
    }
}

static KNOWLEDGE_BASE: OnceLock<KnowledgeBase> = OnceLock::new();
static LOAD_GUARD: Mutex<()> = const_mutex(());

/// Load the process-wide knowledge base
///
/// `None` loads the bundled document. The first successful call wins; later
/// calls return the already loaded instance without reading `path`.
pub fn load_knowledge_base(path: Option<&Path>) -> KnowledgeBaseResult<&'static KnowledgeBase> {
    if let Some(kb) = KNOWLEDGE_BASE.get() {
        return Ok(kb);
    }

    let _guard = LOAD_GUARD.lock();
    if let Some(kb) = KNOWLEDGE_BASE.get() {
        debug!("Knowledge base loaded by another caller");
        return Ok(kb);
    }

    let kb = match path {
        Some(path) => KnowledgeBase::load_from_file(path)?,
        None => {
            let kb = KnowledgeBase::bundled()?;
            info!(
                materials = kb.materials.len(),
                tools = kb.tools.len(),
                "Loaded bundled knowledge base"
            );
            kb
        }
    };
    Ok(KNOWLEDGE_BASE.get_or_init(|| kb))
}

/// Get the process-wide knowledge base, if it has been loaded
pub fn knowledge_base() -> Option<&'static KnowledgeBase> {
    KNOWLEDGE_BASE.get()
}
