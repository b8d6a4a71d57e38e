//! # ProcessKit Core
//!
//! Core types for ProcessKit.
//! Provides the part specification input, the machining plan model,
//! the read-only knowledge base and its error types.

pub mod data;
pub mod error;
pub mod knowledge_base;
pub mod plan;

pub use data::{
    HoleSpec, Material, MaterialId, Operation, OperationId, PartSpec, Tool, ToolId, ToolKind,
};

pub use error::{KnowledgeBaseError, KnowledgeBaseResult};

pub use knowledge_base::{knowledge_base, load_knowledge_base, KnowledgeBase, BUNDLED_DOCUMENT};

pub use plan::{
    DrillingStep, FaceMillingStep, OperationKind, Plan, PlanStep, FACE_MILLING_DEPTH,
};
