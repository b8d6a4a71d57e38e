//! Language model backed alternate planner
//!
//! The planner asks an OpenAI-compatible chat completion endpoint for a JSON
//! array of plan steps. The reply is parsed leniently: unknown operations are
//! kept as unsupported steps so validation reports them, steps that cannot be
//! read at all are dropped, and missing tool or cutting parameters are filled
//! from the knowledge base.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use processkit_core::{
    DrillingStep, FaceMillingStep, KnowledgeBase, Material, OperationId, OperationKind, PartSpec,
    Plan, PlanStep, ToolId, FACE_MILLING_DEPTH,
};

use crate::error::{AlternatePlanError, LlmError};
use crate::planner::{cutting_parameters, resolve_drill, AlternatePlanner};

const MAX_LLM_OUTPUT_LOG_CHARS: usize = 4_000;

/// Chat completion request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System prompt
    pub system: String,
    /// User prompt
    pub user: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
}

/// Chat completion client
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a request and return the text of the first choice
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl LlmClient for Arc<dyn LlmClient> {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

/// HTTP client configuration (OpenAI-compatible)
#[derive(Debug, Clone)]
pub struct HttpLlmClientConfig {
    /// Chat completions URL
    pub endpoint: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpLlmClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// HTTP chat completion client
pub struct HttpLlmClient {
    client: reqwest::Client,
    config: HttpLlmClientConfig,
}

impl HttpLlmClient {
    /// Build a client with the configured request timeout
    pub fn new(config: HttpLlmClientConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| LlmError::InvalidApiKey(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let body = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Response("missing choices".to_string()))
    }
}

/// Model settings of the language model planner
#[derive(Debug, Clone)]
pub struct LlmPlannerConfig {
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
}

impl Default for LlmPlannerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
        }
    }
}

/// A plan step as the model may return it
///
/// Accepts both the `*_mm` names used in the prompt and the plain names of
/// serialized plans.
#[derive(Debug, Deserialize)]
struct RawStep {
    operation: String,
    #[serde(default, alias = "depth_mm")]
    depth: Option<f64>,
    #[serde(default, alias = "diameter_mm")]
    diameter: Option<f64>,
    #[serde(default)]
    position: Option<Vec<f64>>,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    rpm: Option<u32>,
    #[serde(default, alias = "feed_rate_mm_per_min", alias = "feedRate")]
    feed_rate: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

/// Alternate planner backed by a chat completion model
pub struct LlmPlanner<C: LlmClient> {
    client: C,
    config: LlmPlannerConfig,
}

impl<C: LlmClient> LlmPlanner<C> {
    /// Create a planner over the given client
    pub fn new(client: C, config: LlmPlannerConfig) -> Self {
        Self { client, config }
    }

    /// Build the system and user prompts for a part
    pub fn build_prompt(&self, spec: &PartSpec, kb: &KnowledgeBase) -> (String, String) {
        let system = "You are an expert CNC machining process planner. \
            Return ONLY a JSON array of plan steps."
            .to_string();

        let mut user = String::new();
        let _ = writeln!(user, "Part specification:");
        let _ = writeln!(user, "- material: {}", spec.material);
        if spec.holes.is_empty() {
            let _ = writeln!(user, "- no holes to drill");
        } else {
            let _ = writeln!(user, "- holes to drill:");
            for (index, hole) in spec.holes.iter().enumerate() {
                let _ = writeln!(
                    user,
                    "  {}. diameter {} mm, depth {} mm, position [{}, {}]",
                    index + 1,
                    hole.diameter,
                    hole.depth,
                    hole.x(),
                    hole.y()
                );
            }
        }

        let _ = writeln!(user, "\nMaterials:\n{}", to_json(kb.materials()));
        let _ = writeln!(user, "\nTools:\n{}", to_json(kb.tools()));
        let _ = writeln!(user, "\nOperations:\n{}", to_json(kb.operations()));

        user.push_str(
            "\nRules:\n\
             1) Start with one face_milling step (depth_mm 0.2).\n\
             2) Add one drilling step per hole, in the order given.\n\
             3) Pick tools, rpm and feed rates from the database above.\n\
             \nEach step has: operation (\"face_milling\" or \"drilling\"), depth_mm, \
             diameter_mm and position [x, y] for drilling, tool, rpm, \
             feed_rate_mm_per_min, notes.\n\
             Return the JSON array only.\n",
        );
        (system, user)
    }

    fn convert(
        &self,
        raw: RawStep,
        spec: &PartSpec,
        kb: &KnowledgeBase,
        material: &Material,
    ) -> PlanStep {
        match OperationKind::parse(&raw.operation) {
            Some(OperationKind::FaceMilling) => {
                let tool = raw
                    .tool
                    .map(ToolId::new)
                    .or_else(|| kb.default_tool(OperationId::FACE_MILLING).map(|(id, _)| id.clone()));
                let (rpm, feed_rate) = cutting_parameters(
                    tool.as_ref().and_then(|id| kb.tool(id.as_str())),
                    material,
                );
                PlanStep::FaceMilling(FaceMillingStep {
                    depth: raw.depth.unwrap_or(FACE_MILLING_DEPTH),
                    material: spec.material.clone(),
                    tool,
                    rpm: raw.rpm.or(Some(rpm)),
                    feed_rate: raw.feed_rate.or(Some(feed_rate)),
                    notes: raw.notes,
                })
            }
            Some(OperationKind::Drilling) => {
                let tool = raw.tool.map(ToolId::new).or_else(|| {
                    raw.diameter
                        .and_then(|diameter| resolve_drill(kb, diameter))
                        .map(|(id, _)| id.clone())
                });
                let (rpm, feed_rate) = cutting_parameters(
                    tool.as_ref().and_then(|id| kb.tool(id.as_str())),
                    material,
                );
                PlanStep::Drilling(DrillingStep {
                    diameter: raw.diameter,
                    depth: raw.depth,
                    position: raw.position.and_then(|p| <[f64; 2]>::try_from(p).ok()),
                    tool,
                    rpm: raw.rpm.or(Some(rpm)),
                    feed_rate: raw.feed_rate.or(Some(feed_rate)),
                })
            }
            None => PlanStep::Unsupported { tag: raw.operation },
        }
    }

    /// Turn a model reply into a plan
    pub fn parse_reply(
        &self,
        reply: &str,
        spec: &PartSpec,
        kb: &KnowledgeBase,
    ) -> Result<Plan, AlternatePlanError> {
        let material = kb
            .material(spec.material.as_str())
            .ok_or_else(|| AlternatePlanError::UnknownMaterial(spec.material.to_string()))?;

        let json = extract_json(reply)
            .ok_or_else(|| AlternatePlanError::Parse("reply did not contain JSON".to_string()))?;
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| AlternatePlanError::Parse(format!("invalid JSON: {}", e)))?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        let mut steps = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<RawStep>(item) {
                Ok(raw) => steps.push(self.convert(raw, spec, kb, material)),
                Err(err) => warn!(step = index, error = %err, "Skipping unreadable step"),
            }
        }

        if steps.is_empty() {
            return Err(AlternatePlanError::NoSteps);
        }
        Ok(Plan::new(spec.material.clone(), steps))
    }
}

#[async_trait]
impl<C: LlmClient> AlternatePlanner for LlmPlanner<C> {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(
        &self,
        spec: &PartSpec,
        kb: &KnowledgeBase,
    ) -> Result<Plan, AlternatePlanError> {
        let (system, user) = self.build_prompt(spec, kb);
        info!(
            model = %self.config.model,
            temperature = self.config.temperature,
            holes = spec.holes.len(),
            "Requesting plan from language model"
        );
        let request = LlmRequest {
            system,
            user,
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let reply = self.client.complete(request).await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                reply = %truncate_for_log(&reply, MAX_LLM_OUTPUT_LOG_CHARS),
                "Language model reply"
            );
        }

        let plan = self.parse_reply(&reply, spec, kb)?;
        info!(steps = plan.len(), "Language model plan parsed");
        Ok(plan)
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Locate the JSON payload in a model reply
///
/// Markdown code fences are ignored. An array is preferred; a single object is
/// accepted as a one-step plan.
pub fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text).trim();

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if start < end {
                return Some(&text[start..=end]);
            }
        }
    }
    None
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}
