//! Suggestion service: asks the generative model for a refined title and a
//! short checklist, and degrades to a fixed local checklist on any failure.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use taskflow_shared::Suggestion;

use crate::error::SuggestionError;

pub const FALLBACK_SUBTASKS: [&str; 3] = [
    "Break down task into steps",
    "Set a timer",
    "Start with the easiest part",
];

/// Seam to the text-generation provider. `schema` is the structured-output
/// constraint the provider must enforce.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<String, SuggestionError>;
}

pub fn fallback(title: &str) -> Suggestion {
    Suggestion {
        refined_title: title.to_string(),
        subtasks: FALLBACK_SUBTASKS.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn prompt_for(title: &str) -> String {
    format!(
        "Refine this task title for better productivity and suggest 3-4 actionable subtasks: \"{title}\""
    )
}

pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "refinedTitle": {
                "type": "STRING",
                "description": "A more professional, action-oriented version of the input task.",
            },
            "subtasks": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of 3-4 simple steps to complete the task.",
            },
        },
        "required": ["refinedTitle", "subtasks"],
    })
}

#[derive(Clone)]
pub struct SuggestionService {
    generator: Arc<dyn TextGenerator>,
}

impl SuggestionService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Always resolves; provider problems turn into [`fallback`].
    pub async fn suggest(&self, title: &str) -> Suggestion {
        if title.trim().is_empty() {
            return fallback(title);
        }
        match self.try_suggest(title).await {
            Ok(suggestion) => suggestion,
            Err(err) => {
                log::warn!("AI suggester error: {err}");
                fallback(title)
            }
        }
    }

    async fn try_suggest(&self, title: &str) -> Result<Suggestion, SuggestionError> {
        let text = self
            .generator
            .generate(&prompt_for(title), &response_schema())
            .await?;
        Ok(serde_json::from_str(text.trim())?)
    }
}
