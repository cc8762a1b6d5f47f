use serde::{Deserialize, Serialize};

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Provider {
    OpenAI {
        model: String,
        api_key: Option<String>,
        base_url: Option<String>,
    },
    Ollama {
        model: String,
        base_url: String,
    },
}

impl Provider {
    pub fn openai(model: impl Into<String>) -> Self {
        Self::OpenAI {
            model: model.into(),
            api_key: None,
            base_url: None,
        }
    }

    pub fn openai_full(
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        Self::OpenAI {
            model: model.into(),
            api_key,
            base_url,
        }
    }

    pub fn ollama(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::Ollama {
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// Model name regardless of provider kind
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::openai("gpt-4.1-nano")
    }
}
