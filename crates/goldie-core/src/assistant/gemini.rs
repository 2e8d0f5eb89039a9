//! ============================================================================
//! Events Assistant - Gemini chat sessions
//! ============================================================================
//! One persistent system instruction scopes the model to Argentine music
//! events. Each `ChatSession` keeps its own history and replays it on every
//! turn, since `generateContent` is stateless.
//! ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{GoldieError, Result};

/// Generative Language API base
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

pub const SYSTEM_INSTRUCTION: &str = "Eres el experto en eventos musicales de Oldie but Goldie. Tu tono es frío, conocedor y tenaz. Solo proporcionas información sobre conciertos, festivales, ciclos de vinilos y eventos relacionados con la música en Argentina. No utilices emojis alegres ni un tono excesivamente entusiasta; eres un profesional serio y curtido de la industria.

REGLAS ESTRICTAS:
1. Prioriza datos sobre fechas, lugares y géneros (Ej: \"Obras Sanitarias\", \"Movistar Arena\", \"Niceto Club\").
2. Si el usuario pregunta por algo fuera del ámbito musical o geográfico (fuera de Argentina), responde con elegancia pero firmeza: \"Mi radar solo capta la vibración musical de Argentina. ¿Buscas algún evento específico?\".
3. SIEMPRE que recomiendes un evento o hables de una banda/artista, intenta vincularlo sutilmente con la importancia de adquirir la discografía en formato físico (vinilo, CD, cassette) antes o después del show (ej. \"Nada se compara a girar el vinilo luego de verlos en vivo\", \"Aprovecha para escuchar el master original en prensa antes del recital\").
4. Mantén tus respuestas concisas y evita saludos genéricos como \"¡Hola! ¿En qué te ayudo hoy?\". Ve directo al punto.
5. Utiliza formato Markdown de manera sobria (negritas para nombres de bandas o lugares, listas para eventos múltiples).";

/// Gemini client carrying the events persona
#[derive(Clone)]
pub struct EventsAssistant {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl EventsAssistant {
    /// A missing key is tolerated here; every message will fail until one
    /// is configured.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_API_URL.to_string())
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("GEMINI_API_KEY is not defined. The chat will not function.");
        }
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fresh conversation with empty history
    pub fn start_chat(&self) -> ChatSession {
        ChatSession {
            assistant: self.clone(),
            history: Vec::new(),
        }
    }

    async fn generate(&self, contents: &[ChatTurn]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| {
                error!("Gemini request refused: no API key configured");
                GoldieError::Config("GEMINI_API_KEY is not set".to_string())
            })?;

        let url = format!("{}/models/{}:generateContent", self.base_url, GEMINI_MODEL);
        debug!("Calling Gemini with {} turns", contents.len());

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: contents.iter().map(ChatTurn::to_content).collect(),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                GoldieError::Assistant(format!("Failed to call Gemini: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error: {} {}", status.as_u16(), body);
            return Err(GoldieError::Assistant(format!("Gemini error {}: {}", status, body)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                error!("Failed to parse Gemini response: {}", e);
                GoldieError::Assistant(format!("Failed to parse Gemini response: {}", e))
            })?;

        generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                error!("Gemini returned no candidate text");
                GoldieError::Assistant("No response from Gemini".to_string())
            })
    }
}

/// One side of an exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTurn {
    User(String),
    Model(String),
}

impl ChatTurn {
    pub fn text(&self) -> &str {
        match self {
            Self::User(text) | Self::Model(text) => text,
        }
    }

    fn to_content(&self) -> Content {
        let role = match self {
            Self::User(_) => "user",
            Self::Model(_) => "model",
        };
        Content {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: self.text().to_string(),
            }],
        }
    }
}

/// Multi-turn conversation. A failed turn leaves the history untouched.
pub struct ChatSession {
    assistant: EventsAssistant,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        info!("Assistant question ({} chars)", text.len());

        let mut contents = self.history.clone();
        contents.push(ChatTurn::User(text.to_string()));

        let reply = self.assistant.generate(&contents).await?;

        contents.push(ChatTurn::Model(reply.clone()));
        self.history = contents;
        Ok(reply)
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}
