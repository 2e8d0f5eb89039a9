//! Music-events assistant backed by Gemini

mod gemini;

pub use gemini::{ChatSession, ChatTurn, EventsAssistant, GEMINI_API_URL, GEMINI_MODEL, SYSTEM_INSTRUCTION};
