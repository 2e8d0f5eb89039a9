//! Explicit application state: the busy overlay and the lote being assembled.

mod lote;
mod overlay;

pub use lote::Lote;
pub use overlay::{LoadingOverlay, DEFAULT_LOADING_MESSAGE};

/// Everything the storefront keeps between actions, owned by the caller
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub overlay: LoadingOverlay,
    pub lote: Lote,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
