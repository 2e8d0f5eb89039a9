pub const DEFAULT_LOADING_MESSAGE: &str = "Procesando...";

/// Busy indicator with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingOverlay {
    loading: bool,
    message: String,
}

impl Default for LoadingOverlay {
    fn default() -> Self {
        Self {
            loading: false,
            message: DEFAULT_LOADING_MESSAGE.to_string(),
        }
    }
}

impl LoadingOverlay {
    pub fn show(&mut self, message: Option<&str>) {
        self.message = message.unwrap_or(DEFAULT_LOADING_MESSAGE).to_string();
        self.loading = true;
    }

    /// Keeps the last message
    pub fn hide(&mut self) {
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
