//! Error types for the pet-care client

/// Errors that can occur when talking to the pet-care backend
#[derive(Debug, thiserror::Error)]
pub enum PetCareError {
    #[error("Not connected to live channel")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered with a non-success status
    #[error("API error: {status}{}", .message.as_deref().map(|m| format!(" - {m}")).unwrap_or_default())]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to send message: {0}")]
    SendError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PetCareError {
    /// Message to surface to the user
    ///
    /// Server rejections carry the backend's `message` field; everything else
    /// collapses to the operation's fallback text.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            PetCareError::Api {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Result type alias for pet-care operations
pub type Result<T> = std::result::Result<T, PetCareError>;
