use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to create workspace: {0}")]
    WorkspaceCreation(String),

    #[error("Failed to fetch {url}{}: {message}", status_suffix(.status))]
    AssetFetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Bundle error: {0}")]
    Bundle(String),

    #[error("Composition \"{id}\" not found (available: {})", available_list(.available))]
    CompositionNotFound { id: String, available: Vec<String> },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Render did not finish within {0} seconds")]
    RenderTimeout(u64),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReelError {
    /// HTTP status attached to an asset fetch failure, if the server answered
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ReelError::AssetFetch { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

fn available_list(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, ReelError>;
