use thiserror::Error;

/// Unified result type for the masonry crate.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors surfaced by the layout engine and its collaborators.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout has not been initialised")]
    NotInitialized,
    #[error("layout has been destroyed")]
    Destroyed,
    #[error("masonry wrapper is missing")]
    MissingWrapper,
    #[error("node {node} is no longer attached where the layout expects it")]
    Detached { node: String },
    #[error("node {node} does not exist in the host tree")]
    NodeNotFound { node: String },
    #[error("node {node} cannot be inserted there")]
    HierarchyRequest { node: String },
    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),
    #[error("snapshot is not a JSON object")]
    InvalidSnapshot,
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LayoutError {
    pub fn detached(node: impl std::fmt::Debug) -> Self {
        Self::Detached {
            node: format!("{node:?}"),
        }
    }

    pub fn not_found(node: impl std::fmt::Debug) -> Self {
        Self::NodeNotFound {
            node: format!("{node:?}"),
        }
    }

    /// Whether the error was caused by the host tree changing under the layout.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Detached { .. } | Self::NodeNotFound { .. } | Self::MissingWrapper
        )
    }
}
