use thiserror::Error;

/// Errors reported by the entity lifecycle layer.
///
/// Runtime races (double despawn, contacts on removed entities, unknown timer
/// keys) are not errors and never show up here. What does show up is either a
/// programmer error caught at spawn time or a failure reported by the host.
#[derive(Debug, Error)]
pub enum BehaveError {
    #[error("invalid category {name:?}: {reason}")]
    InvalidCategory { name: String, reason: &'static str },

    #[error("invalid attribute {key:?}: {reason}")]
    InvalidAttribute { key: String, reason: &'static str },

    #[error("physics host rejected a {category} body")]
    HostRejected {
        category: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("entity ids exhausted")]
    IdsExhausted,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse session config")]
    ConfigFormat(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BehaveError>;
