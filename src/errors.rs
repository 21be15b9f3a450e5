use thiserror::Error;

pub type Result<T> = std::result::Result<T, DropError>;

#[derive(Error, Debug)]
pub enum DropError {
    #[error("Resource {resource} is not accessible: {message}")]
    Resource { resource: String, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Envelope error: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("Unknown file {0}")]
    UnknownFile(String),
    #[error("Subscription error: {0}")]
    Subscription(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DropError {
    pub fn resource(resource: impl ToString, message: impl ToString) -> Self {
        Self::Resource {
            resource: resource.to_string(),
            message: message.to_string(),
        }
    }

    /// True for failures of the local resource lookup done while a packet is
    /// being built.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }
}
