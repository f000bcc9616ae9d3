use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Failed to fetch {resource}: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatsError {
    pub fn parse(msg: impl Into<String>) -> Self {
        StatsError::Parse(msg.into())
    }

    pub fn fetch(resource: impl Into<String>, source: std::io::Error) -> Self {
        StatsError::Fetch {
            resource: resource.into(),
            source,
        }
    }
}
