use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed joining with server task: {0}")]
    Join(#[from] tokio::task::JoinError),
}
