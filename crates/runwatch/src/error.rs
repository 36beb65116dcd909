use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] runwatch_core::config::ConfigError),

    #[error(transparent)]
    Api(#[from] runwatch_core::api::ApiError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Core(#[from] runwatch_core::error::Error),
}
