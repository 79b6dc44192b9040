use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// Subscriber installation or filter parsing failed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Invalid value '{value}' for {variable}")]
    InvalidEnv { variable: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
