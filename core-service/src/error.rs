use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Compression error: {0}")]
    Compression(#[from] core_compress::CompressError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
