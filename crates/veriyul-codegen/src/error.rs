use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbiError {
    #[error("failed to serialise ABI: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AbiResult<T> = Result<T, AbiError>;
