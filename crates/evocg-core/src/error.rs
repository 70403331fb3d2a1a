//! Error types for code generation.

use thiserror::Error;

use crate::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No covering found for value {value} ({description})")]
    NoCoveringFound { value: NodeId, description: String },

    #[error("Invalid machine description: {0}")]
    InvalidMachine(String),

    #[error("Invalid program graph: {0}")]
    InvalidProgram(String),

    #[error("No transfer instruction moves a value from {from} to {to}")]
    NoTransferInstruction { from: String, to: String },

    #[error("Transfer insertion did not settle after {0} insertions")]
    TransferLimitExceeded(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
