//! CLI error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compiler error: {0}")]
    Compiler(#[from] cumulus_compiler::CompilerError),

    #[error("Version error: {0}")]
    Version(#[from] cumulus_compiler::VersionError),

    #[error("Invalid project file: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] cumulus_compiler::SerializationError),

    #[error("{0}")]
    Message(String),
}

pub type CliResult<T> = Result<T, CliError>;
