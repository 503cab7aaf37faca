//! CLI interface module

pub mod commands;

use std::fmt;

use crate::cli::Commands;
use commands::{config_generate, reaggregate};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::TrackerError> for CliError {
    fn from(err: crate::errors::TrackerError) -> Self {
        CliError::StorageError(err.to_string())
    }
}

/// 执行一条维护命令（`serve` 由 main 处理）
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::GenerateConfig { output_path, force } => {
            config_generate(output_path, force).await
        }
        Commands::Reaggregate { date } => reaggregate(&date).await,
        Commands::Serve => Err(CliError::CommandError(
            "serve is not a maintenance command".to_string(),
        )),
    }
}
