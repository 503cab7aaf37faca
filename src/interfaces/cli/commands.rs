use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::CliError;
use crate::analytics::RevenueAggregator;
use crate::config::StaticConfig;
use crate::storage::{EventStore, StorageFactory};

const DEFAULT_SAMPLE_PATH: &str = "config.example.toml";

/// 生成示例配置文件
pub async fn config_generate(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| DEFAULT_SAMPLE_PATH.to_string());

    if Path::new(&path).exists() && !force {
        return Err(CliError::CommandError(format!(
            "{} already exists, use --force to overwrite",
            path
        )));
    }

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| CliError::CommandError(format!("Failed to write {}: {}", path, e)))?;

    println!("Sample configuration written to {}", path);
    Ok(())
}

/// 从原始事件重建某天的收入汇总
pub async fn reaggregate(date: &str) -> Result<(), CliError> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
        CliError::ParseError(format!("Invalid date '{}', expected YYYY-MM-DD: {}", date, e))
    })?;

    let storage = StorageFactory::create().await?;
    let store: Arc<dyn EventStore> = storage;
    let rows = RevenueAggregator::new(store).reaggregate_day(day).await?;

    info!("Reaggregate finished for {}", day);
    println!("Rebuilt {} daily stat rows for {}", rows, day);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adtrack.toml");
        let path_str = path.to_string_lossy().to_string();

        config_generate(Some(path_str.clone()), false).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: StaticConfig = toml::from_str(&written).unwrap();
        assert_eq!(parsed.selection.top_k, StaticConfig::default().selection.top_k);

        assert!(config_generate(Some(path_str.clone()), false).await.is_err());
        assert!(config_generate(Some(path_str), true).await.is_ok());
    }

    #[tokio::test]
    async fn test_reaggregate_rejects_bad_date() {
        let err = reaggregate("05/01/2024").await.unwrap_err();
        assert!(matches!(err, CliError::ParseError(_)));
    }
}
