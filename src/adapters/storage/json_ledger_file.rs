//! JSON ledger files.
//!
//! Reads the inputs of a reconciliation run and writes its report:
//! - ledger: JSON array of snapshots
//! - agreement history: JSON object of user id to agreement ids
//! - report: pretty-printed `ReconciliationReport`

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::domain::reconciliation::{AgreementHistory, Ledger, ReconciliationReport};

#[derive(Debug, Error)]
pub enum LedgerFileError {
    #[error("Failed to access {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Loads a ledger from a JSON file.
pub async fn load_ledger(path: impl AsRef<Path>) -> Result<Ledger, LedgerFileError> {
    load_json(path.as_ref()).await
}

/// Loads an agreement-history index from a JSON file.
pub async fn load_agreement_history(
    path: impl AsRef<Path>,
) -> Result<AgreementHistory, LedgerFileError> {
    load_json(path.as_ref()).await
}

/// Writes `report` as pretty JSON, creating parent directories.
pub async fn write_report(
    path: impl AsRef<Path>,
    report: &ReconciliationReport,
) -> Result<(), LedgerFileError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(report).map_err(|e| LedgerFileError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| io_error(path, e))?;
    }
    fs::write(path, json).await.map_err(|e| io_error(path, e))
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, LedgerFileError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| io_error(path, e))?;

    serde_json::from_str(&raw).map_err(|e| LedgerFileError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn io_error(path: &Path, e: std::io::Error) -> LedgerFileError {
    LedgerFileError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};
    use tempfile::TempDir;

    #[tokio::test]
    async fn loads_ledger_and_history() {
        let temp_dir = TempDir::new().unwrap();
        let ledger_path = temp_dir.path().join("actual.json");
        let history_path = temp_dir.path().join("history.json");
        std::fs::write(
            &ledger_path,
            r#"[{"user_id": "a", "status": "active", "is_active": true,
                 "expires_at": "2024-04-01T00:00:00Z"}]"#,
        )
        .unwrap();
        std::fs::write(&history_path, r#"{"a": ["AGR-1"]}"#).unwrap();

        let ledger = load_ledger(&ledger_path).await.unwrap();
        let history = load_agreement_history(&history_path).await.unwrap();

        assert_eq!(ledger.len(), 1);
        assert!(history.agreements_for(&UserId::new("a").unwrap()).is_some());
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_ledger(temp_dir.path().join("nope.json")).await;

        assert!(matches!(result, Err(LedgerFileError::Io { .. })));
    }

    #[tokio::test]
    async fn malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, r#"{"not": "an array"}"#).unwrap();

        let result = load_ledger(&path).await;

        assert!(matches!(result, Err(LedgerFileError::Parse { .. })));
    }

    #[tokio::test]
    async fn report_is_written_and_readable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("report.json");
        let report = ReconciliationReport::from_records(Vec::new(), Timestamp::now());

        write_report(&path, &report).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: ReconciliationReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.summary.total, 0);
    }
}
