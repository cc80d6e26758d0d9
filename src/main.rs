//! Reconciliation tool.
//!
//! Usage: `entitlement-engine <expected.json> <actual.json> [history.json]`
//!
//! Prints the reconciliation report as JSON on stdout. Exits with status 1
//! on bad input and 2 when discrepancies were found.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use entitlement_engine::adapters::{load_agreement_history, load_ledger, SystemClock};
use entitlement_engine::application::handlers::reconciliation::{
    RunReconciliationCommand, RunReconciliationHandler,
};
use entitlement_engine::config::AppConfig;
use entitlement_engine::domain::reconciliation::AgreementHistory;
use entitlement_engine::telemetry;

const USAGE: &str = "usage: entitlement-engine <expected.json> <actual.json> [history.json]";

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };
    telemetry::init_tracing(&config.logging);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::from(1);
    }

    let args: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let (expected_path, actual_path, history_path) = match args.as_slice() {
        [expected, actual] => (expected, actual, None),
        [expected, actual, history] => (expected, actual, Some(history)),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(1);
        }
    };

    let loaded = async {
        let expected = load_ledger(expected_path).await?;
        let actual = load_ledger(actual_path).await?;
        let history = match history_path {
            Some(path) => load_agreement_history(path).await?,
            None => AgreementHistory::new(),
        };
        Ok::<_, entitlement_engine::adapters::LedgerFileError>(RunReconciliationCommand {
            expected,
            actual,
            history,
        })
    }
    .await;

    let cmd = match loaded {
        Ok(cmd) => cmd,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load ledgers");
            return ExitCode::from(1);
        }
    };

    let handler = RunReconciliationHandler::new(Arc::new(SystemClock))
        .with_policy(config.reconciliation_policy());
    let report = handler.handle(cmd);

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize report");
            return ExitCode::from(1);
        }
    }

    if report.summary.discrepancies() > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
