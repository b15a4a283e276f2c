// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `echo import` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use echo_config::EchoConfig;
use echo_core::EchoError;
use echo_ingest::{import_sms, ImportOptions};

/// Command-line overrides for one import.
#[derive(Debug)]
pub struct ImportArgs {
    pub source: PathBuf,
    pub phone: String,
    pub target: Option<PathBuf>,
    pub gap_minutes: Option<u64>,
    pub keep_existing: bool,
}

fn import_options(config: &EchoConfig, args: ImportArgs) -> ImportOptions {
    let gap_minutes = args.gap_minutes.unwrap_or(config.import.gap_minutes);
    ImportOptions {
        source: args.source,
        phone: args.phone,
        target: args
            .target
            .unwrap_or_else(|| PathBuf::from(&config.storage.database_path)),
        gap: Duration::from_secs(gap_minutes * 60),
        recreate: config.import.recreate_db && !args.keep_existing,
    }
}

pub async fn run_import(config: &EchoConfig, args: ImportArgs) -> Result<(), EchoError> {
    let opts = import_options(config, args);
    let report = import_sms(&opts).await?;
    println!(
        "Imported {} messages in {} conversations into {}",
        report.messages,
        report.conversations,
        opts.target.display()
    );
    Ok(())
}
