use std::io::{self, Write};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink, RunSummary};
use crate::domain::OutcomeKind;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Forwards progress events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RecordStarted { row, database_name } => {
                info!(row, species = %database_name, "resolving build");
            }
            ProgressEvent::RetryScheduled {
                database_name,
                attempt,
                max_attempts,
                delay,
                error,
            } => {
                warn!(
                    species = %database_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "listing failed, retrying"
                );
            }
            ProgressEvent::BuildRejected {
                database_name,
                capture,
            } => {
                warn!(species = %database_name, %capture, "not a valid build number");
            }
            ProgressEvent::RecordMalformed { row, error } => {
                warn!(row, %error, "row passed through unchanged");
            }
            ProgressEvent::RecordFinished {
                row,
                database_name,
                outcome,
                build,
                error,
                elapsed,
            } => {
                let elapsed_ms = elapsed.as_millis() as u64;
                match outcome {
                    OutcomeKind::Resolved => {
                        let build = build.map(|build| build.get()).unwrap_or_default();
                        info!(row, species = %database_name, build, elapsed_ms, "build resolved");
                    }
                    OutcomeKind::NotFound => {
                        info!(row, species = %database_name, elapsed_ms, "build numbers not found");
                    }
                    OutcomeKind::Failed | OutcomeKind::Malformed => {
                        let error = error.unwrap_or_default();
                        warn!(row, species = %database_name, %error, elapsed_ms, "resolution failed");
                    }
                }
                debug!(row, "row written");
            }
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub fn print_human_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}dbSNP build summary{reset}");
    println!("{green}resolved:  {}{reset}", summary.resolved);
    println!("{yellow}not found: {}{reset}", summary.not_found);
    println!("{red}failed:    {}{reset}", summary.failed);
    if summary.malformed > 0 {
        println!("{red}malformed: {}{reset}", summary.malformed);
    }

    for item in &summary.items {
        let color = match item.outcome {
            OutcomeKind::Resolved => green,
            OutcomeKind::NotFound => yellow,
            OutcomeKind::Failed | OutcomeKind::Malformed => red,
        };
        match item.build {
            Some(build) => println!(
                "{color}  {} {} -> {build}{reset}",
                item.database_name, item.previous_build
            ),
            None => println!(
                "{color}  {} {} ({}){reset}",
                item.database_name, item.previous_build, item.outcome
            ),
        }
    }
}
