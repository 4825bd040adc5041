use std::io::{Read, Write};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;

use crate::domain::{BuildNumber, OutcomeKind, ResolutionOutcome, SpeciesRecord};
use crate::error::ResolverError;
use crate::extract::extract_builds;
use crate::remote::SessionProvider;
use crate::resolver::{DirectoryResolver, Listing};
use crate::retry::Sleeper;
use crate::select::outcome_for;
use crate::table::{RecordReader, RecordWriter, TableRow};

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RecordStarted {
        row: u64,
        database_name: String,
    },
    RetryScheduled {
        database_name: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: String,
    },
    BuildRejected {
        database_name: String,
        capture: String,
    },
    RecordMalformed {
        row: u64,
        error: String,
    },
    RecordFinished {
        row: u64,
        database_name: String,
        outcome: OutcomeKind,
        build: Option<BuildNumber>,
        error: Option<String>,
        elapsed: Duration,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub row: u64,
    pub database_name: String,
    pub previous_build: String,
    pub outcome: OutcomeKind,
    pub build: Option<BuildNumber>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub records: u64,
    pub resolved: u64,
    pub not_found: u64,
    pub failed: u64,
    pub malformed: u64,
    pub items: Vec<RecordReport>,
}

impl RunSummary {
    fn start() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            finished_at: String::new(),
            records: 0,
            resolved: 0,
            not_found: 0,
            failed: 0,
            malformed: 0,
            items: Vec::new(),
        }
    }

    fn push(&mut self, report: RecordReport) {
        self.records += 1;
        match report.outcome {
            OutcomeKind::Resolved => self.resolved += 1,
            OutcomeKind::NotFound => self.not_found += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::Malformed => self.malformed += 1,
        }
        self.items.push(report);
    }
}

pub struct App<P: SessionProvider, S: Sleeper> {
    provider: P,
    resolver: DirectoryResolver,
    sleeper: S,
}

impl<P: SessionProvider, S: Sleeper> App<P, S> {
    pub fn new(provider: P, resolver: DirectoryResolver, sleeper: S) -> Self {
        Self {
            provider,
            resolver,
            sleeper,
        }
    }

    /// Resolves one record's build number. Never fails: every error is
    /// folded into `ResolutionOutcome::Failed`.
    pub fn resolve(&self, record: &SpeciesRecord, sink: &dyn ProgressSink) -> ResolutionOutcome {
        let name = match record.database_name() {
            Ok(name) => name,
            Err(err) => return ResolutionOutcome::Failed(err),
        };

        // One session per record, closed when it goes out of scope.
        let mut session = match self.provider.open() {
            Ok(session) => session,
            Err(err) => return ResolutionOutcome::Failed(err),
        };

        let entries = match self
            .resolver
            .list(&mut session, &name, &self.sleeper, sink)
        {
            Ok(Listing::Entries(entries)) => entries,
            Ok(Listing::Missing) => return ResolutionOutcome::NotFound,
            Err(err) => return ResolutionOutcome::Failed(err),
        };
        drop(session);

        let extraction = extract_builds(&entries);
        for capture in &extraction.rejected {
            sink.event(ProgressEvent::BuildRejected {
                database_name: name.to_string(),
                capture: capture.clone(),
            });
        }
        outcome_for(&extraction)
    }

    /// Resolves, merges and writes one input row. Rows that do not fit the
    /// species schema, or whose key columns are not UTF-8, are written back
    /// unchanged.
    pub fn process_row<W: Write>(
        &self,
        row: TableRow,
        writer: &mut RecordWriter<W>,
        sink: &dyn ProgressSink,
    ) -> Result<RecordReport, ResolverError> {
        let TableRow { row, fields } = row;
        let record = match SpeciesRecord::from_fields(row, fields.clone()) {
            Ok(record) => record,
            Err(err) => {
                sink.event(ProgressEvent::RecordMalformed {
                    row,
                    error: err.to_string(),
                });
                writer.write_row(&fields)?;
                return Ok(RecordReport {
                    row,
                    database_name: fields
                        .first()
                        .map(|field| String::from_utf8_lossy(field).into_owned())
                        .unwrap_or_default(),
                    previous_build: String::new(),
                    outcome: OutcomeKind::Malformed,
                    build: None,
                    error: Some(err.to_string()),
                });
            }
        };

        let database_name = record.database_name_field().to_string();
        sink.event(ProgressEvent::RecordStarted {
            row,
            database_name: database_name.clone(),
        });
        let started = Instant::now();
        let outcome = self.resolve(&record, sink);
        let merged = record.merge(&outcome);
        writer.write_row(merged.fields())?;

        let error = match &outcome {
            ResolutionOutcome::Failed(err) => Some(err.to_string()),
            _ => None,
        };
        sink.event(ProgressEvent::RecordFinished {
            row,
            database_name: database_name.clone(),
            outcome: outcome.kind(),
            build: outcome.build(),
            error: error.clone(),
            elapsed: started.elapsed(),
        });

        Ok(RecordReport {
            row,
            database_name,
            previous_build: record.build_field().to_string(),
            outcome: outcome.kind(),
            build: outcome.build(),
            error,
        })
    }

    /// Processes every row in input order. Only table I/O errors stop the run.
    pub fn run<R: Read, W: Write>(
        &self,
        reader: &mut RecordReader<R>,
        writer: &mut RecordWriter<W>,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, ResolverError> {
        let mut summary = RunSummary::start();
        while let Some(row) = reader.next_row()? {
            let report = self.process_row(row, writer, sink)?;
            summary.push(report);
        }
        summary.finished_at = Utc::now().to_rfc3339();
        Ok(summary)
    }
}
