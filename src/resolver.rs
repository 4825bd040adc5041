use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{DatabaseName, MissingPathPolicy};
use crate::error::ResolverError;
use crate::remote::{ListingEntry, ListingSession};
use crate::retry::{RetryPolicy, Sleeper};

pub const DEFAULT_ROOT: &str = "snp";

/// Result of a successful directory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Entries(Vec<ListingEntry>),
    /// The server reported the directory as unavailable and the policy is to skip it.
    Missing,
}

#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: String,
    retry: RetryPolicy,
    missing_path: MissingPathPolicy,
}

impl DirectoryResolver {
    pub fn new(root: &str, retry: RetryPolicy, missing_path: MissingPathPolicy) -> Self {
        Self {
            root: root.trim_matches('/').to_string(),
            retry,
            missing_path,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// `/<root>/organisms/<name>/database/organism_data/`
    pub fn organism_data_path(&self, name: &DatabaseName) -> String {
        if self.root.is_empty() {
            format!("/organisms/{name}/database/organism_data/")
        } else {
            format!("/{}/organisms/{name}/database/organism_data/", self.root)
        }
    }

    pub fn list<L: ListingSession>(
        &self,
        session: &mut L,
        name: &DatabaseName,
        sleeper: &dyn Sleeper,
        sink: &dyn ProgressSink,
    ) -> Result<Listing, ResolverError> {
        let path = self.organism_data_path(name);
        let skip_missing = self.missing_path == MissingPathPolicy::Skip;
        let result = self.retry.run(
            sleeper,
            |_| session.list(&path),
            |err| !(skip_missing && matches!(err, ResolverError::RemotePathMissing(_))),
            |attempt, err, delay| {
                sink.event(ProgressEvent::RetryScheduled {
                    database_name: name.to_string(),
                    attempt,
                    max_attempts: self.retry.max_attempts(),
                    delay,
                    error: err.to_string(),
                })
            },
        );
        match result {
            Ok(entries) => Ok(Listing::Entries(entries)),
            Err(ResolverError::RemotePathMissing(_)) if skip_missing => Ok(Listing::Missing),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::retry::{Backoff, DEFAULT_DELAY};

    struct Quiet;

    impl ProgressSink for Quiet {
        fn event(&self, _event: ProgressEvent) {}
    }

    #[derive(Default)]
    struct RecordingSleeper {
        waits: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.borrow_mut().push(duration);
        }
    }

    struct ScriptedSession {
        calls: Cell<u32>,
        paths: RefCell<Vec<String>>,
        fail_with: fn(&str) -> ResolverError,
        succeed_on: Option<u32>,
    }

    impl ScriptedSession {
        fn failing(fail_with: fn(&str) -> ResolverError) -> Self {
            Self {
                calls: Cell::new(0),
                paths: RefCell::new(Vec::new()),
                fail_with,
                succeed_on: None,
            }
        }
    }

    impl ListingSession for ScriptedSession {
        fn list(&mut self, path: &str) -> Result<Vec<ListingEntry>, ResolverError> {
            self.calls.set(self.calls.get() + 1);
            self.paths.borrow_mut().push(path.to_string());
            if self.succeed_on == Some(self.calls.get()) {
                return Ok(vec![ListingEntry::new("b150_SNPContigLoc.bcp.gz")]);
            }
            Err((self.fail_with)(path))
        }
    }

    fn transient(path: &str) -> ResolverError {
        ResolverError::FtpList {
            path: path.to_string(),
            message: "connection reset".to_string(),
        }
    }

    fn missing(path: &str) -> ResolverError {
        ResolverError::RemotePathMissing(path.to_string())
    }

    fn name(value: &str) -> DatabaseName {
        value.parse().unwrap()
    }

    #[test]
    fn builds_organism_data_path() {
        let resolver =
            DirectoryResolver::new("/snp/", RetryPolicy::default(), MissingPathPolicy::Retry);
        assert_eq!(
            resolver.organism_data_path(&name("cow_9913")),
            "/snp/organisms/cow_9913/database/organism_data/"
        );
    }

    #[test]
    fn permanent_failure_tries_twice_with_fixed_delay() {
        let resolver =
            DirectoryResolver::new(DEFAULT_ROOT, RetryPolicy::default(), MissingPathPolicy::Retry);
        let mut session = ScriptedSession::failing(transient);
        let sleeper = RecordingSleeper::default();

        let err = resolver
            .list(&mut session, &name("cow_9913"), &sleeper, &Quiet)
            .unwrap_err();

        assert_matches!(err, ResolverError::FtpList { .. });
        assert_eq!(session.calls.get(), 2);
        assert_eq!(*sleeper.waits.borrow(), vec![DEFAULT_DELAY]);
        assert!(
            session
                .paths
                .borrow()
                .iter()
                .all(|path| path == "/snp/organisms/cow_9913/database/organism_data/")
        );
    }

    #[test]
    fn recovers_on_second_attempt() {
        let resolver =
            DirectoryResolver::new(DEFAULT_ROOT, RetryPolicy::default(), MissingPathPolicy::Retry);
        let mut session = ScriptedSession::failing(transient);
        session.succeed_on = Some(2);

        let listing = resolver
            .list(&mut session, &name("cow_9913"), &RecordingSleeper::default(), &Quiet)
            .unwrap();
        assert_matches!(listing, Listing::Entries(entries) if entries.len() == 1);
    }

    #[test]
    fn missing_path_is_retried_by_default() {
        let resolver =
            DirectoryResolver::new(DEFAULT_ROOT, RetryPolicy::default(), MissingPathPolicy::Retry);
        let mut session = ScriptedSession::failing(missing);

        let err = resolver
            .list(&mut session, &name("cow_9913"), &RecordingSleeper::default(), &Quiet)
            .unwrap_err();
        assert_matches!(err, ResolverError::RemotePathMissing(_));
        assert_eq!(session.calls.get(), 2);
    }

    #[test]
    fn missing_path_skip_policy_stops_early() {
        let policy = RetryPolicy::new(3, Backoff::constant(DEFAULT_DELAY));
        let resolver = DirectoryResolver::new(DEFAULT_ROOT, policy, MissingPathPolicy::Skip);
        let mut session = ScriptedSession::failing(missing);
        let sleeper = RecordingSleeper::default();

        let listing = resolver
            .list(&mut session, &name("cow_9913"), &sleeper, &Quiet)
            .unwrap();
        assert_eq!(listing, Listing::Missing);
        assert_eq!(session.calls.get(), 1);
        assert!(sleeper.waits.borrow().is_empty());
    }

    #[test]
    fn skip_policy_still_retries_transient_errors() {
        let resolver =
            DirectoryResolver::new(DEFAULT_ROOT, RetryPolicy::default(), MissingPathPolicy::Skip);
        let mut session = ScriptedSession::failing(transient);

        assert!(
            resolver
                .list(&mut session, &name("cow_9913"), &RecordingSleeper::default(), &Quiet)
                .is_err()
        );
        assert_eq!(session.calls.get(), 2);
    }
}
