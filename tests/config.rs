use std::time::Duration;

use assert_matches::assert_matches;

use dbsnp_build::config::{Config, ConfigLoader};
use dbsnp_build::domain::MissingPathPolicy;
use dbsnp_build::error::ResolverError;
use dbsnp_build::retry::BackoffKind;

#[test]
fn load_config_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dbsnp-build.json");
    std::fs::write(
        &path,
        r#"{
            "input": "species.tsv",
            "delimiter": "\t",
            "ftp": { "host": "ftp.example.org", "root": "/pub/snp/", "connect_timeout_secs": 5 },
            "retry": { "max_attempts": 4, "delay_secs": 1, "backoff": "linear" },
            "missing_path": "skip"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.input.as_str(), "species.tsv");
    assert_eq!(resolved.delimiter, b'\t');
    assert_eq!(resolved.ftp.host, "ftp.example.org");
    assert_eq!(resolved.ftp.user, "anonymous");
    assert_eq!(resolved.ftp.connect_timeout, Duration::from_secs(5));
    assert_eq!(resolved.root, "/pub/snp/");
    assert_eq!(resolved.retry.max_attempts(), 4);
    assert_eq!(resolved.retry.backoff().kind, BackoffKind::Linear);
    assert_eq!(resolved.retry.backoff().delay, Duration::from_secs(1));
    assert_eq!(resolved.missing_path, MissingPathPolicy::Skip);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nope.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, ResolverError::ConfigRead(_));
}

#[test]
fn invalid_json_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, ResolverError::ConfigParse(_));
}

#[test]
fn zero_attempts_rejected() {
    let mut config = Config::default();
    config.retry.max_attempts = Some(0);
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, ResolverError::ConfigInvalid(_));
}
