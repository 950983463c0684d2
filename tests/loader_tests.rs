//! Loading configuration files and reloading the live policy from disk.

mod common;

use std::io::Write;

use oidc_policy::config::OidcConfig;
use oidc_policy::reload::LivePolicy;
use oidc_policy::{Error, provider};
use tempfile::NamedTempFile;

/// Serialize a configuration to a temporary YAML file
fn write_config(config: &OidcConfig) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_yaml::to_string(config).unwrap().as_bytes())
        .unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn yaml_round_trip_through_loader() {
    // GIVEN: a valid configuration written to disk
    let mut config = common::config_with(vec![common::confidential("app")]);
    config.lifespans.access_token = std::time::Duration::from_secs(30 * 60);
    let file = write_config(&config);

    // WHEN: loading it back and validating
    let loaded = OidcConfig::load(Some(file.path())).unwrap();
    let (model, report) = provider::build_policy_model(&loaded).unwrap();

    // THEN: the model reflects the file
    assert!(report.is_valid());
    assert_eq!(model.clients.len(), 1);
    assert_eq!(
        model.lifespans.global.access_token,
        std::time::Duration::from_secs(1800)
    );
}

#[test]
fn human_readable_durations() {
    // GIVEN: lifespans written as duration strings
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "lifespans:\n  access_token: 2h\n  refresh_token: 90m\n  custom:\n    short:\n      access_token: 30s"
    )
    .unwrap();

    // WHEN: loading
    let config = OidcConfig::load(Some(file.path())).unwrap();

    // THEN: each value is parsed
    assert_eq!(config.lifespans.access_token.as_secs(), 7200);
    assert_eq!(config.lifespans.refresh_token.as_secs(), 5400);
    assert_eq!(config.lifespans.custom["short"].access_token.as_secs(), 30);
}

#[test]
fn reload_from_disk_keeps_snapshot_on_invalid_file() {
    // GIVEN: a live policy and an invalid replacement file
    let config = common::config_with(vec![common::confidential("app")]);
    let live = LivePolicy::from_config(&config).unwrap();
    let before = live.get();

    let mut broken = config.clone();
    broken.clients[0].response_modes = vec!["carrier_pigeon".to_string()];
    let file = write_config(&broken);

    // WHEN: reloading from it
    let err = live.reload_from_path(file.path()).unwrap_err();

    // THEN: the previous snapshot is still active
    assert!(matches!(err, Error::Validation(_)));
    assert!(std::sync::Arc::ptr_eq(&before, &live.get()));

    // WHEN: the file is fixed
    let fixed = write_config(&config);
    tokio_test::assert_ok!(live.reload_from_path(fixed.path()));

    // THEN: a new snapshot is published
    assert_eq!(live.generation(), 1);
}

#[test]
fn missing_file_is_a_config_error() {
    let err = OidcConfig::load(Some(std::path::Path::new("/nonexistent/oidc.yaml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
