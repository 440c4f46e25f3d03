use std::collections::HashMap;
use std::io::Write;

use synapse_core::config::{ConfidenceCurve, HittingSetStrategy};
use synapse_core::errors::{AuthError, ConfigError, TransportError};
use synapse_core::{SynapseConfig, SynapseError};

// ─── Parsing ────────────────────────────────────────────────────────────────

#[test]
fn empty_toml_yields_defaults() {
    let config = SynapseConfig::from_toml("").unwrap();
    assert_eq!(config.sync.max_attempts, 5);
    assert_eq!(config.hub.token_issuer, "synapse-hub");
    assert_eq!(config.recall.hitting_set, HittingSetStrategy::Greedy);
    assert!(config.validate().is_ok());
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = SynapseConfig::from_toml(
        r#"
        [sync]
        max_attempts = 2
        initial_backoff_ms = 10

        [causal.confidence_curve]
        kind = "exponential"
        rate = 0.25

        [recall.hitting_set]
        kind = "exhaustive"
        max_chunks = 12
        "#,
    )
    .unwrap();
    assert_eq!(config.sync.max_attempts, 2);
    assert_eq!(config.sync.initial_backoff_ms, 10);
    assert_eq!(config.sync.max_backoff_ms, 30_000);
    assert_eq!(
        config.causal.confidence_curve,
        ConfidenceCurve::Exponential { rate: 0.25 }
    );
    assert_eq!(
        config.recall.hitting_set,
        HittingSetStrategy::Exhaustive { max_chunks: 12 }
    );
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = SynapseConfig::from_toml("[sync\nmax_attempts = ").unwrap_err();
    assert!(matches!(
        err,
        SynapseError::ConfigError(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn load_reads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[hub]\nidle_timeout_secs = 5").unwrap();
    let config = SynapseConfig::load(file.path()).unwrap();
    assert_eq!(config.hub.idle_timeout_secs, 5);
}

// ─── Overrides & validation ─────────────────────────────────────────────────

#[test]
fn overrides_apply_from_lookup() {
    let env: HashMap<&str, &str> = [
        ("SYNAPSE_HUB_ENDPOINT", "mem://hub-a"),
        ("SYNAPSE_SYNC_INTERVAL_SECS", "7"),
        ("SYNAPSE_DB_PATH", "/tmp/agent.db"),
    ]
    .into_iter()
    .collect();
    let mut config = SynapseConfig::default();
    config
        .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(config.sync.hub_endpoint.as_deref(), Some("mem://hub-a"));
    assert_eq!(config.sync.sync_interval_secs, 7);
    assert_eq!(config.storage.db_path.as_deref(), Some("/tmp/agent.db"));
}

#[test]
fn non_numeric_interval_override_is_rejected() {
    let mut config = SynapseConfig::default();
    let err = config
        .apply_overrides(|key| (key == "SYNAPSE_SYNC_INTERVAL_SECS").then(|| "soon".to_string()))
        .unwrap_err();
    assert!(matches!(
        err,
        SynapseError::ConfigError(ConfigError::ValidationFailed { .. })
    ));
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut config = SynapseConfig::default();
    config.sync.max_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = SynapseConfig::default();
    config.causal.confidence_curve = ConfidenceCurve::Linear { saturation: 0.0 };
    assert!(config.validate().is_err());

    let mut config = SynapseConfig::default();
    config.recall.gamma = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = SynapseConfig::default();
    config.sync.initial_backoff_ms = 60_000;
    assert!(config.validate().is_err());
}

// ─── Confidence curves ──────────────────────────────────────────────────────

#[test]
fn confidence_curves_are_monotone_and_saturate() {
    for curve in [
        ConfidenceCurve::Linear { saturation: 10.0 },
        ConfidenceCurve::Exponential { rate: 0.3 },
    ] {
        let mut previous = curve.confidence(0);
        assert_eq!(previous, 0.0);
        for n in 1..200 {
            let c = curve.confidence(n);
            assert!(c >= previous, "{curve:?} decreased at n={n}");
            assert!(c <= 1.0);
            previous = c;
        }
        assert!(previous > 0.99);
    }
    assert_eq!(ConfidenceCurve::Linear { saturation: 10.0 }.confidence(5), 0.5);
}

// ─── Error classification ───────────────────────────────────────────────────

#[test]
fn only_transport_errors_are_retryable() {
    let transport: SynapseError = TransportError::ConnectionClosed.into();
    let auth: SynapseError = AuthError::InvalidSignature.into();
    assert!(transport.is_retryable());
    assert!(!transport.is_fatal_auth());
    assert!(auth.is_fatal_auth());
    assert!(!auth.is_retryable());
}
