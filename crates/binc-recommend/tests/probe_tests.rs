//! Dependency probe and configuration integration tests

use std::io::Write;

use binc_recommend::{DependencyManager, Library, ProbeConfig, RecommendConfig};
use tempfile::TempDir;

fn probe_in(dir: &TempDir, disabled: &[&str]) -> DependencyManager {
    DependencyManager::new(ProbeConfig {
        data_dir: Some(dir.path().to_path_buf()),
        disabled_libraries: disabled.iter().map(|s| s.to_string()).collect(),
        ..ProbeConfig::default()
    })
}

#[test]
fn test_summary_is_stable_across_calls() {
    let dir = TempDir::new().unwrap();
    let probe = probe_in(&dir, &[]);
    let first = probe.status_report();
    let second = probe.status_report();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.summary.total_libraries, Library::ALL.len());
    assert_eq!(
        first.summary.available + first.summary.missing,
        first.summary.total_libraries
    );
}

#[cfg(feature = "parallel")]
#[test]
fn test_disabled_library_gets_a_hint() {
    let dir = TempDir::new().unwrap();
    let probe = probe_in(&dir, &["rayon"]);
    let report = probe.status_report();

    assert!(!probe.is_available("rayon"));
    assert!(!report.details["rayon"].available);
    assert!(report.recommendations["rayon"].contains("disabled_libraries"));
    assert!(!report.is_healthy());
}

#[test]
fn test_unknown_library_name_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let probe = probe_in(&dir, &[]);
    assert!(!probe.is_available("lapack"));
    assert!(probe.is_available("ndarray"));
}

#[cfg(feature = "sentiment")]
#[test]
fn test_lexicon_resource_on_disk() {
    use binc_recommend::probe::{write_resource, ResourceState, VADER_LEXICON};
    use binc_recommend::{Review, SentimentAnalyzer, SentimentLabel};

    let dir = TempDir::new().unwrap();
    let probe = probe_in(&dir, &[]);

    let report = probe.status_report();
    assert_eq!(report.resources[0].state, ResourceState::Missing);
    assert_eq!(report.degraded, vec!["lexicon".to_string()]);
    assert!(!SentimentAnalyzer::from_probe(&probe).has_lexicon());

    write_resource(
        &probe.resource_path(&VADER_LEXICON),
        b"love\t3.2\t0.4\t[3, 3]\nhate\t-2.7\t0.6\t[-3]\n",
    )
    .unwrap();

    let report = probe.status_report();
    assert_eq!(report.resources[0].state, ResourceState::Present);
    assert!(report.degraded.is_empty());

    let analyzer = SentimentAnalyzer::from_probe(&probe);
    assert!(analyzer.has_lexicon());
    let score = analyzer.analyze(&Review::new(1, 1, 5.0, "I love it"));
    assert_eq!(score.label, SentimentLabel::Positive);
}

#[cfg(feature = "sentiment")]
#[test]
fn test_disabled_lexicon_skips_resources() {
    let dir = TempDir::new().unwrap();
    let probe = probe_in(&dir, &["lexicon"]);
    let report = probe.status_report();
    assert!(report.resources.is_empty());
    assert!(report.degraded.is_empty());
}

#[test]
fn test_config_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[probe]
disabled_libraries = ["rand"]

[engine.factorization]
factors = 16

[signals.weights]
purchase = 12.0
"#
    )
    .unwrap();

    let config = RecommendConfig::load(file.path()).unwrap();
    assert_eq!(config.probe.disabled_libraries, vec!["rand".to_string()]);
    assert_eq!(config.engine.factorization.factors, 16);
    assert_eq!(config.engine.factorization.iterations, 20);
    assert_eq!(config.signals.weights["purchase"], 12.0);

    let reparsed = RecommendConfig::from_toml(&config.to_toml().unwrap()).unwrap();
    assert_eq!(reparsed, config);
}

#[test]
fn test_config_rejects_unknown_signal_kind() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[signals.weights]\nteleport = 1.0\n").unwrap();
    assert!(RecommendConfig::load(file.path()).is_err());
}
