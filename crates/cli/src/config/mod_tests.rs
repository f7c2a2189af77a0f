#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;

use super::*;
use crate::framework::FrameworkKind;
use crate::test_utils::temp_project_with_config;

fn parse_ok(content: &str) -> Config {
    parse(content, Path::new("testmux.toml")).unwrap()
}

fn parse_err(content: &str) -> ConfigError {
    parse(content, Path::new("testmux.toml")).unwrap_err()
}

const MINIMAL: &str = r#"
version = 1

[[framework]]
kind = "junit"
"#;

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn minimal_config_uses_defaults() {
    let config = parse_ok(MINIMAL);
    assert_eq!(config.version, 1);
    assert_eq!(config.frameworks.len(), 1);
    assert_eq!(config.frameworks[0].kind, FrameworkKind::Junit);
    assert!(config.frameworks[0].scan);
    assert_eq!(config.run.batch_size, defaults::run::BATCH_SIZE);
    assert_eq!(config.run.retries, defaults::run::RETRIES);
    assert_eq!(config.run.strategy, StrategyConfig::Fixed);
}

#[test]
fn version_defaults_to_current() {
    let config = parse_ok("[[framework]]\nkind = \"testng\"\n");
    assert_eq!(config.version, CONFIG_VERSION);
}

#[test]
fn unsupported_version_is_rejected() {
    let err = parse_err("version = 2\n");
    assert!(matches!(err, ConfigError::UnsupportedVersion(2)));
    assert_eq!(err.to_string(), "unsupported config version 2 (expected 1)");
}

#[test]
fn not_found_names_file_and_directory() {
    let err = ConfigError::NotFound(PathBuf::from("/work/app"));
    assert_eq!(err.to_string(), "no testmux.toml found in /work/app or its parents");
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(matches!(parse_err("version = 1\nfrobnicate = true\n"), ConfigError::Parse { .. }));
}

#[test]
fn unknown_framework_kind_is_rejected() {
    let err = parse_err("[[framework]]\nkind = \"spock\"\n");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn full_config_parses() {
    let config = parse_ok(
        r#"
version = 1

[run]
classes = ["build/classes"]
classpath = ["build/classes", "lib/junit.jar"]
jvm_args = ["-Xmx1g"]
max_parallel = 3
strategy = "per-class"
retries = 2
class_timeout = "90s"
fail_fast = true

[run.properties]
"user.timezone" = "UTC"

[[framework]]
kind = "junit-platform"
name = "jupiter"
options = { include_tags = ["fast"] }

[[framework]]
kind = "testng"
scan = false
include = ["**/*IT.class"]
"#,
    );

    assert_eq!(config.run.max_parallel, 3);
    assert_eq!(config.run.strategy, StrategyConfig::PerClass);
    assert_eq!(config.run.properties.get("user.timezone").map(String::as_str), Some("UTC"));
    assert_eq!(config.frameworks[0].name.as_deref(), Some("jupiter"));
    assert_eq!(config.frameworks[0].options.include_tags, vec!["fast"]);
    assert!(!config.frameworks[1].scan);

    let settings = config.dispatch_settings().unwrap();
    assert_eq!(settings.max_parallel, 3);
    assert_eq!(settings.strategy, BatchingStrategy::PerClass);
    assert_eq!(settings.retries, 2);
    assert_eq!(settings.class_timeout, Some(Duration::from_secs(90)));
    assert!(settings.fail_fast);
}

// =============================================================================
// Dispatch settings
// =============================================================================

#[test]
fn default_settings_are_valid() {
    let settings = Config::default().dispatch_settings().unwrap();
    assert_eq!(settings.strategy, BatchingStrategy::Fixed { size: defaults::run::BATCH_SIZE });
    assert_eq!(settings.fork_every, None);
    assert_eq!(settings.launch_timeout, Duration::from_secs(30));
    assert_eq!(settings.grace_period, Duration::from_secs(10));
    assert_eq!(settings.class_timeout, Some(Duration::from_secs(600)));
}

#[test]
fn zero_class_timeout_disables_it() {
    let mut config = Config::default();
    config.run.class_timeout = "0".to_string();
    assert_eq!(config.class_timeout().unwrap(), None);
}

#[test]
fn fork_every_zero_means_unlimited() {
    let mut config = Config::default();
    config.run.fork_every = 4;
    assert_eq!(config.dispatch_settings().unwrap().fork_every, Some(4));
}

#[yare::parameterized(
    max_parallel = { "max_parallel", "run.max_parallel" },
    launch_attempts = { "launch_attempts", "run.launch_attempts" },
    batch_size = { "batch_size", "run.batch_size" },
    launch_timeout = { "launch_timeout", "run.launch_timeout" },
)]
fn zero_settings_are_rejected(setting: &str, expected_field: &str) {
    let mut config = Config::default();
    match setting {
        "max_parallel" => config.run.max_parallel = 0,
        "launch_attempts" => config.run.launch_attempts = 0,
        "batch_size" => config.run.batch_size = 0,
        _ => config.run.launch_timeout = "0".to_string(),
    }
    let err = config.dispatch_settings().unwrap_err();
    assert!(
        matches!(err, ConfigError::InvalidSetting { field, .. } if field == expected_field),
        "got {err}"
    );
}

#[test]
fn batch_size_is_ignored_per_class() {
    let mut config = Config::default();
    config.run.strategy = StrategyConfig::PerClass;
    config.run.batch_size = 0;
    assert_eq!(config.dispatch_settings().unwrap().strategy, BatchingStrategy::PerClass);
}

#[test]
fn bad_duration_names_the_field() {
    let mut config = Config::default();
    config.run.grace_period = "soon".to_string();
    let err = config.dispatch_settings().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDuration { field: "run.grace_period", .. }));
}

#[yare::parameterized(
    millis = { "250ms", Some(Duration::from_millis(250)) },
    seconds = { "30s", Some(Duration::from_secs(30)) },
    bare_seconds = { "45", Some(Duration::from_secs(45)) },
    minutes = { "5m", Some(Duration::from_secs(300)) },
    hours = { "2h", Some(Duration::from_secs(7200)) },
    padded = { " 10s ", Some(Duration::from_secs(10)) },
    zero = { "0", Some(Duration::ZERO) },
    empty = { "", None },
    unit_only = { "s", None },
    unknown_unit = { "3d", None },
    negative = { "-1s", None },
    overflow = { "99999999999999999h", None },
)]
fn duration_parsing(input: &str, expected: Option<Duration>) {
    assert_eq!(parse_duration(input), expected);
}

// =============================================================================
// Descriptors
// =============================================================================

#[test]
fn descriptors_keep_config_order() {
    let config = parse_ok(
        r#"
[[framework]]
kind = "testng"

[[framework]]
kind = "junit"
"#,
    );
    let names: Vec<String> = config
        .descriptors()
        .unwrap()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(names, vec!["testng", "junit"]);
}

#[test]
fn no_frameworks_is_an_error() {
    let err = parse_ok("version = 1\n").descriptors().err().unwrap();
    assert!(matches!(err, ConfigError::NoFrameworks));
}

#[test]
fn duplicate_framework_names_are_rejected() {
    let config = parse_ok(
        r#"
[[framework]]
kind = "junit"
name = "tests"

[[framework]]
kind = "testng"
name = "tests"
"#,
    );
    let err = config.descriptors().err().unwrap();
    assert!(matches!(err, ConfigError::DuplicateFramework(ref name) if name == "tests"));
}

#[test]
fn same_kind_twice_needs_distinct_names() {
    let config = parse_ok("[[framework]]\nkind = \"junit\"\n\n[[framework]]\nkind = \"junit\"\n");
    assert!(matches!(config.descriptors().err().unwrap(), ConfigError::DuplicateFramework(_)));
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn load_resolves_relative_paths_against_config_dir() {
    let dir = temp_project_with_config(
        r#"
[run]
classes = ["build/classes", "/abs/classes"]
classpath = ["lib/junit.jar"]

[[framework]]
kind = "junit"
classpath = ["launcher/runner.jar"]
"#,
    );
    let config = load(&dir.path().join(CONFIG_FILE)).unwrap();

    assert_eq!(
        config.run.classes,
        vec![dir.path().join("build/classes"), PathBuf::from("/abs/classes")]
    );
    assert_eq!(config.run.classpath, vec![dir.path().join("lib/junit.jar")]);
    assert_eq!(config.frameworks[0].classpath, vec![dir.path().join("launcher/runner.jar")]);
}

#[test]
fn load_reports_read_errors() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(&dir.path().join(CONFIG_FILE)).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn parse_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "version = \n").unwrap();
    let err = load(&path).unwrap_err();
    assert!(err.to_string().contains(CONFIG_FILE), "got {err}");
}

#[test]
fn base_configurator_copies_run_settings() {
    let mut config = Config::default();
    config.run.jvm_args = vec!["-ea".to_string()];
    config.run.modular = true;
    let base = config.base_configurator();
    assert_eq!(base.jvm_args, vec!["-ea"]);
    assert!(base.modular);
}
