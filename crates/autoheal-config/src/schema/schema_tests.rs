use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.browser.endpoint, "http://localhost:9222");
    assert_eq!(config.browser.dialogs, DialogPolicy::Accept);
}

#[test]
fn test_resolution_config_default() {
    let res = ResolutionConfig::default();
    assert_eq!(res.max_attempts, 5);
    assert_eq!(res.max_frames, 15);
    assert_eq!(res.max_shadow_depth, 5);
    assert_eq!(res.dynamic_wait().as_millis(), 3000);
    assert_eq!(res.settle_delay().as_millis(), 300);
}

#[test]
fn test_readiness_config_default() {
    let readiness = ReadinessConfig::default();
    assert_eq!(readiness.budget_ms, 10_000);
    assert_eq!(readiness.sub_timeout_ms, 3000);
    assert!(readiness.loading_selectors.iter().any(|s| s == ".spinner"));
    assert!(readiness
        .loading_selectors
        .iter()
        .any(|s| s.contains("aria-busy")));
}

#[test]
fn test_run_and_artifacts_default() {
    let run = RunConfig::default();
    assert_eq!(run.pause_poll_ms, 500);
    assert_eq!(run.open_attempts, 3);
    assert_eq!(run.step_delay_ms, 0);

    let artifacts = ArtifactsConfig::default();
    assert!(artifacts.screenshots);
    assert!(artifacts.page_source);
    assert_eq!(artifacts.dir, PathBuf::from("./artifacts"));
}

#[test]
fn test_logging_config_default() {
    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert_eq!(logging.recent_lines, 200);
}

#[test]
fn test_dialog_policy_parse() {
    let browser: BrowserConfig = toml::from_str("dialogs = \"ignore\"").unwrap();
    assert_eq!(browser.dialogs, DialogPolicy::Ignore);
    assert_eq!(browser.request_timeout_secs, 30);
}

#[test]
fn test_partial_section_keeps_defaults() {
    let artifacts: ArtifactsConfig = toml::from_str("screenshots = false").unwrap();
    assert!(!artifacts.screenshots);
    assert!(artifacts.page_source);
}
