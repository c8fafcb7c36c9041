//! Evaluate the logging gate against a policy file

use super::utils::parse_level;
use crate::cli::{CheckArgs, CliRunner, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use taglog::logging::tags::{is_known_feature, is_known_module};
use taglog::logging::LoggingConfigManager;

/// Outcome of each gate stage
#[derive(Debug, Serialize)]
pub struct GateReport {
    pub config_file: String,
    pub config_found: bool,
    pub enabled: bool,
    pub level_enabled: bool,
    pub feature_enabled: bool,
    pub module_enabled: bool,
    pub known_feature: bool,
    pub known_module: bool,
    pub would_log: bool,
}

pub async fn evaluate(args: &CheckArgs) -> Result<GateReport> {
    let level = parse_level(&args.level)?;
    let manager = LoggingConfigManager::new(&args.config);
    let config = manager.get_config().await;

    Ok(GateReport {
        config_file: args.config.display().to_string(),
        config_found: args.config.is_file(),
        enabled: config.is_enabled(),
        level_enabled: config.is_level_enabled(level),
        feature_enabled: config.is_feature_enabled(&args.feature),
        module_enabled: config.is_module_enabled(&args.module),
        known_feature: is_known_feature(&args.feature),
        known_module: is_known_module(&args.module),
        would_log: config.should_log(level, &args.feature, &args.module),
    })
}

pub async fn run(runner: &CliRunner, args: CheckArgs) -> Result<()> {
    let report = evaluate(&args).await?;

    if runner.format() == OutputFormat::Json {
        return runner.print_json(&report);
    }

    if !report.config_found {
        runner.print_warning(&format!(
            "{} not found, using the default policy",
            report.config_file
        ));
    }

    let mark = |on: bool| if on { "yes".green() } else { "no".red() };
    runner.print_header(&format!(
        "{} [{}:{}]",
        args.level.to_uppercase(),
        args.feature,
        args.module
    ));
    runner.print_output(&format!("  Logging enabled:  {}", mark(report.enabled)));
    runner.print_output(&format!("  Level enabled:    {}", mark(report.level_enabled)));
    runner.print_output(&format!("  Feature enabled:  {}", mark(report.feature_enabled)));
    runner.print_output(&format!("  Module enabled:   {}", mark(report.module_enabled)));

    if !report.known_feature {
        runner.print_warning(&format!("{} is not a catalogued feature tag", args.feature));
    }
    if !report.known_module {
        runner.print_warning(&format!("{} is not a catalogued module tag", args.module));
    }

    if report.would_log {
        runner.print_success("would be logged");
    } else {
        runner.print_output(&format!("{} would be dropped", "✗".red()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taglog::logging::config::write_sample_config;
    use tempfile::tempdir;

    fn args(config: std::path::PathBuf, level: &str, feature: &str, module: &str) -> CheckArgs {
        CheckArgs {
            config,
            level: level.to_string(),
            feature: feature.to_string(),
            module: module.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sample_policy_gate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logging.json");
        write_sample_config(&path).unwrap();

        let report = evaluate(&args(path.clone(), "info", "AUTH", "SERVICES")).await.unwrap();
        assert!(report.config_found);
        assert!(report.would_log);

        let report = evaluate(&args(path.clone(), "debug", "AUTH", "SERVICES")).await.unwrap();
        assert!(!report.level_enabled);
        assert!(!report.would_log);

        let report = evaluate(&args(path, "error", "AUTH", "TESTS")).await.unwrap();
        assert!(report.feature_enabled);
        assert!(!report.module_enabled);
        assert!(!report.would_log);
    }

    #[tokio::test]
    async fn test_missing_policy_uses_defaults() {
        let dir = tempdir().unwrap();
        let report = evaluate(&args(dir.path().join("none.json"), "ERROR", "ERROR_HANDLING", "HANDLERS"))
            .await
            .unwrap();
        assert!(!report.config_found);
        assert!(!report.enabled);
        assert!(report.feature_enabled);
        assert!(report.module_enabled);
        assert!(!report.would_log);
    }

    #[tokio::test]
    async fn test_invalid_level_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(evaluate(&args(dir.path().join("x.json"), "LOUD", "AUTH", "SERVICES"))
            .await
            .is_err());
    }
}
