//! Volume anomaly detection over the last 24 hours

use super::utils::{format_ranked, snapshot};
use crate::cli::{AnomaliesArgs, CliRunner, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use taglog::logging::LogAnalyzer;

pub async fn run(runner: &CliRunner, args: AnomaliesArgs) -> Result<()> {
    let storage = snapshot(&args.source).await?;
    let analyzer = LogAnalyzer::new(storage);
    let anomalies = analyzer
        .detect_anomalies(args.window_hours, args.threshold)
        .await;

    if runner.format() == OutputFormat::Json {
        return runner.print_json(&anomalies);
    }

    if anomalies.is_empty() {
        runner.print_success("No anomalies detected");
        return Ok(());
    }

    runner.print_header(&format!("{} anomalous windows", anomalies.len()));
    for anomaly in &anomalies {
        runner.print_output(&format!(
            "{} .. {}  {} logs, expected {:.1}, severity {}",
            anomaly.window_start.format("%Y-%m-%d %H:%M"),
            anomaly.window_end.format("%H:%M"),
            anomaly.log_count,
            anomaly.expected_count,
            format!("{:.2}", anomaly.severity).yellow()
        ));
        runner.print_output(&format!("  features: {}", format_ranked(&anomaly.top_features)));
        runner.print_output(&format!("  modules:  {}", format_ranked(&anomaly.top_modules)));
    }
    Ok(())
}
