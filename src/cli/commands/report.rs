//! Full analysis report over stored entries

use super::utils::{format_ranked, snapshot};
use crate::cli::{CliRunner, OutputFormat, ReportArgs};
use anyhow::Result;
use colored::Colorize;
use taglog::logging::analyzer::AnalysisReport;
use taglog::logging::{LogAnalyzer, ReportOptions, TimeWindow};

pub async fn run(runner: &CliRunner, args: ReportArgs) -> Result<()> {
    let storage = snapshot(&args.source).await?;
    let analyzer = LogAnalyzer::new(storage);

    let window = match args.since_hours {
        Some(hours) => TimeWindow::last_hours(hours)?,
        None => TimeWindow::all(),
    };
    let options = ReportOptions {
        include_feature_analysis: !args.no_features,
        include_module_analysis: !args.no_modules,
        include_anomalies: !args.no_anomalies,
    };
    let report = analyzer.generate_report(window, options).await;

    match runner.format() {
        OutputFormat::Json => runner.print_json(&report),
        OutputFormat::Text => {
            print_report(runner, &report);
            Ok(())
        }
    }
}

fn print_report(runner: &CliRunner, report: &AnalysisReport) {
    let stats = &report.statistics;
    runner.print_header("Log analysis report");
    runner.print_output(&format!("Generated:   {}", report.generated_at.to_rfc3339()));
    runner.print_output(&format!("Total logs:  {}", stats.total_logs));
    if let (Some(start), Some(end)) = (stats.time_range.start, stats.time_range.end) {
        runner.print_output(&format!("Time range:  {} .. {}", start.to_rfc3339(), end.to_rfc3339()));
    }
    runner.print_output(&format!("Error rate:  {:.1}%", stats.error_rate * 100.0));
    runner.print_output(&format!("Top features: {}", format_ranked(&stats.most_active_features)));
    runner.print_output(&format!("Top modules:  {}", format_ranked(&stats.most_active_modules)));

    if let Some(features) = &report.feature_analysis {
        runner.print_output(&format!("\n{}", "Features".bold()));
        for (tag, group) in features {
            runner.print_output(&format!(
                "  {:<20} {:>6} logs  {:>5.1}% errors  {:.1}/h",
                tag,
                group.total_logs,
                group.error_rate * 100.0,
                group.logs_per_hour
            ));
        }
    }

    if let Some(modules) = &report.module_analysis {
        runner.print_output(&format!("\n{}", "Modules".bold()));
        for (tag, group) in modules {
            runner.print_output(&format!(
                "  {:<20} {:>6} logs  {:>5.1}% errors  {:.1}/h",
                tag,
                group.total_logs,
                group.error_rate * 100.0,
                group.logs_per_hour
            ));
        }
    }

    if !report.recent_errors.is_empty() {
        runner.print_output(&format!("\n{}", "Recent errors".bold()));
        for error in &report.recent_errors {
            runner.print_output(&format!(
                "  {} {} [{}:{}] {}",
                error.timestamp.format("%Y-%m-%d %H:%M:%S"),
                error.level.to_string().red(),
                error.feature_tag,
                error.module_tag,
                error.message
            ));
        }
    }

    if let Some(anomalies) = &report.anomalies {
        runner.print_output(&format!("\n{}", "Anomalies".bold()));
        if anomalies.is_empty() {
            runner.print_output("  none");
        }
        for anomaly in anomalies {
            runner.print_output(&format!(
                "  {} {} logs (expected {:.1}, severity {:.2})",
                anomaly.window_start.format("%Y-%m-%d %H:%M"),
                anomaly.log_count,
                anomaly.expected_count,
                anomaly.severity
            ));
        }
    }
}
