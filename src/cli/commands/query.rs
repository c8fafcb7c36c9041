//! Query stored entries

use super::utils::{load_entries, parse_level};
use crate::cli::{CliRunner, OutputFormat, QueryArgs};
use anyhow::Result;
use chrono::Utc;
use taglog::logging::analyzer::hours_before;
use taglog::logging::{LogFormatter, LogQuery, PrettyFormatter};

/// Translate command arguments into a storage query
pub fn build_query(args: &QueryArgs) -> Result<LogQuery> {
    let mut query = LogQuery::new().limit(args.limit).offset(args.offset);

    if let Some(level) = &args.level {
        query = query.level(parse_level(level)?);
    }
    if let Some(feature) = &args.feature {
        query = query.feature(feature.as_str());
    }
    if let Some(module) = &args.module {
        query = query.module(module.as_str());
    }
    if let Some(user) = &args.user {
        query = query.user(user.as_str());
    }
    if let Some(hours) = args.since_hours {
        query = query.since(hours_before(Utc::now(), hours)?);
    }

    Ok(query)
}

pub async fn run(runner: &CliRunner, args: QueryArgs) -> Result<()> {
    let query = build_query(&args)?;
    let entries = load_entries(&args.source, &query).await?;

    if runner.format() == OutputFormat::Json {
        return runner.print_json(&entries);
    }

    if entries.is_empty() {
        runner.print_info("No matching log entries");
        return Ok(());
    }

    let formatter = if args.pretty {
        PrettyFormatter::console().show_context(true)
    } else {
        PrettyFormatter::console()
            .show_parameters(false)
            .show_exception(false)
    };

    for entry in &entries {
        runner.print_output(&formatter.format(entry)?);
    }
    runner.print_info(&format!("{} entries", entries.len()));
    Ok(())
}
