use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::Value;
use tracing::{debug, info};

use treepatch_diff::{CaseFailure, CaseSuite, DiffConfig, Differ, Patcher, SuiteReport};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Diff(args) => cmd_diff(args, &config),
        Command::Apply(args) => cmd_apply(args, &config),
        Command::Check(args) => cmd_check(args, &config, &cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DiffConfig> {
    let Some(path) = path else {
        return Ok(DiffConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: DiffConfig = toml::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(?config, "loaded config");
    Ok(config)
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn render(value: &Value, pretty: bool) -> anyhow::Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

fn write_output(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            if !text.is_empty() {
                println!("{text}");
            }
            Ok(())
        }
    }
}

/// Writes the wire patch, or nothing at all when the documents are equivalent.
pub(crate) fn cmd_diff(args: DiffArgs, config: &DiffConfig) -> anyhow::Result<()> {
    let before = read_json(&args.before)?;
    let after = read_json(&args.after)?;

    let patch = Differ::new(*config)
        .diff(&before, &after)
        .with_context(|| format!("cannot diff {} against {}", args.before.display(), args.after.display()))?;

    let text = match patch {
        Some(patch) => {
            info!(changes = patch.change_count(), "patch computed");
            let wire = patch
                .into_encoded(&before)
                .with_context(|| format!("cannot encode patch for {}", args.before.display()))?;
            render(&wire, args.pretty)?
        }
        None => {
            info!("documents are equivalent");
            String::new()
        }
    };
    write_output(args.output.as_deref(), &text)
}

/// An empty patch file means no change.
pub(crate) fn cmd_apply(args: ApplyArgs, config: &DiffConfig) -> anyhow::Result<()> {
    let mut value = read_json(&args.value)?;
    let patch_text = fs::read_to_string(&args.patch)
        .with_context(|| format!("failed to read {}", args.patch.display()))?;

    if patch_text.trim().is_empty() {
        info!("empty patch; document unchanged");
    } else {
        let wire: Value = serde_json::from_str(&patch_text)
            .with_context(|| format!("invalid JSON in {}", args.patch.display()))?;
        Patcher::new(*config)
            .apply_wire(&mut value, wire)
            .with_context(|| format!("cannot apply {} to {}", args.patch.display(), args.value.display()))?;
    }

    write_output(args.output.as_deref(), &render(&value, args.pretty)?)
}

pub(crate) fn cmd_check(args: CheckArgs, config: &DiffConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let suite = match &args.cases {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            CaseSuite::from_json(&text).with_context(|| format!("invalid cases in {}", path.display()))?
        }
        None => CaseSuite::builtin(),
    };

    let report = suite.run(config);
    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.is_success() {
        bail!("{} of {} cases failed", report.failed(), report.reports.len());
    }
    Ok(())
}

fn print_report(report: &SuiteReport) {
    for case in &report.reports {
        match &case.failure {
            None => println!("{} {} passed", "✓".green(), case.name),
            Some(failure) => println!("{} {} failed: {}", "✗".red().bold(), case.name, describe(failure)),
        }
    }
    let failed = report.failed().to_string();
    let failed = if report.is_success() { failed.green() } else { failed.red().bold() };
    println!("Completed: {} Failures: {}", report.reports.len().to_string().bold(), failed);
}

fn describe(failure: &CaseFailure) -> String {
    let show = |v: &Option<Value>| v.as_ref().map_or_else(|| "no change".to_string(), Value::to_string);
    match failure {
        CaseFailure::UnexpectedPatch { expected, actual } => {
            format!("unexpected patch (expected {}, got {})", show(expected), show(actual))
        }
        CaseFailure::RoundTripMismatch { expected, actual } => {
            format!("patched value is not equivalent (expected {expected}, got {actual})")
        }
        CaseFailure::Error { message } => message.clone(),
    }
}
