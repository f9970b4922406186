//! mbrl-jobs - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use mbrl_jobs::{
    cli::{Args, Commands, Settings, Verbosity},
    diff::{diff, Change},
    job::{self, ResolvedJob, SampleBudget, Severity},
    literal::{self, render_value},
    policy::GaussianMlp,
    presets, workspace,
};

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let settings = Settings::load(args.settings.clone()).context("Failed to load settings")?;
    if args.no_color || !settings.output.color {
        colored::control::set_override(false);
    }
    let verbosity = args.verbosity();

    match &args.command {
        Commands::Check {
            records,
            deny_warnings,
        } => cmd_check(records, *deny_warnings, &settings, verbosity),
        Commands::Show {
            record,
            json,
            run,
            no_defaults,
        } => cmd_show(record, *json, *run, *no_defaults, &settings, verbosity),
        Commands::Prepare { config, output } => cmd_prepare(config, output, &settings, verbosity),
        Commands::Plan { record, json } => cmd_plan(record, *json, &settings, verbosity),
        Commands::Diff { left, right } => cmd_diff(left, right, verbosity),
        Commands::Presets { name } => cmd_presets(name.as_deref()),
        Commands::Policy {
            record,
            obs_dim,
            act_dim,
        } => cmd_policy(record, *obs_dim, *act_dim, &settings, verbosity),
    }
}

/// Read a record, fill defaults and extract the typed view
fn load_job(source: &str, settings: &Settings, verbosity: Verbosity) -> Result<ResolvedJob> {
    let mapping = job::read_source(source).with_context(|| format!("Failed to read {}", source))?;
    if verbosity.show_diagnostics() {
        eprintln!(
            "[CONFIG] Loaded {} keys from {} (sections: {})",
            mapping.len(),
            source,
            mapping.sections().join(", ")
        );
    }

    let resolved =
        job::resolve(mapping, &settings.defaults).with_context(|| format!("Invalid record {}", source))?;
    if verbosity.show_diagnostics() && !resolved.filled.is_empty() {
        eprintln!("[DEFAULTS] Filled: {}", resolved.filled.join(", "));
    }
    Ok(resolved)
}

/// Every required key a record lacks after defaults, for reporting alongside the first error
fn missing_fields(source: &str, settings: &Settings) -> Vec<&'static str> {
    match job::read_source(source) {
        Ok(mut mapping) => {
            job::apply_defaults(&mut mapping, &settings.defaults);
            job::missing_required(&mapping)
        }
        Err(_) => Vec::new(),
    }
}

/// Print findings; returns (errors, warnings)
fn print_findings(report: &job::ValidationReport) -> (usize, usize) {
    for finding in &report.findings {
        let line = format!("{}: {}", finding.field, finding.message);
        match finding.severity {
            Severity::Error => println!("  {} {}", "✗".red(), line.red()),
            Severity::Warning => println!("  {} {}", "⚠".yellow(), line.yellow()),
        }
    }
    (report.errors().count(), report.warnings().count())
}

fn cmd_check(
    records: &[String],
    deny_warnings: bool,
    settings: &Settings,
    verbosity: Verbosity,
) -> Result<()> {
    let mut failed = 0;

    for source in records {
        let resolved = match load_job(source, settings, verbosity) {
            Ok(resolved) => resolved,
            Err(e) => {
                println!("{} {}", "✗".red(), source.bold());
                println!("  {}", format!("{:#}", e).red());
                let missing = missing_fields(source, settings);
                if missing.len() > 1 {
                    println!("  {}", format!("missing: {}", missing.join(", ")).red());
                }
                failed += 1;
                continue;
            }
        };

        let report = resolved.validate(&settings.validation);
        let blocked = !report.is_valid() || (deny_warnings && report.warnings().next().is_some());
        let icon = if blocked { "✗".red() } else { "✓".green() };
        println!(
            "{} {} ({}, {}/{} checks passed)",
            icon,
            source.bold(),
            resolved.record.mode(),
            report.checks_passed(),
            report.checks_run
        );
        print_findings(&report);

        if verbosity.show_summary() {
            if let Some(total) = resolved.record.filter_total() {
                println!("  filter_coefs total: {}", total);
            }
        }
        if blocked {
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} records failed validation", failed, records.len());
    }
    Ok(())
}

fn cmd_show(
    source: &str,
    json: bool,
    run_view: bool,
    no_defaults: bool,
    settings: &Settings,
    verbosity: Verbosity,
) -> Result<()> {
    let mut mapping = job::read_source(source).with_context(|| format!("Failed to read {}", source))?;
    if !no_defaults {
        let filled = job::apply_defaults(&mut mapping, &settings.defaults);
        if verbosity.show_diagnostics() && !filled.is_empty() {
            eprintln!("[DEFAULTS] Filled: {}", filled.join(", "));
        }
    }
    if run_view {
        mapping.rename("seed", "base_seed");
    }

    if json {
        println!("{}", workspace::to_json_string(&mapping, settings.export.json_indent)?);
    } else {
        print!("{}", literal::render(&mapping));
    }
    Ok(())
}

fn cmd_prepare(
    source: &str,
    output: &std::path::Path,
    settings: &Settings,
    verbosity: Verbosity,
) -> Result<()> {
    let resolved = load_job(source, settings, verbosity)?;
    let report = resolved.validate(&settings.validation);
    let (errors, _) = print_findings(&report);
    if errors > 0 {
        anyhow::bail!("{} has {} validation error(s); nothing written", source, errors);
    }

    let (ws, path) = workspace::prepare(
        output,
        &resolved,
        settings.export.clone(),
        verbosity.show_diagnostics(),
    )?;

    if verbosity.show_summary() {
        println!("{} Wrote {}", "✓".green(), path.display().to_string().bold());
        let schedule = resolved.schedule();
        let files = ws.checkpoint_files(&schedule);
        println!(
            "  {} iterations, {} checkpoint files expected in {}",
            schedule.iterations.len(),
            files.len(),
            ws.dir().display()
        );
    }
    Ok(())
}

fn cmd_plan(source: &str, json: bool, settings: &Settings, verbosity: Verbosity) -> Result<()> {
    let resolved = load_job(source, settings, verbosity)?;
    let schedule = resolved.schedule();

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }

    println!(
        "{:>5}  {:>14}  {:>8}  {:>12}  {:>12}  {:>10}",
        "iter", "collect", "seed", "fresh models", "policy reset", "checkpoint"
    );
    println!("{}", "─".repeat(72));
    for it in &schedule.iterations {
        let budget = match it.budget {
            SampleBudget::Samples(n) => format!("{} samples", n),
            SampleBudget::Paths(n) => format!("{} paths", n),
        };
        println!(
            "{:>5}  {:>14}  {:>8}  {:>12}  {:>12}  {:>10}",
            it.index,
            budget,
            it.sampling_seed,
            if it.fresh_models { "yes" } else { "no" },
            if it.policy_reset { "yes" } else { "no" },
            if it.checkpoint { "yes" } else { "" }
        );
        if verbosity.show_diagnostics() {
            eprintln!("[SCHEDULE] iteration {} model seeds {:?}", it.index, it.model_seeds);
        }
    }

    if verbosity.show_summary() {
        println!();
        println!("Total collected:   {}", schedule.total_budget());
        if let Some(steps) = schedule.inner_steps {
            println!("NPG inner steps:   {}", steps);
        }
        if let Some(limit) = schedule.buffer_limit {
            println!("Path buffer:       {} transitions", limit);
        }
        if let Some(split) = schedule.start_states {
            println!(
                "Start states:      {} initial + {} buffer",
                split.from_initial, split.from_buffer
            );
        }
    }
    Ok(())
}

fn cmd_diff(left: &str, right: &str, verbosity: Verbosity) -> Result<()> {
    let a = job::read_source(left).with_context(|| format!("Failed to read {}", left))?;
    let b = job::read_source(right).with_context(|| format!("Failed to read {}", right))?;
    let changes = diff(&a, &b);

    for change in &changes {
        match change {
            Change::Removed { key, value } => {
                println!("{}", format!("- {}: {}", key, render_value(value)).red())
            }
            Change::Added { key, value } => {
                println!("{}", format!("+ {}: {}", key, render_value(value)).green())
            }
            Change::Changed { key, left, right } => println!(
                "{}",
                format!("~ {}: {} -> {}", key, render_value(left), render_value(right)).yellow()
            ),
        }
    }

    if verbosity.show_summary() {
        println!("{} differing key(s)", changes.len());
    }
    Ok(())
}

fn cmd_presets(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let preset = presets::preset(name).with_context(|| format!("Unknown preset '{}'", name))?;
            print!("{}", preset.source);
        }
        None => {
            for preset in presets::all() {
                println!("  {:<20} {}", preset.name.green(), preset.description);
            }
        }
    }
    Ok(())
}

fn cmd_policy(
    source: &str,
    obs_dim: usize,
    act_dim: usize,
    settings: &Settings,
    verbosity: Verbosity,
) -> Result<()> {
    let resolved = load_job(source, settings, verbosity)?;
    let policy = GaussianMlp::from_record(&resolved.record, obs_dim, act_dim)?;

    let sizes: Vec<String> = std::iter::once(obs_dim)
        .chain(policy.model().layers().iter().map(|l| l.out_dim))
        .map(|s| s.to_string())
        .collect();
    let mean = policy.mean_action(&vec![0.0; obs_dim])?;

    println!("Layers:            {}", sizes.join(" -> "));
    println!("Parameters:        {}", policy.param_count());
    println!("log_std:           {:?}", policy.log_std());
    println!("Mean at zero obs:  {:?}", mean);
    Ok(())
}
