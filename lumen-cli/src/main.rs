//! Lumen CLI
//!
//! Replays a style scenario and prints what every style recalc did to the
//! layout tree.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_css::{LayoutSnapshot, SelectorMatchBatch, StyleEngineStats};
use owo_colors::OwoColorize;
use serde::Serialize;

use scenario::{Scenario, ScenarioRun};

/// Lumen: replays style invalidation scenarios against the layout tree builder
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Style the document once and print its layout tree
    lumen scenarios/first_letter.json

    # Recalc after every scripted step
    lumen --steps scenarios/first_letter.json

    # Machine-readable snapshots, watching a callback selector
    lumen --json --watch .note scenarios/first_letter.json

    # Trace the recalc walk
    RUST_LOG=lumen_css=trace lumen scenarios/first_letter.json
"#)]
struct Cli {
    /// Scenario file (JSON)
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Print layout snapshots as JSON instead of an indented dump
    #[arg(short, long)]
    json: bool,

    /// Recalc after every step instead of once after all of them
    #[arg(short, long)]
    steps: bool,

    /// Callback selector to watch (repeatable)
    #[arg(short, long, value_name = "SELECTOR")]
    watch: Vec<String>,
}

/// The outcome of one style recalc.
#[derive(Debug, Serialize)]
struct Frame {
    label: String,
    change: String,
    stats: StyleEngineStats,
    layout: LayoutSnapshot,
    #[serde(skip)]
    dump: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    selector_batches: Vec<SelectorMatchBatch>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let scenario = Scenario::load(&cli.scenario)?;
    let mut run = ScenarioRun::new(&scenario)
        .with_context(|| format!("building {}", cli.scenario.display()))?;
    if !cli.watch.is_empty() {
        let selectors: Vec<&str> = cli.watch.iter().map(String::as_str).collect();
        let accepted = run.watch(&selectors);
        log::debug!("watching {accepted} of {} selectors", selectors.len());
    }

    let mut frames = vec![recalc(&mut run, "initial".to_string())];
    for (index, step) in scenario.steps.iter().enumerate() {
        run.apply(step)
            .with_context(|| format!("step {} ({})", index + 1, step.describe()))?;
        if cli.steps {
            frames.push(recalc(&mut run, step.describe()));
        }
    }
    if !cli.steps && !scenario.steps.is_empty() {
        let label = format!("after {} steps", scenario.steps.len());
        frames.push(recalc(&mut run, label));
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&frames)?);
    } else {
        for frame in &frames {
            print_frame(frame);
        }
    }
    Ok(())
}

fn recalc(run: &mut ScenarioRun, label: String) -> Frame {
    let change = run.document_mut().recalc_style();
    let selector_batches = run.drain_selector_batches();
    let doc = run.document();
    Frame {
        label,
        change: change.to_string(),
        stats: doc.stats(),
        layout: doc.layout_snapshot(),
        dump: doc.dump_layout_tree(),
        selector_batches,
    }
}

fn print_frame(frame: &Frame) {
    println!("{} {}", "===".dimmed(), frame.label.bold());
    println!(
        "recalc: {}  (resolver calls: {}, styles changed: {}, unchanged: {})",
        frame.change.cyan(),
        frame.stats.resolver_invocations,
        frame.stats.styles_changed,
        frame.stats.styles_unchanged,
    );
    print!("{}", frame.dump);
    for batch in &frame.selector_batches {
        for selector in &batch.added {
            println!("{} {selector}", "+".green());
        }
        for selector in &batch.removed {
            println!("{} {selector}", "-".red());
        }
    }
    println!();
}
