// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! scene2cad - run a scene document against the in-memory CAD document.
//!
//! ```text
//! scene2cad <scene.json> [--output report.json] [--bridge-gaps]
//!           [--loop-tolerance <m>] [--existing-level <m>]...
//! ```
//!
//! Prints (or writes) the run report together with every recorded document
//! operation as JSON. Tolerances not given on the command line come from
//! `SCENE2CAD_*` environment variables.

use std::path::PathBuf;

use anyhow::{bail, Context};
use scene2cad_processing::{run_json, RecordingMaterializer, RunConfig, RunReport};
use serde::Serialize;

#[derive(Debug)]
struct Args {
    input: PathBuf,
    output: Option<PathBuf>,
    bridge_gaps: bool,
    loop_tolerance: Option<f64>,
    existing_levels: Vec<f64>,
}

#[derive(Serialize)]
struct Output<'a> {
    report: &'a RunReport,
    document: &'a RecordingMaterializer,
}

fn print_usage() {
    eprintln!(
        "Usage: scene2cad <scene.json> [--output <path>] [--bridge-gaps] \
         [--loop-tolerance <m>] [--existing-level <m>]..."
    );
}

fn parse_args() -> anyhow::Result<Args> {
    let mut input = None;
    let mut output = None;
    let mut bridge_gaps = false;
    let mut loop_tolerance = None;
    let mut existing_levels = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                output = Some(PathBuf::from(args.next().context("--output needs a path")?));
            }
            "--bridge-gaps" => bridge_gaps = true,
            "--loop-tolerance" => {
                let value = args.next().context("--loop-tolerance needs a value")?;
                loop_tolerance = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid loop tolerance '{value}'"))?,
                );
            }
            "--existing-level" => {
                let value = args.next().context("--existing-level needs an elevation")?;
                existing_levels.push(
                    value
                        .parse()
                        .with_context(|| format!("invalid elevation '{value}'"))?,
                );
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with('-') => bail!("unknown option '{other}'"),
            other => {
                if input.is_some() {
                    bail!("unexpected argument '{other}'");
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let Some(input) = input else {
        print_usage();
        bail!("missing scene file");
    };
    Ok(Args {
        input,
        output,
        bridge_gaps,
        loop_tolerance,
        existing_levels,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;

    let mut config = RunConfig::from_env();
    if args.bridge_gaps {
        config.bridge_wall_gaps = true;
    }
    if let Some(tolerance) = args.loop_tolerance {
        config.tolerances.loop_gap_tolerance = tolerance;
    }

    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    tracing::info!(
        input = %args.input.display(),
        existing_levels = args.existing_levels.len(),
        bridge_gaps = config.bridge_wall_gaps,
        "Running scene"
    );

    let mut doc = RecordingMaterializer::new().with_existing_levels(args.existing_levels);
    let report = run_json(&json, &mut doc, config).context("scene run failed")?;

    for message in &report.messages {
        tracing::warn!("{message}");
    }

    let output = Output {
        report: &report,
        document: &doc,
    };
    let rendered = serde_json::to_string_pretty(&output)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(output = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
