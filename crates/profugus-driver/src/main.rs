// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Command-Line Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use profugus_driver::{run, write_output, ProblemBuilder, RunOutput};
use profugus_types::error::ProfugusResult;

/// SPN and Monte Carlo neutron transport.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON problem input
    #[arg(short, long)]
    input: PathBuf,

    /// Monte Carlo ranks
    #[arg(short, long, default_value_t = 1)]
    nodes: usize,

    /// Write results as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn summarize(output: &RunOutput) {
    match output {
        RunOutput::Spn(spn) => match (spn.keff, spn.time) {
            (Some(k), _) => info!("SPN k-eigenvalue = {k:.6} ({} iterations)", spn.iterations),
            (None, Some(t)) => info!("SPN transient reached t = {t:.4e} s ({} iterations)", spn.iterations),
            (None, None) => info!("SPN fixed-source solve: {} iterations", spn.iterations),
        },
        RunOutput::Mc(mc) => info!(
            "MC keff = {:.6} +/- {:.6} over {} active cycles",
            mc.result.keff, mc.result.std_dev, mc.result.num_active_cycles
        ),
    }
}

fn execute(args: &Args) -> ProfugusResult<()> {
    info!("Reading {}", args.input.display());
    let builder = ProblemBuilder::from_file(&args.input)?;
    let output = run(&builder, args.nodes)?;
    summarize(&output);
    if let Some(path) = &args.output {
        write_output(path, &output)?;
        info!("Results written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
