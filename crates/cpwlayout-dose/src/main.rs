//! Dose chip generator.
//!
//! Usage:
//!   dose-chip <config.json> [output.gds]
//!
//! The output path falls back to the config's `output`, then `dose_chip.gds`.
//! Set `RUST_LOG=info` for progress output.

use std::{env, path::PathBuf, process::ExitCode};

use cpwlayout_dose::{ChipConfig, DoseError};

const USAGE: &str = "\
Usage: dose-chip <CONFIG> [OUTPUT]

Arguments:
  <CONFIG>  JSON chip description
  [OUTPUT]  GDS file to write (default: config \"output\" or dose_chip.gds)

The dose table is written next to OUTPUT as <stem>_dose_table.txt.";

struct Args {
    config: PathBuf,
    output: Option<PathBuf>,
}

enum Action {
    Help,
    Build(Args),
}

fn parse_args(args: &[String]) -> Result<Action, String> {
    match args {
        [flag] if flag == "-h" || flag == "--help" => Ok(Action::Help),
        [config] => Ok(Action::Build(Args {
            config: config.into(),
            output: None,
        })),
        [config, output] => Ok(Action::Build(Args {
            config: config.into(),
            output: Some(output.into()),
        })),
        _ => Err(USAGE.into()),
    }
}

fn run(args: Args) -> Result<(), DoseError> {
    let config = ChipConfig::load(&args.config)?;
    let output = args
        .output
        .or_else(|| config.output.clone())
        .unwrap_or_else(|| PathBuf::from("dose_chip.gds"));

    let chip = config.build()?;
    let table = chip.save(&output, &config.export)?;
    log::info!(
        "wrote {} ({} polygons) and {}",
        output.display(),
        chip.library().polygon_count(),
        table.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(Action::Build(args)) => args,
        Ok(Action::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
