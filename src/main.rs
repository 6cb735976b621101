mod engine;
mod utils;

use engine::cli::{CLI, CliCommand};
use engine::config::VrConfig;
use engine::xr::{Availability, OpenXrRuntime, probe_headset};
use engine::EngineResult;
use tracing::error;

fn main() {
    utils::logger::init();

    let cli = CLI::parse();
    let result = match cli.command {
        CliCommand::Run { config } => {
            VrConfig::load(config.as_deref()).and_then(engine::Windowing::run_app)
        }
        CliCommand::Probe { config } => VrConfig::load(config.as_deref()).and_then(probe),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn probe(config: VrConfig) -> EngineResult<()> {
    let mut runtime = OpenXrRuntime::new();
    match probe_headset(&mut runtime, &config.identity())? {
        Availability::Ready => println!("headset: available"),
        Availability::Unavailable => println!("headset: unavailable"),
    }
    Ok(())
}
