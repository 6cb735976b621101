//! Command-line interface for stereo-shim.

use std::env;
use std::path::PathBuf;

use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Open a window and render, in VR when a headset is available.
    Run { config: Option<PathBuf> },
    /// Report whether a headset is available, then exit.
    Probe { config: Option<PathBuf> },
}

pub struct CLI {
    pub command: CliCommand,
}

impl CLI {
    /// Parse command-line arguments.
    ///
    /// Supported commands:
    /// - `./stereo-shim [run] [--config <file>]` - Render (default)
    /// - `./stereo-shim probe [--config <file>]` - Check for a headset
    pub fn parse() -> Self {
        Self::parse_from(env::args().skip(1))
    }

    pub fn parse_from(args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args.into_iter().peekable();

        let command = match args.peek().map(String::as_str) {
            Some("probe") => {
                args.next();
                CliCommand::Probe {
                    config: parse_config(args),
                }
            }
            Some("run") => {
                args.next();
                CliCommand::Run {
                    config: parse_config(args),
                }
            }
            _ => CliCommand::Run {
                config: parse_config(args),
            },
        };

        CLI { command }
    }
}

fn parse_config(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => warn!("--config needs a file; ignoring"),
            },
            other => warn!("Unknown argument: {}. Ignoring.", other),
        }
    }
    config
}
