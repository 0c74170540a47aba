//! hatch entry point.
//!
//! Reads commands from a script file or stdin and dispatches them through
//! the shell registry. `RUST_LOG` controls log output (default `info`).

mod commands;
mod session;

use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use hatch_net::TlsProvider;
use hatch_shell::CommandRegistry;
use hatch_types::config::HatchConfig;

use commands::{DownloadContext, register_builtins};
use session::Session;

const USAGE: &str = "usage: hatch [--config <path>] [script]";

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
struct Cli {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
    help: bool,
}

impl Cli {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut cli = Cli::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => cli.help = true,
                "-c" | "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    cli.config = Some(PathBuf::from(path));
                },
                _ if arg.starts_with("--config=") => {
                    cli.config = Some(PathBuf::from(&arg["--config=".len()..]));
                },
                _ if arg.starts_with('-') && arg.len() > 1 => bail!("unknown option {arg}\n{USAGE}"),
                _ if cli.script.is_none() => cli.script = Some(PathBuf::from(&arg)),
                _ => bail!("unexpected argument {arg}\n{USAGE}"),
            }
        }
        Ok(cli)
    }

    /// Explicit path, else `HATCH_CONFIG`.
    fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var_os("HATCH_CONFIG").map(PathBuf::from))
    }
}

fn load_config(cli: &Cli) -> Result<HatchConfig> {
    match cli.config_path() {
        Some(path) => HatchConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(HatchConfig::default()),
    }
}

#[cfg(feature = "tls")]
fn tls_provider() -> Option<Arc<dyn TlsProvider>> {
    let provider: Arc<dyn TlsProvider> = Arc::new(hatch_net::RustlsTlsProvider::new());
    Some(provider)
}

#[cfg(not(feature = "tls"))]
fn tls_provider() -> Option<Arc<dyn TlsProvider>> {
    log::debug!("Built without TLS; https downloads are unavailable");
    None
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse(std::env::args().skip(1))?;
    if cli.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = load_config(&cli)?;

    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry, DownloadContext::new(&config.download, tls_provider()))?;

    let mut session = Session::new(config, registry);
    log::debug!("Registered {} commands", session.registry().len());
    let mut stdout = io::stdout().lock();

    match cli.script {
        Some(ref path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            session.run(BufReader::new(file), &mut stdout, false)?;
        },
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            session.run(stdin.lock(), &mut stdout, interactive)?;
        },
    }

    Ok(())
}
