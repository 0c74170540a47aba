//! Built-in commands registered at startup.

use std::path::PathBuf;
use std::sync::Arc;

use hatch_net::{Download, DownloadObserver, HttpOptions, TlsProvider};
use hatch_shell::{Action, CommandOutput, CommandRegistry};
use hatch_types::config::DownloadConfig;
use hatch_types::error::{HatchError, Result};

const MIB: u64 = 1024 * 1024;

/// Everything the `download` command needs, shared by its closure.
#[derive(Clone)]
pub struct DownloadContext {
    pub options: HttpOptions,
    /// Where `-s` saves files when no destination is given.
    pub directory: PathBuf,
    pub tls: Option<Arc<dyn TlsProvider>>,
}

impl DownloadContext {
    pub fn new(config: &DownloadConfig, tls: Option<Arc<dyn TlsProvider>>) -> Self {
        Self {
            options: HttpOptions::from(config),
            directory: config.directory.clone(),
            tls,
        }
    }
}

/// Register help, echo, alias, download and exit (plus their aliases).
pub fn register_builtins(reg: &mut CommandRegistry, download: DownloadContext) -> Result<()> {
    reg.register("help", Action::plain(|_, _| Ok(CommandOutput::Help)))?;

    reg.register(
        "echo",
        Action::plain(|_, args| Ok(CommandOutput::Text(args.join(" ")))),
    )?;

    reg.register(
        "alias",
        Action::plain(|_, args| match args {
            [target, alias] => Ok(CommandOutput::Alias {
                target: target.clone(),
                alias: alias.clone(),
            }),
            _ => Err(HatchError::Command(
                "usage: alias <existing> <new>".to_string(),
            )),
        }),
    )?;

    let dl = reg.register(
        "download",
        Action::with_dash_args(move |_, args, flags| run_download(&download, args, flags)),
    )?;
    reg.add_alias(&dl, "dl")?;
    reg.add_alias(&dl, "get")?;

    let exit = reg.register("exit", Action::plain(|_, _| Ok(CommandOutput::Exit)))?;
    reg.add_alias(&exit, "quit")?;

    Ok(())
}

/// `download <url> [dest]` with `-q` (no progress) and `-s` (save into the
/// configured directory when no destination is given).
fn run_download(ctx: &DownloadContext, args: &[String], flags: &[String]) -> Result<CommandOutput> {
    if let Some(flag) = flags.iter().find(|f| !matches!(f.as_str(), "-q" | "-s")) {
        return Err(HatchError::Command(format!("download: unknown flag {flag}")));
    }
    let quiet = flags.iter().any(|f| f == "-q");
    let save = flags.iter().any(|f| f == "-s");

    let url = args.first().map(String::as_str).unwrap_or_default();
    let mut download = Download::new(url, args.get(1).map(PathBuf::from))?;
    if download.dest().is_none() && save {
        let name = download
            .suggested_file_name()
            .unwrap_or_else(|| "download".to_string());
        download.set_dest(Some(ctx.directory.join(name)));
    }

    let mut progress = ProgressObserver::new(quiet);
    download.start(&mut progress, ctx.tls.as_deref(), &ctx.options)?;

    let (amount, unit) = download.downloaded_in_auto();
    let summary = match download.dest() {
        Some(path) => format!("downloaded {amount:.2} {unit} to {}", path.display()),
        None => format!("downloaded {amount:.2} {unit}"),
    };
    Ok(CommandOutput::Text(summary))
}

/// Logs progress every 10% (or every MiB when the size is unknown).
struct ProgressObserver {
    quiet: bool,
    next_percent: f64,
    next_bytes: u64,
}

impl ProgressObserver {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            next_percent: 10.0,
            next_bytes: MIB,
        }
    }
}

impl DownloadObserver for ProgressObserver {
    fn on_data(&mut self, _chunk: &[u8], download: &Download) {
        if self.quiet {
            return;
        }
        let (amount, unit) = download.downloaded_in_auto();
        match download.download_percent() {
            Some(percent) if percent >= self.next_percent => {
                log::info!("{amount:.2} {unit} ({percent:.0}%)");
                self.next_percent = (percent / 10.0).floor() * 10.0 + 10.0;
            },
            Some(_) => {},
            None if download.downloaded_bytes() >= self.next_bytes => {
                log::info!("{amount:.2} {unit}");
                self.next_bytes = download.downloaded_bytes() / MIB * MIB + MIB;
            },
            None => {},
        }
    }

    // The command returns the error itself; keep the log quiet.
    fn on_error(&mut self, error: &HatchError) {
        log::debug!("download failed: {error}");
    }
}
