//! # ftop - a top-like process monitor
//!
//! Shows which processes use the most CPU time and memory since ftop was
//! started, who owns them, what they are, and what has been launched while
//! it was running.

mod app;
mod config;
pub mod constants;
mod crash;
mod logging;
mod models;
mod monitor;
mod profiling;
mod ranking;
mod ui;
mod utils;

use std::path::Path;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use config::Config;
use profiling::Profiler;
use ui::ThemeChoice;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

/// Extra arguments, whitespace separated, put before the real ones.
const ENV_ARGS: &str = "FTOP";

/// ftop - top-like process monitor that shows what got launched
#[derive(Parser, Debug)]
#[command(name = "ftop", version, about = "A top-like process monitor that tracks what gets launched")]
struct Cli {
    /// Color theme
    #[arg(long, value_enum)]
    theme: Option<ThemeChoice>,

    /// Print the log on exit even if nothing went wrong
    #[arg(long)]
    debug: bool,

    /// Write CPU and heap profiles and render timings on exit
    #[arg(long)]
    profile: bool,

    /// Panic after startup, for testing crash reporting
    #[arg(long, hide = true)]
    panic: bool,
}

/// `argv` with the words of `env_args` inserted after the program name.
fn args_with_env(argv: impl IntoIterator<Item = String>, env_args: Option<&str>) -> Vec<String> {
    let mut argv = argv.into_iter();
    let mut args = vec![argv.next().unwrap_or_else(|| "ftop".to_string())];
    if let Some(extra) = env_args {
        args.extend(extra.split_whitespace().map(String::from));
    }
    args.extend(argv);
    args
}

fn parse_cli() -> Cli {
    let env_args = std::env::var(ENV_ARGS).ok();
    let args = args_with_env(std::env::args(), env_args.as_deref());
    match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            if let Some(value) = env_args {
                eprintln!("{}={}", ENV_ARGS, value);
            }
            std::process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_cli();

    if let Err(e) = logging::init(cli.debug) {
        eprintln!("Warning: {}", e);
    }
    crash::install_panic_hook();

    // Load and apply CLI overrides to config
    let config = Config::load().with_flags(cli.theme, cli.debug);
    logging::set_debug(config.debug);
    log::info!("ftop {} starting", env!("CARGO_PKG_VERSION"));
    let profiler = cli.profile.then(|| Profiler::start(Path::new(".")));

    let mut app = app::App::new(&config, cli.profile, cli.panic);
    let outcome = tokio::spawn(async move {
        let result = app.run().await;
        (result, app.profile_report())
    })
    .await;

    let timings = match outcome {
        Ok((Ok(()), profile)) => profile,
        Ok((Err(e), _)) => {
            log::error!("{:#}", e);
            None
        }
        // panics were logged by the hook
        Err(e) if e.is_panic() => None,
        Err(e) => {
            log::error!("UI task failed: {}", e);
            None
        }
    };
    finish(config.debug, profiler, timings)
}

/// Write profiles, then print what the terminal could not show while ftop
/// was running.
fn finish(debug: bool, profiler: Option<Profiler>, timings: Option<String>) -> ExitCode {
    if let Some(profiler) = profiler {
        match profiler.finish(Path::new("."), timings.as_deref()) {
            Ok(written) => {
                for path in written {
                    log::info!("Wrote {}", path.display());
                }
            }
            Err(e) => log::warn!("Profiling: {:#}", e),
        }
    }

    let buffer = logging::buffer();
    if buffer.has_errors() {
        eprint!("{}", crash::crash_report(&buffer.drain_to_string()));
        return ExitCode::FAILURE;
    }
    if debug {
        eprint!("{}", buffer.drain_to_string());
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn env_args_go_first() {
        let args = args_with_env(argv(&["ftop", "--debug"]), Some("  --theme  light "));
        assert_eq!(args, argv(&["ftop", "--theme", "light", "--debug"]));
        assert_eq!(args_with_env(argv(&["ftop"]), None), argv(&["ftop"]));
        assert_eq!(args_with_env(Vec::new(), Some("")), argv(&["ftop"]));
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(argv(&["ftop", "--theme", "dark", "--profile"])).unwrap();
        assert_eq!(cli.theme, Some(ThemeChoice::Dark));
        assert!(cli.profile);
        assert!(!cli.debug);
        assert!(!cli.panic);
    }

    #[test]
    fn rejects_unknown_flags_and_themes() {
        let err = Cli::try_parse_from(argv(&["ftop", "--frobnicate"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(err.exit_code(), 2);
        let err = Cli::try_parse_from(argv(&["ftop", "--theme", "purple"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn version_flag_is_handled_by_clap() {
        let err = Cli::try_parse_from(argv(&["ftop", "--version"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        assert_eq!(err.exit_code(), 0);
    }
}
