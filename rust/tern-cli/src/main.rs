//! Tern CLI: the incremental shell for tern script.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser as ClapParser, Subcommand};
use tern_cli::colors::Palette;
use tern_cli::reporter::ConsoleReporter;
use tern_cli::{build_shell, eval_code, logging, repl, run_file, CliError, RunSummary, TernConfig};

#[derive(ClapParser)]
#[command(name = "tern", version, about = "Incremental shell for tern script")]
struct Cli {
    /// Read configuration from this file instead of searching for tern.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (the default)
    Repl,
    /// Feed a file through the shell line by line
    Run {
        #[arg()]
        file: PathBuf,
    },
    /// Evaluate one unit of code and exit
    Eval {
        #[arg()]
        code: String,
    },
    /// Print a default tern.toml
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config_path, config) = match TernConfig::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let color = config.repl.color && !cli.no_color && std::io::stdout().is_terminal();
    let palette = Palette::new(color);

    if let Err(e) = logging::init_tracing(&config.log.filter) {
        eprintln!("{} {}", palette.yellow("warning:"), e);
    }
    if let Some(path) = &config_path {
        tracing::debug!(config = %path.display(), "loaded configuration");
    }

    let outcome = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl::run_repl(&config, palette).map(|()| true),
        Commands::Run { file } => batch(&config, palette, |shell| run_file(shell, &file)),
        Commands::Eval { code } => batch(&config, palette, |shell| eval_code(shell, &code)),
        Commands::Config => {
            print!("{}", TernConfig::default_template());
            Ok(true)
        }
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", palette.red("error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn batch(
    config: &TernConfig,
    palette: Palette,
    run: impl FnOnce(&tern_cli::ScriptShell) -> Result<RunSummary, CliError>,
) -> Result<bool, CliError> {
    let shell = build_shell(config, palette, Arc::new(ConsoleReporter::new(palette)))?;
    let summary = run(&shell)?;
    tracing::debug!(?summary, "batch finished");
    Ok(summary.is_success())
}
