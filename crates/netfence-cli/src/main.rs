mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_STORE_ERROR};
use netfence_core::{Engine, StepSelection};
use netfence_schema::{parse_settings_file, Settings};
use netfence_store::{FileAnswerStore, StoreLayout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "netfence",
    version,
    about = "Reconcile network spaces and load-balancer pools for isolated deployments"
)]
struct Cli {
    /// Path to the answer store directory.
    #[arg(long, default_value = "~/.local/share/netfence")]
    store: String,

    /// Settings file (defaults to netfence.toml in the store directory, if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fabric model to reconcile (overrides the settings file).
    #[arg(long, global = true)]
    model: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StepArg {
    Spaces,
    Pools,
}

fn step_selection(arg: Option<StepArg>) -> StepSelection {
    match arg {
        None => StepSelection::All,
        Some(StepArg::Spaces) => StepSelection::Spaces,
        Some(StepArg::Pools) => StepSelection::Pools,
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import an isolation document into the answer store.
    Import {
        /// Document to import (defaults to the configured import path).
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Set the load-balancer address ranges.
    Ranges {
        /// Comma-separated ranges or CIDRs for the public pool.
        #[arg(long)]
        public: Option<String>,
        /// Comma-separated ranges or CIDRs for the internal pool.
        #[arg(long)]
        internal: Option<String>,
        /// Range used for whichever pool has no explicit value.
        #[arg(long)]
        shared: Option<String>,
        /// Remove all stored ranges.
        #[arg(long, default_value_t = false, conflicts_with_all = ["public", "internal", "shared"])]
        clear: bool,
    },
    /// Show the isolation configuration as currently stored.
    Show,
    /// Check which steps would run, without changing anything.
    Plan {
        /// Only evaluate one step.
        #[arg(long, value_enum)]
        step: Option<StepArg>,
    },
    /// Reconcile the fabric and load balancer with the stored configuration.
    Apply {
        /// Only run one step.
        #[arg(long, value_enum)]
        step: Option<StepArg>,
        /// Import the isolation document before reconciling.
        #[arg(long, default_value_t = false)]
        import: bool,
    },
    /// Run diagnostic checks on the system and answer store.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("NETFENCE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    // These never touch the store or settings.
    match cli.command {
        Commands::Completions { shell } => {
            return finish(commands::completions::run::<Cli>(shell));
        }
        Commands::ManPages { ref dir } => {
            return finish(commands::man_pages::run::<Cli>(dir));
        }
        _ => {}
    }

    let store_path = expand_tilde(&cli.store);
    let settings = match load_settings(cli.config.as_deref(), &store_path, cli.model.as_deref()) {
        Ok(settings) => settings,
        Err(msg) => return finish(Err(msg)),
    };

    let needs_backends = matches!(cli.command, Commands::Plan { .. } | Commands::Apply { .. });
    if needs_backends && std::env::var("NETFENCE_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = netfence_runtime::check_prereqs(
            &settings.fabric.juju,
            &settings.loadbalancer.kubectl,
        );
        if !missing.is_empty() {
            eprintln!("error: {}", netfence_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let store = FileAnswerStore::new(StoreLayout::new(&store_path));
    let engine = Engine::new(Arc::new(store), settings);

    let result = match cli.command {
        Commands::Import { file } => commands::import::run(&engine, file.as_deref(), json_output),
        Commands::Ranges {
            public,
            internal,
            shared,
            clear,
        } => commands::ranges::run(
            &engine,
            commands::ranges::RangeArgs {
                public,
                internal,
                shared,
                clear,
            },
            json_output,
        ),
        Commands::Show => commands::show::run(&engine, json_output),
        Commands::Plan { step } => commands::plan::run(&engine, step_selection(step), json_output),
        Commands::Apply { step, import } => {
            commands::apply::run(&engine, step_selection(step), import, json_output)
        }
        Commands::Doctor => commands::doctor::run(&engine, &store_path, json_output),
        Commands::Completions { .. } | Commands::ManPages { .. } => Ok(commands::EXIT_SUCCESS),
    };

    finish(result)
}

fn finish(result: Result<u8, String>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("configuration error:")
                || msg.starts_with("failed to read settings")
                || msg.starts_with("failed to parse settings")
            {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("store error:") || msg.starts_with("store lock:") {
                EXIT_STORE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn load_settings(
    explicit: Option<&Path>,
    store_path: &Path,
    model: Option<&str>,
) -> Result<Settings, String> {
    let implicit = store_path.join("netfence.toml");
    let mut settings = match explicit {
        Some(path) => parse_settings_file(path)
            .map_err(|e| format!("configuration error: {}: {e}", path.display()))?,
        None if implicit.is_file() => parse_settings_file(&implicit)
            .map_err(|e| format!("configuration error: {}: {e}", implicit.display()))?,
        None => Settings::default(),
    };
    if let Some(model) = model {
        if model.trim().is_empty() {
            return Err("configuration error: --model must not be empty".to_owned());
        }
        model.clone_into(&mut settings.fabric.model);
    }
    debug!("using model {}", settings.fabric.model);
    Ok(settings)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
