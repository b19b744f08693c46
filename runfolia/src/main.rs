//! `run-folia`: download a Folia server build and run it with your plugin staged.
//!
//! Settings come from `run-folia.toml` in the current directory (all keys
//! optional) with command-line flags taking precedence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use runfolia::core::types::RunConfiguration;
use runfolia::exit_codes;
use runfolia::io::config::{CONFIG_FILE_NAME, Overrides, load_config, write_default_config};
use runfolia::io::index::PaperApi;
use runfolia::io::paths::relative_to;
use runfolia::io::process::ConsoleLauncher;
use runfolia::io::stage::SystemLinker;
use runfolia::logging;
use runfolia::run::{Pipeline, clean_cache, plan_offline, prepare, run};

#[derive(Parser)]
#[command(
    name = "run-folia",
    version,
    about = "Download Folia and run it with your plugin staged"
)]
struct Cli {
    /// Config file to read instead of `./run-folia.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve, download, stage plugins and run the server.
    Run(RunArgs),
    /// Resolve, download and stage plugins without starting the server.
    Prepare(RunArgs),
    /// Print the launch command for the cached server jar (no network).
    Plan(RunArgs),
    /// Remove the cached server jar.
    Clean {
        #[command(flatten)]
        target: TargetArgs,
        /// Remove cached jars of every version.
        #[arg(long)]
        all: bool,
    },
    /// Write a default `run-folia.toml`.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// Server release version, e.g. 1.21.6.
    #[arg(long)]
    mc_version: Option<String>,
    /// Managed run directory.
    #[arg(long)]
    run_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Plugin jar to stage (default: discovered in `plugin_libs_dir`).
    #[arg(long)]
    plugin: Option<PathBuf>,
    /// Download the server jar even if it is cached.
    #[arg(long)]
    force: bool,
    /// Copy plugins instead of linking them.
    #[arg(long)]
    copy: bool,
    /// Server arguments, replacing the configured ones.
    #[arg(last = true)]
    server_args: Vec<String>,
}

impl RunArgs {
    fn overrides(&self, cwd: &Path) -> Overrides {
        Overrides {
            plugin_jar: self.plugin.as_ref().map(|path| cwd.join(path)),
            force_refetch: self.force,
            copy_only: self.copy,
            server_args: self.server_args.clone(),
            ..self.target.overrides(cwd)
        }
    }
}

impl TargetArgs {
    fn overrides(&self, cwd: &Path) -> Overrides {
        Overrides {
            version: self.mc_version.clone(),
            run_dir: self.run_dir.as_ref().map(|path| cwd.join(path)),
            ..Overrides::default()
        }
    }
}

fn main() {
    logging::init();
    match run_cli() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run_cli() -> Result<i32> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("read current directory")?;
    let config_path = match &cli.config {
        Some(path) => cwd.join(path),
        None => cwd.join(CONFIG_FILE_NAME),
    };

    let explicit = cli.config.is_some();
    let load = |overrides: Overrides| load_run_configuration(&config_path, explicit, &overrides);

    match cli.command {
        Command::Run(args) => cmd_run(&load(args.overrides(&cwd))?),
        Command::Prepare(args) => cmd_prepare(&load(args.overrides(&cwd))?),
        Command::Plan(args) => cmd_plan(&load(args.overrides(&cwd))?),
        Command::Clean { target, all } => cmd_clean(&load(target.overrides(&cwd))?, all),
        Command::InitConfig { force } => cmd_init_config(&config_path, force),
    }
}

fn load_run_configuration(
    config_path: &Path,
    explicit: bool,
    overrides: &Overrides,
) -> Result<RunConfiguration> {
    if explicit && !config_path.exists() {
        bail!("config file {} not found", config_path.display());
    }
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .context("config path has no parent directory")?;
    let file = load_config(config_path)?;
    let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from);
    file.apply(overrides)
        .resolve(&base_dir, java_home.as_deref())
        .context("resolve configuration")
}

fn cmd_run(config: &RunConfiguration) -> Result<i32> {
    let index = PaperApi::new(&config.api_base_url)?;
    let linker = SystemLinker::probe();
    let pipeline = Pipeline {
        index: &index,
        linker: &linker,
        launcher: &ConsoleLauncher,
    };
    let outcome = run(config, &pipeline)?;
    Ok(outcome.exit_code)
}

fn cmd_prepare(config: &RunConfiguration) -> Result<i32> {
    let index = PaperApi::new(&config.api_base_url)?;
    let linker = SystemLinker::probe();
    let pipeline = Pipeline {
        index: &index,
        linker: &linker,
        launcher: &ConsoleLauncher,
    };
    let prepared = prepare(config, &pipeline)?;
    println!(
        "server: {} (build {})",
        prepared.cached.path.display(),
        prepared.build.build_number
    );
    for staged in &prepared.staging.staged {
        println!(
            "staged: {} ({})",
            relative_to(&staged.destination, &config.run_directory).display(),
            staged.method
        );
    }
    for warning in &prepared.staging.warnings {
        eprintln!("warning: {warning}");
    }
    println!("command: {}", prepared.plan.command_line());
    Ok(exit_codes::OK)
}

fn cmd_plan(config: &RunConfiguration) -> Result<i32> {
    let plan = plan_offline(config);
    println!("workdir: {}", plan.working_directory.display());
    println!("command: {}", plan.command_line());
    Ok(exit_codes::OK)
}

fn cmd_clean(config: &RunConfiguration, all: bool) -> Result<i32> {
    let removed = clean_cache(config, all)?;
    if removed.is_empty() {
        println!("nothing to remove");
    }
    for path in removed {
        println!("removed: {}", path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if write_default_config(path, force)? {
        println!("wrote {}", path.display());
    } else {
        println!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(exit_codes::OK)
}
