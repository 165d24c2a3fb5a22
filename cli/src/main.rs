use arbor_cli::commands::{cli, plan, run};
use arbor_cli::logging::init_tracing;
use arbor_core::api::{load_default, load_from_path, AppConfig, CliError};
use clap::Parser;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();

    let mut cfg = match args.config.as_deref() {
        Some(path) => load_from_path(path),
        None => load_default(),
    }
    .map_err(|e| CliError::Config(format!("{e:#}")))?;
    args.command.apply(&mut cfg);

    init_tracing(&cfg.logging).map_err(CliError::Config)?;
    tracing::debug!(tree = %args.command.tree_args().tree.display(), "config loaded");

    dispatch(args.command, &cfg).await
}

async fn dispatch(
    cmd: cli::Commands,
    cfg: &AppConfig,
) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Plan(tree_args) => plan::plan_cmd(&tree_args, cfg),
        cli::Commands::Run(run_args) => run::run_cmd(&run_args, cfg).await,
    }
}
