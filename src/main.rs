use anyhow::{Context, Result};
use continuum_amp::{cli::args_from_env, config::Config, logging::init_tracing, run};

#[tokio::main]
async fn main() -> Result<()> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging_guard = init_tracing(&config.logging).context("failed to initialize logging")?;

    let summary = run::run(&config, &args).await?;
    println!("{summary}");
    Ok(())
}
