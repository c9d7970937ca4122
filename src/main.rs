use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use rwm::config::Config;
use rwm::services::{create_display, LoopExit, Session};
use rwm::utils::step;

#[derive(Parser, Debug)]
#[command(name = "rwm")]
#[command(about = "Minimal master/stack tiling window manager")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "rwm.toml")]
    config: String,

    /// Use a scripted display instead of the X server
    #[arg(long)]
    dry_run: bool,

    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Starting rwm v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);

    if args.dry_run {
        warn!("Dry-run mode: no X server is contacted");
    }

    let display = step("Connection", || create_display(&config, args.dry_run))?;
    let mut session = Session::start(display, &config.control)?;

    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Could not listen for the interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let result = session.run(interrupt).await;
    session.teardown();

    match result {
        Ok(LoopExit::Shutdown) => info!("Shutdown requested over the control channel"),
        Ok(LoopExit::Interrupted) => info!("Caught interrupt signal"),
        Err(e) => {
            error!("Event loop failed: {}", e);
            return Err(e.into());
        }
    }

    info!("rwm stopped");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        "compact" => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    Ok(())
}
