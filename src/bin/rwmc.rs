use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use rwm::config::Config;
use rwm::services::send_command;

#[derive(Parser, Debug)]
#[command(name = "rwmc")]
#[command(about = "Send a command to a running rwm")]
struct Args {
    /// Path to the configuration file (used to find the socket)
    #[arg(short, long, default_value = "rwm.toml")]
    config: String,

    /// Control socket path (overrides the configuration file)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Command to send, e.g. `quit`
    #[arg(required = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args).await {
        Ok(reply) => {
            println!("{}", reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("rwmc: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<String> {
    let socket = match &args.socket {
        Some(socket) => socket.clone(),
        None => Config::load(&args.config)?.control.socket_path,
    };

    let command = args.command.join(" ");
    send_command(&socket, &command)
        .await
        .with_context(|| format!("Could not talk to rwm at {:?}", socket))
}
