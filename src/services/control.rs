//! Local control channel.
//!
//! One request and one reply per connection: the client writes a command
//! word of at most [`BUFFER_SIZE`] bytes, the server answers and closes.

use crate::config::ControlConfig;
use crate::debug_if_enabled;
use crate::error::{RwmError, Result};
use crate::utils::permissions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Largest request or reply, shared by server and client
pub const BUFFER_SIZE: usize = 1024;
pub const QUIT_COMMAND: &str = "quit";
pub const QUIT_REPLY: &str = "quiting";
pub const ACK_REPLY: &str = "ok";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Quit,
    Other(String),
}

impl ControlCommand {
    /// Interpret one request. Trailing NULs (C clients) and one line
    /// terminator (shell tools) are not part of the command.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut end = bytes.len();
        while end > 0 && bytes[end - 1] == 0 {
            end -= 1;
        }
        let mut bytes = &bytes[..end];
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest.strip_suffix(b"\r").unwrap_or(rest);
        }

        let text = String::from_utf8_lossy(bytes);
        if text == QUIT_COMMAND {
            ControlCommand::Quit
        } else {
            ControlCommand::Other(text.into_owned())
        }
    }

    pub fn reply(&self) -> &'static str {
        match self {
            ControlCommand::Quit => QUIT_REPLY,
            ControlCommand::Other(_) => ACK_REPLY,
        }
    }
}

/// Whether the run loop should keep going. Starts true; only a shutdown
/// command clears it.
#[derive(Debug)]
pub struct RunState {
    running: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self { running: true }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }
}

pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
    read_timeout: Duration,
    bound: bool,
}

impl ControlServer {
    /// Replace any stale endpoint and listen on `config.socket_path`.
    /// Must be called from within the tokio runtime.
    pub fn bind(config: &ControlConfig) -> Result<Self> {
        let path = config.socket_path.clone();
        permissions::check_socket_path(&path)?;
        permissions::remove_stale_endpoint(&path)?;

        let listener = UnixListener::bind(&path).map_err(|e| RwmError::bind(&path, e))?;
        permissions::apply_socket_mode(&path, config.socket_mode)?;

        info!("Control channel listening on {:?}", path);

        Ok(Self {
            listener,
            path,
            read_timeout: config.read_timeout(),
            bound: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn accept(&self) -> std::io::Result<UnixStream> {
        let (stream, _) = self.listener.accept().await?;
        Ok(stream)
    }

    /// Serve one connection to completion: read, act, reply, close.
    /// Per-connection failures are logged and absorbed.
    pub async fn serve(&self, mut stream: UnixStream, run_state: &mut RunState) -> Option<ControlCommand> {
        let mut buffer = [0u8; BUFFER_SIZE];

        let read = match timeout(self.read_timeout, stream.read(&mut buffer)).await {
            Ok(Ok(read)) => read,
            Ok(Err(e)) => {
                warn!("Could not read from control client: {}", e);
                return None;
            }
            Err(_) => {
                warn!("Control client sent nothing within {:?}", self.read_timeout);
                return None;
            }
        };

        if read == 0 {
            debug!("Control client closed without a command");
            return None;
        }

        debug_if_enabled!("Received {:?}", String::from_utf8_lossy(&buffer[..read]));
        let command = ControlCommand::parse(&buffer[..read]);
        info!("Control command: {:?}", command);

        let reply = command.reply();
        match stream.write(reply.as_bytes()).await {
            Ok(written) if written == reply.len() => {}
            Ok(written) => warn!("Partial reply sent ({} of {} bytes)", written, reply.len()),
            Err(e) => warn!("Could not reply to control client: {}", e),
        }

        if command == ControlCommand::Quit {
            run_state.stop();
        }

        Some(command)
    }

    /// Remove the endpoint from the filesystem. Idempotent.
    pub fn remove_endpoint(&mut self) {
        if !self.bound {
            return;
        }
        self.bound = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed control endpoint {:?}", self.path),
            Err(e) => warn!("Could not remove control endpoint {:?}: {}", self.path, e),
        }
    }
}

/// Client side of the exchange: send `command`, return the reply text.
/// Commands longer than [`BUFFER_SIZE`] are refused before connecting.
pub async fn send_command(path: &Path, command: &str) -> std::io::Result<String> {
    if command.len() > BUFFER_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "command is {} bytes, the limit is {}",
                command.len(),
                BUFFER_SIZE
            ),
        ));
    }

    let mut stream = UnixStream::connect(path).await?;
    stream.write_all(command.as_bytes()).await?;

    let mut reply = Vec::with_capacity(BUFFER_SIZE);
    (&mut stream)
        .take(BUFFER_SIZE as u64)
        .read_to_end(&mut reply)
        .await?;

    Ok(String::from_utf8_lossy(&reply).into_owned())
}
