//! Local Player - mpv playback driven over JSON IPC
//!
//! Each visible feed item gets its own paused mpv process pointed at a local
//! file. The feed then plays, pauses, rewinds and polls it through the
//! `--input-ipc-server` socket.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::process::{Child, Command};
use tracing::{debug, warn};
use uuid::Uuid;

/// How long to wait for mpv to open its IPC socket
const IPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const IPC_CONNECT_RETRY: Duration = Duration::from_millis(50);

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("Media file not found: {0}")]
    MediaNotFound(String),
    #[error("Player IPC failed: {0}")]
    Ipc(String),
    #[error("Player exited")]
    Exited,
}

/// A single open media player
///
/// Positions and durations are seconds; `None` means the player does not
/// know yet (or the media has no finite duration).
#[async_trait]
pub trait MediaPlayer: Send {
    async fn play(&mut self) -> Result<(), PlayerError>;
    async fn pause(&mut self) -> Result<(), PlayerError>;
    async fn seek_to_start(&mut self) -> Result<(), PlayerError>;
    async fn position(&mut self) -> Result<Option<f64>, PlayerError>;
    async fn duration(&mut self) -> Result<Option<f64>, PlayerError>;
    /// Enlarge the forward buffer (preload)
    async fn set_readahead(&mut self, secs: u32) -> Result<(), PlayerError>;
    async fn close(&mut self) -> Result<(), PlayerError>;
}

/// Opens players for local files
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaPlayer>, PlayerError>;
}

// =============================================================================
// mpv backend
// =============================================================================

/// Spawns one mpv process per opened file
#[derive(Debug, Clone)]
pub struct MpvBackend {
    command: String,
    extra_args: Vec<String>,
}

impl MpvBackend {
    /// Use `mpv` from PATH
    pub fn new() -> Self {
        Self::with_command("mpv")
    }

    /// Use a custom mpv binary
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            extra_args: Vec::new(),
        }
    }

    /// Append extra command line arguments for every spawned mpv
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check if the player is available on the system
    pub async fn is_available(&self) -> bool {
        if Path::new(&self.command).is_absolute() {
            return Path::new(&self.command).exists();
        }

        Command::new("which")
            .arg(&self.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Arguments for a paused, IPC-controlled mpv on `media`
    pub fn args_for(&self, media: &Path, socket: &str) -> Vec<String> {
        let mut args = vec![
            "--pause".to_string(),
            "--keep-open=yes".to_string(),
            "--no-terminal".to_string(),
            format!("--input-ipc-server={}", socket),
        ];
        args.extend(self.extra_args.iter().cloned());
        // A cached name such as `-x.mp4` must not parse as an option
        args.push("--".to_string());
        args.push(media.display().to_string());
        args
    }
}

impl Default for MpvBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerBackend for MpvBackend {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaPlayer>, PlayerError> {
        if !path.exists() {
            return Err(PlayerError::MediaNotFound(path.display().to_string()));
        }

        let socket = ipc_socket_path();
        let mut cmd = Command::new(&self.command);
        cmd.args(self.args_for(path, &socket))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.command.clone())
            } else {
                PlayerError::StartFailed(e)
            }
        })?;
        debug!(media = %path.display(), socket, "spawned mpv");

        let player = MpvPlayer::connect(child, socket).await?;
        Ok(Box::new(player))
    }
}

#[cfg(unix)]
fn ipc_socket_path() -> String {
    std::env::temp_dir()
        .join(format!("tkp-mpv-{}.sock", Uuid::new_v4()))
        .display()
        .to_string()
}

#[cfg(windows)]
fn ipc_socket_path() -> String {
    format!(r"\\.\pipe\tkp-mpv-{}", Uuid::new_v4())
}

trait IpcIo: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IpcIo for T {}

#[cfg(unix)]
async fn connect_ipc(path: &str) -> std::io::Result<Box<dyn IpcIo>> {
    let stream = tokio::net::UnixStream::connect(path).await?;
    Ok(Box::new(stream))
}

#[cfg(windows)]
async fn connect_ipc(path: &str) -> std::io::Result<Box<dyn IpcIo>> {
    let pipe = tokio::net::windows::named_pipe::ClientOptions::new().open(path)?;
    Ok(Box::new(pipe))
}

/// Build one IPC command line
pub fn ipc_command(request_id: u64, command: &[Value]) -> String {
    let mut line = json!({ "command": command, "request_id": request_id }).to_string();
    line.push('\n');
    line
}

/// A running mpv process and its IPC connection
pub struct MpvPlayer {
    child: Child,
    socket: String,
    reader: BufReader<ReadHalf<Box<dyn IpcIo>>>,
    writer: WriteHalf<Box<dyn IpcIo>>,
    next_request: u64,
}

impl MpvPlayer {
    async fn connect(mut child: Child, socket: String) -> Result<Self, PlayerError> {
        let deadline = tokio::time::Instant::now() + IPC_CONNECT_TIMEOUT;
        let stream = loop {
            match connect_ipc(&socket).await {
                Ok(stream) => break stream,
                Err(e) => {
                    if let Ok(Some(_)) = child.try_wait() {
                        return Err(PlayerError::Exited);
                    }
                    if tokio::time::Instant::now() >= deadline {
                        let _ = child.kill().await;
                        return Err(PlayerError::Ipc(format!(
                            "socket {} never came up: {}",
                            socket, e
                        )));
                    }
                    tokio::time::sleep(IPC_CONNECT_RETRY).await;
                }
            }
        };

        let (read, writer) = tokio::io::split(stream);
        Ok(Self {
            child,
            socket,
            reader: BufReader::new(read),
            writer,
            next_request: 1,
        })
    }

    /// Send a command and wait for its reply, skipping event lines
    async fn request(&mut self, command: &[Value]) -> Result<Value, PlayerError> {
        let id = self.next_request;
        self.next_request += 1;

        let line = ipc_command(id, command);
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PlayerError::Ipc(e.to_string()))?;

        let mut buf = String::new();
        loop {
            buf.clear();
            let n = self
                .reader
                .read_line(&mut buf)
                .await
                .map_err(|e| PlayerError::Ipc(e.to_string()))?;
            if n == 0 {
                return Err(PlayerError::Exited);
            }
            let Ok(reply) = serde_json::from_str::<Value>(&buf) else {
                continue;
            };
            if reply.get("request_id").and_then(Value::as_u64) == Some(id) {
                return Ok(reply);
            }
        }
    }

    async fn command(&mut self, command: &[Value]) -> Result<(), PlayerError> {
        let reply = self.request(command).await?;
        match reply.get("error").and_then(Value::as_str) {
            Some("success") | None => Ok(()),
            Some(err) => Err(PlayerError::Ipc(err.to_string())),
        }
    }

    /// Numeric property, `None` while mpv reports it unavailable
    async fn number_property(&mut self, name: &str) -> Result<Option<f64>, PlayerError> {
        let reply = self.request(&[json!("get_property"), json!(name)]).await?;
        Ok(property_value(&reply))
    }
}

/// Extract a finite numeric `data` field from an mpv reply
pub fn property_value(reply: &Value) -> Option<f64> {
    if reply.get("error").and_then(Value::as_str) != Some("success") {
        return None;
    }
    reply
        .get("data")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

#[async_trait]
impl MediaPlayer for MpvPlayer {
    async fn play(&mut self) -> Result<(), PlayerError> {
        self.command(&[json!("set_property"), json!("pause"), json!(false)])
            .await
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        self.command(&[json!("set_property"), json!("pause"), json!(true)])
            .await
    }

    async fn seek_to_start(&mut self) -> Result<(), PlayerError> {
        self.command(&[json!("seek"), json!(0), json!("absolute")])
            .await
    }

    async fn position(&mut self) -> Result<Option<f64>, PlayerError> {
        self.number_property("time-pos").await
    }

    async fn duration(&mut self) -> Result<Option<f64>, PlayerError> {
        self.number_property("duration").await
    }

    async fn set_readahead(&mut self, secs: u32) -> Result<(), PlayerError> {
        self.command(&[
            json!("set_property"),
            json!("demuxer-readahead-secs"),
            json!(secs),
        ])
        .await
    }

    async fn close(&mut self) -> Result<(), PlayerError> {
        if let Err(e) = self.command(&[json!("quit")]).await {
            debug!(error = %e, "mpv quit command failed, killing");
        }
        if tokio::time::timeout(Duration::from_secs(1), self.child.wait())
            .await
            .is_err()
        {
            if let Err(e) = self.child.kill().await {
                warn!(error = %e, "failed to kill mpv");
            }
        }
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket).await;
        Ok(())
    }
}
