//! TCP listener provider. Multiple log senders may connect at once; each
//! connection carries newline-delimited frames re-assembled per
//! connection, so interleaved senders never corrupt each other's frames.

use super::purge::PurgeLoop;
use super::settings::{NetworkSettings, ProviderSettings, Transport};
use super::{ProviderError, ProviderState, ProviderStatus};
use crate::buffer::PendingQueue;
use crate::decoder::Decoder;
use crate::frame::LineAssembler;
use crate::sink::LogSink;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const READ_BUFFER_SIZE: usize = 8 * 1024;
const LISTEN_BACKLOG: u32 = 1024;
const REBIND_DELAY: Duration = Duration::from_millis(1000);

pub struct TcpProvider {
    settings: NetworkSettings,
    decoder: Decoder,
    sink: Arc<dyn LogSink>,
    state: ProviderState,
    token: CancellationToken,
    receive_task: Option<JoinHandle<()>>,
    purge_task: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<String>>>,
    local_addr: Option<SocketAddr>,
}

impl TcpProvider {
    pub fn new(
        settings: ProviderSettings,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, ProviderError> {
        let ProviderSettings::Network(settings) = settings else {
            return Err(ProviderError::SettingsMismatch(
                "TCP provider requires network settings".to_string(),
            ));
        };
        if settings.transport != Transport::Tcp {
            return Err(ProviderError::SettingsMismatch(format!(
                "TCP provider handed {} transport settings",
                settings.transport.name()
            )));
        }
        settings.validate()?;
        let decoder = settings.format.decoder();
        Ok(Self {
            settings,
            decoder,
            sink,
            state: ProviderState::Idle,
            token: CancellationToken::new(),
            receive_task: None,
            purge_task: None,
            last_error: Arc::new(Mutex::new(None)),
            local_addr: None,
        })
    }

    pub async fn start(&mut self) -> Result<(), ProviderError> {
        if self.state == ProviderState::Running {
            tracing::warn!("Provider {} is already running, ignoring start", self.name());
            return Ok(());
        }

        let listener = bind_listener(&self.settings)
            .await
            .map_err(|e| ProviderError::Bind {
                addr: self.settings.bind_addr(),
                source: e,
            })?;
        self.local_addr = listener.local_addr().ok();
        tracing::info!(
            "TCP provider listening on {} ({})",
            self.describe_addr(),
            self.decoder.name()
        );

        let queue = Arc::new(PendingQueue::new());
        let token = CancellationToken::new();
        *self.last_error.lock() = None;

        self.receive_task = Some(tokio::spawn(accept_loop(
            listener,
            self.settings.clone(),
            queue.clone(),
            token.clone(),
            self.last_error.clone(),
        )));
        self.purge_task = Some(tokio::spawn(
            PurgeLoop::new(
                queue,
                self.decoder.clone(),
                self.sink.clone(),
                self.settings.purge_interval,
                token.clone(),
                self.name(),
            )
            .run(),
        ));
        self.token = token;
        self.state = ProviderState::Running;
        Ok(())
    }

    /// Cancels the accept loop, every open connection, and the purge loop.
    /// Returns without waiting; the listener closes as its task exits.
    pub fn close(&mut self) {
        if self.state == ProviderState::Running {
            tracing::info!("Closing provider {}", self.name());
        }
        self.token.cancel();
        self.state = ProviderState::Closed;
    }

    /// There is no suspend state; pausing closes the provider. A later
    /// `start` builds fresh loops and a fresh listener.
    pub fn pause(&mut self) {
        self.close();
    }

    pub fn is_active(&self) -> bool {
        self.receive_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus {
            state: self.state,
            is_active: self.is_active(),
            last_error: self.last_error.lock().clone(),
        }
    }

    pub fn name(&self) -> String {
        match self.local_addr {
            Some(addr) => format!("tcp:{}", addr.port()),
            None => format!("tcp:{}", self.settings.port),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn describe_addr(&self) -> String {
        match self.local_addr {
            Some(addr) => addr.to_string(),
            None => self.settings.bind_addr(),
        }
    }
}

impl std::fmt::Debug for TcpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpProvider")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl Drop for TcpProvider {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Binds with address reuse so a restart does not trip over sockets from
/// the previous run still in TIME_WAIT.
async fn bind_listener(settings: &NetworkSettings) -> std::io::Result<TcpListener> {
    let mut addrs =
        tokio::net::lookup_host((settings.host.as_str(), settings.port)).await?;
    let addr = addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no addresses",
        )
    })?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

async fn accept_loop(
    listener: TcpListener,
    settings: NetworkSettings,
    queue: Arc<PendingQueue>,
    token: CancellationToken,
    last_error: Arc<Mutex<Option<String>>>,
) {
    let mut current = Some(listener);
    'outer: while !token.is_cancelled() {
        let listener = match current.take() {
            Some(listener) => listener,
            None => match rebind(&settings, &token, &last_error).await {
                Some(listener) => listener,
                None => break,
            },
        };
        loop {
            tokio::select! {
                () = token.cancelled() => break 'outer,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!("Log sender connected from {peer}");
                        tokio::spawn(connection_loop(
                            stream,
                            peer,
                            queue.clone(),
                            token.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "TCP accept failed on {}: {e}, re-establishing listener",
                            settings.bind_addr()
                        );
                        *last_error.lock() = Some(e.to_string());
                        continue 'outer;
                    }
                }
            }
        }
    }
    tracing::debug!("TCP accept loop on {} stopped", settings.bind_addr());
}

async fn rebind(
    settings: &NetworkSettings,
    token: &CancellationToken,
    last_error: &Mutex<Option<String>>,
) -> Option<TcpListener> {
    loop {
        if token.is_cancelled() {
            return None;
        }
        match bind_listener(settings).await {
            Ok(listener) => {
                tracing::info!("TCP listener on {} re-established", settings.bind_addr());
                return Some(listener);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to re-bind TCP listener on {}: {e}",
                    settings.bind_addr()
                );
                *last_error.lock() = Some(e.to_string());
                tokio::select! {
                    () = token.cancelled() => return None,
                    () = tokio::time::sleep(REBIND_DELAY) => {}
                }
            }
        }
    }
}

/// One task per connection. A failed or closed connection ends its own
/// task only; the listener keeps accepting.
async fn connection_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    queue: Arc<PendingQueue>,
    token: CancellationToken,
) {
    let mut assembler = LineAssembler::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        tokio::select! {
            () = token.cancelled() => return,
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    // Deliver an unterminated final line before closing.
                    if let Some(rest) = assembler.take_remainder() {
                        if !rest.trim().is_empty() {
                            queue.enqueue(rest);
                        }
                    }
                    tracing::debug!("Log sender {peer} disconnected");
                    return;
                }
                Ok(n) => {
                    for line in assembler.push(&buf[..n]) {
                        if !line.trim().is_empty() {
                            queue.enqueue(line);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("Connection from {peer} failed: {e}");
                    return;
                }
            }
        }
    }
}
