//! UDP listener provider. Each datagram payload is one frame; oversized
//! payloads are truncated at the receive buffer.

use super::purge::PurgeLoop;
use super::settings::{NetworkSettings, ProviderSettings, Transport};
use super::{ProviderError, ProviderState, ProviderStatus};
use crate::buffer::PendingQueue;
use crate::decoder::Decoder;
use crate::sink::LogSink;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Largest datagram payload accepted. XML events carrying stack traces
/// stay well below this.
const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

const REBIND_DELAY: Duration = Duration::from_millis(1000);

pub struct UdpProvider {
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

impl UdpProvider {
    pub fn new(
        settings: ProviderSettings,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, ProviderError> {
        let ProviderSettings::Network(settings) = settings else {
            return Err(ProviderError::SettingsMismatch(
                "UDP provider requires network settings".to_string(),
            ));
        };
        if settings.transport != Transport::Udp {
            return Err(ProviderError::SettingsMismatch(format!(
                "UDP provider handed {} transport settings",
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

        let socket = bind_socket(&self.settings)
            .await
            .map_err(|e| ProviderError::Bind {
                addr: self.settings.bind_addr(),
                source: e,
            })?;
        self.local_addr = socket.local_addr().ok();
        tracing::info!(
            "UDP provider listening on {} ({})",
            self.describe_addr(),
            self.decoder.name()
        );

        let queue = Arc::new(PendingQueue::new());
        let token = CancellationToken::new();
        *self.last_error.lock() = None;

        self.receive_task = Some(tokio::spawn(receive_loop(
            socket,
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

    /// Cancels both loops and returns without waiting for them. The socket
    /// is dropped by the receive loop within one receive timeout.
    pub fn close(&mut self) {
        if self.state == ProviderState::Running {
            tracing::info!("Closing provider {}", self.name());
        }
        self.token.cancel();
        self.state = ProviderState::Closed;
    }

    /// There is no suspend state; pausing closes the provider. A later
    /// `start` builds fresh loops and a fresh socket.
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
            Some(addr) => format!("udp:{}", addr.port()),
            None => format!("udp:{}", self.settings.port),
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

impl std::fmt::Debug for UdpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpProvider")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl Drop for UdpProvider {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Binds the datagram socket with address reuse enabled. Close is
/// fire-and-forget, so a restart on a fixed port can overlap the old
/// socket's last receive timeout; without reuse that bind would fail
/// with "address in use".
async fn bind_socket(settings: &NetworkSettings) -> std::io::Result<UdpSocket> {
    let addr = tokio::net::lookup_host((settings.host.as_str(), settings.port))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            )
        })?;
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}

async fn receive_loop(
    socket: UdpSocket,
    settings: NetworkSettings,
    queue: Arc<PendingQueue>,
    token: CancellationToken,
    last_error: Arc<Mutex<Option<String>>>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut current = Some(socket);
    'outer: while !token.is_cancelled() {
        let socket = match current.take() {
            Some(socket) => socket,
            None => match rebind(&settings, &token, &last_error).await {
                Some(socket) => socket,
                None => break,
            },
        };
        loop {
            if token.is_cancelled() {
                break 'outer;
            }
            match tokio::time::timeout(settings.receive_timeout, socket.recv_from(&mut buf)).await
            {
                // Timeout is the cancellation checkpoint, not an error.
                Err(_) => continue,
                Ok(Ok((len, _peer))) => {
                    let text = String::from_utf8_lossy(&buf[..len]);
                    let frame = text.trim();
                    if frame.is_empty() {
                        continue;
                    }
                    queue.enqueue(frame.to_string());
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        "UDP receive error on {}: {e}, re-establishing socket",
                        settings.bind_addr()
                    );
                    *last_error.lock() = Some(e.to_string());
                    continue 'outer;
                }
            }
        }
    }
    tracing::debug!("UDP receive loop on {} stopped", settings.bind_addr());
}

async fn rebind(
    settings: &NetworkSettings,
    token: &CancellationToken,
    last_error: &Mutex<Option<String>>,
) -> Option<UdpSocket> {
    loop {
        if token.is_cancelled() {
            return None;
        }
        match bind_socket(settings).await {
            Ok(socket) => {
                tracing::info!("UDP socket on {} re-established", settings.bind_addr());
                return Some(socket);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to re-bind UDP socket on {}: {e}",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::settings::{FileTailSettings, WireFormat};
    use crate::sink::MemoryStore;

    fn test_settings() -> NetworkSettings {
        let mut settings = NetworkSettings::new(WireFormat::JsonEnvelope);
        settings.host = "127.0.0.1".to_string();
        settings.port = 0;
        settings.receive_timeout = Duration::from_millis(20);
        settings.purge_interval = Duration::from_millis(10);
        settings
    }

    #[test]
    fn test_rejects_file_tail_settings() {
        let settings =
            ProviderSettings::FileTail(FileTailSettings::new("/tmp/a.log", "(?P<description>.*)"));
        let err = UdpProvider::new(settings, Arc::new(MemoryStore::new(10))).unwrap_err();
        assert!(matches!(err, ProviderError::SettingsMismatch(_)));
    }

    #[test]
    fn test_rejects_tcp_transport_settings() {
        let mut settings = test_settings();
        settings.transport = Transport::Tcp;
        let err = UdpProvider::new(
            ProviderSettings::Network(settings),
            Arc::new(MemoryStore::new(10)),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::SettingsMismatch(_)));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported_at_start() {
        // TEST-NET address, never assigned to a local interface
        let mut settings = test_settings();
        settings.host = "192.0.2.1".to_string();

        let mut provider = UdpProvider::new(
            ProviderSettings::Network(settings),
            Arc::new(MemoryStore::new(10)),
        )
        .unwrap();
        let err = provider.start().await.unwrap_err();
        assert!(matches!(err, ProviderError::Bind { .. }));
        assert_eq!(provider.status().state, ProviderState::Idle);
        assert!(!provider.is_active());
    }

    #[tokio::test]
    async fn test_reuse_allows_immediate_restart_on_same_port() {
        let sink: Arc<dyn LogSink> = Arc::new(MemoryStore::new(10));
        let mut provider =
            UdpProvider::new(ProviderSettings::Network(test_settings()), sink).unwrap();
        provider.start().await.unwrap();
        let port = provider.local_addr().unwrap().port();

        // Close and rebind the same port without waiting for the old
        // receive loop to observe cancellation.
        provider.close();
        let mut settings = test_settings();
        settings.port = port;
        let mut successor = UdpProvider::new(
            ProviderSettings::Network(settings),
            Arc::new(MemoryStore::new(10)),
        )
        .unwrap();
        successor.start().await.unwrap();
        assert_eq!(successor.local_addr().unwrap().port(), port);
        successor.close();
    }

    #[tokio::test]
    async fn test_lifecycle_close_and_restart() {
        let sink: Arc<dyn LogSink> = Arc::new(MemoryStore::new(10));
        let mut provider =
            UdpProvider::new(ProviderSettings::Network(test_settings()), sink).unwrap();
        assert_eq!(provider.status().state, ProviderState::Idle);
        assert!(!provider.is_active());

        provider.start().await.unwrap();
        assert_eq!(provider.status().state, ProviderState::Running);
        assert!(provider.is_active());

        // A second start while running is a logged no-op.
        provider.start().await.unwrap();
        assert!(provider.is_active());

        provider.close();
        assert_eq!(provider.status().state, ProviderState::Closed);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!provider.is_active());

        // A closed provider can be started again with a fresh socket.
        provider.start().await.unwrap();
        assert_eq!(provider.status().state, ProviderState::Running);
        assert!(provider.is_active());
        provider.close();
    }
}
