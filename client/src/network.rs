//! Session loop: handshake, record stream and command replies
//!
//! One [`Session`] owns the transport for its whole life. It runs strictly
//! receive, apply, send: no read is outstanding while a batch is applied, and
//! the command reply for a batch is written before the next read is issued.
//! The shell learns about progress only through [`SessionEvent`]s.

use crate::commands::CommandState;
use crate::config::ClientConfig;
use crate::connection::{ConnectionState, Handshake, SessionInfo};
use crate::error::{HandshakeError, SessionError};
use crate::framing::LineBuffer;
use crate::world::World;
use log::{debug, error, info, warn};
use shared::Record;
use std::io;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::time::timeout;

/// State shared between the network thread and the shell.
#[derive(Debug, Default)]
pub struct SessionContext {
    world: World,
    commands: CommandState,
    info: OnceLock<SessionInfo>,
    state: Mutex<ConnectionState>,
}

impl SessionContext {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            commands: CommandState::new(config.max_held_keys),
            ..Self::default()
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn commands(&self) -> &CommandState {
        &self.commands
    }

    /// Player ID and world size, once the handshake has completed.
    pub fn info(&self) -> Option<SessionInfo> {
        self.info.get().copied()
    }

    pub fn player_id(&self) -> Option<u32> {
        self.info().map(|info| info.player_id)
    }

    pub fn world_size(&self) -> Option<u32> {
        self.info().map(|info| info.world_size)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            debug!("Connection state: {} -> {}", *state, next);
            *state = next;
        }
    }

    fn set_info(&self, info: SessionInfo) {
        if self.info.set(info).is_err() {
            warn!("Session constants already assigned, ignoring {:?}", info);
        }
    }
}

/// Notifications from the network thread to the shell, in the order they
/// happened.
#[derive(Debug)]
pub enum SessionEvent {
    /// Handshake completed.
    Established(SessionInfo),
    /// A batch has been applied to the world and the command reply sent.
    FrameReady,
    /// The session ended with an error. Sent at most once, and never after
    /// [`SessionEvent::Closed`].
    Failed(SessionError),
    /// The session ended because shutdown was requested.
    Closed,
}

impl SessionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Failed(_) | SessionEvent::Closed)
    }
}

/// Shell side of a session: the event queue and the shutdown switch.
///
/// Dropping the handle also shuts the session down.
#[derive(Debug)]
pub struct SessionHandle {
    events: UnboundedReceiver<SessionEvent>,
    shutdown: watch::Sender<bool>,
}

impl SessionHandle {
    /// Next queued event without waiting.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits for the next event. Returns `None` once the session is gone and
    /// every event has been taken.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Unblocks any pending read or write and ends the session. Safe to call
    /// more than once.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}

pub struct Session {
    ctx: Arc<SessionContext>,
    config: ClientConfig,
    events: UnboundedSender<SessionEvent>,
    shutdown: watch::Receiver<bool>,
}

impl Session {
    pub fn new(ctx: Arc<SessionContext>, config: ClientConfig) -> (Session, SessionHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Session {
            ctx,
            config,
            events: event_tx,
            shutdown: shutdown_rx,
        };
        let handle = SessionHandle {
            events: event_rx,
            shutdown: shutdown_tx,
        };
        (session, handle)
    }

    /// Opens a TCP connection to `addr` and runs the session over it.
    pub async fn connect(mut self, addr: &str, name: &str) {
        self.ctx.set_state(ConnectionState::Connecting);
        info!("Connecting to {}", addr);

        let attempt = timeout(self.config.connect_timeout, TcpStream::connect(addr));
        let connected = tokio::select! {
            biased;
            _ = self.shutdown.wait_for(|stop| *stop) => Err(SessionError::Cancelled),
            result = attempt => match result {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(source)) => Err(SessionError::Connect {
                    addr: addr.to_string(),
                    source,
                }),
                Err(_) => Err(SessionError::Connect {
                    addr: addr.to_string(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                }),
            },
        };

        match connected {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to disable Nagle's algorithm: {}", e);
                }
                info!("Connected to {}", addr);
                self.run(stream, name).await;
            }
            Err(err) => self.finish(Err(err)),
        }
    }

    /// Runs the session over an already open stream until it fails or is
    /// shut down. Emits exactly one terminal event.
    ///
    /// The write half is shut down first so the peer sees a clean end of
    /// stream, then the stream is dropped, which closes the read half too.
    /// Both happen before the terminal event is sent.
    pub async fn run<S>(mut self, mut stream: S, name: &str)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.drive(&mut stream, name).await;
        if let Err(e) = stream.shutdown().await {
            debug!("Transport shutdown: {}", e);
        }
        drop(stream);
        self.finish(result);
    }

    fn finish(&self, result: Result<(), SessionError>) {
        self.ctx.set_state(ConnectionState::Terminated);
        let event = match result {
            Ok(()) | Err(SessionError::Cancelled) => {
                info!("Session closed");
                SessionEvent::Closed
            }
            Err(err) => {
                error!("Session failed: {}", err);
                SessionEvent::Failed(err)
            }
        };
        // the shell may already be gone
        let _ = self.events.send(event);
    }

    async fn drive<S>(&mut self, stream: &mut S, name: &str) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let greeting = format!("{}\n", sanitize_name(name));
        self.send(stream, greeting.as_bytes()).await?;
        self.ctx.set_state(ConnectionState::AwaitingPlayerId);

        let chunk_size = self.config.read_chunk_size.max(1);
        let mut chunk = vec![0u8; chunk_size];
        let mut buffer = LineBuffer::with_capacity(chunk_size);
        let mut handshake = Handshake::new();

        let info = loop {
            if let Some(info) = handshake.advance(&mut buffer)? {
                break info;
            }
            self.ctx.set_state(handshake.state());

            let n = self.receive(stream, &mut chunk).await?;
            if n == 0 {
                return Err(HandshakeError::UnexpectedEof.into());
            }
            buffer.extend(&chunk[..n]);
        };

        info!(
            "Joined as player {} in a {}x{} world",
            info.player_id, info.world_size, info.world_size
        );
        self.ctx.set_info(info);
        self.ctx.set_state(ConnectionState::Streaming);
        let _ = self.events.send(SessionEvent::Established(info));

        // records that arrived together with the handshake
        if buffer.has_complete_line() {
            self.process_batch(stream, &mut buffer).await?;
        }

        loop {
            if buffer.pending_len() > self.config.max_pending_bytes {
                return Err(SessionError::RecordTooLarge(self.config.max_pending_bytes));
            }

            let n = self.receive(stream, &mut chunk).await?;
            if n == 0 {
                return Err(SessionError::ConnectionClosed);
            }
            buffer.extend(&chunk[..n]);
            self.process_batch(stream, &mut buffer).await?;
        }
    }

    /// Applies every complete record in the buffer, then replies with the
    /// current commands and signals the shell.
    async fn process_batch<S>(
        &mut self,
        stream: &mut S,
        buffer: &mut LineBuffer,
    ) -> Result<(), SessionError>
    where
        S: AsyncWrite + Unpin,
    {
        let world = self.ctx.world();
        let mut dropped = 0usize;
        let dispatched = buffer.drain_lines(|line| match Record::decode(line) {
            Ok(record) => {
                world.apply(record);
            }
            Err(e) => {
                dropped += 1;
                warn!("Dropping record of {} bytes: {}", line.len(), e);
            }
        });
        debug!(
            "Batch applied: {} records, {} dropped",
            dispatched - dropped,
            dropped
        );

        let line = self.ctx.commands().take_outbound().to_line()?;
        self.send(stream, line.as_bytes()).await?;
        let _ = self.events.send(SessionEvent::FrameReady);
        Ok(())
    }

    async fn receive<S>(&mut self, stream: &mut S, chunk: &mut [u8]) -> Result<usize, SessionError>
    where
        S: AsyncRead + Unpin,
    {
        tokio::select! {
            biased;
            _ = self.shutdown.wait_for(|stop| *stop) => Err(SessionError::Cancelled),
            read = stream.read(chunk) => Ok(read?),
        }
    }

    async fn send<S>(&mut self, stream: &mut S, bytes: &[u8]) -> Result<(), SessionError>
    where
        S: AsyncWrite + Unpin,
    {
        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        tokio::select! {
            biased;
            _ = self.shutdown.wait_for(|stop| *stop) => Err(SessionError::Cancelled),
            written = write => Ok(written?),
        }
    }
}

/// Names travel as a single line; embedded line breaks would be read by the
/// server as a second handshake token.
fn sanitize_name(name: &str) -> String {
    name.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Firing, Moving, Tank};
    use tokio::io::{duplex, AsyncBufReadExt, BufReader, DuplexStream};

    fn start(config: ClientConfig) -> (Arc<SessionContext>, Session, SessionHandle) {
        let ctx = Arc::new(SessionContext::new(&config));
        let (session, handle) = Session::new(Arc::clone(&ctx), config);
        (ctx, session, handle)
    }

    async fn read_line(reader: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Alice"), "Alice");
        assert_eq!(sanitize_name("Al\r\nice\n"), "Alice");
    }

    #[tokio::test]
    async fn test_handshake_and_first_batch() {
        let (ctx, session, mut handle) = start(ClientConfig::default());
        let (client_end, server_end) = duplex(1024);
        let task = tokio::spawn(async move { session.run(client_end, "Alice").await });

        let mut server = BufReader::new(server_end);
        assert_eq!(read_line(&mut server).await, "Alice\n");

        server
            .get_mut()
            .write_all(b"3\n100\n{\"tank\":3,\"hp\":3,\"name\":\"Alice\"}\n")
            .await
            .unwrap();

        match handle.next_event().await {
            Some(SessionEvent::Established(info)) => {
                assert_eq!(info.player_id, 3);
                assert_eq!(info.world_size, 100);
            }
            other => panic!("expected Established, got {:?}", other),
        }
        assert!(matches!(handle.next_event().await, Some(SessionEvent::FrameReady)));
        assert_eq!(
            read_line(&mut server).await,
            "{\"moving\":\"none\",\"fire\":\"none\",\"tdir\":{\"x\":0.0,\"y\":-1.0}}\n"
        );

        let tank: Tank = ctx.world().get(3).unwrap();
        assert_eq!(tank.name, "Alice");
        assert_eq!(ctx.state(), ConnectionState::Streaming);
        assert_eq!(ctx.player_id(), Some(3));

        handle.shutdown();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Closed)));
        task.await.unwrap();
        assert_eq!(ctx.state(), ConnectionState::Terminated);
    }

    #[tokio::test]
    async fn test_transport_closed_before_closed_event() {
        let (_ctx, session, mut handle) = start(ClientConfig::default());
        let (client_end, server_end) = duplex(1024);
        tokio::spawn(async move { session.run(client_end, "Hana").await });

        let mut server = BufReader::new(server_end);
        read_line(&mut server).await;
        server.get_mut().write_all(b"1\n10\n").await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Established(_))
        ));

        handle.shutdown();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::Closed)));

        // nothing reads from the client end any more
        assert!(server.get_mut().write_all(b"{\"proj\":1}\n").await.is_err());
        assert_eq!(read_line(&mut server).await, "");
    }

    #[tokio::test]
    async fn test_reply_carries_current_commands() {
        let (ctx, session, mut handle) = start(ClientConfig::default());
        let (client_end, server_end) = duplex(1024);
        tokio::spawn(async move { session.run(client_end, "Bob").await });

        let mut server = BufReader::new(server_end);
        read_line(&mut server).await;
        server.get_mut().write_all(b"1\n50\n").await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Established(_))
        ));

        ctx.commands().set_moving(Moving::Left);
        ctx.commands().set_firing(Firing::Alt);
        server.get_mut().write_all(b"{\"proj\":1}\n").await.unwrap();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::FrameReady)));
        let reply = read_line(&mut server).await;
        assert!(reply.contains("\"moving\":\"left\""));
        assert!(reply.contains("\"fire\":\"alt\""));

        // a read with nothing but a fragment still gets a reply
        server.get_mut().write_all(b"{\"pr").await.unwrap();
        assert!(matches!(handle.next_event().await, Some(SessionEvent::FrameReady)));
        let reply = read_line(&mut server).await;
        assert!(reply.contains("\"fire\":\"none\""));

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let (ctx, session, mut handle) = start(ClientConfig::default());
        let (client_end, server_end) = duplex(1024);
        tokio::spawn(async move { session.run(client_end, "Carol").await });

        let mut server = BufReader::new(server_end);
        read_line(&mut server).await;
        server
            .get_mut()
            .write_all(b"2\n100\nnot json\n{\"unknown\":1}\n{\"power\":4}\n")
            .await
            .unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Established(_))
        ));
        assert!(matches!(handle.next_event().await, Some(SessionEvent::FrameReady)));
        assert_eq!(ctx.world().powerups().len(), 1);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_bad_handshake_with_mock_stream() {
        let (ctx, session, mut handle) = start(ClientConfig::default());
        let stream = tokio_test::io::Builder::new()
            .write(b"Alice\n")
            .read(b"abc\n")
            .build();

        session.run(stream, "Alice").await;

        match handle.next_event().await {
            Some(SessionEvent::Failed(SessionError::Handshake(HandshakeError::InvalidPlayerId(
                token,
            )))) => assert_eq!(token, "abc"),
            other => panic!("expected handshake failure, got {:?}", other),
        }
        assert!(handle.next_event().await.is_none());
        assert_eq!(ctx.state(), ConnectionState::Terminated);
        assert_eq!(ctx.info(), None);
    }

    #[tokio::test]
    async fn test_eof_during_handshake() {
        let (_ctx, session, mut handle) = start(ClientConfig::default());
        let stream = tokio_test::io::Builder::new()
            .write(b"Dave\n")
            .read(b"5\n")
            .build();

        session.run(stream, "Dave").await;

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Failed(SessionError::Handshake(
                HandshakeError::UnexpectedEof
            )))
        ));
    }

    #[tokio::test]
    async fn test_server_close_is_reported() {
        let (_ctx, session, mut handle) = start(ClientConfig::default());
        let (client_end, server_end) = duplex(1024);
        let task = tokio::spawn(async move { session.run(client_end, "Eve").await });

        let mut server = BufReader::new(server_end);
        read_line(&mut server).await;
        server.get_mut().write_all(b"9\n10\n").await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Established(_))
        ));
        drop(server);

        let event = handle.next_event().await.unwrap();
        assert!(event.is_terminal());
        assert!(matches!(event, SessionEvent::Failed(_)));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_fragment_ends_session() {
        let config = ClientConfig {
            max_pending_bytes: 16,
            ..ClientConfig::default()
        };
        let (_ctx, session, mut handle) = start(config);
        let (client_end, server_end) = duplex(1024);
        tokio::spawn(async move { session.run(client_end, "Frank").await });

        let mut server = BufReader::new(server_end);
        read_line(&mut server).await;
        server
            .get_mut()
            .write_all(b"1\n10\n{\"tank\":1,\"name\":\"aaaaaaaaaaaaaaaaaa")
            .await
            .unwrap();

        let mut terminal = None;
        while let Some(event) = handle.next_event().await {
            if event.is_terminal() {
                terminal = Some(event);
                break;
            }
        }
        assert!(matches!(
            terminal,
            Some(SessionEvent::Failed(SessionError::RecordTooLarge(16)))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_before_connect() {
        let (ctx, session, mut handle) = start(ClientConfig::default());
        handle.shutdown();
        assert!(handle.is_shutdown());

        session.connect("127.0.0.1:9", "Gina").await;

        assert!(matches!(handle.next_event().await, Some(SessionEvent::Closed)));
        assert_eq!(ctx.state(), ConnectionState::Terminated);
    }
}
