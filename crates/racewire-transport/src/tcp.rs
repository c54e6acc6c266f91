//! The TCP client engine: one connection, three workers.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use racewire_protocol::{Message, OrderClientList};
use racewire_tick::TickScheduler;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::frame::{read_frame, write_frame};
use crate::{
    ClientConfig, ConnectionState, FatalHandler, MessageQueue, ShutdownTrigger, TransportError,
};

enum Lifecycle {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// State shared between the handle and its workers.
#[derive(Clone)]
struct Shared {
    config: Arc<ClientConfig>,
    outbound: Arc<MessageQueue>,
    inbound: Arc<MessageQueue>,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown: ShutdownTrigger,
    fatal: Arc<dyn FatalHandler>,
}

impl Shared {
    fn advance(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            debug!(state = %next, "connection state changed");
        }
    }

    /// Tears the connection down. Process-fatal errors then go to the fatal handler.
    fn fail(&self, err: &TransportError) {
        self.advance(ConnectionState::Closing);
        self.shutdown.trigger();
        if err.is_process_fatal() {
            self.fatal.fatal(err);
        }
    }

    fn enqueue(&self, msgs: impl IntoIterator<Item = Message>) -> Result<usize, TransportError> {
        self.outbound.extend(msgs).inspect_err(|err| self.fatal.fatal(err))
    }
}

/// Client side of a framed TCP connection to the race server.
///
/// Created idle; [`start`](Self::start) spawns the workers on the current Tokio runtime.
/// Sending is fire-and-forget: messages are queued and written by the sender worker on its
/// next tick.
pub struct TcpClient {
    shared: Shared,
    lifecycle: Mutex<Lifecycle>,
}

impl TcpClient {
    pub fn new(config: ClientConfig, fatal: Arc<dyn FatalHandler>) -> Self {
        let outbound = MessageQueue::bounded(config.warn_capacity, config.nuke_capacity);
        let inbound = MessageQueue::bounded(config.warn_capacity, config.nuke_capacity);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Shared {
                config: Arc::new(config),
                outbound: Arc::new(outbound),
                inbound: Arc::new(inbound),
                state: Arc::new(state),
                shutdown: ShutdownTrigger::new(),
                fatal,
            },
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Spawns the connector, sender, and receiver. Returns immediately.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(TransportError::AlreadyStarted);
        }

        let (writer_tx, writer_rx) = oneshot::channel();
        let (reader_tx, reader_rx) = oneshot::channel();

        let connector = tokio::spawn(connect(self.shared.clone(), writer_tx, reader_tx));
        let sender = tokio::spawn(send_loop(self.shared.clone(), writer_rx));
        let receiver = tokio::spawn(receive_loop(self.shared.clone(), reader_rx));

        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let (c, s, r) = tokio::join!(connector, sender, receiver);
            for (worker, result) in [("connector", c), ("sender", s), ("receiver", r)] {
                if let Err(e) = result {
                    error!(worker, error = %e, "transport worker panicked");
                }
            }
            shared.advance(ConnectionState::Closed);
            info!("transport closed");
        });

        *lifecycle = Lifecycle::Running(handle);
        Ok(())
    }

    /// Signals every worker to stop and waits for them to finish.
    ///
    /// Messages still queued are discarded. Safe to call more than once.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);
        self.shared.advance(ConnectionState::Closing);
        self.shared.shutdown.trigger();

        match previous {
            Lifecycle::Running(handle) => {
                info!("stopping transport");
                if let Err(e) = handle.await {
                    error!(error = %e, "transport lifecycle task panicked");
                }
            }
            Lifecycle::Idle => self.shared.advance(ConnectionState::Closed),
            Lifecycle::Stopped => {}
        }
    }

    /// Queues one message for sending.
    ///
    /// On queue overflow the fatal handler is invoked and the message is rejected.
    pub fn send(&self, msg: impl Into<Message>) -> Result<usize, TransportError> {
        self.shared.enqueue(std::iter::once(msg.into()))
    }

    /// Queues a batch as one contiguous run.
    pub fn send_batch(
        &self,
        msgs: impl IntoIterator<Item = Message>,
    ) -> Result<usize, TransportError> {
        self.shared.enqueue(msgs)
    }

    /// Takes every message received since the last call, oldest first.
    ///
    /// The inbound queue has the same watermarks as the outbound one. If nobody drains it,
    /// the receiver fails the connection with a queue overflow.
    pub fn recv(&self) -> VecDeque<Message> {
        self.shared.inbound.drain()
    }

    /// Outbound messages not yet written.
    pub fn pending(&self) -> usize {
        self.shared.outbound.len()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }
}

async fn connect(
    shared: Shared,
    writer_tx: oneshot::Sender<OwnedWriteHalf>,
    reader_tx: oneshot::Sender<OwnedReadHalf>,
) {
    let addr = shared.config.addr();
    let mut shutdown = shared.shutdown.subscribe();
    shared.advance(ConnectionState::Connecting);
    info!(%addr, "connecting");

    let result = tokio::select! {
        _ = shutdown.wait() => {
            debug!("connect abandoned, transport stopping");
            return;
        }
        result = TcpStream::connect(addr.as_str()) => result,
    };

    let stream = match result {
        Ok(stream) => stream,
        Err(source) => {
            let err = TransportError::ConnectFailed { addr, source };
            error!(error = %err, "connect failed");
            shared.fail(&err);
            return;
        }
    };
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "failed to set TCP_NODELAY");
    }
    info!(%addr, "connected");
    shared.advance(ConnectionState::Connected);

    // The server's client list is the first thing this connection asks for.
    if let Err(err) = shared.outbound.push_front(OrderClientList.into()) {
        shared.fatal.fatal(&err);
        return;
    }

    let (reader, writer) = stream.into_split();
    if writer_tx.send(writer).is_err() || reader_tx.send(reader).is_err() {
        debug!("workers gone before handoff");
    }
}

async fn send_loop(shared: Shared, writer_rx: oneshot::Receiver<OwnedWriteHalf>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut writer = tokio::select! {
        _ = shutdown.wait() => return,
        writer = writer_rx => match writer {
            Ok(writer) => writer,
            Err(_) => return,
        },
    };

    let mut ticks = TickScheduler::every(shared.config.tick_period);
    let timeout = shared.config.write_timeout;
    loop {
        ticks.wait_for_tick().await;
        if shutdown.is_triggered() {
            break;
        }
        for msg in shared.outbound.drain() {
            let payload = msg.encode();
            trace!(opcode = %msg.opcode(), len = payload.len(), "sending frame");
            if let Err(err) = write_frame(&mut writer, &payload, timeout).await {
                error!(error = %err, "send failed");
                shared.fail(&err);
                return;
            }
        }
        ticks.record_tick_end();
    }

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "write half shutdown failed");
    }
    debug!("sender stopped");
}

async fn receive_loop(shared: Shared, reader_rx: oneshot::Receiver<OwnedReadHalf>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut reader = tokio::select! {
        _ = shutdown.wait() => return,
        reader = reader_rx => match reader {
            Ok(reader) => reader,
            Err(_) => return,
        },
    };

    let max = shared.config.max_frame_size;
    loop {
        let frame = tokio::select! {
            _ = shutdown.wait() => break,
            frame = read_frame(&mut reader, max) => frame,
        };
        let decoded =
            frame.and_then(|payload| Message::decode(&payload).map_err(TransportError::from));
        match decoded {
            Ok(msg) => {
                trace!(opcode = %msg.opcode(), "frame received");
                if let Err(err) = shared.inbound.push(msg) {
                    error!(error = %err, "inbound queue not drained");
                    shared.fail(&err);
                    break;
                }
            }
            Err(err) if err.is_process_fatal() => {
                error!(error = %err, "receive failed");
                shared.fail(&err);
                break;
            }
            Err(err) => {
                warn!(error = %err, "dropping connection on bad frame");
                shared.fail(&err);
                break;
            }
        }
    }
    debug!("receiver stopped");
}
