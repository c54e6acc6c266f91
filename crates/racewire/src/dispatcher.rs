//! Routes decoded server messages into the race tracker.
//!
//! The [`Dispatcher`] is the sole owner of the [`RaceTracker`]. It runs
//! on one task, so the tracker needs no locking. Everything it wants to
//! say to the server comes back as a list of outbound messages.

use std::sync::Arc;
use std::time::Duration;

use racewire_protocol::{Message, OrderClientList};
use racewire_race::{RaceTracker, RankBatch};
use racewire_tick::TickScheduler;
use racewire_transport::{ConnectionState, ShutdownSignal, TcpClient};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::BotError;

/// Requests from the console side to the dispatch loop.
///
/// Each carries the console's finish epoch. An `ArmStart` from a countdown
/// that began before the latest `ForceStop` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Start a race with the next client list the server sends.
    ArmStart { epoch: u64 },
    /// Stop the current race now.
    ForceStop { epoch: u64 },
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    tracker: RaceTracker,
    start_armed: bool,
    epoch: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a race start and returns the client-list request to send.
    pub fn arm_start(&mut self) -> Vec<Message> {
        self.start_armed = true;
        debug!("race start armed, requesting client list");
        vec![OrderClientList.into()]
    }

    /// Stops the current race, if any.
    pub fn force_stop(&mut self) -> Vec<Message> {
        self.start_armed = false;
        publish(self.tracker.stop_record())
    }

    pub fn apply(&mut self, control: Control) -> Vec<Message> {
        match control {
            Control::ArmStart { epoch } if epoch < self.epoch => {
                debug!(epoch, current = self.epoch, "stale race start dropped");
                Vec::new()
            }
            Control::ArmStart { .. } => self.arm_start(),
            Control::ForceStop { epoch } => {
                self.epoch = self.epoch.max(epoch);
                self.force_stop()
            }
        }
    }

    /// Handles one inbound message.
    pub fn route(&mut self, msg: Message) -> Vec<Message> {
        trace!(opcode = %msg.opcode(), "dispatching");
        let batch = match msg {
            Message::BallState(m) => {
                self.tracker.income_ball_state(&m);
                None
            }
            Message::ClientDisconnected(m) => self.tracker.income_disconnect(&m),
            Message::CheatState(m) => self.tracker.income_cheat(&m),
            Message::LevelFinish(m) => self.tracker.income_level_finish(&m),
            Message::ClientList(list) if self.start_armed => {
                self.start_armed = false;
                self.tracker.start_record(list.players)
            }
            _ => None,
        };
        publish(batch)
    }

    pub fn tracker(&self) -> &RaceTracker {
        &self.tracker
    }

    pub fn is_start_armed(&self) -> bool {
        self.start_armed
    }
}

/// Logs a finished race and renders it as chat.
fn publish(batch: Option<RankBatch>) -> Vec<Message> {
    let Some(batch) = batch else {
        return Vec::new();
    };
    match serde_json::to_string(&batch) {
        Ok(json) => info!(results = %json, "race finished"),
        Err(e) => warn!(error = %e, "could not serialize race results"),
    }
    batch.into_chat_messages()
}

/// The dispatch loop.
///
/// Starts the client, then once per tick applies pending controls and
/// routes every received message. Exits when `shutdown` fires or the
/// connection closes, stopping the client on the way out.
pub async fn run(
    mut dispatcher: Dispatcher,
    client: Arc<TcpClient>,
    mut controls: mpsc::UnboundedReceiver<Control>,
    shutdown: ShutdownSignal,
    tick: Duration,
) -> Result<(), BotError> {
    client.start()?;
    let result = dispatch(&mut dispatcher, &client, &mut controls, &shutdown, tick).await;
    client.stop().await;
    info!("dispatcher stopped");
    result
}

async fn dispatch(
    dispatcher: &mut Dispatcher,
    client: &TcpClient,
    controls: &mut mpsc::UnboundedReceiver<Control>,
    shutdown: &ShutdownSignal,
    tick: Duration,
) -> Result<(), BotError> {
    let mut ticks = TickScheduler::every(tick);
    loop {
        ticks.wait_for_tick().await;
        if shutdown.is_triggered() {
            return Ok(());
        }

        while let Ok(control) = controls.try_recv() {
            send(client, dispatcher.apply(control))?;
        }
        for msg in client.recv() {
            send(client, dispatcher.route(msg))?;
        }

        if client.state() == ConnectionState::Closed {
            warn!("connection closed, dispatcher exiting");
            return Ok(());
        }
        ticks.record_tick_end();
    }
}

fn send(client: &TcpClient, msgs: Vec<Message>) -> Result<(), BotError> {
    if !msgs.is_empty() {
        client.send_batch(msgs)?;
    }
    Ok(())
}
