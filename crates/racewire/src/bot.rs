//! The running bot: transport, dispatch loop, and console commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use racewire_protocol::{Chat, Message, OrderGlobalCheat};
use racewire_transport::{ConnectionState, FatalHandler, ShutdownSignal, ShutdownTrigger, TcpClient};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::command::{
    Command, MODERATION_HELP, MODERATION_INVALID, ModerationOrder, RACE_HELP, RACE_INVALID,
    RaceOrder,
};
use crate::dispatcher::{self, Control, Dispatcher};
use crate::{BotConfig, BotError};

const COUNTDOWN: [&str; 4] = ["3", "2", "1", "GO!"];
const READY_COUNTDOWN: [&str; 5] = ["Ready", "3", "2", "1", "GO!"];

/// What the console should show after a command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Lines for the operator.
    pub lines: Vec<String>,
    /// The command asked the bot to shut down.
    pub quit: bool,
}

impl Reply {
    fn text(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| (*l).to_owned()).collect(),
            quit: false,
        }
    }
}

/// A connected race bot.
///
/// # Example
///
/// ```rust,ignore
/// let bot = Bot::start(BotConfig::from_args("127.0.0.1", "6172"), Arc::new(ExitProcess));
/// bot.execute(Command::parse("!sw st"))?;
/// bot.shutdown().await?;
/// ```
pub struct Bot {
    config: BotConfig,
    client: Arc<TcpClient>,
    controls: mpsc::UnboundedSender<Control>,
    shutdown: ShutdownTrigger,
    dispatch: JoinHandle<Result<(), BotError>>,
    /// Bumped by every `!sw fin`; a countdown only arms the epoch it began in.
    epoch: AtomicU64,
    countdowns: Mutex<Vec<JoinHandle<()>>>,
}

impl Bot {
    /// Spawns the dispatch loop, which connects to the server.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: BotConfig, fatal: Arc<dyn FatalHandler>) -> Self {
        let client = Arc::new(TcpClient::new(config.client.clone(), fatal));
        let (controls, control_rx) = mpsc::unbounded_channel();
        let shutdown = ShutdownTrigger::new();

        info!(addr = %config.client.addr(), "starting bot");
        let dispatch = {
            let client = client.clone();
            let signal = shutdown.subscribe();
            let trigger = shutdown.clone();
            let tick = config.dispatch_tick;
            tokio::spawn(async move {
                let result =
                    dispatcher::run(Dispatcher::new(), client, control_rx, signal, tick).await;
                // Lets countdowns and the console see that the bot is done.
                trigger.trigger();
                result
            })
        };

        Self {
            config,
            client,
            controls,
            shutdown,
            dispatch,
            epoch: AtomicU64::new(0),
            countdowns: Mutex::new(Vec::new()),
        }
    }

    /// Applies one console command.
    pub fn execute(&self, command: Command) -> Result<Reply, BotError> {
        match command {
            Command::Empty => Ok(Reply::default()),
            Command::Chat(line) => {
                self.client.send(Chat::broadcast(line))?;
                Ok(Reply::default())
            }
            Command::Race(order) => self.race(order),
            Command::Moderation(order) => self.moderation(order),
        }
    }

    fn race(&self, order: RaceOrder) -> Result<Reply, BotError> {
        match order {
            RaceOrder::Missing => Ok(Reply::text(&[RACE_INVALID])),
            RaceOrder::Start => {
                self.countdown(&COUNTDOWN);
                Ok(Reply::default())
            }
            RaceOrder::ReadyStart => {
                self.countdown(&READY_COUNTDOWN);
                Ok(Reply::default())
            }
            RaceOrder::Finish => {
                let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                for task in self.countdowns.lock().drain(..) {
                    task.abort();
                }
                self.control(Control::ForceStop { epoch })?;
                Ok(Reply::default())
            }
            RaceOrder::Stop => {
                self.shutdown.trigger();
                Ok(Reply {
                    lines: Vec::new(),
                    quit: true,
                })
            }
            RaceOrder::Help => Ok(Reply::text(&RACE_HELP)),
        }
    }

    fn moderation(&self, order: ModerationOrder) -> Result<Reply, BotError> {
        match order {
            ModerationOrder::Missing => Ok(Reply::text(&[MODERATION_INVALID])),
            ModerationOrder::Cheat(Some(on)) => {
                self.client.send(OrderGlobalCheat {
                    cheated: u8::from(on),
                })?;
                info!(cheat = on, "global cheat order sent");
                Ok(Reply::default())
            }
            ModerationOrder::Cheat(None) => Ok(Reply::text(&["Usage: /mmo cheat on|off"])),
            ModerationOrder::Kick(name) => {
                warn!(?name, "kick is not supported by this server protocol");
                Ok(Reply::text(&["Kick is not supported."]))
            }
            ModerationOrder::Help => Ok(Reply::text(&MODERATION_HELP)),
        }
    }

    fn control(&self, control: Control) -> Result<(), BotError> {
        self.controls
            .send(control)
            .map_err(|_| BotError::DispatcherGone)
    }

    /// Broadcasts `lines` one per countdown interval, then arms a start.
    fn countdown(&self, lines: &'static [&'static str]) {
        let task = tokio::spawn(countdown(
            self.client.clone(),
            self.controls.clone(),
            lines,
            self.config.countdown_interval,
            self.epoch.load(Ordering::SeqCst),
            self.shutdown.subscribe(),
        ));
        let mut countdowns = self.countdowns.lock();
        countdowns.retain(|t| !t.is_finished());
        countdowns.push(task);
    }

    pub fn client(&self) -> &TcpClient {
        &self.client
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// A signal that fires once a shutdown was requested or the dispatcher exited.
    pub fn stopped(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Stops the dispatch loop, which stops the transport.
    pub async fn shutdown(self) -> Result<(), BotError> {
        info!("shutting down bot");
        self.shutdown.trigger();
        match self.dispatch.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "dispatch task panicked");
                Err(BotError::DispatcherGone)
            }
        }
    }
}

async fn countdown(
    client: Arc<TcpClient>,
    controls: mpsc::UnboundedSender<Control>,
    lines: &'static [&'static str],
    interval: Duration,
    epoch: u64,
    mut shutdown: ShutdownSignal,
) {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            tokio::select! {
                _ = shutdown.wait() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        let msg: Message = Chat::broadcast(*line).into();
        if client.send(msg).is_err() {
            return;
        }
    }
    if controls.send(Control::ArmStart { epoch }).is_err() {
        warn!("countdown finished after dispatcher exited");
    }
}
