use std::time::Duration;

use racewire_transport::ClientConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Everything the bot needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Connection and queue settings for the transport.
    pub client: ClientConfig,
    /// How often the dispatcher drains the inbound queue.
    pub dispatch_tick: Duration,
    /// Pause between countdown lines.
    pub countdown_interval: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            dispatch_tick: Duration::from_millis(10),
            countdown_interval: Duration::from_secs(1),
        }
    }
}

impl BotConfig {
    /// Builds a config from command-line strings.
    ///
    /// A port that does not parse falls back to
    /// [`ClientConfig::DEFAULT_PORT`] with a warning.
    pub fn from_args(host: &str, port: &str) -> Self {
        let port = match port.trim().parse::<u16>() {
            Ok(port) => port,
            Err(e) => {
                warn!(
                    port,
                    error = %e,
                    fallback = ClientConfig::DEFAULT_PORT,
                    "invalid port, using default"
                );
                ClientConfig::DEFAULT_PORT
            }
        };
        Self {
            client: ClientConfig::new(host, port),
            ..Self::default()
        }
    }
}
