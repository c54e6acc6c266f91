use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and queueing parameters for a [`TcpClient`](crate::TcpClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Inbound frames declaring this many bytes or more are rejected.
    pub max_frame_size: u32,
    /// Pending messages in either queue at which every enqueue warns.
    pub warn_capacity: usize,
    /// Pending messages in either queue at which the process is terminated.
    pub nuke_capacity: usize,
    /// How often the sender drains the outbound queue.
    pub tick_period: Duration,
    /// Longest a single frame write may block.
    pub write_timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 6172;
    pub const MAX_FRAME_SIZE: u32 = 2048;
    pub const WARN_CAPACITY: usize = 2048;
    pub const NUKE_CAPACITY: usize = 3072;

    /// Defaults for everything except the endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `host:port`, as passed to the connector.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_owned(),
            port: Self::DEFAULT_PORT,
            max_frame_size: Self::MAX_FRAME_SIZE,
            warn_capacity: Self::WARN_CAPACITY,
            nuke_capacity: Self::NUKE_CAPACITY,
            tick_period: Duration::from_millis(10),
            write_timeout: Duration::from_secs(1),
        }
    }
}
