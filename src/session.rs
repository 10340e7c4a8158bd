use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crate::{
    channel::{CommandBuffer, Inbox, Transaction, Transport},
    protocol::{payload_string, Command, RawValue},
    Error,
};

/// Length of the name buffer in an identify response.
const NAME_LEN: usize = 16;

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How long a transaction waits for its response.
    pub timeout: Duration,
}

impl Config {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300);

    /// Set the response timeout.
    ///
    /// A timeout too large to represent as a deadline waits forever.
    ///
    /// # Example
    ///
    /// ```
    /// use corsairlink::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::default().with_timeout(Duration::from_millis(500));
    /// assert_eq!(config.timeout, Duration::from_millis(500));
    /// ```
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// One connection to a device.
///
/// All transactions are serialized through the session's command buffer
/// lock. Reports from the transport are handed to the session's [`Inbox`].
#[derive(Debug)]
pub struct Session<T> {
    transport: T,
    buffer: Mutex<CommandBuffer>,
    inbox: Arc<Inbox>,
    config: Config,
    identity: String,
}

impl<T: Transport> Session<T> {
    /// Start a session and fetch the device identity.
    ///
    /// `inbox` must be the inbox `transport` delivers reports to.
    pub fn start(transport: T, inbox: Arc<Inbox>, config: Config) -> Result<Self, Error> {
        let mut session = Session {
            transport,
            buffer: Mutex::new(CommandBuffer::default()),
            inbox,
            config,
            identity: String::new(),
        };
        let identity = {
            let mut tx = session.begin();
            let frame = tx.request(Command::identify())?;
            payload_string(frame, NAME_LEN)
        };
        tracing::info!(%identity, "session started");
        session.identity = identity;
        Ok(session)
    }

    /// Take the session lock for a sequence of transactions.
    ///
    /// Other callers block until the returned transaction is dropped.
    pub fn begin(&self) -> Transaction<'_, T> {
        Transaction {
            transport: &self.transport,
            inbox: &self.inbox,
            timeout: self.config.timeout,
            buf: self
                .buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Read a single register.
    pub fn read_register(&self, register: u8) -> Result<RawValue, Error> {
        self.begin().read_register(register)
    }

    /// Select a channel and read a register without releasing the lock.
    pub fn select_and_read(&self, select: u8, channel: u8, register: u8) -> Result<RawValue, Error> {
        self.begin().select_and_read(select, channel, register)
    }

    /// Device name fetched when the session started.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Inbox inbound reports are delivered to.
    pub fn inbox(&self) -> &Arc<Inbox> {
        &self.inbox
    }
}
