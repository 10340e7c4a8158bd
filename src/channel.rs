//! Command/response transactions over the shared report buffer.

use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        MutexGuard,
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::{protocol::Command, Error, HID_REPORT_LEN};

/// One fixed-size report, no report ID byte.
pub type Frame = [u8; HID_REPORT_LEN];

/// Host transport to the device.
///
/// Inbound reports are not read through this trait, the transport hands them
/// to [`Inbox::deliver`] as they arrive.
pub trait Transport: Send + Sync {
    /// Transmit one outbound frame.
    fn send(&self, frame: &Frame) -> io::Result<()>;
}

/// Buffer commands are composed in and responses are received into.
#[derive(Debug)]
pub struct CommandBuffer {
    frame: Frame,
    cursor: usize,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        CommandBuffer {
            frame: [0; HID_REPORT_LEN],
            cursor: 0,
        }
    }
}

impl CommandBuffer {
    /// Zero the frame and rewind the write cursor.
    pub(crate) fn clear(&mut self) {
        self.frame = [0; HID_REPORT_LEN];
        self.cursor = 0;
    }

    /// Append one byte at the write cursor.
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), Error> {
        let slot = self.frame.get_mut(self.cursor).ok_or(Error::CommandTooLong)?;
        *slot = byte;
        self.cursor += 1;
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

/// A report copied out of the transport's receive path.
#[derive(Debug)]
struct Report {
    data: Frame,
    len: usize,
}

/// Inbound report demultiplexer.
///
/// Holds the completion signal of the one transaction in flight. Each
/// transaction arms the inbox with a fresh generation; the first report that
/// claims that generation completes it, everything else is dropped.
#[derive(Debug)]
pub struct Inbox {
    /// Generation awaiting a response, zero when idle.
    pending: AtomicU64,
    next: AtomicU64,
    tx: Sender<(u64, Report)>,
    rx: Receiver<(u64, Report)>,
}

impl Default for Inbox {
    fn default() -> Self {
        let (tx, rx) = bounded(2);
        Inbox {
            pending: AtomicU64::new(0),
            next: AtomicU64::new(1),
            tx,
            rx,
        }
    }
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand an inbound report to the waiting transaction.
    ///
    /// Returns `false` if no transaction was waiting and the report was
    /// dropped. Never blocks.
    pub fn deliver(&self, data: &[u8]) -> bool {
        let generation = self.pending.load(Ordering::Acquire);
        if generation == 0
            || self
                .pending
                .compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            tracing::trace!(len = data.len(), "dropping unsolicited report");
            return false;
        }

        let len = data.len().min(HID_REPORT_LEN);
        let mut report = Report {
            data: [0; HID_REPORT_LEN],
            len,
        };
        report.data[..len].copy_from_slice(&data[..len]);
        self.tx.try_send((generation, report)).is_ok()
    }

    /// `true` while a transaction waits for its response.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) != 0
    }

    fn arm(&self) -> u64 {
        // leftovers from a generation that timed out
        for (generation, _) in self.rx.try_iter() {
            tracing::trace!(generation, "discarding late report");
        }
        let generation = self.next.fetch_add(1, Ordering::Relaxed);
        self.pending.store(generation, Ordering::Release);
        generation
    }

    fn disarm(&self, generation: u64) {
        let _ = self
            .pending
            .compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    fn wait(&self, generation: u64, timeout: Duration) -> Option<Report> {
        // `None` waits without bound
        let deadline: Option<Instant> = Instant::now().checked_add(timeout);
        loop {
            let received = match deadline {
                Some(deadline) => self
                    .rx
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((g, report)) if g == generation => return Some(report),
                Ok((g, _)) => tracing::trace!(generation = g, "discarding late report"),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    self.disarm(generation);
                    return None;
                }
            }
        }
    }
}

/// Exclusive access to the command buffer for one or more transactions.
///
/// The buffer lock is held until the transaction is dropped.
pub struct Transaction<'s, T> {
    pub(crate) transport: &'s T,
    pub(crate) inbox: &'s Inbox,
    pub(crate) timeout: Duration,
    pub(crate) buf: MutexGuard<'s, CommandBuffer>,
}

impl<T: Transport> Transaction<'_, T> {
    /// Compose `command` into the buffer and send it, optionally waiting for
    /// the response.
    ///
    /// On success with `wait_for_response` the buffer holds the raw response.
    /// The response status is not checked here.
    pub fn execute(&mut self, command: Command, wait_for_response: bool) -> Result<(), Error> {
        command.encode_into(&mut self.buf)?;
        let generation = self.inbox.arm();
        let frame = self.buf.frame();
        tracing::debug!(opcode = frame[0], register = frame[1], "sending command");

        if let Err(e) = self.transport.send(frame) {
            self.inbox.disarm(generation);
            return Err(Error::Transport(e));
        }
        self.buf.cursor = 0;

        if !wait_for_response {
            self.inbox.disarm(generation);
            return Ok(());
        }

        let report = self.inbox.wait(generation, self.timeout).ok_or(Error::Timeout)?;
        self.buf.frame[..report.len].copy_from_slice(&report.data[..report.len]);
        tracing::debug!(status = self.buf.frame[0], len = report.len, "response");
        Ok(())
    }

    /// Raw buffer contents.
    pub fn buffer(&self) -> &Frame {
        self.buf.frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Mock, Reply};
    use std::sync::Mutex;

    fn transaction<'s>(
        mock: &'s Mock,
        buf: &'s Mutex<CommandBuffer>,
        timeout: Duration,
    ) -> Transaction<'s, Mock> {
        Transaction {
            transport: mock,
            inbox: mock.inbox(),
            timeout,
            buf: buf.lock().unwrap(),
        }
    }

    #[test]
    fn push_bounds() {
        let mut buf = CommandBuffer::default();
        for _ in 0..HID_REPORT_LEN {
            buf.push(0xAA).unwrap();
        }
        assert!(matches!(buf.push(0xAA), Err(Error::CommandTooLong)));
        buf.clear();
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.frame(), &[0; HID_REPORT_LEN]);
    }

    #[test]
    fn response_overwrites_buffer() {
        let mock = Mock::new(|_| Reply::Now(vec![0x00, 0x8D]));
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_millis(300));
        tx.execute(Command::select(0x8D, 0x55), true).unwrap();
        assert_eq!(&mock.sent()[0][..4], &[0x02, 0x8D, 0x55, 0x00]);
        assert_eq!(tx.buf.cursor(), 0);
        // response is two bytes long, the rest of the command stays
        assert_eq!(&tx.buffer()[..4], &[0x00, 0x8D, 0x55, 0x00]);
        assert!(!mock.inbox().is_pending());
    }

    #[test]
    fn command_replaces_previous_response() {
        let mock = Mock::new(|f| Reply::Now(vec![0x00, f[1], 0xAB, 0xCD, 0xEF]));
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_millis(300));
        tx.execute(Command::read(0x90), true).unwrap();
        tx.execute(Command::read(0x8C), true).unwrap();
        let sent = mock.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[1][..6], &[0x03, 0x8C, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn oversized_report_truncated() {
        let mock = Mock::new(|_| Reply::Now(vec![0x5A; 100]));
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_millis(300));
        tx.execute(Command::read(0x90), true).unwrap();
        assert_eq!(tx.buffer(), &[0x5A; HID_REPORT_LEN]);
    }

    #[test]
    fn timeout_bounds() {
        const TIMEOUT: Duration = Duration::from_millis(50);
        let mock = Mock::new(|_| Reply::Never);
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, TIMEOUT);

        let start = Instant::now();
        assert!(matches!(
            tx.execute(Command::read(0x90), true),
            Err(Error::Timeout)
        ));
        let elapsed = start.elapsed();
        assert!(elapsed >= TIMEOUT, "{:?}", elapsed);
        assert!(elapsed < TIMEOUT + Duration::from_millis(250), "{:?}", elapsed);
        assert!(!mock.inbox().is_pending());
    }

    #[test]
    fn unbounded_timeout() {
        let mock = Mock::new(|f| {
            Reply::After(Duration::from_millis(10), vec![0x00, f[1], 0x01, 0x02])
        });
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::MAX);
        tx.execute(Command::read(0x90), true).unwrap();
        assert_eq!(&tx.buffer()[..4], &[0x00, 0x90, 0x01, 0x02]);
        assert!(!mock.inbox().is_pending());
    }

    #[test]
    fn send_failure_propagates() {
        let mock = Mock::new(|_| Reply::Fail(io::ErrorKind::BrokenPipe));
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_millis(300));
        match tx.execute(Command::read(0x90), true) {
            Err(Error::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!mock.inbox().is_pending());
    }

    #[test]
    fn fire_and_forget() {
        let mock = Mock::new(|_| Reply::Never);
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_secs(5));
        let start = Instant::now();
        tx.execute(Command::select(0x00, 0x02), false).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!mock.inbox().is_pending());
        assert_eq!(mock.sent().len(), 1);
        assert_eq!(&mock.sent()[0][..4], &[0x02, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn fire_and_forget_after_read() {
        let session = crate::mock::session(|f| match f[0] {
            crate::cmd::READ => Reply::Now(vec![0x00, f[1], 0xAB, 0xCD]),
            _ => Reply::Never,
        });
        session.read_register(0x90).unwrap();
        session
            .begin()
            .execute(Command::select(crate::cmd::CHANNEL_SELECT, 0x01), false)
            .unwrap();
        let sent = session.transport().sent();
        assert_eq!(sent.len(), 2);
        let mut expected = [0; HID_REPORT_LEN];
        expected[..3].copy_from_slice(&[0x02, 0x00, 0x01]);
        assert_eq!(sent[1], expected);
    }

    #[test]
    fn unsolicited_report_dropped() {
        let inbox = Inbox::new();
        assert!(!inbox.deliver(&[0xFF; 64]));

        let mock = Mock::new(|_| Reply::Never);
        assert!(!mock.inbox().deliver(&[0x00; 64]));
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_millis(30));
        // the earlier report must not be taken as this transaction's response
        assert!(matches!(
            tx.execute(Command::read(0x90), true),
            Err(Error::Timeout)
        ));
    }

    #[test]
    fn late_report_after_timeout_dropped() {
        let mock = Mock::new(|frame| match frame[1] {
            0x01 => Reply::Never,
            _ => Reply::Now(vec![0x00, frame[1], 0xBE, 0xEF]),
        });
        let buf = Mutex::new(CommandBuffer::default());
        {
            let mut tx = transaction(&mock, &buf, Duration::from_millis(30));
            assert!(matches!(
                tx.execute(Command::read(0x01), true),
                Err(Error::Timeout)
            ));
        }
        // the device finally answers the first command
        assert!(!mock.inbox().deliver(&[0x00, 0x01, 0xDE, 0xAD]));

        let mut tx = transaction(&mock, &buf, Duration::from_millis(300));
        tx.execute(Command::read(0x02), true).unwrap();
        assert_eq!(&tx.buffer()[..4], &[0x00, 0x02, 0xBE, 0xEF]);
    }

    #[test]
    fn stale_generation_discarded() {
        let inbox = Inbox::new();
        let first = inbox.arm();
        assert!(inbox.deliver(&[0x01]));
        // waiter for `first` never collected; a new transaction arms
        let second = inbox.arm();
        assert_ne!(first, second);
        assert!(inbox.deliver(&[0x02]));
        let report = inbox.wait(second, Duration::from_millis(100)).unwrap();
        assert_eq!(report.len, 1);
        assert_eq!(report.data[0], 0x02);
    }

    #[test]
    fn delayed_response_from_other_thread() {
        let mock = Mock::new(|frame| {
            Reply::After(Duration::from_millis(20), vec![0x00, frame[1], 0x01, 0x02])
        });
        let buf = Mutex::new(CommandBuffer::default());
        let mut tx = transaction(&mock, &buf, Duration::from_millis(300));
        tx.execute(Command::read(0x90), true).unwrap();
        assert_eq!(&tx.buffer()[..4], &[0x00, 0x90, 0x01, 0x02]);
    }
}
