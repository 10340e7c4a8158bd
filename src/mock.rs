//! Scripted transport for tests.

use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    channel::{Frame, Inbox, Transport},
    cmd, Config, Session,
};

/// Device name the mock reports on identify.
pub(crate) const NAME: &str = "HX850i";

pub(crate) enum Reply {
    /// Deliver the report before `send` returns.
    Now(Vec<u8>),
    /// Deliver the report from another thread after a delay.
    After(Duration, Vec<u8>),
    Never,
    Fail(io::ErrorKind),
}

type Responder = Box<dyn FnMut(&Frame) -> Reply + Send>;

pub(crate) struct Mock {
    inbox: Arc<Inbox>,
    respond: Mutex<Responder>,
    sent: Mutex<Vec<Frame>>,
}

impl Mock {
    pub(crate) fn new(respond: impl FnMut(&Frame) -> Reply + Send + 'static) -> Self {
        Mock {
            inbox: Arc::new(Inbox::new()),
            respond: Mutex::new(Box::new(respond)),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub(crate) fn inbox_handle(&self) -> Arc<Inbox> {
        Arc::clone(&self.inbox)
    }

    /// Every frame sent so far.
    pub(crate) fn sent(&self) -> Vec<Frame> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Transport for Mock {
    fn send(&self, frame: &Frame) -> io::Result<()> {
        self.sent.lock().unwrap().push(*frame);
        let reply = {
            let mut respond = self.respond.lock().unwrap();
            (*respond)(frame)
        };
        match reply {
            Reply::Now(report) => {
                self.inbox.deliver(&report);
            }
            Reply::After(delay, report) => {
                let inbox = Arc::clone(&self.inbox);
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    inbox.deliver(&report);
                });
            }
            Reply::Never => (),
            Reply::Fail(kind) => return Err(io::Error::new(kind, "mock send failure")),
        }
        Ok(())
    }
}

fn name_report() -> Vec<u8> {
    let mut report = vec![0x00, cmd::NAME];
    report.extend_from_slice(NAME.as_bytes());
    report.resize(64, 0);
    report
}

/// Started session that answers identify itself and `respond` otherwise.
///
/// The identify frame is cleared from the sent log.
pub(crate) fn session_with(
    config: Config,
    mut respond: impl FnMut(&Frame) -> Reply + Send + 'static,
) -> Session<Mock> {
    let mock = Mock::new(move |frame| match (frame[0], frame[1]) {
        (cmd::IDENTIFY, cmd::NAME) => Reply::Now(name_report()),
        _ => respond(frame),
    });
    let inbox = mock.inbox_handle();
    let session = Session::start(mock, inbox, config).unwrap();
    session.transport().clear_sent();
    session
}

pub(crate) fn session(respond: impl FnMut(&Frame) -> Reply + Send + 'static) -> Session<Mock> {
    session_with(Config::default(), respond)
}
