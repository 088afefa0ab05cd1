//! In-memory stand-ins for an nREPL server, for tests of code built on
//! this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::trait_def::ReplClient;
use crate::bencode::Value;
use crate::message::{Message, OP_CLONE, OP_EVAL, STATUS_DONE};
use crate::result::EvalResult;
use crate::rpc::{Connector, NreplError, Transport};

/// Produces the frames a server would send back for one request.
pub type Responder = Arc<dyn Fn(&Message) -> Vec<Message> + Send + Sync>;

/// Shared record of what a scripted server saw.
#[derive(Clone, Default)]
pub struct WireLog {
    sent: Arc<Mutex<Vec<Message>>>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl WireLog {
    /// Every request written by the client, across all connections.
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Requests with the given `op`.
    pub fn sent_with_op(&self, op: &str) -> Vec<Message> {
        self.sent().into_iter().filter(|m| m.op() == Some(op)).collect()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Transport that answers each request from a [`Responder`].
pub struct ScriptedTransport {
    responder: Responder,
    pending: VecDeque<Message>,
    log: WireLog,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, message: Message) -> Result<(), NreplError> {
        let replies = (self.responder)(&message);
        if let Ok(mut sent) = self.log.sent.lock() {
            sent.push(message);
        }
        self.pending.extend(replies);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message, NreplError> {
        self.pending.pop_front().ok_or(NreplError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), NreplError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out [`ScriptedTransport`]s that share one log.
#[derive(Clone)]
pub struct ScriptedConnector {
    responder: Responder,
    log: WireLog,
}

impl ScriptedConnector {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Message) -> Vec<Message> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            log: WireLog::default(),
        }
    }

    /// A well-behaved server: `clone` gets a single `done` frame carrying
    /// `session`, and `eval` gets whatever `evaluate` returns for the code
    /// followed by a `done` frame. Every reply echoes the request id.
    pub fn server<F>(session: &str, evaluate: F) -> Self
    where
        F: Fn(&str) -> Vec<Message> + Send + Sync + 'static,
    {
        let session = session.to_string();
        Self::new(move |request| {
            let id = request.id().unwrap_or_default().to_string();
            let replies = match request.op() {
                Some(OP_CLONE) => vec![done_frame().with("new-session", session.clone())],
                Some(OP_EVAL) => {
                    let mut frames = evaluate(request.code().unwrap_or_default());
                    frames.push(done_frame());
                    frames
                }
                _ => vec![Message::new().with(
                    "status",
                    vec![Value::from("unknown-op"), Value::from(STATUS_DONE)],
                )],
            };
            replies
                .into_iter()
                .map(|reply| reply.with("id", id.clone()))
                .collect()
        })
    }

    pub fn log(&self) -> WireLog {
        self.log.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, _port: u16) -> Result<ScriptedTransport, NreplError> {
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedTransport {
            responder: self.responder.clone(),
            pending: VecDeque::new(),
            log: self.log.clone(),
        })
    }
}

/// `{"status": ["done"]}`
pub fn done_frame() -> Message {
    Message::new().with("status", vec![Value::from(STATUS_DONE)])
}

/// A [`ReplClient`] that replays queued results and records the code it
/// was asked to evaluate.
#[derive(Default)]
pub struct MockReplClient {
    results: VecDeque<Result<EvalResult, NreplError>>,
    evaluated: Arc<Mutex<Vec<String>>>,
    session: Option<String>,
}

impl MockReplClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next evaluation.
    pub fn push_result(&mut self, result: Result<EvalResult, NreplError>) -> &mut Self {
        self.results.push_back(result);
        self
    }

    /// Queue an evaluation that produced just `value`.
    pub fn push_value(&mut self, value: &str) -> &mut Self {
        self.push_result(Ok(EvalResult {
            values: vec![value.to_string()],
            ..EvalResult::default()
        }))
    }

    /// Handle on the code evaluated so far; stays valid after the mock is
    /// moved into something else.
    pub fn evaluated(&self) -> Arc<Mutex<Vec<String>>> {
        self.evaluated.clone()
    }
}

#[async_trait]
impl ReplClient for MockReplClient {
    async fn eval(&mut self, code: &str) -> Result<EvalResult, NreplError> {
        if let Ok(mut evaluated) = self.evaluated.lock() {
            evaluated.push(code.to_string());
        }
        self.session.get_or_insert_with(|| "mock-session".to_string());
        self.results.pop_front().unwrap_or_else(|| Ok(EvalResult::default()))
    }

    async fn close(&mut self) -> Result<bool, NreplError> {
        Ok(self.session.take().is_some())
    }

    fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }
}
