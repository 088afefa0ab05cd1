use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use super::{Connector, EvalLimits, EvalState, Evaluation, IdGenerator, NreplError, TcpConnector, Transport};
use crate::config::ClientConfig;
use crate::message::{Message, Request};
use crate::port_file::PortLocator;
use crate::result::EvalResult;

/// An open connection and the session cloned on it.
pub struct Connection<T: Transport> {
    pub transport: T,
    pub port: u16,
    /// Absent when the server's `clone` reply carried no `new-session`; evals
    /// then run in the server's default session.
    pub session: Option<String>,
}

/// A client for an nREPL server.
///
/// Owns at most one connection and one session. Both are created lazily on
/// the first evaluation and reused until [`close`](Self::close). Every
/// protocol operation takes `&mut self`, so exchanges on the connection
/// cannot interleave.
pub struct NreplClient<C: Connector = TcpConnector> {
    connector: C,
    locator: PortLocator,
    limits: EvalLimits,
    ids: IdGenerator,
    connection: Option<Connection<C::Transport>>,
}

impl NreplClient<TcpConnector> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            TcpConnector::new(config.host.clone()),
            config.locator(),
            config.limits(),
        )
    }
}

impl<C: Connector> NreplClient<C> {
    pub fn new(connector: C, locator: PortLocator, limits: EvalLimits) -> Self {
        Self {
            connector,
            locator,
            limits,
            ids: IdGenerator::default(),
            connection: None,
        }
    }

    /// Replace the request id generator.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.connection.as_ref().and_then(|c| c.session.as_deref())
    }

    pub fn port(&self) -> Option<u16> {
        self.connection.as_ref().map(|c| c.port)
    }

    pub fn limits(&self) -> EvalLimits {
        self.limits
    }

    pub fn locator(&self) -> &PortLocator {
        &self.locator
    }

    /// Return the live connection, opening one and cloning a session first
    /// if there is none.
    pub async fn ensure_session(&mut self) -> Result<&mut Connection<C::Transport>, NreplError> {
        if self.connection.is_none() {
            let connection = open_connection(&self.connector, &self.locator, &self.ids).await?;
            self.connection = Some(connection);
        }
        self.connection.as_mut().ok_or(NreplError::ConnectionClosed)
    }

    /// Evaluate `code` in the session and collect every frame up to `done`.
    pub async fn eval(&mut self, code: &str) -> Result<EvalResult, NreplError> {
        let id = self.ids.next_id();
        let limits = self.limits;

        let outcome = match self.ensure_session().await {
            Ok(connection) => run_eval(connection, id, code, limits).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            error!("Evaluation failed: {}", e);
            if e.poisons_connection() {
                self.discard_connection().await;
            }
        }
        outcome
    }

    /// Close the connection if one is open. Returns whether there was one.
    pub async fn close(&mut self) -> Result<bool, NreplError> {
        match self.connection.take() {
            Some(mut connection) => {
                info!("Closing nREPL connection on port {}", connection.port);
                connection.transport.close().await?;
                Ok(true)
            }
            None => {
                debug!("No nREPL connection to close");
                Ok(false)
            }
        }
    }

    async fn discard_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            warn!("Dropping nREPL connection on port {} after failure", connection.port);
            if let Err(e) = connection.transport.close().await {
                debug!("Ignoring error while closing broken connection: {}", e);
            }
        }
    }
}

/// Connect, then clone a session with exactly one request/reply.
async fn open_connection<C: Connector>(
    connector: &C,
    locator: &PortLocator,
    ids: &IdGenerator,
) -> Result<Connection<C::Transport>, NreplError> {
    let port_file = locator.locate()?;
    let port = port_file.port_number()?;
    info!("Using nREPL port {} from {}", port, port_file.path.display());

    let mut transport = connector.connect(port).await?;
    let clone = Request::Clone {
        id: ids.next_id(),
    };
    transport.send(clone.into_message()).await?;
    let reply = transport.recv().await?;

    let session = reply.new_session().map(str::to_string);
    match &session {
        Some(id) => info!("Cloned nREPL session {}", id),
        None => warn!("clone reply carried no new-session; evaluating without a session"),
    }

    Ok(Connection {
        transport,
        port,
        session,
    })
}

/// Drive one `eval` exchange on `connection`.
pub async fn run_eval<T: Transport>(
    connection: &mut Connection<T>,
    id: String,
    code: &str,
    limits: EvalLimits,
) -> Result<EvalResult, NreplError> {
    let mut evaluation = Evaluation::new(limits);
    let request = Request::Eval {
        id: id.clone(),
        code: code.to_string(),
        session: connection.session.clone(),
    };

    debug!("Sending eval {} ({} bytes of code)", id, code.len());
    connection.transport.send(request.into_message()).await?;
    evaluation.mark_sent()?;

    let deadline = limits.timeout.map(|t| (Instant::now() + t, t));
    while evaluation.state() == EvalState::Collecting {
        let received = match deadline {
            Some((at, budget)) => match timeout_at(at, connection.transport.recv()).await {
                Ok(received) => received,
                Err(_) => Err(NreplError::Timeout(budget)),
            },
            None => connection.transport.recv().await,
        };
        let message = match received {
            Ok(message) => message,
            Err(e) => return Err(evaluation.abort(e)),
        };
        let absorbed = if is_foreign(&message, &id) {
            warn!("Skipping frame for request {:?} while waiting on {}", message.id(), id);
            evaluation.skip()
        } else {
            evaluation.absorb(&message)
        };
        if let Err(e) = absorbed {
            return Err(evaluation.abort(e));
        }
    }

    debug!("Eval {} done after {} frames", id, evaluation.frames());
    evaluation.finish()
}

fn is_foreign(message: &Message, id: &str) -> bool {
    matches!(message.id(), Some(other) if other != id)
}
