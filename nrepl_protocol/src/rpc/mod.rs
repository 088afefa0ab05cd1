// Session-oriented nREPL client
mod client;
mod codec;
mod error;
mod eval;
mod id_generator;
mod transport;

pub use client::{run_eval, Connection, NreplClient};
pub use codec::NreplCodec;
pub use error::{ErrorKind, NreplError};
pub use eval::{EvalLimits, EvalState, Evaluation};
pub use id_generator::IdGenerator;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
