//! Client side of the nREPL protocol.
//!
//! Finds a running REPL through its port file, opens a TCP connection,
//! clones a session and evaluates code in it, folding the streamed
//! `out`/`value`/`err` frames into one [`EvalResult`].
//!
//! ```rust,no_run
//! use nrepl_protocol::{ClientConfig, NreplClient};
//!
//! # async fn example() -> Result<(), nrepl_protocol::NreplError> {
//! let mut client = NreplClient::from_config(&ClientConfig::default());
//! let result = client.eval("(+ 1 41)").await?;
//! println!("{}", result);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod bencode;
pub mod client;
pub mod config;
pub mod message;
pub mod port_file;
pub mod result;
pub mod rpc;

pub use client::ReplClient;
pub use config::ClientConfig;
pub use message::{Message, Request};
pub use port_file::{PortFile, PortLocator, ReplKind, SearchMode};
pub use result::{EvalResult, NO_OUTPUT};
pub use rpc::{
    Connector, ErrorKind, EvalLimits, EvalState, Evaluation, NreplClient, NreplError, TcpConnector,
    TcpTransport, Transport,
};
