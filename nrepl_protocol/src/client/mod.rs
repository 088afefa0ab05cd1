// Client interface used by the tool layer
mod adapter;
pub mod testing;
mod trait_def;

pub use testing::{MockReplClient, ScriptedConnector, ScriptedTransport, WireLog};
pub use trait_def::ReplClient;
