use async_trait::async_trait;

use crate::result::EvalResult;
use crate::rpc::NreplError;

/// Something that can evaluate Clojure code and be closed.
///
/// The tool layer is written against this trait so it can run on a real
/// [`NreplClient`](crate::rpc::NreplClient) or on a mock in tests.
#[async_trait]
pub trait ReplClient: Send {
    /// Evaluate code and return everything collected up to `done`.
    async fn eval(&mut self, code: &str) -> Result<EvalResult, NreplError>;

    /// Close the connection. `Ok(false)` means nothing was open.
    async fn close(&mut self) -> Result<bool, NreplError>;

    /// Current session id, if a session is open.
    fn session_id(&self) -> Option<&str>;
}
