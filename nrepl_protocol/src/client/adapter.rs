use async_trait::async_trait;

use super::trait_def::ReplClient;
use crate::result::EvalResult;
use crate::rpc::{Connector, NreplClient, NreplError};

#[async_trait]
impl<C: Connector> ReplClient for NreplClient<C> {
    async fn eval(&mut self, code: &str) -> Result<EvalResult, NreplError> {
        NreplClient::eval(self, code).await
    }

    async fn close(&mut self) -> Result<bool, NreplError> {
        NreplClient::close(self).await
    }

    fn session_id(&self) -> Option<&str> {
        NreplClient::session_id(self)
    }
}
