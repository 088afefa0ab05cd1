//! One-shot evaluation without a session.

use anyhow::{Context, Result};
use tracing::{debug, error};

use nrepl_protocol::rpc::IdGenerator;
use nrepl_protocol::{Connector, PortLocator, ReplKind, Request, SearchMode, TcpConnector, Transport};

pub const NO_RESULT: &str = "No result";

/// Evaluate `code` on a fresh connection to the REPL whose `.nrepl-port` sits
/// in the working directory, returning the first value.
pub async fn eval_clojure_simple(code: &str) -> String {
    let locator = PortLocator::new(ReplKind::Clj, SearchMode::WorkingDirectory);
    eval_simple_with(&TcpConnector::default(), &locator, code).await
}

pub async fn eval_simple_with<C: Connector>(connector: &C, locator: &PortLocator, code: &str) -> String {
    match try_eval(connector, locator, code).await {
        Ok(value) => value,
        Err(e) => {
            error!("eval_clojure_simple failed: {:#}", e);
            format!("Error: {:#}", e)
        }
    }
}

async fn try_eval<C: Connector>(connector: &C, locator: &PortLocator, code: &str) -> Result<String> {
    let port = locator.locate()?.port_number()?;
    let mut transport = connector.connect(port).await?;

    let request = Request::Eval {
        id: IdGenerator::default().next_id(),
        code: code.to_string(),
        session: None,
    };
    transport.send(request.into_message()).await?;

    let first = transport.recv().await.context("no reply to eval")?;
    let value = first.value().unwrap_or(NO_RESULT).to_string();
    if !first.is_done() {
        let trailing = transport.recv().await.context("reading trailing status")?;
        debug!("Discarding trailing frame {:?}", trailing);
    }

    transport.close().await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrepl_protocol::client::testing::{done_frame, ScriptedConnector};
    use nrepl_protocol::Message;

    fn locator_in(dir: &std::path::Path) -> PortLocator {
        PortLocator::new(ReplKind::Clj, SearchMode::WorkingDirectory).with_start_dir(dir)
    }

    #[tokio::test]
    async fn returns_first_value_without_a_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".nrepl-port"), "7888%").unwrap();
        let connector = ScriptedConnector::new(|_| {
            vec![Message::new().with("value", "42"), done_frame()]
        });
        let log = connector.log();

        let out = eval_simple_with(&connector, &locator_in(dir.path()), "(* 3 14)").await;
        assert_eq!(out, "42");

        let sent = log.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].op(), Some("eval"));
        assert!(!sent[0].contains_key("session"));
        assert_eq!(log.closes(), 1);
    }

    #[tokio::test]
    async fn reports_no_result_for_a_bare_done() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".nrepl-port"), "7888").unwrap();
        let connector = ScriptedConnector::new(|_| vec![done_frame()]);

        let out = eval_simple_with(&connector, &locator_in(dir.path()), "nil").await;
        assert_eq!(out, NO_RESULT);
    }

    #[tokio::test]
    async fn missing_port_file_is_an_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let connector = ScriptedConnector::new(|_| Vec::new());

        let out = eval_simple_with(&connector, &locator_in(dir.path()), "1").await;
        assert_eq!(
            out,
            "Error: No .nrepl-port file found in current directory. Make sure your Clojure REPL is running."
        );
        assert_eq!(connector.log().connects(), 0);
    }
}
