use std::path::Path;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use nrepl_protocol::{ClientConfig, EvalResult, NreplClient, NreplError, ReplClient, ReplKind};

use crate::expressions;

/// Text-returning operations against one nREPL session.
///
/// Every method returns a `String`: the rendered result on success, or an
/// error line with a fixed prefix. Calls are serialized on the inner client,
/// so concurrent callers never interleave on the connection.
pub struct ClojureRepl<R: ReplClient = NreplClient> {
    client: Mutex<R>,
}

impl ClojureRepl<NreplClient> {
    /// Search upward from the working directory for the port file of `kind`.
    pub fn new(kind: ReplKind) -> Self {
        Self::from_config(&ClientConfig::for_kind(kind))
    }

    /// Accepts `"clj"` or `"cljs"`.
    pub fn for_repl_type(repl_type: &str) -> Result<Self, NreplError> {
        Ok(Self::new(repl_type.parse()?))
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        info!(
            "Creating {} REPL toolbox (search: {:?}, host: {})",
            config.repl_type, config.search, config.host
        );
        Self::with_client(NreplClient::from_config(config))
    }

    pub fn from_env() -> Result<Self, NreplError> {
        Ok(Self::from_config(&ClientConfig::from_env()?))
    }
}

impl Default for ClojureRepl<NreplClient> {
    fn default() -> Self {
        Self::new(ReplKind::default())
    }
}

impl<R: ReplClient> ClojureRepl<R> {
    pub fn with_client(client: R) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    pub async fn session_id(&self) -> Option<String> {
        self.client.lock().await.session_id().map(str::to_string)
    }

    /// Evaluate without rendering.
    pub async fn eval_result(&self, code: &str) -> Result<EvalResult, NreplError> {
        let mut client = self.client.lock().await;
        client.eval(code).await
    }

    pub async fn eval_clojure(&self, code: &str) -> String {
        debug!("eval_clojure: {}", code);
        match self.eval_result(code).await {
            Ok(result) => result.render(),
            Err(e) => {
                error!("eval_clojure failed: {}", e);
                format!("Error evaluating Clojure code: {}", e)
            }
        }
    }

    pub async fn get_namespace(&self) -> String {
        match self.eval_result(expressions::CURRENT_NAMESPACE).await {
            Ok(result) => {
                let namespace = result.values.first().map(String::as_str).unwrap_or("unknown");
                format!("Current namespace: {}", namespace)
            }
            Err(e) => {
                error!("get_namespace failed: {}", e);
                format!("Error getting namespace: {}", e)
            }
        }
    }

    pub async fn require_namespace(&self, namespace: &str) -> String {
        self.eval_clojure(&expressions::require_namespace(namespace)).await
    }

    pub async fn list_namespaces(&self) -> String {
        self.eval_clojure(expressions::LIST_NAMESPACES).await
    }

    pub async fn inspect_var(&self, var_name: &str) -> String {
        self.eval_clojure(&expressions::inspect_var(var_name)).await
    }

    pub async fn show_classpath(&self) -> String {
        self.eval_clojure(expressions::SHOW_CLASSPATH).await
    }

    pub async fn dir_namespace(&self, namespace: &str) -> String {
        self.eval_clojure(&expressions::dir_namespace(namespace)).await
    }

    pub async fn apropos(&self, pattern: &str) -> String {
        self.eval_clojure(&expressions::apropos(pattern)).await
    }

    pub async fn find_doc(&self, pattern: &str) -> String {
        self.eval_clojure(&expressions::find_doc(pattern)).await
    }

    pub async fn doc(&self, symbol: &str) -> String {
        self.eval_clojure(&expressions::doc(symbol)).await
    }

    pub async fn source(&self, symbol: &str) -> String {
        self.eval_clojure(&expressions::source(symbol)).await
    }

    /// Evaluate the whole contents of a source file.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();
        match read_source(path).await {
            Ok(code) => {
                info!("Loading {} ({} bytes)", path.display(), code.len());
                self.eval_clojure(&code).await
            }
            Err(e @ NreplError::FileNotFound(_)) => e.to_string(),
            Err(e) => {
                error!("load_file failed: {}", e);
                format!("Error loading file {}: {}", path.display(), e)
            }
        }
    }

    pub async fn close_connection(&self) -> String {
        let mut client = self.client.lock().await;
        match client.close().await {
            Ok(true) => "nREPL connection closed".to_string(),
            Ok(false) => "No active connection to close".to_string(),
            Err(e) => {
                error!("close_connection failed: {}", e);
                format!("Error closing connection: {}", e)
            }
        }
    }
}

async fn read_source(path: &Path) -> Result<String, NreplError> {
    if !tokio::fs::try_exists(path).await? {
        return Err(NreplError::FileNotFound(path.to_path_buf()));
    }
    Ok(tokio::fs::read_to_string(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrepl_protocol::client::MockReplClient;

    #[test]
    fn rejects_unknown_repl_type() {
        let err = ClojureRepl::for_repl_type("babashka").err().unwrap();
        assert_eq!(
            err.to_string(),
            "repl_type must be either 'clj' or 'cljs', got \"babashka\""
        );
        assert!(ClojureRepl::for_repl_type("cljs").is_ok());
    }

    #[tokio::test]
    async fn namespace_falls_back_to_unknown() {
        let repl = ClojureRepl::with_client(MockReplClient::new());
        assert_eq!(repl.get_namespace().await, "Current namespace: unknown");
    }

    #[tokio::test]
    async fn errors_carry_their_prefix() {
        let mut mock = MockReplClient::new();
        mock.push_result(Err(NreplError::ConnectionClosed))
            .push_result(Err(NreplError::ConnectionClosed));
        let repl = ClojureRepl::with_client(mock);

        assert_eq!(
            repl.eval_clojure("(+ 1 1)").await,
            "Error evaluating Clojure code: nREPL server closed the connection"
        );
        assert_eq!(
            repl.get_namespace().await,
            "Error getting namespace: nREPL server closed the connection"
        );
    }
}
