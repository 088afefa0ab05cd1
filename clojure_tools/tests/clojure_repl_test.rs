use pretty_assertions::assert_eq;

use clojure_tools::ClojureRepl;
use nrepl_protocol::client::MockReplClient;
use nrepl_protocol::{EvalResult, NreplError};

fn output(outputs: &[&str], values: &[&str], errors: &[&str]) -> EvalResult {
    EvalResult {
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
        values: values.iter().map(|s| s.to_string()).collect(),
        errors: errors.iter().map(|s| s.to_string()).collect(),
        ns: None,
    }
}

#[tokio::test]
async fn derived_operations_send_their_forms() {
    let mock = MockReplClient::new();
    let evaluated = mock.evaluated();
    let repl = ClojureRepl::with_client(mock);

    repl.require_namespace("clojure.string").await;
    repl.list_namespaces().await;
    repl.inspect_var("clojure.core/map").await;
    repl.show_classpath().await;
    repl.dir_namespace("clojure.set").await;
    repl.apropos("he said \"hi\"").await;
    repl.find_doc("reduce").await;
    repl.doc("conj").await;
    repl.source("filter").await;
    repl.get_namespace().await;

    assert_eq!(
        *evaluated.lock().unwrap(),
        vec![
            "(require 'clojure.string)",
            "(sort (map str (all-ns)))",
            "(meta (var clojure.core/map))",
            "(System/getProperty \"java.class.path\")",
            "(dir clojure.set)",
            "(apropos \"he said \\\"hi\\\"\")",
            "(find-doc \"reduce\")",
            "(doc conj)",
            "(source filter)",
            "*ns*",
        ]
    );
}

#[tokio::test]
async fn results_are_rendered() {
    let mut mock = MockReplClient::new();
    mock.push_result(Ok(output(&["a", "b"], &["1"], &[])))
        .push_result(Ok(output(&[], &[], &["boom\n"])))
        .push_result(Ok(EvalResult::default()));
    let repl = ClojureRepl::with_client(mock);

    assert_eq!(repl.eval_clojure("x").await, "Output:\nab\nResult: 1");
    assert_eq!(repl.eval_clojure("y").await, "Errors:\nboom\n");
    assert_eq!(repl.eval_clojure("z").await, "Evaluation completed with no output");
}

#[tokio::test]
async fn namespace_reports_first_value() {
    let mut mock = MockReplClient::new();
    mock.push_result(Ok(output(&[], &["my.app", "ignored"], &[])));
    let repl = ClojureRepl::with_client(mock);

    assert_eq!(repl.get_namespace().await, "Current namespace: my.app");
}

#[tokio::test]
async fn partial_output_survives_a_failure() {
    let mut mock = MockReplClient::new();
    mock.push_result(Err(NreplError::Incomplete {
        partial: output(&["step 1\n"], &[], &[]),
        source: Box::new(NreplError::ConnectionClosed),
    }));
    let repl = ClojureRepl::with_client(mock);

    assert_eq!(
        repl.eval_clojure("(run)").await,
        "Error evaluating Clojure code: nREPL server closed the connection\n\
         Partial output before failure:\nOutput:\nstep 1\n"
    );
}

#[tokio::test]
async fn close_twice_reports_both_outcomes() {
    let repl = ClojureRepl::with_client(MockReplClient::new());
    repl.eval_clojure("1").await;

    assert_eq!(repl.close_connection().await, "nREPL connection closed");
    assert_eq!(repl.close_connection().await, "No active connection to close");
}

#[tokio::test]
async fn load_file_evaluates_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("core.clj");
    std::fs::write(&path, "(ns demo.core)\n(defn f [] 1)\n").unwrap();

    let mut mock = MockReplClient::new();
    mock.push_value("#'demo.core/f");
    let evaluated = mock.evaluated();
    let repl = ClojureRepl::with_client(mock);

    assert_eq!(repl.load_file(&path).await, "Result: #'demo.core/f");
    assert_eq!(
        *evaluated.lock().unwrap(),
        vec!["(ns demo.core)\n(defn f [] 1)\n".to_string()]
    );
}

#[tokio::test]
async fn load_file_reports_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.clj");

    let mock = MockReplClient::new();
    let evaluated = mock.evaluated();
    let repl = ClojureRepl::with_client(mock);

    assert_eq!(
        repl.load_file(&path).await,
        format!("File not found: {}", path.display())
    );
    assert!(evaluated.lock().unwrap().is_empty());
}

#[tokio::test]
async fn load_file_reports_unreadable_path() {
    let dir = tempfile::tempdir().unwrap();

    let repl = ClojureRepl::with_client(MockReplClient::new());
    let text = repl.load_file(dir.path()).await;

    assert!(
        text.starts_with(&format!("Error loading file {}: ", dir.path().display())),
        "{}",
        text
    );
}
