//! String-returning Clojure REPL operations on top of [`nrepl_protocol`].

pub mod clojure_repl;
pub mod expressions;
pub mod logging;
pub mod simple_eval;

pub use clojure_repl::ClojureRepl;
pub use simple_eval::{eval_clojure_simple, NO_RESULT};
