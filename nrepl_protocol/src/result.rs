use std::fmt;

use crate::message::Message;

/// Text returned when an evaluation finished without producing anything.
pub const NO_OUTPUT: &str = "Evaluation completed with no output";

/// Everything collected from one `eval` exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalResult {
    /// `out` chunks in arrival order.
    pub outputs: Vec<String>,
    /// `value` entries in arrival order.
    pub values: Vec<String>,
    /// `err` chunks in arrival order.
    pub errors: Vec<String>,
    /// Last namespace the server reported.
    pub ns: Option<String>,
}

impl EvalResult {
    /// Fold one response frame into the result.
    pub fn absorb(&mut self, message: &Message) {
        if let Some(value) = message.value() {
            self.values.push(value.to_string());
        }
        if let Some(out) = message.out() {
            self.outputs.push(out.to_string());
        }
        if let Some(err) = message.err() {
            self.errors.push(err.to_string());
        }
        if let Some(ns) = message.ns() {
            self.ns = Some(ns.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.values.is_empty() && self.errors.is_empty()
    }

    /// Render as the single text block handed to callers.
    ///
    /// Sections appear in the order Output, Result, Errors and are joined by
    /// one newline. Outputs and errors are concatenated verbatim; values are
    /// space separated.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.outputs.is_empty() {
            parts.push(format!("Output:\n{}", self.outputs.concat()));
        }
        if !self.values.is_empty() {
            parts.push(format!("Result: {}", self.values.join(" ")));
        }
        if !self.errors.is_empty() {
            parts.push(format!("Errors:\n{}", self.errors.concat()));
        }
        if parts.is_empty() {
            return NO_OUTPUT.to_string();
        }
        parts.join("\n")
    }
}

impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
