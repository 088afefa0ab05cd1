use std::collections::BTreeMap;

use crate::bencode::Value;

/// Op name for creating a session.
pub const OP_CLONE: &str = "clone";
/// Op name for evaluating code.
pub const OP_EVAL: &str = "eval";
/// Status flag that ends a response stream.
pub const STATUS_DONE: &str = "done";

/// One nREPL frame: a dictionary of string keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: BTreeMap<String, Value>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn op(&self) -> Option<&str> {
        self.get_str("op")
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn session(&self) -> Option<&str> {
        self.get_str("session")
    }

    pub fn code(&self) -> Option<&str> {
        self.get_str("code")
    }

    pub fn value(&self) -> Option<&str> {
        self.get_str("value")
    }

    pub fn out(&self) -> Option<&str> {
        self.get_str("out")
    }

    pub fn err(&self) -> Option<&str> {
        self.get_str("err")
    }

    pub fn ns(&self) -> Option<&str> {
        self.get_str("ns")
    }

    pub fn new_session(&self) -> Option<&str> {
        self.get_str("new-session")
    }

    /// Status flags. A bare string is accepted as a single flag since some
    /// servers are loose about it.
    pub fn status(&self) -> Vec<&str> {
        match self.get("status") {
            Some(Value::List(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::Str(flag)) => vec![flag.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn has_status(&self, flag: &str) -> bool {
        self.status().contains(&flag)
    }

    /// True when this frame terminates the response stream.
    pub fn is_done(&self) -> bool {
        self.has_status(STATUS_DONE)
    }

    pub fn into_value(self) -> Value {
        Value::Dict(self.fields)
    }
}

impl From<BTreeMap<String, Value>> for Message {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

/// Requests this client knows how to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Ask the server for a fresh session.
    Clone { id: String },
    /// Evaluate `code`, optionally inside `session`.
    Eval {
        id: String,
        code: String,
        session: Option<String>,
    },
}

impl Request {
    pub fn id(&self) -> &str {
        match self {
            Request::Clone { id } | Request::Eval { id, .. } => id,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Request::Clone { .. } => OP_CLONE,
            Request::Eval { .. } => OP_EVAL,
        }
    }

    pub fn into_message(self) -> Message {
        let op = self.op();
        match self {
            Request::Clone { id } => Message::new().with("op", op).with("id", id),
            Request::Eval { id, code, session } => {
                let mut message = Message::new()
                    .with("op", op)
                    .with("id", id)
                    .with("code", code);
                if let Some(session) = session {
                    message.insert("session", session);
                }
                message
            }
        }
    }
}
