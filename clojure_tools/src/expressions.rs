//! Clojure forms sent by the convenience operations.
//!
//! Symbol and namespace arguments are spliced in as-is. Search patterns are
//! wrapped in a string literal with embedded double quotes escaped.

pub const CURRENT_NAMESPACE: &str = "*ns*";
pub const LIST_NAMESPACES: &str = "(sort (map str (all-ns)))";
pub const SHOW_CLASSPATH: &str = "(System/getProperty \"java.class.path\")";

pub fn require_namespace(namespace: &str) -> String {
    format!("(require '{})", namespace)
}

pub fn inspect_var(var_name: &str) -> String {
    format!("(meta (var {}))", var_name)
}

pub fn dir_namespace(namespace: &str) -> String {
    format!("(dir {})", namespace)
}

pub fn apropos(pattern: &str) -> String {
    format!("(apropos {})", string_literal(pattern))
}

pub fn find_doc(pattern: &str) -> String {
    format!("(find-doc {})", string_literal(pattern))
}

pub fn doc(symbol: &str) -> String {
    format!("(doc {})", symbol)
}

pub fn source(symbol: &str) -> String {
    format!("(source {})", symbol)
}

// Only `"` is escaped; backslashes pass through so regex patterns keep working.
fn string_literal(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}
