use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Generates unique `id` values for nREPL requests
pub struct IdGenerator {
    counter: AtomicU64,
    use_uuid: bool,
}

impl IdGenerator {
    pub fn new(use_uuid: bool) -> Self {
        Self {
            counter: AtomicU64::new(1),
            use_uuid,
        }
    }

    /// Sequential ids, handy when tests want to predict them.
    pub fn new_numeric() -> Self {
        Self::new(false)
    }

    pub fn new_uuid() -> Self {
        Self::new(true)
    }

    pub fn next_id(&self) -> String {
        if self.use_uuid {
            Uuid::new_v4().to_string()
        } else {
            self.counter.fetch_add(1, Ordering::SeqCst).to_string()
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new_uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_count_up() {
        let ids = IdGenerator::new_numeric();
        assert_eq!(ids.next_id(), "1");
        assert_eq!(ids.next_id(), "2");
    }

    #[test]
    fn uuid_ids_differ() {
        let ids = IdGenerator::new_uuid();
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
