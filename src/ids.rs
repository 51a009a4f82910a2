use uuid::Uuid;

/// Source of opaque identifiers for sessions and tickets. Injected so tests
/// can produce deterministic ids instead of reaching for global randomness.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Production generator backed by uuid v4.
#[derive(Debug, Default, Clone)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
pub mod testing {
    use super::IdGenerator;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic generator for tests: "id-1", "id-2", ...
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        counter: AtomicU64,
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            format!("id-{n}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_generator_yields_unique_ids() {
        let ids = UuidGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
