use uuid::Uuid;

/// Source of correlation identifiers for contexts at every level.
///
/// Identifiers are UUIDv4 strings: statistically unique within a process
/// lifetime, generated once at context construction and never reassigned.
pub struct IdGenerator;

impl IdGenerator {
    pub fn generate() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Joins identifier segments into an opaque correlation key.
///
/// Keys exist purely so log lines from different levels can be matched up
/// afterwards; they are never parsed back or used for routing.
pub(crate) fn correlation_key(parts: &[&str]) -> String {
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::{IdGenerator, correlation_key};

    #[test]
    fn generated_ids_are_unique_and_uuid_shaped() {
        let first = IdGenerator::generate();
        let second = IdGenerator::generate();
        assert_ne!(first, second);
        assert_eq!(first.len(), 36);
        assert_eq!(first.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn correlation_key_joins_segments_in_order() {
        let key = correlation_key(&["acct-1", "req-2", "sub-3"]);
        assert_eq!(key, "acct-1/req-2/sub-3");
    }
}
