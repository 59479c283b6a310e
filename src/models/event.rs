use std::fmt;

/// Kind of change carried by a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl EventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Added => "ADDED",
            EventType::Modified => "MODIFIED",
            EventType::Deleted => "DELETED",
        }
    }

    /// Parse from the wire name. Names are case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADDED" => Some(EventType::Added),
            "MODIFIED" => Some(EventType::Modified),
            "DELETED" => Some(EventType::Deleted),
            _ => None,
        }
    }

    /// Returns true if the raw wire value denotes a deletion.
    ///
    /// Anything that is not exactly `DELETED` is handled as an upsert.
    pub fn is_delete(raw: &str) -> bool {
        Self::parse(raw) == Some(EventType::Deleted)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(EventType::parse("ADDED"), Some(EventType::Added));
        assert_eq!(EventType::parse("MODIFIED"), Some(EventType::Modified));
        assert_eq!(EventType::parse("DELETED"), Some(EventType::Deleted));
        assert_eq!(EventType::parse("deleted"), None);
        assert_eq!(EventType::parse(""), None);
    }

    #[test]
    fn test_display_matches_wire_name() {
        for event in [EventType::Added, EventType::Modified, EventType::Deleted] {
            assert_eq!(EventType::parse(&event.to_string()), Some(event));
        }
    }

    #[test]
    fn test_is_delete() {
        assert!(EventType::is_delete("DELETED"));
        assert!(!EventType::is_delete("ADDED"));
        assert!(!EventType::is_delete("MODIFIED"));
        assert!(!EventType::is_delete("SOMETHING_ELSE"));
    }
}
