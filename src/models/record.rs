use serde_json::Value;

/// Resource type under which namespace records are stored.
pub const NAMESPACE_RESOURCE_TYPE: &str = "namespace";

/// Canonical stored form of a synced resource.
///
/// Stored as the underscore-prefixed document shape written by both
/// backends. The `uid` is not part of the document; each backend attaches it
/// as its own identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub event_type: String,
    pub resource_type: String,
    pub namespace: String,
    pub name: String,
    pub cluster: String,
    pub data: Value,
}

impl ResourceRecord {
    /// Converts the record into the JSON document handed to a backend.
    pub fn into_document(self) -> Value {
        serde_json::json!({
            "_event_type": self.event_type,
            "_resource_type": self.resource_type,
            "_namespace": self.namespace,
            "_name": self.name,
            "_cluster": self.cluster,
            "data": self.data,
        })
    }
}

/// Canonical stored form of a synced namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRecord {
    pub event_type: String,
    pub name: String,
    pub cluster: String,
    pub data: Value,
}

impl NamespaceRecord {
    pub fn into_document(self) -> Value {
        serde_json::json!({
            "_event_type": self.event_type,
            "_resource_type": NAMESPACE_RESOURCE_TYPE,
            "_name": self.name,
            "_cluster": self.cluster,
            "data": self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_document_shape() {
        let record = ResourceRecord {
            event_type: "ADDED".to_string(),
            resource_type: "pod".to_string(),
            namespace: "default".to_string(),
            name: "mypod".to_string(),
            cluster: "c1".to_string(),
            data: json!({"foo": "bar"}),
        };

        assert_eq!(
            record.into_document(),
            json!({
                "_event_type": "ADDED",
                "_resource_type": "pod",
                "_namespace": "default",
                "_name": "mypod",
                "_cluster": "c1",
                "data": {"foo": "bar"},
            })
        );
    }

    #[test]
    fn test_namespace_document_has_fixed_type_and_no_namespace() {
        let record = NamespaceRecord {
            event_type: "MODIFIED".to_string(),
            name: "default".to_string(),
            cluster: "c1".to_string(),
            data: json!({"n": "v"}),
        };

        let doc = record.into_document();
        assert_eq!(doc["_resource_type"], "namespace");
        assert_eq!(doc["_name"], "default");
        assert!(doc.get("_namespace").is_none());
    }
}
