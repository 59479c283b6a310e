mod event;
mod record;

pub use event::EventType;
pub use record::{NamespaceRecord, ResourceRecord, NAMESPACE_RESOURCE_TYPE};
