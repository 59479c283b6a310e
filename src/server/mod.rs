//! Sync RPC service: request messages, the handler and the HTTP router.

pub mod handler;
pub mod messages;
pub mod rpc;

pub use handler::{SyncHandler, NO_UID_MESSAGE};
pub use messages::{SyncNamespaceRequest, SyncResourceRequest, SyncResponse};
pub use rpc::router;
