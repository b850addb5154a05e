//! Storage for webhook identities and their message logs.
//!
//! `WebhookStorage` is the seam a persistent backend would implement.
//! The only implementation today is [`InMemoryStore`], which lives for the
//! lifetime of the process.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Message, Webhook};

pub use in_memory::InMemoryStore;

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced webhook does not exist.
    #[error("Webhook with ID {0} not found")]
    NotFound(String),

    /// Any other backend failure.
    #[error("storage error: {0}")]
    Internal(String),
}

/// Keeper of webhook identities and their append-only message logs.
///
/// Operations are synchronous and expected to be quick; implementations must
/// be safe to share across concurrently running request handlers.
pub trait WebhookStorage: Send + Sync {
    /// Assign a fresh unique ID to `webhook`, store it, and return the ID.
    /// No validation is performed here.
    fn insert_webhook(&self, webhook: Webhook) -> Result<String, StoreError>;

    fn get_webhook(&self, id: &str) -> Result<Arc<Webhook>, StoreError>;

    /// Append a message to an existing webhook's log.
    fn insert_message(&self, webhook_id: &str, message: Message) -> Result<(), StoreError>;

    /// Full log in append order; empty if nothing was received yet.
    fn get_messages_for_webhook(&self, webhook_id: &str) -> Result<Vec<Message>, StoreError>;
}
