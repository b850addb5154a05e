//! Webhook receiver - a small multi-tenant mailbox for webhook callbacks.
//!
//! Callers register a webhook, optionally protected by Basic-Auth
//! credentials or a shared-secret header token. External services POST
//! payloads to the webhook's URL; payloads are appended to that webhook's
//! message log and can be read back with GET.
//!
//! ## Architecture
//!
//! ```text
//! HTTP → web (routing, JSON, auth) → storage (identities + message logs)
//!                  ↓
//!            model (webhook identity, credentials, messages)
//! ```
//!
//! All state is in memory and lives for the lifetime of the process.

pub mod config;
pub mod model;
pub mod storage;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use model::{BasicAuth, CredentialHasher, HashConfig, Message, ValidationError, Webhook};
pub use storage::{InMemoryStore, StoreError, WebhookStorage};
pub use web::{router, AppState};
