//! Webhook identities, their credentials, and received messages.

pub mod credentials;
pub mod message;
pub mod webhook;

pub use credentials::{verify_secret, BasicAuth, CredentialHasher, HashConfig, HashError};
pub use message::{HeaderList, Message};
pub use webhook::{ValidationError, Webhook, WebhookCreated, WebhookInput};
