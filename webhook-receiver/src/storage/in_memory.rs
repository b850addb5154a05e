use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, WebhookStorage};
use crate::model::{Message, Webhook};

/// Map-backed store with one read-write lock per collection.
///
/// Identities and message logs are guarded independently so that traffic on
/// one never blocks the other. Message operations check that the webhook
/// exists and then take the message lock; the two steps are not atomic, which
/// is only safe because webhooks are never removed.
#[derive(Default)]
pub struct InMemoryStore {
    webhooks: RwLock<HashMap<String, Arc<Webhook>>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WebhookStorage for InMemoryStore {
    fn insert_webhook(&self, mut webhook: Webhook) -> Result<String, StoreError> {
        let mut webhooks = self.webhooks.write();

        let id = Uuid::new_v4().to_string();
        webhook.id = id.clone();
        webhooks.insert(id.clone(), Arc::new(webhook));

        debug!(webhook_id = %id, webhook_count = webhooks.len(), "store_webhook_inserted");
        Ok(id)
    }

    fn get_webhook(&self, id: &str) -> Result<Arc<Webhook>, StoreError> {
        self.webhooks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn insert_message(&self, webhook_id: &str, message: Message) -> Result<(), StoreError> {
        self.get_webhook(webhook_id)?;

        let mut messages = self.messages.write();
        let log = messages.entry(webhook_id.to_string()).or_default();
        log.push(message);

        debug!(webhook_id = %webhook_id, message_count = log.len(), "store_message_appended");
        Ok(())
    }

    fn get_messages_for_webhook(&self, webhook_id: &str) -> Result<Vec<Message>, StoreError> {
        self.get_webhook(webhook_id)?;

        Ok(self
            .messages
            .read()
            .get(webhook_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CredentialHasher, HashConfig, HeaderList};
    use std::thread;

    fn message(payload: &str) -> Message {
        Message::new(payload.to_string(), HeaderList::new())
    }

    fn public_webhook() -> Webhook {
        Webhook::new("", "", "", "", &CredentialHasher::new(HashConfig::fast()))
    }

    #[test]
    fn test_insert_and_get_webhook() {
        let store = InMemoryStore::new();
        let id = store.insert_webhook(public_webhook()).unwrap();

        let webhook = store.get_webhook(&id).unwrap();
        assert_eq!(webhook.id, id);
    }

    #[test]
    fn test_insert_assigns_unique_ids() {
        let store = InMemoryStore::new();
        let first = store.insert_webhook(public_webhook()).unwrap();
        let second = store.insert_webhook(public_webhook()).unwrap();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_insert_overwrites_caller_id() {
        let store = InMemoryStore::new();
        let mut webhook = public_webhook();
        webhook.id = "chosen-by-caller".to_string();

        let id = store.insert_webhook(webhook).unwrap();
        assert_ne!(id, "chosen-by-caller");
        assert!(matches!(
            store.get_webhook("chosen-by-caller"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_webhook_not_found() {
        let store = InMemoryStore::new();

        match store.get_webhook("missing") {
            Err(StoreError::NotFound(id)) => assert_eq!(id, "missing"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        match store.insert_message("missing", message("body")) {
            Err(StoreError::NotFound(id)) => assert_eq!(id, "missing"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        match store.get_messages_for_webhook("missing") {
            Err(StoreError::NotFound(id)) => assert_eq!(id, "missing"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_message_does_not_create_webhook() {
        let store = InMemoryStore::new();
        let _ = store.insert_message("missing", message("body"));

        assert!(store.get_webhook("missing").is_err());
        assert!(store.messages.read().is_empty());
    }

    #[test]
    fn test_messages_empty_for_new_webhook() {
        let store = InMemoryStore::new();
        let id = store.insert_webhook(public_webhook()).unwrap();

        assert!(store.get_messages_for_webhook(&id).unwrap().is_empty());
    }

    #[test]
    fn test_messages_in_insertion_order() {
        let store = InMemoryStore::new();
        let id = store.insert_webhook(public_webhook()).unwrap();
        let m1 = message("first");
        let m2 = message("second");

        store.insert_message(&id, m1.clone()).unwrap();
        store.insert_message(&id, m2.clone()).unwrap();

        assert_eq!(store.get_messages_for_webhook(&id).unwrap(), vec![m1, m2]);
    }

    #[test]
    fn test_messages_are_per_webhook() {
        let store = InMemoryStore::new();
        let a = store.insert_webhook(public_webhook()).unwrap();
        let b = store.insert_webhook(public_webhook()).unwrap();

        store.insert_message(&a, message("for a")).unwrap();

        assert_eq!(store.get_messages_for_webhook(&a).unwrap().len(), 1);
        assert!(store.get_messages_for_webhook(&b).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_inserts_lose_nothing() {
        const WRITERS: usize = 64;

        let store = Arc::new(InMemoryStore::new());
        let id = store.insert_webhook(public_webhook()).unwrap();

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = id.clone();
                thread::spawn(move || store.insert_message(&id, message(&i.to_string())))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let log = store.get_messages_for_webhook(&id).unwrap();
        assert_eq!(log.len(), WRITERS);

        let mut payloads: Vec<usize> = log
            .iter()
            .map(|m| std::str::from_utf8(&m.payload).unwrap().parse().unwrap())
            .collect();
        payloads.sort_unstable();
        assert_eq!(payloads, (0..WRITERS).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_webhook_inserts() {
        let store = Arc::new(InMemoryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.insert_webhook(public_webhook()).unwrap())
            })
            .collect();
        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for id in &ids {
            assert_eq!(store.get_webhook(id).unwrap().id, *id);
        }
        assert_eq!(store.webhooks.read().len(), 16);
    }
}
