use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::{Error, Message};

/// A message that can be handed to several threads.
///
/// Every operation takes the message's own lock for its whole duration, so
/// two threads appending tags or rendering the same message never observe
/// a half done CEE promotion. Distinct messages never contend.
#[derive(Clone, Debug, Default)]
pub struct SharedMessage {
    inner: Arc<Mutex<Message>>,
}

impl From<Message> for SharedMessage {
    fn from(msg: Message) -> Self {
        SharedMessage {
            inner: Arc::new(Mutex::new(msg)),
        }
    }
}

impl SharedMessage {
    pub fn new(msg: Message) -> Self {
        SharedMessage::from(msg)
    }

    /// Hold the lock for a sequence of operations.
    ///
    /// A panic in another holder does not leave the message half updated
    /// (every mutation commits at once), so a poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Message> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_tag(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock().add_tag(key, value)
    }

    pub fn add_to_tag_array(&self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.lock().add_to_tag_array(key, value)
    }

    pub fn set_content(&self, raw: &str) -> Result<(), Error> {
        self.lock().set_content(raw)
    }

    pub fn to_text(&self) -> Result<String, Error> {
        self.lock().to_text()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        self.lock().to_json()
    }

    /// A copy of the message as it is right now.
    pub fn snapshot(&self) -> Message {
        self.lock().clone()
    }
}
