use dashmap::DashMap;

use veil_crypto::Tails;

use crate::error::CredentialError;

/// Publishes a tails blob and returns where it can be fetched from.
pub trait TailsWriter {
    fn write(&self, tails: &Tails) -> Result<String, CredentialError>;
}

/// Fetches a previously published tails blob.
pub trait TailsReader {
    fn read(&self, location: &str) -> Result<Tails, CredentialError>;
}

/// Content-addressed in-memory tails store. Locations are the blob's hash.
#[derive(Default)]
pub struct InMemoryTailsStore {
    blobs: DashMap<String, Tails>,
}

impl InMemoryTailsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.blobs.len()
    }
}

impl TailsWriter for InMemoryTailsStore {
    fn write(&self, tails: &Tails) -> Result<String, CredentialError> {
        let location = tails.content_hash();
        self.blobs.insert(location.clone(), tails.clone());
        tracing::debug!(location = %location, capacity = tails.capacity(), "tails stored");
        Ok(location)
    }
}

impl TailsReader for InMemoryTailsStore {
    fn read(&self, location: &str) -> Result<Tails, CredentialError> {
        self.blobs
            .get(location)
            .map(|entry| entry.clone())
            .ok_or_else(|| CredentialError::TailsNotFound(location.to_string()))
    }
}
