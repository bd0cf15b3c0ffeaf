/*
 * vMail mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 *  This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 **/
/// errors raised by a content repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// the storage is momentarily unavailable, the operation can be retried.
    Transient(String),
    /// the stored message is exclusively held by someone else, try again later.
    Locked(String),
    /// no content is stored under this key.
    NotFound(String),
    /// any other failure, permanent.
    Other(String),
}

impl RepositoryError {
    /// can the operation be retried right away ?
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// is the content held by another process ?
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::Locked(_))
    }

    /// look for a contention error in an error chain.
    #[must_use]
    pub fn find_contention(error: &anyhow::Error) -> Option<&Self> {
        error
            .chain()
            .filter_map(|e| e.downcast_ref::<Self>())
            .find(|e| e.is_contention())
    }
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(key) => write!(f, "repository temporarily unavailable for '{key}'"),
            Self::Locked(key) => write!(f, "'{key}' is locked by another process"),
            Self::NotFound(key) => write!(f, "'{key}' not found in the repository"),
            Self::Other(message) => write!(f, "repository error: {message}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// a byte storage holding the content of the mails.
///
/// implementations are responsible for their own locking.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// read the whole content stored under `key`.
    async fn open(&self, key: &str) -> Result<Vec<u8>, RepositoryError>;

    /// store `bytes` under `key`, replacing any previous content.
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), RepositoryError>;

    /// remove the content stored under `key`.
    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;
}

/// Contents kept in memory, lost when the process stops.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryRepository {
    fn entries(
        &self,
    ) -> Result<
        std::sync::MutexGuard<'_, std::collections::HashMap<String, Vec<u8>>>,
        RepositoryError,
    > {
        self.entries
            .lock()
            .map_err(|_| RepositoryError::Other("memory repository mutex poisoned".to_string()))
    }

    /// bytes stored under `key`, without going through [`Repository::open`].
    ///
    /// # Errors
    ///
    /// * the mutex is poisoned
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        Ok(self.entries()?.get(key).cloned())
    }

    /// keys stored, sorted.
    ///
    /// # Errors
    ///
    /// * the mutex is poisoned
    pub fn keys(&self) -> Result<Vec<String>, RepositoryError> {
        let mut keys = self.entries()?.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    async fn open(&self, key: &str) -> Result<Vec<u8>, RepositoryError> {
        self.get(key)?
            .ok_or_else(|| RepositoryError::NotFound(key.to_string()))
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        self.entries()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.entries()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(key.to_string()))
    }
}
