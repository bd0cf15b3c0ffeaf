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
use crate::{log_channels, Repository, RepositoryError};

/// how transient repository failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// number of retries after the first attempt.
    pub retry_max: usize,
    /// base delay between two attempts, multiplied by the attempt number.
    pub delay: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_max: 3,
            delay: std::time::Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// run `operation` until it succeeds, fails with a non transient error,
    /// or the retry budget is exhausted.
    ///
    /// # Errors
    ///
    /// * the last error returned by `operation`.
    pub async fn run<T, F, Fut>(&self, key: &str, mut operation: F) -> Result<T, RepositoryError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, RepositoryError>> + Send,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Err(error) if error.is_transient() && attempt < self.retry_max => {
                    attempt += 1;
                    log::warn!(
                        target: log_channels::CONTENT,
                        "'{key}': {error}, retrying ({attempt}/{})",
                        self.retry_max
                    );
                    tokio::time::sleep(
                        self.delay * u32::try_from(attempt).unwrap_or(u32::MAX),
                    )
                    .await;
                }
                otherwise => return otherwise,
            }
        }
    }
}

/// handle on the raw content (headers + body) of a mail.
///
/// the repository is read lazily on the first [`Content::open`] and the bytes
/// are kept until [`Content::reset`], so one processing pass reads the
/// storage at most once.
#[derive(Clone)]
pub struct Content {
    key: String,
    repository: std::sync::Arc<dyn Repository>,
    retry: RetryPolicy,
    cache: tokio::sync::OnceCell<std::sync::Arc<[u8]>>,
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("key", &self.key)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Content {
    /// create a handle on content already stored under `key`.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        repository: std::sync::Arc<dyn Repository>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            key: key.into(),
            repository,
            retry,
            cache: tokio::sync::OnceCell::new(),
        }
    }

    /// store `bytes` under `key` and return a handle on them.
    ///
    /// # Errors
    ///
    /// * the repository failed to store the bytes.
    pub async fn create(
        key: impl Into<String> + Send,
        repository: std::sync::Arc<dyn Repository>,
        retry: RetryPolicy,
        bytes: Vec<u8>,
    ) -> Result<Self, RepositoryError> {
        let mut content = Self::new(key, repository, retry);
        content.write(bytes).await?;
        Ok(content)
    }

    /// the repository key of this content.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// the repository behind this content.
    #[must_use]
    pub fn repository(&self) -> &std::sync::Arc<dyn Repository> {
        &self.repository
    }

    /// how the transient failures of the repository are retried.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// has the content been read during this pass ?
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cache.initialized()
    }

    /// get the bytes of the message, reading the repository only once.
    ///
    /// # Errors
    ///
    /// * the repository failed, transient failures are retried first.
    pub async fn open(&self) -> Result<std::sync::Arc<[u8]>, RepositoryError> {
        self.cache
            .get_or_try_init(|| async {
                log::trace!(target: log_channels::CONTENT, "reading '{}'", self.key);
                self.retry
                    .run(&self.key, || self.repository.open(&self.key))
                    .await
                    .map(std::sync::Arc::<[u8]>::from)
            })
            .await
            .map(std::sync::Arc::clone)
    }

    /// replace the content of the message.
    ///
    /// # Errors
    ///
    /// * the repository failed, transient failures are retried first.
    pub async fn write(&mut self, bytes: Vec<u8>) -> Result<(), RepositoryError> {
        self.retry
            .run(&self.key, || self.repository.store(&self.key, &bytes))
            .await?;
        self.cache = tokio::sync::OnceCell::new_with(Some(std::sync::Arc::from(bytes)));
        Ok(())
    }

    /// copy the content under another key of the same repository.
    ///
    /// # Errors
    ///
    /// * failed to read this content or to store the copy.
    pub async fn copy_to(&self, key: impl Into<String> + Send) -> Result<Self, RepositoryError> {
        let bytes = self.open().await?;
        Self::create(key, self.repository.clone(), self.retry, bytes.to_vec()).await
    }

    /// forget the bytes read so far, the next open reads the repository again.
    pub fn reset(&mut self) {
        self.cache = tokio::sync::OnceCell::new();
    }

    /// remove the content from the repository.
    ///
    /// # Errors
    ///
    /// * the repository failed to remove the content.
    pub async fn release(&self) -> Result<(), RepositoryError> {
        match self
            .retry
            .run(&self.key, || self.repository.remove(&self.key))
            .await
        {
            Ok(()) | Err(RepositoryError::NotFound(_)) => Ok(()),
            Err(error) => Err(error),
        }
    }
}
