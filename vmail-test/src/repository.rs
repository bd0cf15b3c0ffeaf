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
use vmail_common::{re::async_trait, MemoryRepository, Repository, RepositoryError};

/// [`MemoryRepository`] counting its reads.
#[derive(Debug, Default)]
pub struct CountingRepository {
    inner: MemoryRepository,
    reads: std::sync::atomic::AtomicUsize,
}

impl CountingRepository {
    /// number of [`Repository::open`] calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// bytes stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).unwrap()
    }

    /// keys stored, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys().unwrap()
    }
}

#[async_trait::async_trait]
impl Repository for CountingRepository {
    async fn open(&self, key: &str) -> Result<Vec<u8>, RepositoryError> {
        self.reads
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.open(key).await
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        self.inner.store(key, bytes).await
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.inner.remove(key).await
    }
}

/// In-memory repository whose reads fail a given number of times.
#[derive(Debug, Default)]
pub struct FlakyRepository {
    inner: CountingRepository,
    transient: std::sync::atomic::AtomicUsize,
    locked: std::sync::atomic::AtomicUsize,
}

impl FlakyRepository {
    /// the next `count` reads fail with [`RepositoryError::Transient`].
    pub fn fail_transient(&self, count: usize) {
        self.transient
            .store(count, std::sync::atomic::Ordering::SeqCst);
    }

    /// the next `count` reads fail with [`RepositoryError::Locked`].
    pub fn fail_locked(&self, count: usize) {
        self.locked
            .store(count, std::sync::atomic::Ordering::SeqCst);
    }

    /// the repository behind the failures.
    #[must_use]
    pub const fn inner(&self) -> &CountingRepository {
        &self.inner
    }

    fn consume(counter: &std::sync::atomic::AtomicUsize) -> bool {
        counter
            .fetch_update(
                std::sync::atomic::Ordering::SeqCst,
                std::sync::atomic::Ordering::SeqCst,
                |n| n.checked_sub(1),
            )
            .is_ok()
    }
}

#[async_trait::async_trait]
impl Repository for FlakyRepository {
    async fn open(&self, key: &str) -> Result<Vec<u8>, RepositoryError> {
        if Self::consume(&self.locked) {
            return Err(RepositoryError::Locked(key.to_string()));
        }
        if Self::consume(&self.transient) {
            return Err(RepositoryError::Transient(key.to_string()));
        }
        self.inner.open(key).await
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        self.inner.store(key, bytes).await
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.inner.remove(key).await
    }
}
