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
use crate::log_channels;
use vmail_common::{
    re::{anyhow, async_trait, log},
    Repository, RepositoryError,
};

/// One file per key, under the queues directory.
///
/// The `/` of a key are directories: `mailboxes/john@example.com/{id}`.
#[derive(Debug, Clone)]
pub struct FileRepository {
    dirpath: std::path::PathBuf,
}

fn map_io_error(key: &str, error: &std::io::Error) -> RepositoryError {
    match error.kind() {
        std::io::ErrorKind::NotFound => RepositoryError::NotFound(key.to_string()),
        std::io::ErrorKind::Interrupted
        | std::io::ErrorKind::TimedOut
        | std::io::ErrorKind::WouldBlock => RepositoryError::Transient(key.to_string()),
        _ => RepositoryError::Other(format!("'{key}': {error}")),
    }
}

impl FileRepository {
    /// Create the directory if missing.
    ///
    /// # Errors
    ///
    /// * failed to create the directory
    pub fn new(dirpath: impl Into<std::path::PathBuf>) -> anyhow::Result<Self> {
        let dirpath = dirpath.into();
        if !dirpath.exists() {
            std::fs::DirBuilder::new()
                .recursive(true)
                .create(&dirpath)
                .map_err(|error| {
                    anyhow::anyhow!("cannot create repository at {dirpath:?}: {error}")
                })?;
        }
        Ok(Self { dirpath })
    }

    /// the path of the file holding `key`.
    ///
    /// # Errors
    ///
    /// * the key is empty or escapes the repository directory
    pub fn to_path(&self, key: &str) -> Result<std::path::PathBuf, RepositoryError> {
        let relative = std::path::Path::new(key);
        if key.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, std::path::Component::Normal(_)))
        {
            return Err(RepositoryError::Other(format!("invalid key '{key}'")));
        }
        Ok(self.dirpath.join(relative))
    }
}

#[async_trait::async_trait]
impl Repository for FileRepository {
    async fn open(&self, key: &str) -> Result<Vec<u8>, RepositoryError> {
        let path = self.to_path(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|error| map_io_error(key, &error))
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), RepositoryError> {
        let path = self.to_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| map_io_error(key, &error))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| map_io_error(key, &error))?;

        log::trace!(target: log_channels::REPOSITORY, "'{key}' written to {path:?}");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        let path = self.to_path(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|error| map_io_error(key, &error))
    }
}
