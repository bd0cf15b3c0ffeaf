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
use crate::{log_channels, processes::spool::stopping, DeliveryRejected, Intake};
use vmail_common::{
    re::{anyhow, log, serde_json},
    Address, MailQueue, QueueError,
};

/// A mail dropped in the pickup directory, as a json file.
///
/// ```json
/// {
///   "sender": "john@doe.com",
///   "recipients": ["jane@example.com"],
///   "message": "Subject: hello\r\n\r\nbody\r\n"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct PickupMessage {
    /// emitter of the mail, absent for a null sender.
    #[serde(default)]
    pub sender: Option<Address>,
    /// recipients of the mail.
    pub recipients: Vec<Address>,
    /// raw content of the message.
    pub message: String,
}

/// the pickup directory under the queues directory.
#[must_use]
pub fn pickup_dir(dirpath: &std::path::Path) -> std::path::PathBuf {
    dirpath.join("pickup")
}

/// can the same file be handed over again later ?
fn is_retryable(rejected: &DeliveryRejected) -> bool {
    match rejected {
        DeliveryRejected::Storage(error) => error.is_transient() || error.is_contention(),
        DeliveryRejected::Queue(QueueError::Transient(_) | QueueError::Closed) => true,
        _ => false,
    }
}

async fn set_aside(path: &std::path::Path, reason: &str) {
    let rejected = path.with_extension("rejected");
    log::warn!(
        target: log_channels::PICKUP,
        "{path:?} rejected: {reason}, moved to {rejected:?}"
    );
    if let Err(error) = tokio::fs::rename(path, &rejected).await {
        log::error!(
            target: log_channels::PICKUP,
            "failed to move {path:?} to {rejected:?}: {error}"
        );
    }
}

/// Hand the json files of the pickup directory over to `intake`, in the
/// order of their names. Returns the number of mails accepted.
///
/// An accepted file is removed. A file which cannot be parsed or whose
/// mail is refused is renamed with the `.rejected` extension. A file whose
/// mail could not be stored or queued for now is kept for the next scan.
///
/// # Errors
///
/// * the pickup directory cannot be read
pub async fn scan(dir: &std::path::Path, intake: &Intake) -> anyhow::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|error| anyhow::anyhow!("cannot read the pickup directory {dir:?}: {error}"))?;

    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |extension| extension == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut accepted = 0;
    for path in files {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                log::warn!(target: log_channels::PICKUP, "cannot read {path:?}: {error}");
                continue;
            }
        };
        let message = match serde_json::from_slice::<PickupMessage>(&bytes) {
            Ok(message) => message,
            Err(error) => {
                set_aside(&path, &error.to_string()).await;
                continue;
            }
        };

        match intake
            .send_mail(
                message.sender,
                message.recipients,
                message.message.into_bytes(),
            )
            .await
        {
            Ok(id) => {
                log::info!(target: log_channels::PICKUP, "{path:?} picked up as '{id}'");
                accepted += 1;
                if let Err(error) = tokio::fs::remove_file(&path).await {
                    log::error!(
                        target: log_channels::PICKUP,
                        "'{id}' queued but {path:?} cannot be removed: {error}"
                    );
                }
            }
            Err(rejected) if is_retryable(&rejected) => {
                log::warn!(
                    target: log_channels::PICKUP,
                    "{path:?} not picked up: {rejected}, kept for the next scan"
                );
            }
            Err(rejected) => set_aside(&path, &rejected.to_string()).await,
        }
    }

    Ok(accepted)
}

/// Scan the pickup directory every `interval` until `shutdown` is set to true.
///
/// # Errors
///
/// * the pickup directory cannot be read
pub async fn start(
    dir: std::path::PathBuf,
    interval: std::time::Duration,
    intake: std::sync::Arc<Intake>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    log::info!(
        target: log_channels::PICKUP,
        "watching {dir:?} every {interval:?}"
    );

    loop {
        let accepted = scan(&dir, &intake).await?;
        if accepted != 0 {
            log::debug!(target: log_channels::PICKUP, "{accepted} mail(s) picked up");
        }

        tokio::select! {
            biased;
            () = stopping(&mut shutdown) => break,
            () = tokio::time::sleep(interval) => {},
        }
    }

    log::debug!(target: log_channels::PICKUP, "stopped");
    Ok(())
}

/// Write the mails left in `queue` back to the pickup directory and
/// release their content, so they are processed again on the next start.
///
/// The mails restart from the root processor, their attributes are lost.
/// Returns the number of mails written.
///
/// # Errors
///
/// * the queue cannot be read
pub async fn store_back(dir: &std::path::Path, queue: &dyn MailQueue) -> anyhow::Result<usize> {
    let mut written = 0;

    while queue.size() != 0 {
        let mail = queue.dequeue().await?;

        let bytes = match mail.content.open().await {
            Ok(bytes) => bytes,
            Err(error) => {
                log::error!(
                    target: log_channels::PICKUP,
                    "'{}' cannot be stored back, its content is unreadable: {error}",
                    mail.id()
                );
                continue;
            }
        };
        let message = PickupMessage {
            sender: mail.sender.clone(),
            recipients: mail.recipients.iter().cloned().collect(),
            message: String::from_utf8_lossy(&bytes).into_owned(),
        };

        let path = dir.join(format!("{}.json", mail.id()));
        let stored = match serde_json::to_vec_pretty(&message) {
            Ok(json) => tokio::fs::write(&path, json).await.map_err(anyhow::Error::new),
            Err(error) => Err(anyhow::Error::new(error)),
        };
        if let Err(error) = stored {
            log::error!(
                target: log_channels::PICKUP,
                "'{}' cannot be stored back to {path:?}: {error}, its content is kept at '{}'",
                mail.id(),
                mail.content.key()
            );
            continue;
        }

        if let Err(error) = mail.content.release().await {
            log::warn!(
                target: log_channels::PICKUP,
                "'{}' failed to release the content: {error}",
                mail.id()
            );
        }
        log::info!(target: log_channels::PICKUP, "'{}' stored back to {path:?}", mail.id());
        written += 1;
    }

    Ok(written)
}
