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
use vmail_common::{re::async_trait, Mail, MailQueue, QueueError};

/// Bounded in-memory FIFO shared by the front-ends and the workers.
///
/// Several workers can wait on [`MailQueue::dequeue`], each mail is handed
/// to one of them. A mail cannot be queued while the queue is full, the
/// producer gets a [`QueueError::Transient`] and tries again later.
pub struct MemoryQueue {
    name: String,
    size: std::sync::atomic::AtomicUsize,
    sender: std::sync::Mutex<Option<tokio::sync::mpsc::Sender<Mail>>>,
    receiver: tokio::sync::Mutex<tokio::sync::mpsc::Receiver<Mail>>,
}

impl std::fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

impl MemoryQueue {
    /// a queue holding at most `capacity` mails (at least one).
    #[must_use]
    pub fn new(name: &str, capacity: usize) -> Self {
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity.max(1));
        Self {
            name: name.to_string(),
            size: std::sync::atomic::AtomicUsize::new(0),
            sender: std::sync::Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    /// stop accepting mails, the mails already queued can still be dequeued.
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

#[async_trait::async_trait]
impl MailQueue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn enqueue(&self, mail: Mail) -> Result<(), QueueError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| QueueError::Transient("queue mutex poisoned".to_string()))?;

        self.size
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let sent = match sender.as_ref() {
            Some(sender) => sender.try_send(mail).map_err(|error| match error {
                tokio::sync::mpsc::error::TrySendError::Full(_) => {
                    QueueError::Transient(format!("queue '{}' is full", self.name))
                }
                tokio::sync::mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            }),
            None => Err(QueueError::Closed),
        };
        if sent.is_err() {
            self.size
                .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        }
        sent
    }

    async fn dequeue(&self) -> Result<Mail, QueueError> {
        let mail = self
            .receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(QueueError::Closed)?;
        self.size
            .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        Ok(mail)
    }
}
