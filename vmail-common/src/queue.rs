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
use crate::Mail;

/// errors raised by a mail queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// the queue does not accept or deliver mails anymore.
    Closed,
    /// the queue is momentarily unavailable.
    Transient(String),
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => f.write_str("queue closed"),
            Self::Transient(message) => write!(f, "queue temporarily unavailable: {message}"),
        }
    }
}

impl std::error::Error for QueueError {}

/// hand-off of mails between the producers and the processing workers.
///
/// delivery is at-least-once: a mail may be dequeued more than once.
#[async_trait::async_trait]
pub trait MailQueue: Send + Sync {
    /// name of the queue.
    fn name(&self) -> &str;

    /// number of mails waiting in the queue.
    fn size(&self) -> usize;

    /// push a mail at the end of the queue.
    async fn enqueue(&self, mail: Mail) -> Result<(), QueueError>;

    /// pull the first mail of the queue, waiting if it is empty.
    async fn dequeue(&self) -> Result<Mail, QueueError>;
}
