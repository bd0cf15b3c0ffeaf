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
use vmail_common::MailQueue;

/// Read-only view of a queue.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QueueSnapshot {
    ///
    pub queue_name: String,
    /// mails waiting to be processed.
    pub queue_size: usize,
}

/// Exposes the state of a queue to the management interfaces.
pub struct ManagementReader {
    queue: std::sync::Arc<dyn MailQueue>,
}

impl ManagementReader {
    ///
    #[must_use]
    pub fn new(queue: std::sync::Arc<dyn MailQueue>) -> Self {
        Self { queue }
    }

    ///
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue_name: self.queue.name().to_string(),
            queue_size: self.queue.size(),
        }
    }
}
