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
    headers, re::log, Address, Content, Mail, MailQueue, QueueError, Recipients, Repository,
    RepositoryError, RetryPolicy, State,
};
use vmail_config::Config;

/// Why a mail handed over by a front-end has been refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryRejected {
    /// the mail has no recipient.
    NoRecipient,
    /// more recipients than `server.intake.rcpt_count_max`.
    TooManyRecipients {
        /// distinct recipients of the mail.
        count: usize,
        /// configured bound.
        max: usize,
    },
    /// the content is empty.
    EmptyContent,
    /// the content does not start with a header section.
    MissingHeaders,
    /// the content is larger than `server.intake.message_size_max`.
    TooLarge {
        /// size of the content in bytes.
        size: usize,
        /// configured bound.
        max: usize,
    },
    /// the content could not be stored.
    Storage(RepositoryError),
    /// the mail could not be queued.
    Queue(QueueError),
}

impl std::fmt::Display for DeliveryRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRecipient => f.write_str("the mail has no recipient"),
            Self::TooManyRecipients { count, max } => {
                write!(f, "too many recipients: {count} (max {max})")
            }
            Self::EmptyContent => f.write_str("the content of the mail is empty"),
            Self::MissingHeaders => f.write_str("the content of the mail has no header section"),
            Self::TooLarge { size, max } => {
                write!(f, "the mail is too large: {size} bytes (max {max})")
            }
            Self::Storage(error) => write!(f, "failed to store the mail: {error}"),
            Self::Queue(error) => write!(f, "failed to queue the mail: {error}"),
        }
    }
}

impl std::error::Error for DeliveryRejected {}

/// Entry point of the pipeline for the front-ends.
pub struct Intake {
    queue: std::sync::Arc<dyn MailQueue>,
    repository: std::sync::Arc<dyn Repository>,
    retry: RetryPolicy,
    root: String,
    rcpt_count_max: usize,
    message_size_max: usize,
}

impl Intake {
    ///
    #[must_use]
    pub fn new(
        config: &Config,
        queue: std::sync::Arc<dyn MailQueue>,
        repository: std::sync::Arc<dyn Repository>,
    ) -> Self {
        Self {
            queue,
            repository,
            retry: RetryPolicy {
                retry_max: config.server.queues.content.retry_max,
                delay: config.server.queues.content.retry_delay,
            },
            root: config.pipeline.root.clone(),
            rcpt_count_max: config.server.intake.rcpt_count_max,
            message_size_max: config.server.intake.message_size_max,
        }
    }

    fn check(&self, recipients: &Recipients, content: &[u8]) -> Result<(), DeliveryRejected> {
        if recipients.is_empty() {
            return Err(DeliveryRejected::NoRecipient);
        }
        if recipients.len() > self.rcpt_count_max {
            return Err(DeliveryRejected::TooManyRecipients {
                count: recipients.len(),
                max: self.rcpt_count_max,
            });
        }
        if content.is_empty() {
            return Err(DeliveryRejected::EmptyContent);
        }
        if content.len() > self.message_size_max {
            return Err(DeliveryRejected::TooLarge {
                size: content.len(),
                max: self.message_size_max,
            });
        }
        if !headers::has_header_section(content) {
            return Err(DeliveryRejected::MissingHeaders);
        }
        Ok(())
    }

    /// Store the content of a new mail and queue it for the root processor.
    ///
    /// Duplicated recipients are collapsed. Returns the id of the mail.
    ///
    /// # Errors
    ///
    /// * see [`DeliveryRejected`]
    pub async fn send_mail(
        &self,
        sender: Option<Address>,
        recipients: Vec<Address>,
        content: Vec<u8>,
    ) -> Result<String, DeliveryRejected> {
        let recipients = recipients.into_iter().collect::<Recipients>();
        if let Err(rejected) = self.check(&recipients, &content) {
            log::warn!(target: log_channels::INTAKE, "mail rejected: {rejected}");
            return Err(rejected);
        }

        let id = Mail::generate_id();
        let content = Content::create(id.clone(), self.repository.clone(), self.retry, content)
            .await
            .map_err(DeliveryRejected::Storage)?;

        let mut mail = Mail::new(id.clone(), sender, recipients, content);
        mail.state = State::Processor(self.root.clone());
        mail.content.reset();

        log::info!(target: log_channels::INTAKE, "{mail} received");

        let handle = mail.content.clone();
        if let Err(error) = self.queue.enqueue(mail).await {
            if let Err(release) = handle.release().await {
                log::warn!(
                    target: log_channels::INTAKE,
                    "'{id}' failed to release the content: {release}"
                );
            }
            return Err(DeliveryRejected::Queue(error));
        }

        Ok(id)
    }
}
