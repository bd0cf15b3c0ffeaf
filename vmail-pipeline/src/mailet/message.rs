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
use super::{Mailet, Outcome, Parameters};
use crate::{log_channels, MailetContext};
use vmail_common::{
    headers,
    re::{anyhow, async_trait, log},
    Address, Mail,
};

/// Prepend a header to the message.
#[derive(Debug)]
pub struct AddHeader {
    name: String,
    value: String,
}

impl AddHeader {
    /// # Errors
    ///
    /// * `name` or `value` is missing
    /// * `name` is not a valid header name
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        let name = params.require_str("name")?;
        anyhow::ensure!(
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_graphic() && c != ':'),
            "mailet 'AddHeader': '{name}' is not a valid header name"
        );

        Ok(Self {
            name: name.to_string(),
            value: params.require_str("value")?.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Mailet for AddHeader {
    fn name(&self) -> &str {
        "AddHeader"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        _: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        let raw = mail.content.open().await?;
        let updated = headers::prepend(&raw, &self.name, &self.value);
        mail.content.write(updated).await?;

        Ok(Outcome::Continue)
    }
}

/// Remove the matched recipients, the mail is discarded when none remain.
#[derive(Debug, Default)]
pub struct RemoveRecipients;

#[async_trait::async_trait]
impl Mailet for RemoveRecipients {
    fn name(&self) -> &str {
        "RemoveRecipients"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        mail.recipients.remove_all(matched);

        Ok(if mail.recipients.is_empty() {
            Outcome::Terminate
        } else {
            Outcome::Continue
        })
    }
}

/// Replace the matched recipients with the addresses of `forward_to`.
#[derive(Debug)]
pub struct Forward {
    forward_to: Vec<Address>,
}

impl Forward {
    /// # Errors
    ///
    /// * `forward_to` is missing or holds an invalid address
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            forward_to: params.require_addresses("forward_to")?,
        })
    }
}

#[async_trait::async_trait]
impl Mailet for Forward {
    fn name(&self) -> &str {
        "Forward"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        mail.recipients.remove_all(matched);
        for address in &self.forward_to {
            mail.recipients.insert(address.clone());
        }

        log::debug!(
            target: log_channels::MAILET,
            "'{}': {} recipient(s) forwarded to {}",
            mail.id(),
            matched.len(),
            mail.recipients
        );

        Ok(Outcome::Continue)
    }
}

/// Write a line about the mail in the application logs.
#[derive(Debug)]
pub struct LogMessage {
    comment: Option<String>,
}

impl LogMessage {
    /// # Errors
    ///
    /// * `comment` is not a string
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            comment: params.get_str("comment")?.map(str::to_string),
        })
    }
}

#[async_trait::async_trait]
impl Mailet for LogMessage {
    fn name(&self) -> &str {
        "LogMessage"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        ctx: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        log::info!(
            target: vmail_config::log_channel::APP,
            "[{}] {}: from={} matched={} {}",
            ctx.processor(),
            mail.id(),
            mail.reverse_path(),
            matched.len(),
            self.comment.as_deref().unwrap_or_default()
        );

        Ok(Outcome::Continue)
    }
}
