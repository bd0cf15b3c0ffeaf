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
    re::{anyhow, async_trait, log},
    Address, Mail,
};

/// Store a copy of the message under `{repository}/{id}`.
///
/// The mail is discarded afterwards unless `passthrough` is set.
#[derive(Debug)]
pub struct ToRepository {
    repository: String,
    passthrough: bool,
}

impl ToRepository {
    /// # Errors
    ///
    /// * `repository` is missing
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            repository: params.require_str("repository")?.to_string(),
            passthrough: params.get_bool("passthrough", false)?,
        })
    }
}

#[async_trait::async_trait]
impl Mailet for ToRepository {
    fn name(&self) -> &str {
        "ToRepository"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        _: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        let key = format!("{}/{}", self.repository, mail.id());
        mail.content.copy_to(key.clone()).await?;

        log::debug!(target: log_channels::MAILET, "'{}': stored in '{key}'", mail.id());

        Ok(if self.passthrough {
            Outcome::Continue
        } else {
            Outcome::Terminate
        })
    }
}

/// Deliver the message to the mailbox of each matched recipient,
/// stored under `{repository}/{recipient}/{id}`.
///
/// Delivered recipients are removed, the mail is discarded when none remain.
#[derive(Debug)]
pub struct LocalDelivery {
    repository: String,
}

impl LocalDelivery {
    /// # Errors
    ///
    /// * `repository` is not a string
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            repository: params
                .get_str("repository")?
                .unwrap_or("mailboxes")
                .to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Mailet for LocalDelivery {
    fn name(&self) -> &str {
        "LocalDelivery"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        for rcpt in matched {
            let key = format!("{}/{}/{}", self.repository, rcpt.canonical(), mail.id());
            mail.content.copy_to(key).await?;

            log::info!(
                target: log_channels::MAILET,
                "'{}': delivered to '{rcpt}'",
                mail.id()
            );
        }
        mail.recipients.remove_all(matched);

        Ok(if mail.recipients.is_empty() {
            Outcome::Terminate
        } else {
            Outcome::Continue
        })
    }
}
