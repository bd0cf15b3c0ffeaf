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
    Address, Content, Mail, Recipients, State,
};

/// Discard the mail.
#[derive(Debug, Default)]
pub struct Null;

#[async_trait::async_trait]
impl Mailet for Null {
    fn name(&self) -> &str {
        "Null"
    }

    async fn service(
        &self,
        _: &mut Mail,
        _: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        Ok(Outcome::Terminate)
    }
}

/// Send the matched recipients to another processor.
///
/// When only some of the recipients are matched, they are split in a new
/// mail sent to `processor`, the others stay in the current processor.
#[derive(Debug)]
pub struct ToProcessor {
    processor: String,
    notice: Option<String>,
}

impl ToProcessor {
    /// # Errors
    ///
    /// * `processor` is missing
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            processor: params.require_str("processor")?.to_string(),
            notice: params.get_str("notice")?.map(str::to_string),
        })
    }
}

#[async_trait::async_trait]
impl Mailet for ToProcessor {
    fn name(&self) -> &str {
        "ToProcessor"
    }

    fn targets(&self) -> Vec<&str> {
        vec![&self.processor]
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        ctx: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        if let Some(notice) = &self.notice {
            mail.last_error = Some(notice.clone());
        }

        if matched.len() == mail.recipients.len() {
            return Ok(Outcome::Redirect(self.processor.clone()));
        }

        let mut split = mail.derive(matched.iter().cloned().collect()).await?;
        split.state = State::from(self.processor.as_str());
        mail.recipients.remove_all(matched);

        log::debug!(
            target: log_channels::MAILET,
            "'{}': {} recipient(s) split in '{}' for '{}'",
            mail.id(),
            matched.len(),
            split.id(),
            self.processor
        );
        ctx.emit(split);

        Ok(Outcome::Continue)
    }
}

/// Notify the sender that the mail could not be delivered to the matched recipients.
///
/// The notification has a null sender and is sent to `processor`
/// (the root processor by default). Mails with a null sender are never bounced.
#[derive(Debug)]
pub struct Bounce {
    processor: Option<String>,
    passthrough: bool,
}

impl Bounce {
    /// # Errors
    ///
    /// * a parameter has an invalid type
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            processor: params.get_str("processor")?.map(str::to_string),
            passthrough: params.get_bool("passthrough", false)?,
        })
    }

    fn notification(mail: &Mail, matched: &[Address], postmaster: &str, to: &Address) -> Vec<u8> {
        format!(
            "From: {postmaster}\r\n\
            To: {to}\r\n\
            Subject: Undelivered mail returned to sender\r\n\
            Auto-Submitted: auto-replied\r\n\
            \r\n\
            The mail '{}' could not be delivered to the following recipients:\r\n\
            \r\n\
            {}\r\n\
            \r\n\
            Reason: {}\r\n",
            mail.id(),
            matched
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\r\n"),
            mail.last_error.as_deref().unwrap_or("unknown error")
        )
        .into_bytes()
    }
}

#[async_trait::async_trait]
impl Mailet for Bounce {
    fn name(&self) -> &str {
        "Bounce"
    }

    fn targets(&self) -> Vec<&str> {
        self.processor.iter().map(String::as_str).collect()
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        ctx: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        match &mail.sender {
            None => {
                log::warn!(
                    target: log_channels::MAILET,
                    "'{}': not bouncing a mail with a null sender",
                    mail.id()
                );
            }
            Some(sender) => {
                let postmaster = format!("postmaster@{}", ctx.server().domain());
                let id = Mail::generate_id();
                let content = Content::create(
                    id.clone(),
                    mail.content.repository().clone(),
                    mail.content.retry(),
                    Self::notification(mail, matched, &postmaster, sender),
                )
                .await?;

                let mut bounce = Mail::new(
                    id,
                    None,
                    Recipients::from(vec![sender.clone()]),
                    content,
                );
                bounce.state = State::from(self.processor.as_deref().unwrap_or(ctx.root()));

                log::info!(
                    target: log_channels::MAILET,
                    "'{}': bounced to '{}' in '{}'",
                    mail.id(),
                    sender,
                    bounce.id()
                );
                ctx.emit(bounce);
            }
        }

        Ok(if self.passthrough {
            Outcome::Continue
        } else {
            Outcome::Terminate
        })
    }
}
