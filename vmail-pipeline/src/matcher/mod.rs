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
use crate::MailetContext;
use vmail_common::{
    re::{anyhow, async_trait},
    Address, Mail,
};

mod composite;
mod leaf;

pub use composite::{And, Not, Or};
pub use leaf::{
    All, HasAttachment, HasAttribute, HasHeader, HasSingleRecipient, HostIs, HostIsLocal,
    RecipientIs, RecipientIsRegex, SenderIs, SenderIsNull, SizeGreaterThan, SubjectIs,
};

/// Select the recipients a step applies to.
///
/// The condition of a matcher is parsed when it is built, a malformed
/// condition is an error of the configuration.
#[async_trait::async_trait]
pub trait Matcher: Send + Sync {
    /// identifier of the matcher, as written in the configuration.
    fn name(&self) -> &str;

    /// return the subset of `candidates` for which the condition holds.
    ///
    /// `candidates` are the recipients of `mail` considered by the caller,
    /// the mail itself is never modified.
    ///
    /// # Errors
    ///
    /// * the content of the mail could not be read
    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        ctx: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>>;
}

/// every candidate when `condition` is true, none otherwise.
fn all_if(condition: bool, candidates: &[Address]) -> Vec<Address> {
    if condition {
        candidates.to_vec()
    } else {
        vec![]
    }
}
