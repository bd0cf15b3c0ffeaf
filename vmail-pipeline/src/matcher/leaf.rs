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
use super::{all_if, Matcher};
use crate::MailetContext;
use vmail_common::{
    headers,
    re::{
        anyhow::{self, Context},
        async_trait,
    },
    Address, Mail,
};

fn required<'a>(id: &str, condition: Option<&'a str>) -> anyhow::Result<&'a str> {
    match condition.map(str::trim) {
        Some(condition) if !condition.is_empty() => Ok(condition),
        _ => anyhow::bail!("matcher '{id}' requires a condition"),
    }
}

fn forbidden(id: &str, condition: Option<&str>) -> anyhow::Result<()> {
    anyhow::ensure!(
        condition.is_none(),
        "matcher '{id}' does not take a condition, got '{}'",
        condition.unwrap_or_default()
    );
    Ok(())
}

fn split_list(condition: &str) -> impl Iterator<Item = &str> {
    condition
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

macro_rules! unconditional {
    ($matcher:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default)]
        pub struct $matcher;

        impl $matcher {
            /// # Errors
            ///
            /// * a condition is given
            pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
                forbidden(stringify!($matcher), condition)?;
                Ok(Self)
            }
        }
    };
}

unconditional!(All, "Every recipient.");
unconditional!(
    HostIsLocal,
    "Recipients whose domain is one of the server's names."
);
unconditional!(SenderIsNull, "Every recipient of a bounce (null sender).");
unconditional!(
    HasSingleRecipient,
    "Every recipient when the mail has exactly one."
);
unconditional!(
    HasAttachment,
    "Every recipient when the message carries an attachment."
);

#[async_trait::async_trait]
impl Matcher for All {
    fn name(&self) -> &str {
        "All"
    }

    async fn matches(
        &self,
        _: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(candidates.to_vec())
    }
}

#[async_trait::async_trait]
impl Matcher for HostIsLocal {
    fn name(&self) -> &str {
        "HostIsLocal"
    }

    async fn matches(
        &self,
        _: &Mail,
        candidates: &[Address],
        ctx: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(candidates
            .iter()
            .filter(|rcpt| ctx.server().is_local(rcpt.domain()))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl Matcher for SenderIsNull {
    fn name(&self) -> &str {
        "SenderIsNull"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(all_if(mail.sender.is_none(), candidates))
    }
}

#[async_trait::async_trait]
impl Matcher for HasSingleRecipient {
    fn name(&self) -> &str {
        "HasSingleRecipient"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(all_if(mail.recipients.len() == 1, candidates))
    }
}

#[async_trait::async_trait]
impl Matcher for HasAttachment {
    fn name(&self) -> &str {
        "HasAttachment"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        let content = mail.content.open().await?;
        Ok(all_if(headers::has_attachment(&content), candidates))
    }
}

/// Recipients whose domain is in a list.
///
/// condition: `example.com, example.org`
#[derive(Debug)]
pub struct HostIs {
    domains: Vec<String>,
}

impl HostIs {
    /// # Errors
    ///
    /// * no domain is given
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        let domains = split_list(required("HostIs", condition)?)
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>();
        anyhow::ensure!(!domains.is_empty(), "matcher 'HostIs' requires a domain");
        Ok(Self { domains })
    }
}

#[async_trait::async_trait]
impl Matcher for HostIs {
    fn name(&self) -> &str {
        "HostIs"
    }

    async fn matches(
        &self,
        _: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(candidates
            .iter()
            .filter(|rcpt| {
                self.domains
                    .iter()
                    .any(|domain| domain.eq_ignore_ascii_case(rcpt.domain()))
            })
            .cloned()
            .collect())
    }
}

/// Recipients equal to an address of a list.
///
/// condition: `john@example.com, jane@example.com`
#[derive(Debug)]
pub struct RecipientIs {
    addresses: Vec<Address>,
}

impl RecipientIs {
    /// # Errors
    ///
    /// * no address is given
    /// * an address is not valid
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        let addresses = split_list(required("RecipientIs", condition)?)
            .map(Address::try_from)
            .collect::<anyhow::Result<Vec<_>>>()
            .context("matcher 'RecipientIs' has an invalid condition")?;
        anyhow::ensure!(
            !addresses.is_empty(),
            "matcher 'RecipientIs' requires an address"
        );
        Ok(Self { addresses })
    }
}

#[async_trait::async_trait]
impl Matcher for RecipientIs {
    fn name(&self) -> &str {
        "RecipientIs"
    }

    async fn matches(
        &self,
        _: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(candidates
            .iter()
            .filter(|rcpt| self.addresses.contains(rcpt))
            .cloned()
            .collect())
    }
}

/// Recipients whose full address matches a regular expression.
#[derive(Debug)]
pub struct RecipientIsRegex {
    regex: regex::Regex,
}

impl RecipientIsRegex {
    /// # Errors
    ///
    /// * the condition is not a valid regular expression
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        let condition = required("RecipientIsRegex", condition)?;
        Ok(Self {
            regex: regex::Regex::new(condition)
                .with_context(|| format!("matcher 'RecipientIsRegex': invalid regex '{condition}'"))?,
        })
    }
}

#[async_trait::async_trait]
impl Matcher for RecipientIsRegex {
    fn name(&self) -> &str {
        "RecipientIsRegex"
    }

    async fn matches(
        &self,
        _: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(candidates
            .iter()
            .filter(|rcpt| self.regex.is_match(rcpt.full()))
            .cloned()
            .collect())
    }
}

/// Every recipient when the sender is in a list, `<>` stands for the null sender.
#[derive(Debug)]
pub struct SenderIs {
    senders: Vec<Option<Address>>,
}

impl SenderIs {
    /// # Errors
    ///
    /// * no sender is given
    /// * an address is not valid
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        let senders = split_list(required("SenderIs", condition)?)
            .map(|sender| match sender {
                "<>" => Ok(None),
                _ => Address::try_from(sender).map(Some),
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .context("matcher 'SenderIs' has an invalid condition")?;
        anyhow::ensure!(!senders.is_empty(), "matcher 'SenderIs' requires a sender");
        Ok(Self { senders })
    }
}

#[async_trait::async_trait]
impl Matcher for SenderIs {
    fn name(&self) -> &str {
        "SenderIs"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(all_if(self.senders.contains(&mail.sender), candidates))
    }
}

/// Every recipient when the subject of the message is the condition.
#[derive(Debug)]
pub struct SubjectIs {
    subject: String,
}

impl SubjectIs {
    /// # Errors
    ///
    /// * no subject is given
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self {
            subject: required("SubjectIs", condition)?.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Matcher for SubjectIs {
    fn name(&self) -> &str {
        "SubjectIs"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        let content = mail.content.open().await?;
        let headers = headers::parse(&content);
        Ok(all_if(
            headers::get(&headers, "Subject") == Some(self.subject.as_str()),
            candidates,
        ))
    }
}

/// Every recipient when the message has a header, optionally with a value.
///
/// condition: `X-Spam` or `X-Spam=yes`
#[derive(Debug)]
pub struct HasHeader {
    header: String,
    value: Option<String>,
}

impl HasHeader {
    /// # Errors
    ///
    /// * no header name is given
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        let condition = required("HasHeader", condition)?;
        let (header, value) = match condition.split_once('=') {
            Some((header, value)) => (header.trim(), Some(value.trim().to_string())),
            None => (condition, None),
        };
        anyhow::ensure!(
            !header.is_empty() && !header.contains(char::is_whitespace),
            "matcher 'HasHeader': invalid header name '{header}'"
        );
        Ok(Self {
            header: header.to_string(),
            value,
        })
    }
}

#[async_trait::async_trait]
impl Matcher for HasHeader {
    fn name(&self) -> &str {
        "HasHeader"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        let content = mail.content.open().await?;
        let headers = headers::parse(&content);
        let found = match (headers::get(&headers, &self.header), &self.value) {
            (Some(value), Some(expected)) => value == expected,
            (Some(_), None) => true,
            (None, _) => false,
        };
        Ok(all_if(found, candidates))
    }
}

/// Every recipient when the message is larger than a size, in bytes.
///
/// condition: `1000`, `500k` or `10m`
#[derive(Debug)]
pub struct SizeGreaterThan {
    size: usize,
}

impl SizeGreaterThan {
    /// # Errors
    ///
    /// * the condition is not a size
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        let condition = required("SizeGreaterThan", condition)?.to_ascii_lowercase();
        let (digits, unit) = match condition.strip_suffix('k') {
            Some(digits) => (digits, 1024),
            None => match condition.strip_suffix('m') {
                Some(digits) => (digits, 1024 * 1024),
                None => (condition.as_str(), 1),
            },
        };
        let size = digits
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|size| size.checked_mul(unit))
            .ok_or_else(|| {
                anyhow::anyhow!("matcher 'SizeGreaterThan': invalid size '{condition}'")
            })?;
        Ok(Self { size })
    }
}

#[async_trait::async_trait]
impl Matcher for SizeGreaterThan {
    fn name(&self) -> &str {
        "SizeGreaterThan"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        Ok(all_if(mail.content.open().await?.len() > self.size, candidates))
    }
}

/// Every recipient when an attribute is set on the mail.
#[derive(Debug)]
pub struct HasAttribute {
    key: String,
}

impl HasAttribute {
    /// # Errors
    ///
    /// * no attribute key is given
    pub fn new(condition: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self {
            key: required("HasAttribute", condition)?.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Matcher for HasAttribute {
    fn name(&self) -> &str {
        "HasAttribute"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        _: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        Ok(all_if(mail.attributes.contains_key(&self.key), candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions() {
        assert!(All::new(None).is_ok());
        assert!(All::new(Some("foo")).is_err());
        assert!(HostIs::new(None).is_err());
        assert!(HostIs::new(Some(" , ")).is_err());
        assert!(RecipientIs::new(Some("not an address")).is_err());
        assert!(RecipientIsRegex::new(Some("(unclosed")).is_err());
        assert!(SenderIs::new(Some("<>, john@doe.com")).is_ok());
        assert!(HasHeader::new(Some("X Spam")).is_err());
        assert!(SizeGreaterThan::new(Some("ten")).is_err());
    }

    #[test]
    fn sizes() {
        assert_eq!(SizeGreaterThan::new(Some("1000")).unwrap().size, 1000);
        assert_eq!(SizeGreaterThan::new(Some("2k")).unwrap().size, 2048);
        assert_eq!(SizeGreaterThan::new(Some("1M")).unwrap().size, 1_048_576);
    }

    #[test]
    fn header_condition() {
        let matcher = HasHeader::new(Some("X-Spam = yes")).unwrap();
        assert_eq!(matcher.header, "X-Spam");
        assert_eq!(matcher.value.as_deref(), Some("yes"));
    }
}
