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
    re::{anyhow, async_trait, serde_json},
    Address, Mail,
};

mod attributes;
mod message;
mod routing;
mod storage;

pub use attributes::{RemoveAttribute, SetAttribute};
pub use message::{AddHeader, Forward, LogMessage, RemoveRecipients};
pub use routing::{Bounce, Null, ToProcessor};
pub use storage::{LocalDelivery, ToRepository};

/// What the pipeline does with a mail after a mailet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// go to the next step of the processor.
    Continue,
    /// dispatch the mail to another processor, skipping the remaining steps.
    Redirect(String),
    /// discard the mail now.
    Terminate,
    /// the mail cannot be processed, it is sent to the error processor.
    Fault(String),
}

/// The action of a processing step.
#[async_trait::async_trait]
pub trait Mailet: Send + Sync {
    /// identifier of the mailet, as written in the configuration.
    fn name(&self) -> &str;

    /// processors this mailet can send mails to, checked when the pipeline is built.
    fn targets(&self) -> Vec<&str> {
        vec![]
    }

    /// act on `mail` for the `matched` recipients.
    ///
    /// `matched` is never empty and is a subset of the mail's recipients.
    ///
    /// # Errors
    ///
    /// An error is handled as [`Outcome::Fault`], unless it is caused by
    /// a locked content, in which case the mail is processed again later.
    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        ctx: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome>;
}

/// Parameters of a mailet, as written in the configuration.
#[derive(Debug, Clone)]
pub struct Parameters<'a> {
    mailet: &'a str,
    values: &'a std::collections::BTreeMap<String, serde_json::Value>,
}

impl<'a> Parameters<'a> {
    ///
    #[must_use]
    pub const fn new(
        mailet: &'a str,
        values: &'a std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self { mailet, values }
    }

    /// raw value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.values.get(key)
    }

    /// # Errors
    ///
    /// * the parameter is not a string
    pub fn get_str(&self, key: &str) -> anyhow::Result<Option<&'a str>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(serde_json::Value::String(value)) => Ok(Some(value.as_str())),
            Some(otherwise) => anyhow::bail!(
                "mailet '{}': parameter '{key}' must be a string, got '{otherwise}'",
                self.mailet
            ),
        }
    }

    /// # Errors
    ///
    /// * the parameter is missing
    /// * the parameter is not a string
    pub fn require_str(&self, key: &str) -> anyhow::Result<&'a str> {
        self.get_str(key)?.ok_or_else(|| {
            anyhow::anyhow!("mailet '{}': parameter '{key}' is required", self.mailet)
        })
    }

    /// # Errors
    ///
    /// * the parameter is not a boolean
    pub fn get_bool(&self, key: &str, default: bool) -> anyhow::Result<bool> {
        match self.values.get(key) {
            None => Ok(default),
            Some(serde_json::Value::Bool(value)) => Ok(*value),
            Some(otherwise) => anyhow::bail!(
                "mailet '{}': parameter '{key}' must be a boolean, got '{otherwise}'",
                self.mailet
            ),
        }
    }

    /// a comma separated list of addresses.
    ///
    /// # Errors
    ///
    /// * the parameter is missing or not a string
    /// * an address is not valid
    pub fn require_addresses(&self, key: &str) -> anyhow::Result<Vec<Address>> {
        let addresses = self
            .require_str(key)?
            .split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(Address::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        anyhow::ensure!(
            !addresses.is_empty(),
            "mailet '{}': parameter '{key}' has no address",
            self.mailet
        );
        Ok(addresses)
    }
}

#[cfg(test)]
mod tests {
    use super::Parameters;
    use vmail_common::{collection, re::serde_json};

    #[test]
    fn typed_access() {
        let values: std::collections::BTreeMap<_, _> = collection! {
            "processor".to_string() => serde_json::json!("transport"),
            "passthrough".to_string() => serde_json::json!(true),
            "count".to_string() => serde_json::json!(3),
            "forward_to".to_string() => serde_json::json!("a@example.com, b@example.com"),
        };
        let params = Parameters::new("Test", &values);

        assert_eq!(params.require_str("processor").unwrap(), "transport");
        assert_eq!(params.get_str("missing").unwrap(), None);
        assert!(params.require_str("missing").is_err());
        assert!(params.get_str("count").is_err());
        assert!(params.get_bool("passthrough", false).unwrap());
        assert!(params.get_bool("missing", true).unwrap());
        assert!(params.get_bool("processor", false).is_err());
        assert_eq!(params.require_addresses("forward_to").unwrap().len(), 2);
        assert!(params.require_addresses("processor").is_err());
    }
}
