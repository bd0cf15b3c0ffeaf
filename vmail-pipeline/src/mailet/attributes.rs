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
use crate::MailetContext;
use vmail_common::{
    re::{anyhow, async_trait, serde_json},
    Address, Mail,
};

/// Set an attribute on the mail, replacing any previous value.
///
/// `value` is taken as written in the configuration (string, number, boolean, table ...).
#[derive(Debug)]
pub struct SetAttribute {
    name: String,
    value: serde_json::Value,
}

impl SetAttribute {
    /// # Errors
    ///
    /// * `name` or `value` is missing
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            name: params.require_str("name")?.to_string(),
            value: params
                .get("value")
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("mailet 'SetAttribute': parameter 'value' is required"))?,
        })
    }
}

#[async_trait::async_trait]
impl Mailet for SetAttribute {
    fn name(&self) -> &str {
        "SetAttribute"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        _: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        mail.attributes.insert(self.name.clone(), self.value.clone());
        Ok(Outcome::Continue)
    }
}

/// Remove an attribute from the mail, if present.
#[derive(Debug)]
pub struct RemoveAttribute {
    name: String,
}

impl RemoveAttribute {
    /// # Errors
    ///
    /// * `name` is missing
    pub fn new(params: &Parameters<'_>) -> anyhow::Result<Self> {
        Ok(Self {
            name: params.require_str("name")?.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Mailet for RemoveAttribute {
    fn name(&self) -> &str {
        "RemoveAttribute"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        _: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        mail.attributes.remove(&self.name);
        Ok(Outcome::Continue)
    }
}
