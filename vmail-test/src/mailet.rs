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
use vmail_common::{
    re::{anyhow, async_trait},
    Address, Mail,
};
use vmail_pipeline::{Mailet, MailetContext, Outcome, Parameters, Registry};

/// A call of the [`Recording`] mailet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// `tag` parameter of the mailet.
    pub tag: String,
    /// processor the mailet was run in.
    pub processor: String,
    /// id of the mail.
    pub mail: String,
    /// recipients the mailet was called for.
    pub matched: Vec<String>,
}

/// Calls shared between the test and the mailets.
#[derive(Debug, Clone, Default)]
pub struct Calls(std::sync::Arc<std::sync::Mutex<Vec<Call>>>);

impl Calls {
    /// every call so far.
    #[must_use]
    pub fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// the tags of the calls so far.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.tag.clone())
            .collect()
    }
}

/// Record its calls and continue.
pub struct Recording {
    tag: String,
    calls: Calls,
}

#[async_trait::async_trait]
impl Mailet for Recording {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn service(
        &self,
        mail: &mut Mail,
        matched: &[Address],
        ctx: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        self.calls.0.lock().unwrap().push(Call {
            tag: self.tag.clone(),
            processor: ctx.processor().to_string(),
            mail: mail.id().to_string(),
            matched: matched.iter().map(ToString::to_string).collect(),
        });
        Ok(Outcome::Continue)
    }
}

/// Never completes, the pass can only be abandoned.
pub struct Pending;

#[async_trait::async_trait]
impl Mailet for Pending {
    fn name(&self) -> &str {
        "Pending"
    }

    async fn service(
        &self,
        _: &mut Mail,
        _: &[Address],
        _: &mut MailetContext<'_>,
    ) -> anyhow::Result<Outcome> {
        std::future::pending().await
    }
}

/// The standard registry, with the `Recording` mailet writing in `calls`
/// and the `Pending` mailet.
///
/// `Recording` takes a required `tag` parameter.
#[must_use]
pub fn registry(calls: &Calls) -> Registry {
    let calls = calls.clone();
    let mut registry = Registry::standard();
    registry.register_mailet("Recording", move |params: &Parameters<'_>| {
        Ok(Box::new(Recording {
            tag: params.require_str("tag")?.to_string(),
            calls: calls.clone(),
        }))
    });
    registry.register_mailet("Pending", |_: &Parameters<'_>| Ok(Box::new(Pending)));
    registry
}
