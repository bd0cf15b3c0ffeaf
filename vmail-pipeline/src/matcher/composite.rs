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
use super::Matcher;
use crate::MailetContext;
use vmail_common::{
    re::{anyhow, async_trait},
    Address, Mail,
};

/// Evaluate every child against the same candidates, in order.
///
/// All children are evaluated, there is no short-circuit.
async fn evaluate(
    children: &[Box<dyn Matcher>],
    mail: &Mail,
    candidates: &[Address],
    ctx: &MailetContext<'_>,
) -> anyhow::Result<Vec<Vec<Address>>> {
    let mut results = Vec::with_capacity(children.len());
    for child in children {
        results.push(child.matches(mail, candidates, ctx).await?);
    }
    Ok(results)
}

fn check_arity(id: &str, children: &[Box<dyn Matcher>]) -> anyhow::Result<()> {
    anyhow::ensure!(
        !children.is_empty(),
        "composite matcher '{id}' requires at least one child matcher"
    );
    Ok(())
}

/// Recipients selected by every child.
pub struct And {
    children: Vec<Box<dyn Matcher>>,
}

impl And {
    /// # Errors
    ///
    /// * `children` is empty
    pub fn new(children: Vec<Box<dyn Matcher>>) -> anyhow::Result<Self> {
        check_arity("And", &children)?;
        Ok(Self { children })
    }
}

#[async_trait::async_trait]
impl Matcher for And {
    fn name(&self) -> &str {
        "And"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        ctx: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        let results = evaluate(&self.children, mail, candidates, ctx).await?;
        Ok(candidates
            .iter()
            .filter(|rcpt| results.iter().all(|result| result.contains(rcpt)))
            .cloned()
            .collect())
    }
}

/// Recipients selected by at least one child.
pub struct Or {
    children: Vec<Box<dyn Matcher>>,
}

impl Or {
    /// # Errors
    ///
    /// * `children` is empty
    pub fn new(children: Vec<Box<dyn Matcher>>) -> anyhow::Result<Self> {
        check_arity("Or", &children)?;
        Ok(Self { children })
    }
}

#[async_trait::async_trait]
impl Matcher for Or {
    fn name(&self) -> &str {
        "Or"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        ctx: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        let results = evaluate(&self.children, mail, candidates, ctx).await?;
        Ok(candidates
            .iter()
            .filter(|rcpt| results.iter().any(|result| result.contains(rcpt)))
            .cloned()
            .collect())
    }
}

/// Recipients selected by none of the children.
pub struct Not {
    children: Vec<Box<dyn Matcher>>,
}

impl Not {
    /// # Errors
    ///
    /// * `children` is empty
    pub fn new(children: Vec<Box<dyn Matcher>>) -> anyhow::Result<Self> {
        check_arity("Not", &children)?;
        Ok(Self { children })
    }
}

#[async_trait::async_trait]
impl Matcher for Not {
    fn name(&self) -> &str {
        "Not"
    }

    async fn matches(
        &self,
        mail: &Mail,
        candidates: &[Address],
        ctx: &MailetContext<'_>,
    ) -> anyhow::Result<Vec<Address>> {
        let results = evaluate(&self.children, mail, candidates, ctx).await?;
        Ok(candidates
            .iter()
            .filter(|rcpt| !results.iter().any(|result| result.contains(rcpt)))
            .cloned()
            .collect())
    }
}
