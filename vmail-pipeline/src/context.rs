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
use vmail_common::Mail;
use vmail_config::Config;

/// Names the server receives mails for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    domain: String,
    local_domains: Vec<String>,
}

impl ServerIdentity {
    ///
    #[must_use]
    pub fn new(domain: &str, local_domains: &[String]) -> Self {
        Self {
            domain: domain.to_ascii_lowercase(),
            local_domains: local_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        }
    }

    ///
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.server.domain, &config.server.local_domains)
    }

    /// the main domain of the server.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// is `domain` one of the server's names ? (case-insensitive)
    #[must_use]
    pub fn is_local(&self, domain: &str) -> bool {
        self.domain.eq_ignore_ascii_case(domain)
            || self
                .local_domains
                .iter()
                .any(|local| local.eq_ignore_ascii_case(domain))
    }
}

/// Given to matchers and mailets on each call.
///
/// Mails created by a mailet (bounces, split recipients) are emitted in a
/// vector owned by the caller, which can release them if the pass is abandoned.
pub struct MailetContext<'a> {
    server: &'a ServerIdentity,
    root: &'a str,
    processor: String,
    derived: &'a mut Vec<Mail>,
}

impl<'a> MailetContext<'a> {
    ///
    #[must_use]
    pub fn new(server: &'a ServerIdentity, root: &'a str, derived: &'a mut Vec<Mail>) -> Self {
        Self {
            server,
            root,
            processor: String::new(),
            derived,
        }
    }

    ///
    #[must_use]
    pub const fn server(&self) -> &ServerIdentity {
        self.server
    }

    /// name of the processor new mails enter the pipeline with.
    #[must_use]
    pub const fn root(&self) -> &str {
        self.root
    }

    /// name of the processor being run.
    #[must_use]
    pub fn processor(&self) -> &str {
        &self.processor
    }

    pub(crate) fn enter(&mut self, processor: &str) {
        self.processor = processor.to_string();
    }

    /// send a new mail in the pipeline, it will be queued after this pass.
    pub fn emit(&mut self, mail: Mail) {
        self.derived.push(mail);
    }

    /// mails emitted so far.
    #[must_use]
    pub fn derived(&self) -> &[Mail] {
        self.derived
    }
}
