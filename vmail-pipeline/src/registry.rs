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
use crate::{
    mailet::{self, Mailet, Parameters},
    matcher::{self, Matcher},
};
use vmail_common::re::anyhow::{self, Context};
use vmail_config::MatcherConfig;

type MatcherFactory = dyn Fn(Option<&str>) -> anyhow::Result<Box<dyn Matcher>> + Send + Sync;
type MailetFactory = dyn Fn(&Parameters<'_>) -> anyhow::Result<Box<dyn Mailet>> + Send + Sync;

const COMPOSITES: [&str; 3] = ["And", "Or", "Not"];

/// Factories of the matchers and mailets, by configuration identifier.
///
/// Identifiers are resolved when the pipeline is built, an unknown
/// identifier is an error of the configuration.
#[derive(Default)]
pub struct Registry {
    matchers: std::collections::HashMap<String, Box<MatcherFactory>>,
    mailets: std::collections::HashMap<String, Box<MailetFactory>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut matchers = self.matchers.keys().collect::<Vec<_>>();
        let mut mailets = self.mailets.keys().collect::<Vec<_>>();
        matchers.sort();
        mailets.sort();

        f.debug_struct("Registry")
            .field("matchers", &matchers)
            .field("mailets", &mailets)
            .finish()
    }
}

macro_rules! register_matchers {
    ($registry:expr, $($id:ident),* $(,)?) => {
        $(
            $registry.register_matcher(stringify!($id), |condition| {
                Ok(Box::new(matcher::$id::new(condition)?))
            });
        )*
    };
}

macro_rules! register_mailets {
    ($registry:expr, $($id:ident),* $(,)?) => {
        $(
            $registry.register_mailet(stringify!($id), |params| {
                Ok(Box::new(mailet::$id::new(params)?))
            });
        )*
    };
}

impl Registry {
    /// A registry without any matcher or mailet, the composites excepted.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the standard matchers and mailets.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        register_matchers!(
            registry,
            All,
            HostIsLocal,
            HostIs,
            RecipientIs,
            RecipientIsRegex,
            SenderIs,
            SenderIsNull,
            HasSingleRecipient,
            HasAttachment,
            SubjectIs,
            HasHeader,
            SizeGreaterThan,
            HasAttribute,
        );

        register_mailets!(
            registry,
            ToProcessor,
            Bounce,
            SetAttribute,
            RemoveAttribute,
            AddHeader,
            Forward,
            ToRepository,
            LocalDelivery,
            LogMessage,
        );
        registry.register_mailet("Null", |_| Ok(Box::new(mailet::Null)));
        registry.register_mailet("RemoveRecipients", |_| {
            Ok(Box::new(mailet::RemoveRecipients))
        });

        registry
    }

    /// Add a leaf matcher, replacing any matcher with the same identifier.
    ///
    /// The factory receives the condition written in the configuration.
    pub fn register_matcher<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn(Option<&str>) -> anyhow::Result<Box<dyn Matcher>> + Send + Sync + 'static,
    {
        self.matchers.insert(id.to_string(), Box::new(factory));
        self
    }

    /// Add a mailet, replacing any mailet with the same identifier.
    pub fn register_mailet<F>(&mut self, id: &str, factory: F) -> &mut Self
    where
        F: Fn(&Parameters<'_>) -> anyhow::Result<Box<dyn Mailet>> + Send + Sync + 'static,
    {
        self.mailets.insert(id.to_string(), Box::new(factory));
        self
    }

    /// Build a matcher and its children.
    ///
    /// # Errors
    ///
    /// * an identifier is not registered
    /// * a condition is malformed
    /// * a composite has a condition or no child, a leaf has children
    pub fn build_matcher(&self, config: &MatcherConfig) -> anyhow::Result<Box<dyn Matcher>> {
        if COMPOSITES.contains(&config.id.as_str()) {
            anyhow::ensure!(
                config.condition.is_none(),
                "composite matcher '{}' does not take a condition",
                config.id
            );

            let children = config
                .matchers
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    self.build_matcher(child)
                        .with_context(|| format!("in '{}' child {index}", config.id))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            return Ok(match config.id.as_str() {
                "And" => Box::new(matcher::And::new(children)?),
                "Or" => Box::new(matcher::Or::new(children)?),
                _ => Box::new(matcher::Not::new(children)?),
            });
        }

        anyhow::ensure!(
            config.matchers.is_empty(),
            "matcher '{}' is not a composite and cannot have child matchers",
            config.id
        );

        let factory = self
            .matchers
            .get(&config.id)
            .ok_or_else(|| anyhow::anyhow!("matcher '{}' is not registered", config.id))?;

        factory(config.condition.as_deref())
    }

    /// Build a mailet from its identifier and parameters.
    ///
    /// # Errors
    ///
    /// * the identifier is not registered
    /// * a parameter is missing or invalid
    pub fn build_mailet(&self, id: &str, params: &Parameters<'_>) -> anyhow::Result<Box<dyn Mailet>> {
        let factory = self
            .mailets
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("mailet '{id}' is not registered"))?;

        factory(params)
    }
}
