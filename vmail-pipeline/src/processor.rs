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
    log_channels,
    mailet::{Mailet, Outcome, Parameters},
    matcher::Matcher,
    MailetContext, Registry,
};
use vmail_common::{
    re::{
        anyhow::{self, Context},
        log,
    },
    Mail, RepositoryError, State,
};
use vmail_config::{ConfigProcessor, ConfigStep};

/// A matcher and the mailet it selects recipients for.
pub struct Step {
    /// selection of the recipients.
    pub matcher: Box<dyn Matcher>,
    /// action on the selected recipients.
    pub mailet: Box<dyn Mailet>,
}

/// How a mail left a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// a mailet changed the state of the mail.
    Routed,
    /// every step ran without changing the state of the mail.
    FellThrough,
    /// a matcher or a mailet failed, with a diagnostic.
    Faulted(String),
    /// the content is locked by another process, the mail must be processed later.
    Contended(String),
}

/// A named and ordered list of steps, immutable once built.
pub struct Processor {
    name: String,
    steps: Vec<Step>,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name)
            .field(
                "steps",
                &self
                    .steps
                    .iter()
                    .map(|step| format!("{} -> {}", step.matcher.name(), step.mailet.name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Processor {
    ///
    #[must_use]
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Build the matchers and mailets of a processor's configuration.
    ///
    /// # Errors
    ///
    /// * a matcher or a mailet could not be built (see [`Registry`])
    pub fn build(config: &ConfigProcessor, registry: &Registry) -> anyhow::Result<Self> {
        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                Self::build_step(step, registry)
                    .with_context(|| format!("processor '{}' step {index}", config.name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self::new(&config.name, steps))
    }

    fn build_step(step: &ConfigStep, registry: &Registry) -> anyhow::Result<Step> {
        Ok(Step {
            matcher: registry.build_matcher(&step.matcher)?,
            mailet: registry
                .build_mailet(&step.mailet, &Parameters::new(&step.mailet, &step.params))?,
        })
    }

    ///
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// processors the mailets of this processor can send mails to.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|step| step.mailet.targets())
            .collect()
    }

    fn on_error(&self, mail: &Mail, index: usize, error: &anyhow::Error) -> Transition {
        if let Some(contention) = RepositoryError::find_contention(error) {
            log::debug!(
                target: log_channels::PROCESSOR,
                "[{}] '{}' step {index}: {contention}",
                self.name,
                mail.id()
            );
            Transition::Contended(contention.to_string())
        } else {
            Transition::Faulted(format!("{error:#}"))
        }
    }

    /// Run the steps against `mail`, until one of them changes its state.
    ///
    /// The state of the mail when it enters is its "unchanged" state,
    /// a mailet returning [`Outcome::Continue`] after setting another state
    /// also ends the processor.
    pub async fn run(&self, mail: &mut Mail, ctx: &mut MailetContext<'_>) -> Transition {
        for (index, step) in self.steps.iter().enumerate() {
            if mail.recipients.is_empty() {
                log::trace!(
                    target: log_channels::PROCESSOR,
                    "[{}] '{}' has no recipient left, skipping step {index}",
                    self.name,
                    mail.id()
                );
                continue;
            }

            let candidates = mail.recipients.as_slice().to_vec();
            let mut matched = match step.matcher.matches(mail, &candidates, ctx).await {
                Ok(matched) => matched,
                Err(error) => {
                    return self.on_error(
                        mail,
                        index,
                        &error.context(format!("matcher '{}'", step.matcher.name())),
                    )
                }
            };
            matched.retain(|rcpt| candidates.contains(rcpt));

            log::trace!(
                target: log_channels::PROCESSOR,
                "[{}] '{}' step {index}: '{}' matched {}/{}",
                self.name,
                mail.id(),
                step.matcher.name(),
                matched.len(),
                candidates.len()
            );

            if matched.is_empty() {
                continue;
            }

            let state_before = mail.state.clone();
            match step.mailet.service(mail, &matched, ctx).await {
                Ok(Outcome::Continue) if mail.state == state_before => {}
                Ok(Outcome::Continue) => return Transition::Routed,
                Ok(Outcome::Redirect(next)) => {
                    mail.state = State::from(next);
                    return Transition::Routed;
                }
                Ok(Outcome::Terminate) => {
                    mail.state = State::Ghost;
                    return Transition::Routed;
                }
                Ok(Outcome::Fault(detail)) => {
                    return Transition::Faulted(format!(
                        "mailet '{}': {detail}",
                        step.mailet.name()
                    ))
                }
                Err(error) => {
                    return self.on_error(
                        mail,
                        index,
                        &error.context(format!("mailet '{}'", step.mailet.name())),
                    )
                }
            }
        }

        Transition::FellThrough
    }
}
