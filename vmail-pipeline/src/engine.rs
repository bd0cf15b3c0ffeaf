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
use crate::{log_channels, MailetContext, Processor, Registry, ServerIdentity, Transition};
use vmail_common::{
    re::{
        anyhow::{self, Context},
        log,
    },
    Mail, State,
};
use vmail_config::{Config, FallThrough};

/// How a pass through the pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// the mail reached the ghost state, its content has been released.
    Discarded,
    /// the mail could not be routed, with the diagnostic that has been logged.
    Dropped(String),
    /// the content of the mail is locked, the mail must be processed again later.
    Deferred(String),
}

/// Result of [`RoutingEngine::process`].
#[derive(Debug)]
pub struct PassReport {
    ///
    pub disposition: Disposition,
    /// mails created during the pass, to be queued by the caller.
    pub derived: Vec<Mail>,
}

/// Moves the mails from processor to processor until a terminal state.
///
/// Built once from the configuration, read-only afterward.
#[derive(Debug)]
pub struct RoutingEngine {
    processors: std::collections::HashMap<String, Processor>,
    root: String,
    error: Option<String>,
    max_hops: usize,
    fall_through: FallThrough,
    server: ServerIdentity,
}

impl RoutingEngine {
    /// Build every processor of the configuration.
    ///
    /// # Errors
    ///
    /// * a matcher or a mailet could not be built
    /// * a processor name is defined twice
    /// * the root or error processor is not defined
    /// * a mailet sends mails to a processor which is not defined
    pub fn new(config: &Config, registry: &Registry) -> anyhow::Result<Self> {
        let pipeline = &config.pipeline;
        anyhow::ensure!(pipeline.max_hops >= 1, "'max_hops' must be at least 1");

        let mut processors = std::collections::HashMap::with_capacity(pipeline.processors.len());
        for processor in &pipeline.processors {
            let built = Processor::build(processor, registry)?;
            anyhow::ensure!(
                processors
                    .insert(processor.name.clone(), built)
                    .is_none(),
                "processor '{}' is defined more than once",
                processor.name
            );
        }

        anyhow::ensure!(
            processors.contains_key(&pipeline.root),
            "root processor '{}' is not defined",
            pipeline.root
        );
        if let Some(error) = &pipeline.error {
            anyhow::ensure!(
                processors.contains_key(error),
                "error processor '{error}' is not defined"
            );
        }

        for processor in processors.values() {
            for target in processor.targets() {
                anyhow::ensure!(
                    State::is_reserved(target) || processors.contains_key(target),
                    "processor '{}' sends mails to '{target}' which is not defined",
                    processor.name()
                );
            }
        }

        log::debug!(
            target: log_channels::ENGINE,
            "pipeline built: {} processors, root='{}', error={:?}",
            processors.len(),
            pipeline.root,
            pipeline.error
        );

        Ok(Self {
            processors,
            root: pipeline.root.clone(),
            error: pipeline.error.clone(),
            max_hops: pipeline.max_hops,
            fall_through: pipeline.fall_through,
            server: ServerIdentity::from_config(config),
        })
    }

    /// Build the engine with the standard matchers and mailets.
    ///
    /// # Errors
    ///
    /// * see [`RoutingEngine::new`]
    pub fn with_standard_registry(config: &Config) -> anyhow::Result<Self> {
        Self::new(config, &Registry::standard()).context("failed to build the pipeline")
    }

    /// name of the processor new mails are dispatched to.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    ///
    #[must_use]
    pub fn error_processor(&self) -> Option<&str> {
        self.error.as_deref()
    }

    ///
    #[must_use]
    pub const fn max_hops(&self) -> usize {
        self.max_hops
    }

    ///
    #[must_use]
    pub fn processor(&self, name: &str) -> Option<&Processor> {
        self.processors.get(name)
    }

    fn drop_mail(mail: &Mail, diagnostic: String) -> Disposition {
        log::error!(
            target: log_channels::ENGINE,
            "'{}' dropped: {diagnostic}",
            mail.id()
        );
        Disposition::Dropped(diagnostic)
    }

    /// Dispatch `mail` to the processor named by its state, until the mail
    /// is discarded, dropped or deferred.
    ///
    /// The content of a discarded or dropped mail is released. The mails
    /// emitted by the mailets are returned, unless the mail is deferred.
    pub async fn process(&self, mail: &mut Mail) -> PassReport {
        let mut derived = vec![];
        let disposition = self.process_into(mail, &mut derived).await;
        PassReport {
            disposition,
            derived,
        }
    }

    /// Same as [`RoutingEngine::process`], the mails emitted by the mailets
    /// are pushed in `derived` as soon as they are created.
    ///
    /// If the returned future is dropped before completion, the mails pushed
    /// so far are left in `derived` and their content must be released by
    /// the caller. If the mail is deferred, they are released and removed.
    pub async fn process_into(&self, mail: &mut Mail, derived: &mut Vec<Mail>) -> Disposition {
        mail.content.reset();
        mail.hop_count = 0;

        let emitted_before = derived.len();
        let mut ctx = MailetContext::new(&self.server, &self.root, derived);
        let mut loop_detected = false;
        let mut loop_handled = false;

        let disposition = loop {
            let name = match &mail.state {
                State::Ghost => break Disposition::Discarded,
                State::Error => match &self.error {
                    Some(error) => error.clone(),
                    None => {
                        break Self::drop_mail(
                            mail,
                            mail.last_error
                                .clone()
                                .unwrap_or_else(|| "unknown error".to_string()),
                        )
                    }
                },
                State::Processor(name) => name.clone(),
            };
            let in_error = self.error.as_deref() == Some(name.as_str());

            mail.hop_count += 1;
            if mail.hop_count > self.max_hops {
                if !loop_detected {
                    loop_detected = true;
                    let diagnostic = format!("routing loop detected after {} hops", self.max_hops);
                    log::error!(
                        target: log_channels::ENGINE,
                        "'{}' {diagnostic}, last processor '{name}'",
                        mail.id()
                    );
                    mail.last_error = Some(diagnostic);
                    mail.state = State::Error;
                    continue;
                }
                if !in_error || loop_handled {
                    break Self::drop_mail(
                        mail,
                        format!(
                            "routing loop detected after {} hops, still looping in '{name}'",
                            self.max_hops
                        ),
                    );
                }
                loop_handled = true;
            }

            let processor = match self.processors.get(&name) {
                Some(processor) => processor,
                None if in_error || self.error.is_none() => {
                    break Self::drop_mail(mail, format!("processor '{name}' is not defined"));
                }
                None => {
                    let diagnostic = format!("processor '{name}' is not defined");
                    log::error!(target: log_channels::ENGINE, "'{}' {diagnostic}", mail.id());
                    mail.last_error = Some(diagnostic);
                    mail.state = State::Error;
                    continue;
                }
            };

            mail.state = State::Processor(name.clone());
            ctx.enter(&name);

            log::debug!(
                target: log_channels::ENGINE,
                "'{}' dispatched to '{name}' (hop {})",
                mail.id(),
                mail.hop_count
            );

            match processor.run(mail, &mut ctx).await {
                Transition::Routed => {}
                Transition::FellThrough if in_error || self.fall_through == FallThrough::Ghost => {
                    log::warn!(
                        target: log_channels::ENGINE,
                        "'{}' fell through processor '{name}', discarded",
                        mail.id()
                    );
                    mail.state = State::Ghost;
                }
                Transition::FellThrough => {
                    log::warn!(
                        target: log_channels::ENGINE,
                        "'{}' fell through processor '{name}', sent to the error processor",
                        mail.id()
                    );
                    mail.last_error = Some(format!(
                        "processor '{name}' completed without routing the mail"
                    ));
                    mail.state = State::Error;
                }
                Transition::Faulted(detail) if in_error => {
                    break Self::drop_mail(
                        mail,
                        format!("fault in the error processor '{name}': {detail}"),
                    );
                }
                Transition::Faulted(detail) => {
                    log::warn!(
                        target: log_channels::ENGINE,
                        "'{}' fault in processor '{name}': {detail}",
                        mail.id()
                    );
                    mail.last_error = Some(detail);
                    mail.state = State::Error;
                }
                Transition::Contended(detail) => {
                    log::info!(
                        target: log_channels::ENGINE,
                        "'{}' deferred in processor '{name}': {detail}",
                        mail.id()
                    );
                    break Disposition::Deferred(detail);
                }
            }
        };

        drop(ctx);
        match &disposition {
            Disposition::Discarded | Disposition::Dropped(_) => {
                if let Err(error) = mail.content.release().await {
                    log::warn!(
                        target: log_channels::ENGINE,
                        "'{}' failed to release the content: {error}",
                        mail.id()
                    );
                }
            }
            Disposition::Deferred(_) => {
                for orphan in derived.drain(emitted_before..) {
                    if let Err(error) = orphan.content.release().await {
                        log::warn!(
                            target: log_channels::ENGINE,
                            "'{}' failed to release the content: {error}",
                            orphan.id()
                        );
                    }
                }
            }
        }

        log::debug!(
            target: log_channels::ENGINE,
            "'{}' pass ended after {} hop(s): {disposition:?}, {} derived",
            mail.id(),
            mail.hop_count,
            derived.len() - emitted_before
        );

        disposition
    }
}
