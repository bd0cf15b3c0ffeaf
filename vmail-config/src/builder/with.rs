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
// this produce just too much false positive in this file
#![allow(clippy::missing_const_for_fn)]

use super::wants::{
    WantsAppLogs, WantsPipeline, WantsPipelineOptions, WantsServer, WantsServerIntake,
    WantsServerLogs, WantsServerQueues, WantsServerSystem, WantsValidate, WantsVersion,
};
use crate::config::{
    ConfigAppLogs, ConfigPipeline, ConfigProcessor, ConfigQueueContent, ConfigQueueWorking,
    ConfigServer, ConfigServerIntake, ConfigServerLogs, ConfigServerQueues,
    ConfigServerSystemThreadPool, FallThrough,
};
use vmail_common::re::{
    anyhow::{self, Context},
    log,
};

///
pub struct Builder<State> {
    pub(crate) state: State,
}

impl Builder<WantsVersion> {
    /// # Errors
    ///
    /// * CARGO_PKG_VERSION is not valid
    pub fn with_current_version(self) -> anyhow::Result<Builder<WantsServer>> {
        self.with_version_str(&format!(">={}", env!("CARGO_PKG_VERSION")))
    }

    /// # Errors
    ///
    /// * version_requirement is not valid format
    pub fn with_version_str(
        self,
        version_requirement: &str,
    ) -> anyhow::Result<Builder<WantsServer>> {
        semver::VersionReq::parse(version_requirement)
            .with_context(|| format!("version is not valid: '{version_requirement}'"))
            .map(|version_requirement| Builder::<WantsServer> {
                state: WantsServer {
                    parent: self.state,
                    version_requirement,
                },
            })
    }
}

impl Builder<WantsServer> {
    ///
    #[must_use]
    pub fn with_debug_server_info(self) -> Builder<WantsServerSystem> {
        self.with_server_name("debug.com")
    }

    ///
    #[must_use]
    pub fn with_hostname(self) -> Builder<WantsServerSystem> {
        self.with_server_name(&ConfigServer::hostname())
    }

    ///
    #[must_use]
    pub fn with_server_name(self, domain: &str) -> Builder<WantsServerSystem> {
        self.with_server_name_and_local_domains(domain, &[])
    }

    /// `local_domains` are the other domains the server receives mails for.
    #[must_use]
    pub fn with_server_name_and_local_domains(
        self,
        domain: &str,
        local_domains: &[&str],
    ) -> Builder<WantsServerSystem> {
        Builder::<WantsServerSystem> {
            state: WantsServerSystem {
                parent: self.state,
                domain: domain.to_string(),
                local_domains: local_domains.iter().map(ToString::to_string).collect(),
            },
        }
    }
}

impl Builder<WantsServerSystem> {
    ///
    #[must_use]
    pub fn with_default_system(self) -> Builder<WantsServerLogs> {
        self.with_thread_pool(ConfigServerSystemThreadPool::default_processing())
    }

    /// `thread_pool_processing` is the number of processing workers.
    #[must_use]
    pub fn with_thread_pool(self, thread_pool_processing: usize) -> Builder<WantsServerLogs> {
        Builder::<WantsServerLogs> {
            state: WantsServerLogs {
                parent: self.state,
                thread_pool_processing,
            },
        }
    }
}

impl Builder<WantsServerLogs> {
    ///
    #[must_use]
    pub fn with_default_logs_settings(self) -> Builder<WantsServerQueues> {
        self.with_logs_settings(
            ConfigServerLogs::default_filepath(),
            ConfigServerLogs::default_format(),
            ConfigServerLogs::default_level(),
        )
    }

    ///
    #[must_use]
    pub fn with_logs_settings(
        self,
        filepath: impl Into<std::path::PathBuf>,
        format: impl Into<String>,
        level: std::collections::BTreeMap<String, log::LevelFilter>,
    ) -> Builder<WantsServerQueues> {
        Builder::<WantsServerQueues> {
            state: WantsServerQueues {
                parent: self.state,
                filepath: filepath.into(),
                format: format.into(),
                level,
                size_limit: ConfigServerLogs::default_size_limit(),
                archive_count: ConfigServerLogs::default_archive_count(),
            },
        }
    }
}

impl Builder<WantsServerQueues> {
    ///
    #[must_use]
    pub fn with_default_queues(self) -> Builder<WantsServerIntake> {
        self.with_spool_dir_and_default_queues(ConfigServerQueues::default_dirpath())
    }

    ///
    #[must_use]
    pub fn with_spool_dir_and_default_queues(
        self,
        spool_dir: impl Into<std::path::PathBuf>,
    ) -> Builder<WantsServerIntake> {
        self.with_spool_dir_and_queues(
            spool_dir,
            ConfigQueueWorking::default(),
            ConfigQueueContent::default(),
            ConfigServerQueues::default_contention_delay(),
        )
    }

    ///
    #[must_use]
    pub fn with_spool_dir_and_queues(
        self,
        spool_dir: impl Into<std::path::PathBuf>,
        working: ConfigQueueWorking,
        content: ConfigQueueContent,
        contention_delay: std::time::Duration,
    ) -> Builder<WantsServerIntake> {
        Builder::<WantsServerIntake> {
            state: WantsServerIntake {
                parent: self.state,
                dirpath: spool_dir.into(),
                working,
                content,
                contention_delay,
            },
        }
    }
}

impl Builder<WantsServerIntake> {
    ///
    #[must_use]
    pub fn with_default_intake(self) -> Builder<WantsAppLogs> {
        self.with_intake(
            ConfigServerIntake::default_rcpt_count_max(),
            ConfigServerIntake::default_message_size_max(),
        )
    }

    ///
    #[must_use]
    pub fn with_intake(
        self,
        rcpt_count_max: usize,
        message_size_max: usize,
    ) -> Builder<WantsAppLogs> {
        Builder::<WantsAppLogs> {
            state: WantsAppLogs {
                parent: self.state,
                rcpt_count_max,
                message_size_max,
            },
        }
    }
}

impl Builder<WantsAppLogs> {
    ///
    #[must_use]
    pub fn with_default_app_logs(self) -> Builder<WantsPipeline> {
        self.with_app_logs_level_and_format(
            ConfigAppLogs::default_filepath(),
            ConfigAppLogs::default_level(),
            ConfigAppLogs::default_format(),
        )
    }

    ///
    #[must_use]
    pub fn with_app_logs_level_and_format(
        self,
        filepath: impl Into<std::path::PathBuf>,
        level: log::LevelFilter,
        format: impl Into<String>,
    ) -> Builder<WantsPipeline> {
        Builder::<WantsPipeline> {
            state: WantsPipeline {
                parent: self.state,
                filepath: filepath.into(),
                level,
                format: format.into(),
                size_limit: ConfigAppLogs::default_size_limit(),
                archive_count: ConfigAppLogs::default_archive_count(),
            },
        }
    }
}

impl Builder<WantsPipeline> {
    ///
    #[must_use]
    pub fn with_default_pipeline(self) -> Builder<WantsPipelineOptions> {
        self.with_processors(
            &ConfigPipeline::default_root(),
            Some(&ConfigPipeline::default_error()),
            ConfigPipeline::default_processors(),
        )
    }

    /// mails enter the pipeline in `root`, faulty mails go to `error`.
    #[must_use]
    pub fn with_processors(
        self,
        root: &str,
        error: Option<&str>,
        processors: Vec<ConfigProcessor>,
    ) -> Builder<WantsPipelineOptions> {
        Builder::<WantsPipelineOptions> {
            state: WantsPipelineOptions {
                parent: self.state,
                root: root.to_string(),
                error: error.map(str::to_string),
                processors,
            },
        }
    }
}

impl Builder<WantsPipelineOptions> {
    ///
    #[must_use]
    pub fn with_default_routing(self) -> Builder<WantsValidate> {
        self.with_routing(
            ConfigPipeline::default_max_hops(),
            ConfigPipeline::default_fall_through(),
        )
    }

    ///
    #[must_use]
    pub fn with_routing(self, max_hops: usize, fall_through: FallThrough) -> Builder<WantsValidate> {
        Builder::<WantsValidate> {
            state: WantsValidate {
                parent: self.state,
                max_hops,
                fall_through,
            },
        }
    }
}
