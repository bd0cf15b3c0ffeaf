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
    config::{
        ConfigApp, ConfigAppLogs, ConfigPipeline, ConfigServer, ConfigServerIntake,
        ConfigServerLogs, ConfigServerQueues, ConfigServerSystem, ConfigServerSystemThreadPool,
    },
    Config,
};
use vmail_common::{re::anyhow, State};

use super::{wants::WantsValidate, with::Builder};

impl Builder<WantsValidate> {
    ///
    ///
    /// # Errors
    ///
    /// * the structure of the configuration is not valid, see [Builder::<WantsValidate>::ensure]
    pub fn validate(self) -> anyhow::Result<Config> {
        let routing = self.state;
        let pipeline = routing.parent;
        let app_logs = pipeline.parent;
        let intake = app_logs.parent;
        let srv_queues = intake.parent;
        let srv_logs = srv_queues.parent;
        let srv_syst = srv_logs.parent;
        let srv = srv_syst.parent;
        let version = srv.parent;

        Self::ensure(Config {
            version_requirement: version.version_requirement,
            server: ConfigServer {
                domain: srv.domain,
                local_domains: srv.local_domains,
                system: ConfigServerSystem {
                    thread_pool: ConfigServerSystemThreadPool {
                        processing: srv_syst.thread_pool_processing,
                    },
                },
                logs: ConfigServerLogs {
                    filepath: srv_logs.filepath,
                    format: srv_logs.format,
                    level: srv_logs.level,
                    size_limit: srv_logs.size_limit,
                    archive_count: srv_logs.archive_count,
                },
                queues: ConfigServerQueues {
                    dirpath: srv_queues.dirpath,
                    working: srv_queues.working,
                    content: srv_queues.content,
                    contention_delay: srv_queues.contention_delay,
                    pickup_interval: ConfigServerQueues::default_pickup_interval(),
                },
                intake: ConfigServerIntake {
                    rcpt_count_max: intake.rcpt_count_max,
                    message_size_max: intake.message_size_max,
                },
            },
            app: ConfigApp {
                logs: ConfigAppLogs {
                    filepath: app_logs.filepath,
                    level: app_logs.level,
                    format: app_logs.format,
                    size_limit: app_logs.size_limit,
                    archive_count: app_logs.archive_count,
                },
            },
            pipeline: ConfigPipeline {
                root: pipeline.root,
                error: pipeline.error,
                max_hops: routing.max_hops,
                fall_through: routing.fall_through,
                processors: pipeline.processors,
            },
        })
    }

    /// Structural checks of a configuration.
    ///
    /// The matchers and mailets are checked when the pipeline is built.
    ///
    /// # Errors
    ///
    /// * both logs are written in the same file
    /// * there is no processing worker
    /// * the working queue cannot hold any mail
    /// * a processor name is duplicated, empty or reserved
    /// * the root or the error processor is not defined
    /// * `max_hops` is zero
    pub(crate) fn ensure(config: Config) -> anyhow::Result<Config> {
        anyhow::ensure!(
            config.app.logs.filepath != config.server.logs.filepath,
            "server and application logs cannot both be written in '{}' !",
            config.app.logs.filepath.display()
        );

        anyhow::ensure!(
            config.server.system.thread_pool.processing != 0,
            "at least one processing worker is required"
        );

        anyhow::ensure!(
            config.server.queues.working.channel_size != 0,
            "the working queue must hold at least one mail ('channel_size' is 0)"
        );

        let pipeline = &config.pipeline;
        anyhow::ensure!(
            pipeline.max_hops >= 1,
            "'max_hops' must be at least 1, got {}",
            pipeline.max_hops
        );

        let mut names = std::collections::HashSet::new();
        for processor in &pipeline.processors {
            anyhow::ensure!(!processor.name.is_empty(), "a processor has no name");
            anyhow::ensure!(
                !State::is_reserved(&processor.name),
                "'{}' is a reserved name and cannot be used for a processor",
                processor.name
            );
            anyhow::ensure!(
                names.insert(processor.name.as_str()),
                "processor '{}' is defined more than once",
                processor.name
            );
        }

        anyhow::ensure!(
            names.contains(pipeline.root.as_str()),
            "root processor '{}' is not defined",
            pipeline.root
        );
        if let Some(error) = &pipeline.error {
            anyhow::ensure!(
                names.contains(error.as_str()),
                "error processor '{}' is not defined",
                error
            );
        }

        Ok(config)
    }
}
