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
#![allow(clippy::module_name_repetitions)]

use crate::{
    builder::{Builder, WantsValidate},
    config::{
        ConfigApp, ConfigAppLogs, ConfigPipeline, ConfigProcessor, ConfigQueueContent,
        ConfigQueueWorking, ConfigServer, ConfigServerIntake, ConfigServerLogs,
        ConfigServerQueues, ConfigServerSystem, ConfigServerSystemThreadPool, ConfigStep,
        FallThrough, MatcherConfig,
    },
    Config,
};
use vmail_common::{collection, re::log, State};

impl Default for Config {
    fn default() -> Self {
        Builder::<WantsValidate>::ensure(Self {
            version_requirement: semver::VersionReq::parse(">=1.0.0").expect("valid requirement"),
            server: ConfigServer::default(),
            app: ConfigApp::default(),
            pipeline: ConfigPipeline::default(),
        })
        .expect("default configuration is valid")
    }
}

impl Default for ConfigServer {
    fn default() -> Self {
        Self {
            domain: Self::hostname(),
            local_domains: vec![],
            system: ConfigServerSystem::default(),
            logs: ConfigServerLogs::default(),
            queues: ConfigServerQueues::default(),
            intake: ConfigServerIntake::default(),
        }
    }
}

impl ConfigServer {
    pub(crate) fn hostname() -> String {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }
}

impl Default for ConfigServerSystemThreadPool {
    fn default() -> Self {
        Self {
            processing: Self::default_processing(),
        }
    }
}

impl ConfigServerSystemThreadPool {
    pub(crate) const fn default_processing() -> usize {
        6
    }
}

impl Default for ConfigServerLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            format: Self::default_format(),
            level: Self::default_level(),
            size_limit: Self::default_size_limit(),
            archive_count: Self::default_archive_count(),
        }
    }
}

impl ConfigServerLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/vmail/vmail.log".into()
    }

    pub(crate) fn default_format() -> String {
        "{d(%Y-%m-%d %H:%M:%S%.f)} {h({l:<5} [{I}])} {t:<30} $ {m}{n}".to_string()
    }

    pub(crate) fn default_level() -> std::collections::BTreeMap<String, log::LevelFilter> {
        collection! {
            "default".to_string() => log::LevelFilter::Warn
        }
    }

    pub(crate) const fn default_size_limit() -> u64 {
        10_485_760 // 10MB
    }

    pub(crate) const fn default_archive_count() -> u32 {
        10
    }
}

impl Default for ConfigServerQueues {
    fn default() -> Self {
        Self {
            dirpath: Self::default_dirpath(),
            working: ConfigQueueWorking::default(),
            content: ConfigQueueContent::default(),
            contention_delay: Self::default_contention_delay(),
            pickup_interval: Self::default_pickup_interval(),
        }
    }
}

impl ConfigServerQueues {
    pub(crate) fn default_dirpath() -> std::path::PathBuf {
        "/var/spool/vmail".into()
    }

    pub(crate) const fn default_contention_delay() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }

    pub(crate) const fn default_pickup_interval() -> std::time::Duration {
        std::time::Duration::from_secs(1)
    }
}

impl Default for ConfigQueueWorking {
    fn default() -> Self {
        Self { channel_size: 32 }
    }
}

impl Default for ConfigQueueContent {
    fn default() -> Self {
        Self {
            retry_max: 3,
            retry_delay: std::time::Duration::from_millis(100),
        }
    }
}

impl Default for ConfigServerIntake {
    fn default() -> Self {
        Self {
            rcpt_count_max: Self::default_rcpt_count_max(),
            message_size_max: Self::default_message_size_max(),
        }
    }
}

impl ConfigServerIntake {
    pub(crate) const fn default_rcpt_count_max() -> usize {
        1000
    }

    pub(crate) const fn default_message_size_max() -> usize {
        20_000_000
    }
}

impl Default for ConfigAppLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            level: Self::default_level(),
            format: Self::default_format(),
            size_limit: Self::default_size_limit(),
            archive_count: Self::default_archive_count(),
        }
    }
}

impl ConfigAppLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/vmail/app.log".into()
    }

    pub(crate) const fn default_level() -> log::LevelFilter {
        log::LevelFilter::Warn
    }

    pub(crate) fn default_format() -> String {
        "{d} - {m}{n}".to_string()
    }

    pub(crate) const fn default_size_limit() -> u64 {
        10_485_760 // 10MB
    }

    pub(crate) const fn default_archive_count() -> u32 {
        10
    }
}

impl Default for ConfigPipeline {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            error: Some(Self::default_error()),
            max_hops: Self::default_max_hops(),
            fall_through: Self::default_fall_through(),
            processors: Self::default_processors(),
        }
    }
}

impl ConfigPipeline {
    pub(crate) fn default_root() -> String {
        State::ROOT.to_string()
    }

    pub(crate) fn default_error() -> String {
        "quarantine".to_string()
    }

    pub(crate) const fn default_max_hops() -> usize {
        10
    }

    pub(crate) const fn default_fall_through() -> FallThrough {
        FallThrough::Ghost
    }

    /// local recipients are delivered in their mailbox, the others are
    /// stored for an outgoing transport, faulty mails are quarantined.
    pub(crate) fn default_processors() -> Vec<ConfigProcessor> {
        vec![
            ConfigProcessor::new(
                &Self::default_root(),
                vec![
                    ConfigStep::new(MatcherConfig::leaf("HostIsLocal", None), "LocalDelivery")
                        .with_param("repository", "mailboxes"),
                    ConfigStep::new(MatcherConfig::leaf("All", None), "ToRepository")
                        .with_param("repository", "outgoing"),
                ],
            ),
            ConfigProcessor::new(
                &Self::default_error(),
                vec![
                    ConfigStep::new(MatcherConfig::leaf("All", None), "ToRepository")
                        .with_param("repository", "quarantine"),
                ],
            ),
        ]
    }
}
