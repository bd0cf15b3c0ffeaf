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

use crate::config::{
    ConfigProcessor, ConfigQueueContent, ConfigQueueWorking, FallThrough,
};
use vmail_common::re::log;

///
pub struct WantsVersion(pub(crate) ());

///
pub struct WantsServer {
    #[allow(dead_code)]
    pub(crate) parent: WantsVersion,
    pub(super) version_requirement: semver::VersionReq,
}

///
pub struct WantsServerSystem {
    pub(crate) parent: WantsServer,
    pub(super) domain: String,
    pub(super) local_domains: Vec<String>,
}

///
pub struct WantsServerLogs {
    pub(crate) parent: WantsServerSystem,
    pub(super) thread_pool_processing: usize,
}

///
pub struct WantsServerQueues {
    pub(crate) parent: WantsServerLogs,
    pub(super) filepath: std::path::PathBuf,
    pub(super) format: String,
    pub(super) level: std::collections::BTreeMap<String, log::LevelFilter>,
    pub(super) size_limit: u64,
    pub(super) archive_count: u32,
}

///
pub struct WantsServerIntake {
    pub(crate) parent: WantsServerQueues,
    pub(super) dirpath: std::path::PathBuf,
    pub(super) working: ConfigQueueWorking,
    pub(super) content: ConfigQueueContent,
    pub(super) contention_delay: std::time::Duration,
}

///
pub struct WantsAppLogs {
    pub(crate) parent: WantsServerIntake,
    pub(super) rcpt_count_max: usize,
    pub(super) message_size_max: usize,
}

///
pub struct WantsPipeline {
    pub(crate) parent: WantsAppLogs,
    pub(super) filepath: std::path::PathBuf,
    pub(super) level: log::LevelFilter,
    pub(super) format: String,
    pub(super) size_limit: u64,
    pub(super) archive_count: u32,
}

///
pub struct WantsPipelineOptions {
    pub(crate) parent: WantsPipeline,
    pub(super) root: String,
    pub(super) error: Option<String>,
    pub(super) processors: Vec<ConfigProcessor>,
}

///
pub struct WantsValidate {
    pub(crate) parent: WantsPipelineOptions,
    pub(super) max_hops: usize,
    pub(super) fall_through: FallThrough,
}
