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
#![allow(missing_docs)]

use vmail_common::re::{log, serde_json};

///
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(
        serialize_with = "crate::parser::semver::serialize",
        deserialize_with = "crate::parser::semver::deserialize"
    )]
    pub version_requirement: semver::VersionReq,
    #[serde(default)]
    pub server: ConfigServer,
    #[serde(default)]
    pub app: ConfigApp,
    #[serde(default)]
    pub pipeline: ConfigPipeline,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServer {
    // TODO: parse valid fqdn
    #[serde(default = "ConfigServer::hostname")]
    pub domain: String,
    #[serde(default)]
    pub local_domains: Vec<String>,
    #[serde(default)]
    pub system: ConfigServerSystem,
    #[serde(default)]
    pub logs: ConfigServerLogs,
    #[serde(default)]
    pub queues: ConfigServerQueues,
    #[serde(default)]
    pub intake: ConfigServerIntake,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerSystem {
    #[serde(default)]
    pub thread_pool: ConfigServerSystemThreadPool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerSystemThreadPool {
    #[serde(default = "ConfigServerSystemThreadPool::default_processing")]
    pub processing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerLogs {
    #[serde(default = "ConfigServerLogs::default_filepath")]
    pub filepath: std::path::PathBuf,
    #[serde(default = "ConfigServerLogs::default_format")]
    pub format: String,
    #[serde(default = "ConfigServerLogs::default_level")]
    pub level: std::collections::BTreeMap<String, log::LevelFilter>,
    #[serde(default = "ConfigServerLogs::default_size_limit")]
    pub size_limit: u64,
    #[serde(default = "ConfigServerLogs::default_archive_count")]
    pub archive_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigQueueWorking {
    /// mails the working queue can hold, enqueuing beyond is refused.
    pub channel_size: usize,
}

/// Access to the content repository.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigQueueContent {
    /// retries of a transient repository failure, after the first attempt.
    pub retry_max: usize,
    /// base delay between two attempts.
    #[serde(with = "humantime_serde")]
    pub retry_delay: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerQueues {
    #[serde(default = "ConfigServerQueues::default_dirpath")]
    pub dirpath: std::path::PathBuf,
    #[serde(default)]
    pub working: ConfigQueueWorking,
    #[serde(default)]
    pub content: ConfigQueueContent,
    /// delay before a mail whose content is locked is put back in the queue.
    #[serde(
        default = "ConfigServerQueues::default_contention_delay",
        with = "humantime_serde"
    )]
    pub contention_delay: std::time::Duration,
    /// delay between two scans of the pickup directory.
    #[serde(
        default = "ConfigServerQueues::default_pickup_interval",
        with = "humantime_serde"
    )]
    pub pickup_interval: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServerIntake {
    #[serde(default = "ConfigServerIntake::default_rcpt_count_max")]
    pub rcpt_count_max: usize,
    /// in bytes, the content of a mail cannot be larger.
    #[serde(default = "ConfigServerIntake::default_message_size_max")]
    pub message_size_max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigAppLogs {
    #[serde(default = "ConfigAppLogs::default_filepath")]
    pub filepath: std::path::PathBuf,
    #[serde(default = "ConfigAppLogs::default_level")]
    pub level: log::LevelFilter,
    #[serde(default = "ConfigAppLogs::default_format")]
    pub format: String,
    #[serde(default = "ConfigAppLogs::default_size_limit")]
    pub size_limit: u64,
    #[serde(default = "ConfigAppLogs::default_archive_count")]
    pub archive_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigApp {
    #[serde(default)]
    pub logs: ConfigAppLogs,
}

/// What happens to a mail when a processor runs all its steps
/// without redirecting or terminating it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallThrough {
    /// the mail is discarded, and a warning is logged.
    Ghost,
    /// the mail is sent to the error processor.
    Error,
}

/// A matcher of a processing step.
///
/// In the configuration file, a matcher is either a string `"Id"` or
/// `"Id=condition"`, or a table `{ id = "Id", condition = "...", matchers = [...] }`.
/// The composite matchers (`And`, `Or`, `Not`) take their children in `matchers`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "crate::parser::matcher::MatcherRepr")]
pub struct MatcherConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatcherConfig>,
}

impl MatcherConfig {
    /// A matcher without children.
    #[must_use]
    pub fn leaf(id: &str, condition: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            condition: condition.map(str::to_string),
            matchers: vec![],
        }
    }

    /// A matcher combining the result of `matchers`.
    #[must_use]
    pub fn composite(id: &str, matchers: Vec<Self>) -> Self {
        Self {
            id: id.to_string(),
            condition: None,
            matchers,
        }
    }
}

impl std::str::FromStr for MatcherConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::matcher::from_shorthand(s)
    }
}

/// One step of a processor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigStep {
    pub matcher: MatcherConfig,
    pub mailet: String,
    #[serde(default)]
    pub params: std::collections::BTreeMap<String, serde_json::Value>,
}

impl ConfigStep {
    ///
    #[must_use]
    pub fn new(matcher: MatcherConfig, mailet: &str) -> Self {
        Self {
            matcher,
            mailet: mailet.to_string(),
            params: std::collections::BTreeMap::new(),
        }
    }

    ///
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// A named and ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigProcessor {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<ConfigStep>,
}

impl ConfigProcessor {
    ///
    #[must_use]
    pub fn new(name: &str, steps: Vec<ConfigStep>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPipeline {
    /// the processor a new mail is dispatched to.
    #[serde(default = "ConfigPipeline::default_root")]
    pub root: String,
    /// the processor handling the faulty mails, they are dropped if none.
    #[serde(default)]
    pub error: Option<String>,
    /// bound of processor dispatches taken by a mail in one pass.
    #[serde(default = "ConfigPipeline::default_max_hops")]
    pub max_hops: usize,
    #[serde(default = "ConfigPipeline::default_fall_through")]
    pub fall_through: FallThrough,
    #[serde(default = "ConfigPipeline::default_processors")]
    pub processors: Vec<ConfigProcessor>,
}
