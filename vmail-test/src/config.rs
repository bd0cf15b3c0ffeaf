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
use vmail_config::{
    Config, ConfigProcessor, ConfigQueueContent, ConfigQueueWorking, FallThrough,
};

/// Get a config for local test, with the default pipeline.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn local_test() -> Config {
    Config::builder()
        .with_version_str(">=1.0.0")
        .unwrap()
        .with_server_name_and_local_domains("testserver.com", &["testserver.org"])
        .with_thread_pool(2)
        .with_default_logs_settings()
        .with_spool_dir_and_queues(
            "./tmp/spool",
            ConfigQueueWorking { channel_size: 8 },
            ConfigQueueContent {
                retry_max: 2,
                retry_delay: std::time::Duration::from_millis(1),
            },
            std::time::Duration::from_millis(10),
        )
        .with_default_intake()
        .with_default_app_logs()
        .with_default_pipeline()
        .with_default_routing()
        .validate()
        .unwrap()
}

/// Get a config for local test, with the given processors.
///
/// # Panics
///
/// * config cannot be built
#[must_use]
pub fn with_processors(
    root: &str,
    error: Option<&str>,
    processors: Vec<ConfigProcessor>,
) -> Config {
    let mut config = local_test();
    config.pipeline.root = root.to_string();
    config.pipeline.error = error.map(str::to_string);
    config.pipeline.processors = processors;
    config.pipeline.fall_through = FallThrough::Ghost;
    config
}
