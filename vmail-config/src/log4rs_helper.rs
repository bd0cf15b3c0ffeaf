use crate::{log_channel, Config};
use vmail_common::re::{anyhow, log};

fn init_rolling_log(
    format: &str,
    filepath: &std::path::Path,
    size_limit: u64,
    archive_count: u32,
) -> anyhow::Result<log4rs::append::rolling_file::RollingFileAppender> {
    use anyhow::Context;
    use log4rs::{
        append::rolling_file::{
            policy::compound::{roll, trigger, CompoundPolicy},
            RollingFileAppender,
        },
        encode,
    };

    let roller = roll::fixed_window::FixedWindowRoller::builder()
        .base(0)
        .build(
            &format!("{}-ar/trace.{{}}.gz", filepath.display()),
            archive_count,
        )
        .with_context(|| format!("invalid archive pattern for '{}'", filepath.display()))?;

    RollingFileAppender::builder()
        .append(true)
        .encoder(Box::new(encode::pattern::PatternEncoder::new(format)))
        .build(
            filepath,
            Box::new(CompoundPolicy::new(
                Box::new(trigger::size::SizeTrigger::new(size_limit)),
                Box::new(roller),
            )),
        )
        .with_context(|| format!("For filepath: '{}'", filepath.display()))
}

#[doc(hidden)]
pub fn get_log4rs_config(config: &Config, no_daemon: bool) -> anyhow::Result<log4rs::Config> {
    use log4rs::{append, config, encode, Config};

    let server = init_rolling_log(
        &config.server.logs.format,
        &config.server.logs.filepath,
        config.server.logs.size_limit,
        config.server.logs.archive_count,
    )?;
    let app = init_rolling_log(
        &config.app.logs.format,
        &config.app.logs.filepath,
        config.app.logs.size_limit,
        config.app.logs.archive_count,
    )?;

    let mut builder = Config::builder();
    let mut root = config::Root::builder();

    if no_daemon {
        builder = builder.appender(
            config::Appender::builder().build(
                "stdout",
                Box::new(
                    append::console::ConsoleAppender::builder()
                        .encoder(Box::new(encode::pattern::PatternEncoder::new(
                            &config.server.logs.format,
                        )))
                        .build(),
                ),
            ),
        );
        root = root.appender("stdout");
    }

    builder
        .appender(config::Appender::builder().build("server", Box::new(server)))
        .appender(config::Appender::builder().build("app", Box::new(app)))
        .loggers(config.server.logs.level.iter().filter_map(|(name, level)| {
            // every channel is nested under "server", "default" is the level of "server" itself.
            if name == "default" || name == "root" {
                None
            } else {
                Some(config::Logger::builder().build(format!("server::{name}"), *level))
            }
        }))
        .logger(
            config::Logger::builder()
                .appender("app")
                .additive(false)
                .build(log_channel::APP, config.app.logs.level),
        )
        .logger(
            config::Logger::builder()
                .appender("server")
                .additive(true)
                .build(
                    log_channel::DEFAULT,
                    *config
                        .server
                        .logs
                        .level
                        .get("default")
                        .unwrap_or(&log::LevelFilter::Warn),
                ),
        )
        .build(
            // the true root logger, only used by the dependencies.
            root.appender("server").build(
                *config
                    .server
                    .logs
                    .level
                    .get("root")
                    .unwrap_or(&log::LevelFilter::Warn),
            ),
        )
        .map_err(anyhow::Error::new)
}
