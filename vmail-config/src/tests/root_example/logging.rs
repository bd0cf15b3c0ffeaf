use crate::Config;
use vmail_common::{collection, re::log};

#[test]
fn parse() {
    let toml = include_str!("../../../../config/logging.toml");
    pretty_assertions::assert_eq!(
        Config::from_toml(toml).unwrap(),
        Config::builder()
            .with_version_str(">=1.0.0")
            .unwrap()
            .with_server_name("example.com")
            .with_default_system()
            .with_logs_settings(
                "/var/log/vmail/vmail.log",
                "{d} {l} - {m}{n}",
                collection! {
                    "default".to_string() => log::LevelFilter::Warn,
                    "pipeline".to_string() => log::LevelFilter::Debug,
                    "processes".to_string() => log::LevelFilter::Info,
                }
            )
            .with_default_queues()
            .with_default_intake()
            .with_app_logs_level_and_format(
                "/var/log/vmail/app.log",
                log::LevelFilter::Trace,
                "{d} - {m}{n}"
            )
            .with_default_pipeline()
            .with_default_routing()
            .validate()
            .unwrap()
    );
}
