use crate::{Config, ConfigProcessor, ConfigStep, MatcherConfig};

#[test]
fn parse() {
    let toml = include_str!("../../../../config/simple.toml");
    pretty_assertions::assert_eq!(
        Config::from_toml(toml).unwrap(),
        Config::builder()
            .with_version_str(">=1.0.0, <2.0.0")
            .unwrap()
            .with_server_name_and_local_domains("example.com", &["example.org"])
            .with_thread_pool(4)
            .with_default_logs_settings()
            .with_spool_dir_and_default_queues("./tmp/spool")
            .with_default_intake()
            .with_default_app_logs()
            .with_processors(
                "root",
                Some("errors"),
                vec![
                    ConfigProcessor::new(
                        "root",
                        vec![
                            ConfigStep::new(
                                MatcherConfig::leaf("HostIsLocal", None),
                                "LocalDelivery"
                            )
                            .with_param("repository", "mailboxes"),
                            ConfigStep::new(MatcherConfig::leaf("All", None), "ToProcessor")
                                .with_param("processor", "transport"),
                        ]
                    ),
                    ConfigProcessor::new(
                        "transport",
                        vec![
                            ConfigStep::new(MatcherConfig::leaf("All", None), "ToRepository")
                                .with_param("repository", "outgoing")
                        ]
                    ),
                    ConfigProcessor::new(
                        "errors",
                        vec![
                            ConfigStep::new(MatcherConfig::leaf("All", None), "ToRepository")
                                .with_param("repository", "quarantine")
                        ]
                    ),
                ]
            )
            .with_default_routing()
            .validate()
            .unwrap()
    );
}
