use crate::{
    Config, ConfigProcessor, ConfigQueueContent, ConfigQueueWorking, ConfigStep, FallThrough,
    MatcherConfig,
};

#[allow(clippy::too_many_lines)]
#[test]
fn parse() {
    let toml = include_str!("../../../../config/pipeline.toml");
    pretty_assertions::assert_eq!(
        Config::from_toml(toml).unwrap(),
        Config::builder()
            .with_version_str(">=1.0.0")
            .unwrap()
            .with_server_name_and_local_domains("example.com", &["example.org", "example.net"])
            .with_default_system()
            .with_default_logs_settings()
            .with_spool_dir_and_queues(
                "./tmp/spool",
                ConfigQueueWorking { channel_size: 64 },
                ConfigQueueContent {
                    retry_max: 5,
                    retry_delay: std::time::Duration::from_millis(50)
                },
                std::time::Duration::from_secs(2)
            )
            .with_intake(50, 1_000_000)
            .with_default_app_logs()
            .with_processors(
                "root",
                Some("errors"),
                vec![
                    ConfigProcessor::new(
                        "root",
                        vec![
                            ConfigStep::new(
                                MatcherConfig::leaf("HasAttribute", Some("spam")),
                                "ToRepository"
                            )
                            .with_param("repository", "spam"),
                            ConfigStep::new(
                                MatcherConfig::composite(
                                    "And",
                                    vec![
                                        MatcherConfig::leaf("HostIsLocal", None),
                                        MatcherConfig::composite(
                                            "Not",
                                            vec![MatcherConfig::leaf("SenderIsNull", None)]
                                        )
                                    ]
                                ),
                                "SetAttribute"
                            )
                            .with_param("name", "local")
                            .with_param("value", true),
                            ConfigStep::new(
                                MatcherConfig::composite(
                                    "Or",
                                    vec![
                                        MatcherConfig::leaf("HasAttachment", None),
                                        MatcherConfig::leaf("SizeGreaterThan", Some("10m"))
                                    ]
                                ),
                                "LogMessage"
                            )
                            .with_param("comment", "large message"),
                            ConfigStep::new(
                                MatcherConfig::leaf("HostIsLocal", None),
                                "ToProcessor"
                            )
                            .with_param("processor", "local"),
                            ConfigStep::new(MatcherConfig::leaf("All", None), "ToProcessor")
                                .with_param("processor", "transport"),
                        ]
                    ),
                    ConfigProcessor::new(
                        "local",
                        vec![
                            ConfigStep::new(
                                MatcherConfig::leaf("RecipientIs", Some("postmaster@example.com")),
                                "Forward"
                            )
                            .with_param("forward_to", "admin@example.com"),
                            ConfigStep::new(MatcherConfig::leaf("All", None), "LocalDelivery")
                                .with_param("repository", "mailboxes"),
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
                            ConfigStep::new(
                                MatcherConfig::composite(
                                    "Not",
                                    vec![MatcherConfig::leaf("SenderIsNull", None)]
                                ),
                                "Bounce"
                            )
                            .with_param("passthrough", true),
                            ConfigStep::new(MatcherConfig::leaf("All", None), "ToRepository")
                                .with_param("repository", "quarantine"),
                        ]
                    ),
                ]
            )
            .with_routing(5, FallThrough::Error)
            .validate()
            .unwrap()
    );
}
