use crate::Config;

#[test]
fn parse() {
    let toml = include_str!("../../../../config/minimal.toml");
    pretty_assertions::assert_eq!(
        Config::from_toml(toml).unwrap(),
        Config::builder()
            .with_version_str(">=1.0.0")
            .unwrap()
            .with_hostname()
            .with_default_system()
            .with_default_logs_settings()
            .with_default_queues()
            .with_default_intake()
            .with_default_app_logs()
            .with_default_pipeline()
            .with_default_routing()
            .validate()
            .unwrap()
    );
}

#[test]
fn same_as_default() {
    let toml = include_str!("../../../../config/minimal.toml");
    pretty_assertions::assert_eq!(Config::from_toml(toml).unwrap(), Config::default());
}
