mod root_example {
    mod logging;
    mod minimal;
    mod pipeline;
    mod simple;
}

#[test]
fn version_not_fulfilled() {
    let error = crate::Config::from_toml(r#"version_requirement = "<1.0.0""#).unwrap_err();
    assert!(
        error.to_string().starts_with("Version requirement not fulfilled"),
        "{error}"
    );
}

#[test]
fn unknown_field() {
    assert!(crate::Config::from_toml(
        r#"
version_requirement = ">=1.0.0"

[server]
domain = "example.com"
foo = "bar"
"#
    )
    .is_err());
}

#[test]
fn undefined_root() {
    let error = crate::Config::from_toml(
        r#"
version_requirement = ">=1.0.0"

[pipeline]
root = "main"
"#,
    )
    .unwrap_err();
    assert_eq!(error.to_string(), "root processor 'main' is not defined");
}

#[test]
fn json_round_trip() {
    use vmail_common::re::serde_json;

    let config = crate::Config::from_toml(include_str!("../../../config/pipeline.toml")).unwrap();
    let json = serde_json::to_string_pretty(&config).unwrap();
    pretty_assertions::assert_eq!(serde_json::from_str::<crate::Config>(&json).unwrap(), config);
}
