use crate::MatcherConfig;

#[derive(serde::Deserialize)]
#[serde(untagged)]
pub enum MatcherRepr {
    Shorthand(String),
    Table(MatcherTable),
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherTable {
    id: String,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    matchers: Vec<MatcherConfig>,
}

pub fn from_shorthand(input: &str) -> Result<MatcherConfig, String> {
    let (id, condition) = match input.split_once('=') {
        Some((id, condition)) => (id.trim(), Some(condition.trim())),
        None => (input.trim(), None),
    };

    if id.is_empty() {
        return Err(format!("matcher has no identifier: '{input}'"));
    }
    Ok(MatcherConfig::leaf(id, condition))
}

impl TryFrom<MatcherRepr> for MatcherConfig {
    type Error = String;

    fn try_from(value: MatcherRepr) -> Result<Self, Self::Error> {
        match value {
            MatcherRepr::Shorthand(shorthand) => from_shorthand(&shorthand),
            MatcherRepr::Table(MatcherTable {
                id,
                condition,
                matchers,
            }) => {
                if id.trim().is_empty() {
                    return Err("matcher has no identifier".to_string());
                }
                Ok(Self {
                    id,
                    condition,
                    matchers,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::MatcherConfig;

    #[derive(Debug, serde::Deserialize)]
    struct S {
        m: MatcherConfig,
    }

    #[test]
    fn shorthand() {
        assert_eq!(
            toml::from_str::<S>(r#"m = "All""#).unwrap().m,
            MatcherConfig::leaf("All", None)
        );
        assert_eq!(
            toml::from_str::<S>(r#"m = "HostIs=example.com, example.org""#)
                .unwrap()
                .m,
            MatcherConfig::leaf("HostIs", Some("example.com, example.org"))
        );
        assert_eq!(
            "HasHeader=X-Spam=yes".parse::<MatcherConfig>().unwrap(),
            MatcherConfig::leaf("HasHeader", Some("X-Spam=yes"))
        );
    }

    #[test]
    fn table() {
        let s = toml::from_str::<S>(
            r#"m = { id = "Not", matchers = ["HostIsLocal", { id = "SenderIs", condition = "<>" }] }"#,
        )
        .unwrap();

        pretty_assertions::assert_eq!(
            s.m,
            MatcherConfig::composite(
                "Not",
                vec![
                    MatcherConfig::leaf("HostIsLocal", None),
                    MatcherConfig::leaf("SenderIs", Some("<>"))
                ]
            )
        );
    }

    #[test]
    fn invalid() {
        assert!(toml::from_str::<S>(r#"m = "=foo""#).is_err());
        assert!(toml::from_str::<S>(r#"m = { id = "All", foo = "bar" }"#).is_err());
        assert!(toml::from_str::<S>(r#"m = 42"#).is_err());
    }
}
