pub fn serialize<S: serde::Serializer>(
    value: &semver::VersionReq,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serde::Serialize::serialize(&value.to_string(), serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<semver::VersionReq, D::Error>
where
    D: serde::Deserializer<'de>,
{
    semver::VersionReq::parse(&<String as serde::Deserialize>::deserialize(deserializer)?)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct S {
        #[serde(
            serialize_with = "crate::parser::semver::serialize",
            deserialize_with = "crate::parser::semver::deserialize"
        )]
        v: semver::VersionReq,
    }

    #[test]
    fn serialize_deserialize() {
        let str = "v = \">=1.0.0\"\n";
        let s: S = toml::from_str(str).unwrap();
        assert_eq!(str, toml::to_string(&s).unwrap());
    }

    #[test]
    fn invalid() {
        assert!(toml::from_str::<S>("v = \"not a version\"").is_err());
    }
}
