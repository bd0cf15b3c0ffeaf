//! vMail configuration

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

/// targets for log! macro
pub mod log_channel {
    /// server's logs, every other server channel is nested under this one.
    pub const DEFAULT: &str = "server";
    /// application side's logs (messages logged by the pipeline itself).
    pub const APP: &str = "app";
}

#[cfg(test)]
mod tests;

mod parser {
    pub mod matcher;
    pub mod semver;
}

/// The configuration builder for programmatically instantiating
pub mod builder {
    mod wants;
    mod with;

    #[doc(hidden)]
    pub mod validate;
    pub use wants::*;
    pub use with::*;
}

mod log4rs_helper;

mod config;
mod default;

pub use config::*;
pub use log4rs_helper::get_log4rs_config;

/// Re-exported dependencies
pub mod re {
    pub use log4rs;
}

use builder::{Builder, WantsValidate, WantsVersion};
use vmail_common::re::anyhow;

impl Config {
    ///
    #[must_use]
    pub const fn builder() -> Builder<WantsVersion> {
        Builder {
            state: WantsVersion(()),
        }
    }

    /// Parse a [Config] with [TOML] format
    ///
    /// # Errors
    ///
    /// * data is not a valid [TOML]
    /// * one field is unknown
    /// * the version requirement are not fulfilled
    /// * a mandatory field is not provided (no default value)
    /// * the pipeline is not consistent (see [Builder::<WantsValidate>::validate])
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml(input: &str) -> anyhow::Result<Self> {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct VersionRequirement {
            #[serde(
                serialize_with = "crate::parser::semver::serialize",
                deserialize_with = "crate::parser::semver::deserialize"
            )]
            version_requirement: semver::VersionReq,
        }

        let req = toml::from_str::<VersionRequirement>(input)?;
        let pkg_version = semver::Version::parse(env!("CARGO_PKG_VERSION"))?;

        if !req.version_requirement.matches(&pkg_version) {
            anyhow::bail!(
                "Version requirement not fulfilled: expected '{}' but got '{}'",
                req.version_requirement,
                env!("CARGO_PKG_VERSION")
            );
        }

        toml::from_str::<Self>(input)
            .map(Builder::<WantsValidate>::ensure)
            .map_err(anyhow::Error::new)?
    }

    /// Get a processor's configuration by name.
    #[must_use]
    pub fn processor(&self, name: &str) -> Option<&ConfigProcessor> {
        self.pipeline.processors.iter().find(|p| p.name == name)
    }
}
