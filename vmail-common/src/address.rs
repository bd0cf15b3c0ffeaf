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
/// Address Email
///
/// Two addresses are equal when their canonical forms are equal: the domain
/// is compared case-insensitively, the local part is compared as is.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, Eq)]
#[serde(into = "String", try_from = "String")]
pub struct Address {
    at_sign: usize,
    full: String,
    canonical: String,
}

impl TryFrom<String> for Address {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Err(error) = addr::parse_email_address(&value) {
            anyhow::bail!("'{}' is not a valid address: {}", value, error)
        }
        let at_sign = value
            .rfind('@')
            .ok_or_else(|| anyhow::anyhow!("'{}' is not a valid address: missing '@'", value))?;

        Ok(Self {
            canonical: format!(
                "{}@{}",
                &value[..at_sign],
                value[at_sign + 1..].to_ascii_lowercase()
            ),
            at_sign,
            full: value,
        })
    }
}

impl TryFrom<&str> for Address {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl std::str::FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_string())
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.full
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full)
    }
}

impl Address {
    /// get the full email address, as received.
    #[must_use]
    pub fn full(&self) -> &str {
        &self.full
    }

    /// get the canonical form used for comparisons.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// get the user of the address.
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.full[..self.at_sign]
    }

    /// get the fqdn of the address.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.full[self.at_sign + 1..]
    }
}
