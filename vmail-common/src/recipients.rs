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
use crate::Address;

/// the recipients of a mail.
///
/// insertion order is kept, an address already present in its canonical
/// form is never inserted twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<Address>", into = "Vec<Address>")]
pub struct Recipients(Vec<Address>);

impl Recipients {
    /// create an empty recipient set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// add a recipient, returns false if it was already present.
    pub fn insert(&mut self, address: Address) -> bool {
        if self.0.contains(&address) {
            false
        } else {
            self.0.push(address);
            true
        }
    }

    /// remove a recipient, returns false if it was not present.
    pub fn remove(&mut self, address: &Address) -> bool {
        let len = self.0.len();
        self.0.retain(|rcpt| rcpt != address);
        len != self.0.len()
    }

    /// remove every recipient contained in `addresses`.
    pub fn remove_all(&mut self, addresses: &[Address]) {
        self.0.retain(|rcpt| !addresses.contains(rcpt));
    }

    /// keep only the recipients for which `f` returns true.
    pub fn retain(&mut self, f: impl FnMut(&Address) -> bool) {
        self.0.retain(f);
    }

    ///
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    ///
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    ///
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    ///
    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.0.iter()
    }

    ///
    #[must_use]
    pub fn as_slice(&self) -> &[Address] {
        &self.0
    }
}

impl From<Vec<Address>> for Recipients {
    fn from(addresses: Vec<Address>) -> Self {
        addresses.into_iter().collect()
    }
}

impl From<Recipients> for Vec<Address> {
    fn from(recipients: Recipients) -> Self {
        recipients.0
    }
}

impl FromIterator<Address> for Recipients {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

impl Extend<Address> for Recipients {
    fn extend<T: IntoIterator<Item = Address>>(&mut self, iter: T) {
        for address in iter {
            self.insert(address);
        }
    }
}

impl<'a> IntoIterator for &'a Recipients {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for Recipients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, rcpt) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{rcpt}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::try_from(s).unwrap()
    }

    #[test]
    fn unique_by_canonical_form() {
        let mut rcpt = Recipients::new();
        assert!(rcpt.insert(addr("a@example.com")));
        assert!(!rcpt.insert(addr("a@EXAMPLE.com")));
        assert!(rcpt.insert(addr("b@example.com")));

        assert_eq!(rcpt.len(), 2);
        assert_eq!(rcpt.to_string(), "[a@example.com, b@example.com]");
    }

    #[test]
    fn insertion_order() {
        let rcpt = vec![
            addr("c@example.com"),
            addr("a@example.com"),
            addr("c@Example.com"),
            addr("b@example.com"),
        ]
        .into_iter()
        .collect::<Recipients>();

        pretty_assertions::assert_eq!(
            rcpt.iter().map(Address::full).collect::<Vec<_>>(),
            vec!["c@example.com", "a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn remove() {
        let mut rcpt = Recipients::from(vec![addr("a@example.com"), addr("b@example.com")]);
        assert!(rcpt.remove(&addr("a@Example.com")));
        assert!(!rcpt.remove(&addr("a@example.com")));

        rcpt.remove_all(&[addr("b@example.com")]);
        assert!(rcpt.is_empty());
    }

    #[test]
    fn deserialize_collapses_duplicates() {
        let rcpt =
            serde_json::from_str::<Recipients>(r#"["a@example.com", "a@example.com"]"#).unwrap();
        assert_eq!(rcpt.len(), 1);
    }
}
