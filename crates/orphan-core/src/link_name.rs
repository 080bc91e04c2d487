use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A normalized link target, e.g. `"Foo Bar"` from `[[ Foo Bar |shown]]`.
///
/// Ordering is byte-wise on the UTF-8 text, so it is case-sensitive and
/// uppercase ASCII sorts before lowercase: `"Beta" < "alpha" < "zeta"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkName(String);

impl LinkName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for LinkName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for LinkName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for LinkName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LinkName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for LinkName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LinkName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_case_sensitively() {
        let mut names: Vec<LinkName> = ["zeta", "alpha", "Beta"].into_iter().map(LinkName::from).collect();
        names.sort();
        assert_eq!(names, vec!["Beta", "alpha", "zeta"]);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&LinkName::from("Ghost")).unwrap();
        assert_eq!(json, "\"Ghost\"");
    }
}
