use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static LOCATOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([A-Za-z])?$").expect("locator pattern is valid"));

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid residue locator '{0}': expected a residue number optionally followed by a chain letter (e.g. '145A')")]
pub struct ParseLocatorError(pub String);

/// A PDB-style residue address: residue number plus an optional chain letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResidueLocator {
    pub number: isize,
    pub chain: Option<char>,
}

impl ResidueLocator {
    pub fn new(number: isize, chain: Option<char>) -> Self {
        Self { number, chain }
    }

    /// The chain letter, or `default` when the locator does not name one.
    pub fn chain_or(&self, default: char) -> char {
        self.chain.unwrap_or(default)
    }

    /// The same residue with the chain letter filled in.
    pub fn resolved(&self, default_chain: char) -> Self {
        Self {
            number: self.number,
            chain: Some(self.chain_or(default_chain)),
        }
    }
}

impl FromStr for ResidueLocator {
    type Err = ParseLocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = LOCATOR_PATTERN
            .captures(s.trim())
            .ok_or_else(|| ParseLocatorError(s.to_string()))?;
        let number = caps[1]
            .parse()
            .map_err(|_| ParseLocatorError(s.to_string()))?;
        let chain = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase());
        Ok(Self { number, chain })
    }
}

impl TryFrom<String> for ResidueLocator {
    type Error = ParseLocatorError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResidueLocator> for String {
    fn from(value: ResidueLocator) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ResidueLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chain {
            Some(chain) => write!(f, "{}{}", self.number, chain),
            None => write!(f, "{}", self.number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number_and_chain() {
        let loc: ResidueLocator = "145A".parse().unwrap();
        assert_eq!(loc, ResidueLocator::new(145, Some('A')));
        assert_eq!(loc.to_string(), "145A");
    }

    #[test]
    fn parses_number_without_chain() {
        let loc: ResidueLocator = " 12 ".parse().unwrap();
        assert_eq!(loc, ResidueLocator::new(12, None));
        assert_eq!(loc.chain_or('B'), 'B');
        assert_eq!(loc.resolved('B').to_string(), "12B");
    }

    #[test]
    fn lowercase_chain_is_normalised() {
        let loc: ResidueLocator = "1b".parse().unwrap();
        assert_eq!(loc.chain, Some('B'));
    }

    #[test]
    fn rejects_malformed_locators() {
        assert!("".parse::<ResidueLocator>().is_err());
        assert!("A145".parse::<ResidueLocator>().is_err());
        assert!("14AB".parse::<ResidueLocator>().is_err());
        assert!("-3A".parse::<ResidueLocator>().is_err());
    }

    #[test]
    fn serde_uses_the_textual_form() {
        let loc = ResidueLocator::new(1, Some('B'));
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"1B\"");
        let back: ResidueLocator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
