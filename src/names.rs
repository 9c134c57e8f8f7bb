//! Class Name Canonicalization
//!
//! Every class is keyed by its lower camel case name: `OrderCustomer`,
//! `order_customer` and `order-customer` all become `orderCustomer`.
//! Two spellings that normalize to the same name are the same class as far as
//! the registry is concerned.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical identity of a domain class
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    /// Canonicalize a raw class name
    pub fn new(raw: &str) -> Self {
        Self(to_camel_case(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ClassName {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&ClassName> for ClassName {
    fn from(name: &ClassName) -> Self {
        name.clone()
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClassName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Split a string into words.
///
/// Separators are any non-alphanumeric character. Inside an alphanumeric run a
/// new word starts at a lower-to-upper change, at a letter/digit change, and
/// before the last capital of an acronym that is followed by lowercase
/// (`XMLHttp` -> `XML`, `Http`).
pub fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();

    for token in s.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = token.chars().collect();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if i > 0 && !current.is_empty() {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();
                let boundary = (prev.is_lowercase() && c.is_uppercase())
                    || (prev.is_alphabetic() && c.is_numeric())
                    || (prev.is_numeric() && c.is_alphabetic())
                    || (prev.is_uppercase()
                        && c.is_uppercase()
                        && next.is_some_and(|n| n.is_lowercase()));
                if boundary {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }

        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}

/// Convert to lower camel case (`Order Customer` -> `orderCustomer`)
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for (i, word) in split_words(s).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            result.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }

    result
}
