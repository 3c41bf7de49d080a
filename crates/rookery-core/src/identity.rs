//! Nest identity
//!
//! Every nest is identified by a unique, human-readable name such as
//! `"Big Oak"` or `"Cow Pasture"`.

use std::borrow::Borrow;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Unique name of a nest in the network
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NestName(String);

impl NestName {
    /// Create a nest name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NestName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NestName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&NestName> for NestName {
    fn from(name: &NestName) -> Self {
        name.clone()
    }
}

impl AsRef<str> for NestName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NestName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NestName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NestName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
