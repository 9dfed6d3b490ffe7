//! Logical partitions of the vector index.

use std::fmt;

use serde::{Deserialize, Serialize};

const USER_PREFIX: &str = "user_";
const PUBLIC: &str = "public";

/// A namespace in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Namespace {
    /// Private namespace holding every dream of one user.
    User(String),

    /// Shared namespace holding only dreams currently marked public.
    Public,
}

impl Namespace {
    /// The private namespace of `owner_id`.
    pub fn user(owner_id: impl Into<String>) -> Self {
        Self::User(owner_id.into())
    }

    /// Wire name of the namespace.
    pub fn name(&self) -> String {
        match self {
            Self::User(owner) => format!("{USER_PREFIX}{owner}"),
            Self::Public => PUBLIC.to_string(),
        }
    }

    /// Parse a wire name. Returns `None` for names this system does not own.
    pub fn parse(name: &str) -> Option<Self> {
        if name == PUBLIC {
            return Some(Self::Public);
        }
        name.strip_prefix(USER_PREFIX)
            .filter(|owner| !owner.is_empty())
            .map(|owner| Self::User(owner.to_string()))
    }

    /// Owner of a private namespace.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::User(owner) => Some(owner),
            Self::Public => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.name()
    }
}

impl TryFrom<String> for Namespace {
    type Error = String;

    fn try_from(name: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&name).ok_or_else(|| format!("not a dream namespace: {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_names() {
        assert_eq!(Namespace::user("u1").name(), "user_u1");
        assert_eq!(Namespace::Public.to_string(), "public");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Namespace::parse("user_42"), Some(Namespace::user("42")));
        assert_eq!(Namespace::parse("public"), Some(Namespace::Public));
        assert_eq!(Namespace::parse("user_"), None);
        assert_eq!(Namespace::parse(""), None);
        assert_eq!(Namespace::parse("archive"), None);
    }

    #[test]
    fn test_owner() {
        assert_eq!(Namespace::user("u1").owner(), Some("u1"));
        assert_eq!(Namespace::Public.owner(), None);
    }
}
