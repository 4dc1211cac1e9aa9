//! Cache key composition.
//!
//! A key names exactly one query shape and its parameters. Components are
//! percent-encoded before joining so a `:` inside a field can never shift the
//! boundaries between fields; word-only input (which is all the HTTP layer lets
//! through) encodes to itself.

use std::fmt;

const SEPARATOR: char = ':';

/// Key for one cacheable query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Paged list of descriptions matching a loose query.
    Match {
        page: u32,
        name: String,
        class: String,
        subclass: String,
    },
    /// Detailed record for one fully specified asset.
    Fetch {
        name: String,
        class: String,
        subclass: String,
    },
}

impl CacheKey {
    pub fn matches(page: u32, name: &str, class: &str, subclass: &str) -> Self {
        CacheKey::Match {
            page,
            name: name.to_string(),
            class: class.to_string(),
            subclass: subclass.to_string(),
        }
    }

    pub fn fetch(name: &str, class: &str, subclass: &str) -> Self {
        CacheKey::Fetch {
            name: name.to_string(),
            class: class.to_string(),
            subclass: subclass.to_string(),
        }
    }

    /// Leading component naming the query shape.
    pub fn shape(&self) -> &'static str {
        match self {
            CacheKey::Match { .. } => "match",
            CacheKey::Fetch { .. } => "fetch",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Match {
                page,
                name,
                class,
                subclass,
            } => write!(
                f,
                "{shape}{sep}{page}{sep}{}{sep}{}{sep}{}",
                urlencoding::encode(name),
                urlencoding::encode(class),
                urlencoding::encode(subclass),
                shape = self.shape(),
                sep = SEPARATOR,
            ),
            CacheKey::Fetch {
                name,
                class,
                subclass,
            } => write!(
                f,
                "{shape}{sep}{}{sep}{}{sep}{}",
                urlencoding::encode(name),
                urlencoding::encode(class),
                urlencoding::encode(subclass),
                shape = self.shape(),
                sep = SEPARATOR,
            ),
        }
    }
}
