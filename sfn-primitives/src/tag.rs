//! Data tags carried alongside every payload.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Small integer naming the semantic channel of a payload.
///
/// Tags are used for routing only; they never describe payload content.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(u32);

impl Tag {
    /// Wraps a raw tag value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw tag value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Tag> for u32 {
    fn from(value: Tag) -> Self {
        value.0
    }
}
