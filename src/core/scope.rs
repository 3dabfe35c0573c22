//! Rebuild scope decided per accepted filesystem event.

use std::fmt;

/// How much of the project a change invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebuildScope {
    /// Rebuild page bundles only. The backend keeps running.
    FrontendOnly,
    /// Rescan routes, rebuild every page, regenerate backend source and
    /// restart the backend.
    Full,
}

impl RebuildScope {
    #[inline]
    pub const fn is_full(self) -> bool {
        matches!(self, Self::Full)
    }
}

impl fmt::Display for RebuildScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrontendOnly => f.write_str("frontend"),
            Self::Full => f.write_str("full"),
        }
    }
}
