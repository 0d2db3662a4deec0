use std::fmt;
use std::ops::BitOr;

/// Set of capability facets a request type declares.
///
/// The set is read once, when the pipeline composes the behavior chain for a type;
/// it is never re-inspected per call.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const CACHEABLE: Self = Self(1 << 0);
    pub const CACHE_INVALIDATING: Self = Self(1 << 1);
    pub const AUTHORIZABLE: Self = Self(1 << 2);
    pub const RATE_LIMITED: Self = Self(1 << 3);
    pub const CIRCUIT_PROTECTED: Self = Self(1 << 4);
    pub const LOGGABLE: Self = Self(1 << 5);
    pub const INTERVAL_CHECKED: Self = Self(1 << 6);
    pub const TRANSACTIONAL: Self = Self(1 << 7);

    const NAMES: [(Self, &'static str); 8] = [
        (Self::CACHEABLE, "cacheable"),
        (Self::CACHE_INVALIDATING, "cache_invalidating"),
        (Self::AUTHORIZABLE, "authorizable"),
        (Self::RATE_LIMITED, "rate_limited"),
        (Self::CIRCUIT_PROTECTED, "circuit_protected"),
        (Self::LOGGABLE, "loggable"),
        (Self::INTERVAL_CHECKED, "interval_checked"),
        (Self::TRANSACTIONAL, "transactional"),
    ];

    /// Union of two sets; usable in `const` position.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(cap, _)| self.contains(*cap))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Capabilities({})", names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_contains() {
        const CAPS: Capabilities = Capabilities::CACHEABLE.with(Capabilities::LOGGABLE);
        assert!(CAPS.contains(Capabilities::CACHEABLE));
        assert!(CAPS.contains(Capabilities::LOGGABLE));
        assert!(!CAPS.contains(Capabilities::TRANSACTIONAL));
        assert!(CAPS.contains(Capabilities::NONE));
        assert!(Capabilities::default().is_empty());
        assert_eq!(
            Capabilities::RATE_LIMITED | Capabilities::CIRCUIT_PROTECTED,
            Capabilities::RATE_LIMITED.with(Capabilities::CIRCUIT_PROTECTED)
        );
    }

    #[test]
    fn debug_lists_names() {
        let caps = Capabilities::AUTHORIZABLE | Capabilities::TRANSACTIONAL;
        assert_eq!(
            format!("{:?}", caps),
            "Capabilities(authorizable | transactional)"
        );
    }
}
