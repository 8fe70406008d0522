// src/pinning/state.rs

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Freshness of a recipe relative to the current pinnings.
///
/// A set of flags, one contributed per rendered variant and OR-combined over
/// all variants of the recipe.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PinningState(u8);

impl PinningState {
    /// Rendering failed.
    pub const FAIL: Self = Self(1 << 0);
    /// A variant will be skipped.
    pub const SKIP: Self = Self(1 << 1);
    /// A variant exists already.
    pub const HAVE: Self = Self(1 << 2);
    /// A variant was bumped already and will be built as is.
    pub const BUMPED: Self = Self(1 << 3);
    /// A variant needs its build number bumped.
    pub const BUMP: Self = Self(1 << 4);
    /// A `noarch: python` variant exists already.
    pub const HAVE_NOARCH_VARIANT: Self = Self(1 << 5);

    const NAMED: [(&'static str, PinningState); 6] = [
        ("FAIL", Self::FAIL),
        ("SKIP", Self::SKIP),
        ("HAVE", Self::HAVE),
        ("BUMPED", Self::BUMPED),
        ("BUMP", Self::BUMP),
        ("HAVE_NOARCH_VARIANT", Self::HAVE_NOARCH_VARIANT),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every flag in `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn needs_bump(self) -> bool {
        self.contains(Self::BUMP)
    }

    pub fn failed(self) -> bool {
        self.contains(Self::FAIL)
    }

    /// Names of the flags that are set, in declaration order.
    pub fn flag_names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| name)
    }

    /// All flag names, for tallies.
    pub fn all_flag_names() -> impl Iterator<Item = &'static str> {
        Self::NAMED.into_iter().map(|(name, _)| name)
    }
}

impl BitOr for PinningState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PinningState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PinningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(empty)");
        }
        let names: Vec<&str> = self.flag_names().collect();
        f.write_str(&names.join(" | "))
    }
}

impl fmt::Debug for PinningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinningState({self})")
    }
}
