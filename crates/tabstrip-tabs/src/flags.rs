//! Flags accepted by `TabRegistry::load_url`

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Independent, combinable load options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadFlags(u32);

impl LoadFlags {
    pub const NONE: LoadFlags = LoadFlags(0);
    pub const NEW_TAB: LoadFlags = LoadFlags(1 << 0);
    pub const USER_ENTERED: LoadFlags = LoadFlags(1 << 1);
    pub const PRIVATE: LoadFlags = LoadFlags(1 << 2);
    pub const PINNED: LoadFlags = LoadFlags(1 << 3);
    pub const DELAY_LOAD: LoadFlags = LoadFlags(1 << 4);
    pub const DESKTOP: LoadFlags = LoadFlags(1 << 5);
    pub const BACKGROUND: LoadFlags = LoadFlags(1 << 6);
    pub const EXTERNAL: LoadFlags = LoadFlags(1 << 7);

    pub const fn from_bits(bits: u32) -> Self {
        LoadFlags(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: LoadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Delay-load tabs are never brought to the foreground.
    pub fn is_background(&self) -> bool {
        self.contains(LoadFlags::DELAY_LOAD) || self.contains(LoadFlags::BACKGROUND)
    }
}

impl BitOr for LoadFlags {
    type Output = LoadFlags;

    fn bitor(self, rhs: LoadFlags) -> LoadFlags {
        LoadFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LoadFlags {
    fn bitor_assign(&mut self, rhs: LoadFlags) {
        self.0 |= rhs.0;
    }
}
