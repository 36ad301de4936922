use std::fmt;

/// Where a bone lives on the character.
///
/// Variant order is meaningful: everything below `Accessory(0)` is on the body,
/// everything at or above it is on an accessory slot. The derived `Ord` follows
/// the persisted ordinal, so range checks like `location < BoneLocation::ACCESSORY`
/// partition modifiers the same way the saved data does.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BoneLocation {
    /// Not resolved yet. Acts as a wildcard when looking bones up.
    #[default]
    Unknown,
    /// Under the body root, accessories excluded.
    BodyTop,
    /// Under the root of the accessory in slot `n`.
    Accessory(u32),
}

impl BoneLocation {
    /// First accessory location; all accessory locations compare `>=` to this.
    pub const ACCESSORY: Self = Self::Accessory(0);

    const ORDINAL_BODY_TOP: i32 = 1;
    const ORDINAL_ACCESSORY: i32 = 2;

    pub fn ordinal(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::BodyTop => Self::ORDINAL_BODY_TOP,
            Self::Accessory(n) => i32::try_from(n)
                .map_or(i32::MAX, |n| Self::ORDINAL_ACCESSORY.saturating_add(n)),
        }
    }

    /// Negative and out-of-range ordinals map to `Unknown` so that the bone is
    /// searched for everywhere instead of being dropped.
    pub fn from_ordinal(ordinal: i32) -> Self {
        match ordinal {
            Self::ORDINAL_BODY_TOP => Self::BodyTop,
            n if n >= Self::ORDINAL_ACCESSORY => Self::Accessory((n - Self::ORDINAL_ACCESSORY) as u32),
            _ => Self::Unknown,
        }
    }

    pub fn is_accessory(self) -> bool {
        self >= Self::ACCESSORY
    }

    pub fn accessory_index(self) -> Option<usize> {
        match self {
            Self::Accessory(n) => Some(n as usize),
            _ => None,
        }
    }
}

impl fmt::Display for BoneLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::BodyTop => f.write_str("BodyTop"),
            Self::Accessory(n) => write!(f, "Accessory{n}"),
        }
    }
}
