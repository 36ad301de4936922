//! Versioned extended-data records stored with character cards and coordinates.

use crate::binary::{decode_bone_dictionary, decode_modifier_list, encode_modifier_list};
use crate::{BoneModifier, Error};
use std::collections::BTreeMap;

/// Key of the modifier block inside a [`PluginData`] record.
pub const BONE_DATA_KEY: &str = "boneData";

/// Card schema written by [`save_modifiers`].
pub const CARD_VERSION: i32 = 2;
/// Legacy card schema: dictionary keyed by bone name.
pub const CARD_VERSION_LEGACY: i32 = 1;

/// Coordinate schema written by [`save_coordinate_modifiers`].
pub const COORDINATE_VERSION: i32 = 3;
/// Legacy coordinate schema: dictionary keyed by bone name.
pub const COORDINATE_VERSION_LEGACY: i32 = 2;

/// One versioned record in the host's save container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluginData {
    pub version: i32,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl PluginData {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            data: BTreeMap::new(),
        }
    }

    fn with_block(version: i32, block: Vec<u8>) -> Self {
        let mut data = Self::new(version);
        data.data.insert(BONE_DATA_KEY.to_string(), block);
        data
    }

    fn block(&self) -> Result<&[u8], Error> {
        self.data
            .get(BONE_DATA_KEY)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingKey {
                key: BONE_DATA_KEY.to_string(),
            })
    }
}

fn is_saveable(modifier: &BoneModifier) -> bool {
    !modifier.is_empty() && modifier.bone().is_some()
}

pub fn try_read_modifiers(data: &PluginData) -> Result<Vec<BoneModifier>, Error> {
    match data.version {
        CARD_VERSION => decode_modifier_list(data.block()?),
        CARD_VERSION_LEGACY => {
            log::debug!("loading legacy bone dictionary card data");
            decode_bone_dictionary(data.block()?)
        }
        version => Err(Error::UnsupportedVersion { version }),
    }
}

/// Reads card modifiers. Failures are logged and yield an empty list.
pub fn read_modifiers(data: Option<&PluginData>) -> Vec<BoneModifier> {
    let Some(data) = data else {
        return Vec::new();
    };
    try_read_modifiers(data).unwrap_or_else(|e| {
        log::error!("failed to load extended data: {e}");
        Vec::new()
    })
}

/// Saves every non-empty modifier resolved to a bone, or `None` if there is nothing to save.
pub fn save_modifiers(modifiers: &[BoneModifier]) -> Option<PluginData> {
    let to_save: Vec<BoneModifier> = modifiers.iter().filter(|m| is_saveable(m)).cloned().collect();
    if to_save.is_empty() {
        return None;
    }
    Some(PluginData::with_block(CARD_VERSION, encode_modifier_list(&to_save)))
}

pub fn try_read_coordinate_modifiers(data: &PluginData) -> Result<Vec<BoneModifier>, Error> {
    match data.version {
        COORDINATE_VERSION => decode_modifier_list(data.block()?),
        COORDINATE_VERSION_LEGACY => decode_bone_dictionary(data.block()?),
        version => Err(Error::UnsupportedVersion { version }),
    }
}

/// Reads coordinate modifiers. Failures are logged and yield an empty list.
pub fn read_coordinate_modifiers(data: Option<&PluginData>) -> Vec<BoneModifier> {
    let Some(data) = data else {
        return Vec::new();
    };
    try_read_coordinate_modifiers(data).unwrap_or_else(|e| {
        log::error!("failed to load coordinate extended data: {e}");
        Vec::new()
    })
}

/// Saves the `coordinate` slot of every coordinate-specific modifier as a single-slot
/// modifier, or `None` if there is nothing to save.
pub fn save_coordinate_modifiers(
    modifiers: &[BoneModifier],
    coordinate: usize,
) -> Option<PluginData> {
    let to_save: Vec<BoneModifier> = modifiers
        .iter()
        .filter(|m| m.is_coordinate_specific() && is_saveable(m))
        .map(|m| BoneModifier::with_data(m.bone_name(), m.location(), vec![*m.data(coordinate)]))
        .collect();
    if to_save.is_empty() {
        return None;
    }
    Some(PluginData::with_block(
        COORDINATE_VERSION,
        encode_modifier_list(&to_save),
    ))
}
