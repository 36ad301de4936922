//! Human-readable JSON interchange for modifier sets.
//!
//! Only authored data is exchanged: bone name, location and per-coordinate deltas.
//! Resolved nodes and baselines belong to a live character and are never written.

use crate::{BoneLocation, BoneModifier, BoneModifierData, Error};
use glam::Vec3;
use serde::{Deserialize, Serialize};

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataDef {
    #[serde(default = "default_scale")]
    scale: [f32; 3],
    #[serde(default)]
    position: [f32; 3],
    #[serde(default)]
    rotation: [f32; 3],
}

impl From<&BoneModifierData> for DataDef {
    fn from(data: &BoneModifierData) -> Self {
        Self {
            scale: data.scale.to_array(),
            position: data.position.to_array(),
            rotation: data.rotation.to_array(),
        }
    }
}

impl From<&DataDef> for BoneModifierData {
    fn from(def: &DataDef) -> Self {
        BoneModifierData::new(
            Vec3::from_array(def.scale),
            Vec3::from_array(def.position),
            Vec3::from_array(def.rotation),
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifierDef {
    bone: String,
    #[serde(default)]
    location: Option<String>,
    coordinates: Vec<DataDef>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Root {
    modifiers: Vec<ModifierDef>,
}

fn parse_location(bone: &str, value: Option<&str>) -> Result<BoneLocation, Error> {
    let Some(value) = value else {
        return Ok(BoneLocation::Unknown);
    };
    match value {
        "Unknown" => Ok(BoneLocation::Unknown),
        "BodyTop" => Ok(BoneLocation::BodyTop),
        other => other
            .strip_prefix("Accessory")
            .and_then(|n| n.parse::<u32>().ok())
            .map(BoneLocation::Accessory)
            .ok_or_else(|| Error::Json {
                message: format!("invalid location '{other}' for bone '{bone}'"),
            }),
    }
}

/// Serializes every non-empty modifier.
pub fn modifiers_to_string(modifiers: &[BoneModifier]) -> Result<String, Error> {
    let root = Root {
        modifiers: modifiers
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| ModifierDef {
                bone: m.bone_name().to_string(),
                location: Some(m.location().to_string()),
                coordinates: m.coordinate_data().iter().map(DataDef::from).collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&root).map_err(|e| Error::Json {
        message: e.to_string(),
    })
}

pub fn modifiers_from_str(s: &str) -> Result<Vec<BoneModifier>, Error> {
    let root: Root = serde_json::from_str(s).map_err(|e| Error::Json {
        message: e.to_string(),
    })?;
    root.modifiers
        .iter()
        .map(|def| {
            if def.bone.is_empty() {
                return Err(Error::InvalidArgument {
                    message: "bone name must not be empty".to_string(),
                });
            }
            let location = parse_location(&def.bone, def.location.as_deref())?;
            let data = def.coordinates.iter().map(BoneModifierData::from).collect();
            Ok(BoneModifier::with_data(def.bone.clone(), location, data))
        })
        .collect()
}
