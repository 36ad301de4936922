//! Host/version specific knobs.

#[cfg(feature = "json")]
use crate::Error;

/// Bone naming data that differs between host games.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "json", serde(default, rename_all = "camelCase"))]
pub struct HostProfile {
    /// Root of the head subtree; splits face bones from body bones in selective reloads.
    pub head_root_bone: String,
    /// Name prefixes of transforms that are never offered as bones.
    pub non_bone_prefixes: Vec<String>,
    /// Bones driven by an independent secondary-motion simulation. Their baseline is
    /// recaptured every frame so modifiers ride on top of the simulation.
    pub dynamic_bone_prefixes: Vec<String>,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self::koikatsu()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl HostProfile {
    pub fn koikatsu() -> Self {
        Self {
            head_root_bone: "cf_j_head".to_string(),
            non_bone_prefixes: strings(&["cf_t_", "cf_pv_"]),
            dynamic_bone_prefixes: strings(&["cf_d_sk_", "cf_j_bust0", "cf_d_siri01_", "cf_j_siri_"]),
        }
    }

    pub fn ai_shoujo() -> Self {
        Self {
            head_root_bone: "cf_J_Head".to_string(),
            non_bone_prefixes: strings(&["f_t_", "f_pv_", "f_k_"]),
            dynamic_bone_prefixes: strings(&["cf_J_SiriDam", "cf_J_Mune00"]),
        }
    }

    pub fn is_possible_bone(&self, name: &str) -> bool {
        !self.non_bone_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    pub fn is_dynamic_bone(&self, name: &str) -> bool {
        self.dynamic_bone_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Parses a profile; missing fields fall back to the Koikatsu preset.
    #[cfg(feature = "json")]
    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s).map_err(|e| Error::Json {
            message: e.to_string(),
        })
    }
}

/// Which parts of the saved modifier set a reload may replace.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LoadFlags {
    pub body: bool,
    pub face: bool,
    pub clothes: bool,
}

impl Default for LoadFlags {
    fn default() -> Self {
        Self::ALL
    }
}

impl LoadFlags {
    pub const ALL: Self = Self {
        body: true,
        face: true,
        clothes: true,
    };

    pub fn any(self) -> bool {
        self.body || self.face || self.clothes
    }

    pub fn all(self) -> bool {
        self.body && self.face && self.clothes
    }
}
