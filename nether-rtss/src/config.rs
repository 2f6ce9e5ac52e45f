//! Shader generation settings (rtss.toml)
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock configuration: Cg output, per-vertex fog, two skinning weights.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RtssError;
use crate::srs::SHADOW_TEXTURE_COUNT;

/// Shader generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtssConfig {
    /// Language programs are generated in (default: "cg")
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default)]
    pub hlsl: HlslConfig,
    #[serde(default)]
    pub glsl: GlslConfig,
    #[serde(default)]
    pub glsles: GlslEsConfig,
    #[serde(default)]
    pub fog: FogConfig,
    #[serde(default)]
    pub skinning: SkinningConfig,
    #[serde(default)]
    pub pssm: PssmConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HlslConfig {
    /// Emit SV_* semantics and keep fragment inputs in vertex output order
    #[serde(default)]
    pub shader_model_4: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlslConfig {
    /// `#version` line of desktop GLSL programs (default: 120)
    #[serde(default = "default_glsl_version")]
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlslEsConfig {
    /// Default float precision qualifier (default: "mediump")
    #[serde(default = "default_precision")]
    pub precision: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FogConfig {
    /// Compute fog in the fragment program (default: false)
    #[serde(default)]
    pub per_pixel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinningConfig {
    /// Influences per vertex when the mesh doesn't say (default: 2, range: 1-4)
    #[serde(default = "default_weight_count")]
    pub default_weight_count: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PssmConfig {
    /// Shadow map splits; only 3 is supported
    #[serde(default = "default_split_count")]
    pub split_count: u32,
}

fn default_target_language() -> String {
    crate::language::CG.to_string()
}
fn default_glsl_version() -> u32 {
    120
}
fn default_precision() -> String {
    "mediump".to_string()
}
fn default_weight_count() -> u16 {
    2
}
fn default_split_count() -> u32 {
    SHADOW_TEXTURE_COUNT as u32
}

impl Default for RtssConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            hlsl: HlslConfig::default(),
            glsl: GlslConfig::default(),
            glsles: GlslEsConfig::default(),
            fog: FogConfig::default(),
            skinning: SkinningConfig::default(),
            pssm: PssmConfig::default(),
        }
    }
}

impl Default for GlslConfig {
    fn default() -> Self {
        Self {
            version: default_glsl_version(),
        }
    }
}

impl Default for GlslEsConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            default_weight_count: default_weight_count(),
        }
    }
}

impl Default for PssmConfig {
    fn default() -> Self {
        Self {
            split_count: default_split_count(),
        }
    }
}

impl RtssConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, RtssError> {
        let config: Self = toml::from_str(text).map_err(|e| RtssError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RtssError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RtssError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), RtssError> {
        if self.pssm.split_count != default_split_count() {
            return Err(RtssError::Config(format!(
                "pssm.split_count must be {}, got {}",
                default_split_count(),
                self.pssm.split_count
            )));
        }
        if !(1..=4).contains(&self.skinning.default_weight_count) {
            return Err(RtssError::Config(format!(
                "skinning.default_weight_count must be 1-4, got {}",
                self.skinning.default_weight_count
            )));
        }
        Ok(())
    }
}
