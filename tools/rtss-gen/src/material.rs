//! Material description files
//!
//! ```toml
//! name = "terrain"
//! features = ["FFP_Transform", "FFP_Color", "FFP_Texturing", "SGX_TextureAtlasSampler"]
//! atlas = "terrain.atlas"
//!
//! [pass]
//! lighting_enabled = true
//!
//! [[pass.texture_units]]
//! texture_name = "terrain.png"
//! ```

use anyhow::{Context, Result};
use nether_rtss::host::PassDescription;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Material {
    /// Base name of the generated files
    #[serde(default = "default_name")]
    pub name: String,

    /// Feature type names in any order; empty means the fixed-function chain
    #[serde(default)]
    pub features: Vec<String>,

    /// Texture atlas definition, relative to the material file
    #[serde(default)]
    pub atlas: Option<PathBuf>,

    #[serde(default)]
    pub pass: PassDescription,
}

fn default_name() -> String {
    "material".to_string()
}

impl Material {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse material description")
    }

    /// Load a material, resolving its atlas path against the file's directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read material {}", path.display()))?;
        let mut material =
            Self::from_toml_str(&text).with_context(|| format!("In {}", path.display()))?;

        if let (Some(atlas), Some(dir)) = (&material.atlas, path.parent()) {
            material.atlas = Some(dir.join(atlas));
        }
        Ok(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nether_rtss::host::FogMode;

    #[test]
    fn test_defaults() {
        let material = Material::from_toml_str("").unwrap();
        assert_eq!(material.name, "material");
        assert!(material.features.is_empty());
        assert!(material.atlas.is_none());
        assert!(material.pass.lighting_enabled);
    }

    #[test]
    fn test_parse_material() {
        let material = Material::from_toml_str(
            r#"
            name = "rock"
            features = ["FFP_Transform", "FFP_Fog"]

            [pass.scene_fog]
            mode = "exp2"
            density = 0.02
            "#,
        )
        .unwrap();
        assert_eq!(material.name, "rock");
        assert_eq!(material.features, ["FFP_Transform", "FFP_Fog"]);
        assert_eq!(material.pass.scene_fog.mode, FogMode::Exp2);
    }

    #[test]
    fn test_atlas_path_is_relative_to_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.toml");
        std::fs::write(&path, "atlas = \"terrain.atlas\"\n").unwrap();

        let material = Material::load(&path).unwrap();
        assert_eq!(material.atlas.unwrap(), dir.path().join("terrain.atlas"));
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(Material::from_toml_str("features = 3").is_err());
    }
}
