//! Automatically supplied engine constants
//!
//! Auto constants are uniforms whose values come from the host engine's scene
//! state (matrices, derived colours, texture sizes) rather than from the
//! material. A program holds at most one uniform per (type, data) pair.

use super::{GpuConstantType, GpuParamVariability};

/// Vocabulary of auto constants understood by the host parameter source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoConstantType {
    WorldMatrix,
    InverseWorldMatrix,
    /// Array of 3x4 world matrices, one per bone
    WorldMatrixArray3x4,
    ViewMatrix,
    ViewProjMatrix,
    WorldViewMatrix,
    WorldViewProjMatrix,
    InverseTransposeWorldViewMatrix,
    /// Texture projection matrix for the shadow/projector texture given as data
    TextureWorldViewProjMatrix,
    DerivedAmbientLightColor,
    DerivedSceneColor,
    SurfaceDiffuseColor,
    SurfaceSpecularColor,
    SurfaceShininess,
    /// Diffuse colour of the light index given as data
    LightDiffuseColor,
    FogColor,
    FogParams,
    /// (1/width, 1/height, 1/depth, 1) of the texture unit given as data
    InverseTextureSize,
    /// Elapsed time multiplied by the real data factor
    Time,
}

impl AutoConstantType {
    /// Base uniform name
    pub fn name(self) -> &'static str {
        match self {
            AutoConstantType::WorldMatrix => "world_matrix",
            AutoConstantType::InverseWorldMatrix => "inverse_world_matrix",
            AutoConstantType::WorldMatrixArray3x4 => "world_matrix_array_3x4",
            AutoConstantType::ViewMatrix => "view_matrix",
            AutoConstantType::ViewProjMatrix => "viewproj_matrix",
            AutoConstantType::WorldViewMatrix => "worldview_matrix",
            AutoConstantType::WorldViewProjMatrix => "worldviewproj_matrix",
            AutoConstantType::InverseTransposeWorldViewMatrix => {
                "inverse_transpose_worldview_matrix"
            }
            AutoConstantType::TextureWorldViewProjMatrix => "texture_worldviewproj_matrix",
            AutoConstantType::DerivedAmbientLightColor => "derived_ambient_light_colour",
            AutoConstantType::DerivedSceneColor => "derived_scene_colour",
            AutoConstantType::SurfaceDiffuseColor => "surface_diffuse_colour",
            AutoConstantType::SurfaceSpecularColor => "surface_specular_colour",
            AutoConstantType::SurfaceShininess => "surface_shininess",
            AutoConstantType::LightDiffuseColor => "light_diffuse_colour",
            AutoConstantType::FogColor => "fog_colour",
            AutoConstantType::FogParams => "fog_params",
            AutoConstantType::InverseTextureSize => "inverse_texture_size",
            AutoConstantType::Time => "time",
        }
    }

    /// Declared type of one element
    pub fn element_type(self) -> GpuConstantType {
        match self {
            AutoConstantType::WorldMatrixArray3x4 => GpuConstantType::Matrix3x4,
            AutoConstantType::WorldMatrix
            | AutoConstantType::InverseWorldMatrix
            | AutoConstantType::ViewMatrix
            | AutoConstantType::ViewProjMatrix
            | AutoConstantType::WorldViewMatrix
            | AutoConstantType::WorldViewProjMatrix
            | AutoConstantType::InverseTransposeWorldViewMatrix
            | AutoConstantType::TextureWorldViewProjMatrix => GpuConstantType::Matrix4x4,
            AutoConstantType::SurfaceShininess | AutoConstantType::Time => GpuConstantType::Float1,
            _ => GpuConstantType::Float4,
        }
    }

    /// How often the host refreshes the value
    pub fn variability(self) -> GpuParamVariability {
        match self {
            AutoConstantType::ViewMatrix
            | AutoConstantType::ViewProjMatrix
            | AutoConstantType::FogColor
            | AutoConstantType::FogParams
            | AutoConstantType::Time
            | AutoConstantType::DerivedAmbientLightColor => GpuParamVariability::GLOBAL,
            AutoConstantType::LightDiffuseColor | AutoConstantType::DerivedSceneColor => {
                GpuParamVariability::LIGHTS
            }
            _ => GpuParamVariability::PER_OBJECT,
        }
    }
}

/// Data associated with an auto constant (light index, texture unit, factor)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutoConstantData {
    Int(usize),
    Real(f32),
}

impl AutoConstantData {
    /// Suffix appended to the base uniform name; empty for zero data
    pub fn name_suffix(self) -> String {
        match self {
            AutoConstantData::Int(0) => String::new(),
            AutoConstantData::Int(value) => value.to_string(),
            AutoConstantData::Real(value) if value == 0.0 => String::new(),
            // '.' is not legal in identifiers
            AutoConstantData::Real(value) => value.to_string().replace(['.', '-'], "_"),
        }
    }
}
