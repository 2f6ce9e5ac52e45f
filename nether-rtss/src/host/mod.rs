//! Host engine interfaces
//!
//! The material snapshot features read ([`PassDescription`]), the pass the
//! generated programs are attached to ([`Pass`]), live GPU parameter tables
//! and the compile backend.

mod backend;
mod gpu_params;

pub use backend::{CompiledProgram, GpuProgramBackend, GpuProgramDesc, GpuProgramHandle, MemoryBackend};
pub use gpu_params::{
    AutoConstantEntry, AutoParamSource, ConstantDefinition, ConstantValue, GpuParameters,
    StaticAutoParams,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ir::ProgramStage;

bitflags! {
    /// Material colour channels that follow the vertex colour
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TrackVertexColor: u8 {
        const AMBIENT = 1;
        const DIFFUSE = 2;
        const SPECULAR = 4;
        const EMISSIVE = 8;
    }
}

impl Default for TrackVertexColor {
    fn default() -> Self {
        Self::empty()
    }
}

/// Fog falloff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FogMode {
    #[default]
    None,
    Exp,
    Exp2,
    Linear,
}

/// Fog settings of a scene or a pass override
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    #[serde(default)]
    pub mode: FogMode,
    #[serde(default = "default_fog_color")]
    pub color: [f32; 4],
    #[serde(default)]
    pub start: f32,
    #[serde(default = "default_fog_end")]
    pub end: f32,
    #[serde(default = "default_fog_density")]
    pub density: f32,
}

impl FogSettings {
    /// Fog disabled, keeping the default colour and range
    pub fn none() -> Self {
        Self::default()
    }
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            mode: FogMode::None,
            color: default_fog_color(),
            start: 0.0,
            end: default_fog_end(),
            density: default_fog_density(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextureType {
    #[serde(rename = "1d")]
    Tex1D,
    #[default]
    #[serde(rename = "2d")]
    Tex2D,
    #[serde(rename = "3d")]
    Tex3D,
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressingMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
    Border,
}

/// One texture unit of the material pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureUnitDescription {
    #[serde(default)]
    pub name: String,
    pub texture_name: String,
    #[serde(default)]
    pub texture_type: TextureType,
    #[serde(default)]
    pub addressing_mode: AddressingMode,
    #[serde(default)]
    pub tex_coord_set: u32,
}

/// Parallel-split shadow receiver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    /// Split distances: near plane, two inner splits, far plane
    #[serde(default = "default_split_points")]
    pub split_points: [f32; 4],
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            split_points: default_split_points(),
        }
    }
}

/// Hardware skinning settings of the rendered mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinningSettings {
    pub bone_count: u16,
    /// Influences per vertex (1-4); falls back to the configured default when 0
    #[serde(default)]
    pub weight_count: u16,
}

/// Snapshot of the host material pass the features inspect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassDescription {
    #[serde(default = "default_true")]
    pub lighting_enabled: bool,
    #[serde(default)]
    pub vertex_color_tracking: TrackVertexColor,
    #[serde(default = "default_white")]
    pub diffuse: [f32; 4],
    #[serde(default)]
    pub specular: [f32; 4],
    #[serde(default)]
    pub shininess: f32,
    /// Fog of the scene the pass renders in
    #[serde(default)]
    pub scene_fog: FogSettings,
    /// Pass-level fog replacing the scene fog
    #[serde(default)]
    pub fog_override: Option<FogSettings>,
    #[serde(default)]
    pub texture_units: Vec<TextureUnitDescription>,
    #[serde(default)]
    pub receive_shadows: bool,
    #[serde(default)]
    pub shadow: Option<ShadowSettings>,
    #[serde(default)]
    pub skinning: Option<SkinningSettings>,
}

impl PassDescription {
    /// Fog in effect for this pass
    pub fn effective_fog(&self) -> FogSettings {
        self.fog_override.unwrap_or(self.scene_fog)
    }
}

impl Default for PassDescription {
    fn default() -> Self {
        Self {
            lighting_enabled: default_true(),
            vertex_color_tracking: TrackVertexColor::empty(),
            diffuse: default_white(),
            specular: [0.0; 4],
            shininess: 0.0,
            scene_fog: FogSettings::default(),
            fog_override: None,
            texture_units: Vec::new(),
            receive_shadows: false,
            shadow: None,
            skinning: None,
        }
    }
}

/// Changes features ask the host to apply to the destination pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassOverrides {
    /// Fixed-function fog to use instead of the material's (shader fog disables it)
    pub fog: Option<FogSettings>,
}

/// Program attached to a pass together with its live parameter table
#[derive(Debug, Clone)]
pub struct PassProgram {
    pub name: String,
    pub parameters: GpuParameters,
}

/// Destination pass: the material snapshot plus generated programs
#[derive(Debug, Clone)]
pub struct Pass {
    description: PassDescription,
    fog_override: Option<FogSettings>,
    vertex_program: Option<PassProgram>,
    fragment_program: Option<PassProgram>,
}

impl Pass {
    pub fn new(description: PassDescription) -> Self {
        Self {
            description,
            fog_override: None,
            vertex_program: None,
            fragment_program: None,
        }
    }

    pub fn description(&self) -> &PassDescription {
        &self.description
    }

    /// Fog override written back by the last successful acquisition
    pub fn fog_override(&self) -> Option<&FogSettings> {
        self.fog_override.as_ref()
    }

    pub fn apply_overrides(&mut self, overrides: &PassOverrides) {
        if let Some(fog) = overrides.fog {
            self.fog_override = Some(fog);
        }
    }

    pub fn program(&self, stage: ProgramStage) -> Option<&PassProgram> {
        match stage {
            ProgramStage::Vertex => self.vertex_program.as_ref(),
            ProgramStage::Fragment => self.fragment_program.as_ref(),
            ProgramStage::Geometry => None,
        }
    }

    pub fn program_mut(&mut self, stage: ProgramStage) -> Option<&mut PassProgram> {
        match stage {
            ProgramStage::Vertex => self.vertex_program.as_mut(),
            ProgramStage::Fragment => self.fragment_program.as_mut(),
            ProgramStage::Geometry => None,
        }
    }

    pub fn set_programs(&mut self, vertex: PassProgram, fragment: PassProgram) {
        self.vertex_program = Some(vertex);
        self.fragment_program = Some(fragment);
    }

    /// Detach both programs, returning what was attached
    pub fn take_programs(&mut self) -> (Option<PassProgram>, Option<PassProgram>) {
        (self.vertex_program.take(), self.fragment_program.take())
    }

    pub fn has_programs(&self) -> bool {
        self.vertex_program.is_some() && self.fragment_program.is_some()
    }
}

fn default_true() -> bool {
    true
}
fn default_white() -> [f32; 4] {
    [1.0; 4]
}
fn default_fog_color() -> [f32; 4] {
    [1.0; 4]
}
fn default_fog_end() -> f32 {
    1.0
}
fn default_fog_density() -> f32 {
    0.001
}
fn default_split_points() -> [f32; 4] {
    [1.0, 20.0, 60.0, 200.0]
}
