//! Core enumerations of the shader IR
//!
//! Semantics, content tags, constant types and program stages shared by the
//! parameter model, the writers and the processors.

use bitflags::bitflags;

/// Shader stage a program is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ProgramStage {
    /// Suffix appended to generated program names
    pub fn name_suffix(self) -> &'static str {
        match self {
            ProgramStage::Vertex => "_VS",
            ProgramStage::Fragment => "_FS",
            ProgramStage::Geometry => "_GS",
        }
    }

    /// Human-readable stage description (used in source headers)
    pub fn description(self) -> &'static str {
        match self {
            ProgramStage::Vertex => "Vertex shader",
            ProgramStage::Fragment => "Fragment shader",
            ProgramStage::Geometry => "Geometry shader",
        }
    }
}

/// Role of a function inside its program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Entry point of a vertex program
    VertexMain,
    /// Entry point of a fragment program
    PixelMain,
    /// Helper routine called from an entry point
    Internal,
}

/// Binding semantic of a varying parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Unknown,
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Color,
    TextureCoordinates,
    Binormal,
    Tangent,
}

impl Semantic {
    /// Name fragment used by the parameter naming convention
    pub fn name(self) -> &'static str {
        match self {
            Semantic::Unknown => "Unknown",
            Semantic::Position => "Position",
            Semantic::BlendWeights => "BlendWeights",
            Semantic::BlendIndices => "BlendIndices",
            Semantic::Normal => "Normal",
            Semantic::Color => "Color",
            Semantic::TextureCoordinates => "Texcoord",
            Semantic::Binormal => "Binormal",
            Semantic::Tangent => "Tangent",
        }
    }
}

/// Fine-grained role tag of a parameter
///
/// Two parameters with the same non-`Unknown` content and type are the same
/// value, which is what lets independent features share parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Content {
    Unknown,
    PositionObjectSpace,
    PositionWorldSpace,
    PositionViewSpace,
    PositionProjectiveSpace,
    /// Position in the space of shadow/light camera N
    PositionLightSpace(u8),
    NormalObjectSpace,
    NormalWorldSpace,
    NormalViewSpace,
    NormalTangentSpace,
    BlendWeights,
    BlendIndices,
    TangentObjectSpace,
    BinormalObjectSpace,
    ColorDiffuse,
    ColorSpecular,
    DepthObjectSpace,
    DepthWorldSpace,
    DepthViewSpace,
    DepthProjectiveSpace,
    /// Texture coordinate set N
    TextureCoordinate(u8),
    /// Feature-private content tag
    Custom(u32),
}

/// Data type of a shader constant or varying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuConstantType {
    Float1,
    Float2,
    Float3,
    Float4,
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler1DShadow,
    Sampler2DShadow,
    Matrix2x2,
    Matrix2x3,
    Matrix2x4,
    Matrix3x2,
    Matrix3x3,
    Matrix3x4,
    Matrix4x2,
    Matrix4x3,
    Matrix4x4,
    Int1,
    Int2,
    Int3,
    Int4,
}

impl GpuConstantType {
    /// Vector width for scalar and vector types, `None` for matrices and samplers
    pub fn component_count(self) -> Option<usize> {
        match self {
            GpuConstantType::Float1 | GpuConstantType::Int1 => Some(1),
            GpuConstantType::Float2 | GpuConstantType::Int2 => Some(2),
            GpuConstantType::Float3 | GpuConstantType::Int3 => Some(3),
            GpuConstantType::Float4 | GpuConstantType::Int4 => Some(4),
            _ => None,
        }
    }

    /// Number of scalar slots one element occupies in a constant buffer
    pub fn element_size(self) -> usize {
        match self {
            GpuConstantType::Matrix2x2 => 4,
            GpuConstantType::Matrix2x3 | GpuConstantType::Matrix3x2 => 6,
            GpuConstantType::Matrix2x4 | GpuConstantType::Matrix4x2 => 8,
            GpuConstantType::Matrix3x3 => 9,
            GpuConstantType::Matrix3x4 | GpuConstantType::Matrix4x3 => 12,
            GpuConstantType::Matrix4x4 => 16,
            other => other.component_count().unwrap_or(1),
        }
    }

    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            GpuConstantType::Sampler1D
                | GpuConstantType::Sampler2D
                | GpuConstantType::Sampler3D
                | GpuConstantType::SamplerCube
                | GpuConstantType::Sampler1DShadow
                | GpuConstantType::Sampler2DShadow
        )
    }

    pub fn is_int(self) -> bool {
        matches!(
            self,
            GpuConstantType::Int1
                | GpuConstantType::Int2
                | GpuConstantType::Int3
                | GpuConstantType::Int4
        )
    }

    /// Float vector type with the given number of components
    pub fn float_with_components(count: usize) -> Option<Self> {
        match count {
            1 => Some(GpuConstantType::Float1),
            2 => Some(GpuConstantType::Float2),
            3 => Some(GpuConstantType::Float3),
            4 => Some(GpuConstantType::Float4),
            _ => None,
        }
    }
}

bitflags! {
    /// Update frequency class of a uniform
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GpuParamVariability: u16 {
        /// No variation except by manual setting
        const GLOBAL = 1;
        /// Varies per object (world matrices, derived colours)
        const PER_OBJECT = 2;
        /// Varies with light setup
        const LIGHTS = 4;
        /// Varies with pass iteration number
        const PASS_ITERATION_NUMBER = 8;
        /// Full mask
        const ALL = 0xFFFF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_counts() {
        assert_eq!(GpuConstantType::Float3.component_count(), Some(3));
        assert_eq!(GpuConstantType::Int4.component_count(), Some(4));
        assert_eq!(GpuConstantType::Matrix4x4.component_count(), None);
        assert_eq!(GpuConstantType::Sampler2D.component_count(), None);
    }

    #[test]
    fn test_element_sizes() {
        assert_eq!(GpuConstantType::Matrix3x4.element_size(), 12);
        assert_eq!(GpuConstantType::Matrix4x4.element_size(), 16);
        assert_eq!(GpuConstantType::Float2.element_size(), 2);
        assert_eq!(GpuConstantType::Sampler2D.element_size(), 1);
    }

    #[test]
    fn test_float_with_components() {
        assert_eq!(
            GpuConstantType::float_with_components(2),
            Some(GpuConstantType::Float2)
        );
        assert_eq!(GpuConstantType::float_with_components(0), None);
        assert_eq!(GpuConstantType::float_with_components(5), None);
    }
}
