//! Semantic-specific parameter constructors
//!
//! Every varying created here follows one naming convention:
//! `<direction prefix><semantic name>_<index>`, e.g. `iPosition_0` for the
//! first position input and `oTexcoord_2` for the third texcoord output.
//! The GLSL writer relies on it to pair a fragment input with the vertex
//! output that feeds it (see [`varying_name`]).

use super::{Content, GpuConstantType, GpuParamVariability, Parameter, ParameterPtr, Semantic};
use std::rc::Rc;

/// Direction of a varying relative to its function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn prefix(self) -> char {
        match self {
            Direction::In => 'i',
            Direction::Out => 'o',
        }
    }
}

/// Name of the varying for (direction, semantic, index)
pub fn varying_name(direction: Direction, semantic: Semantic, index: i32) -> String {
    format!("{}{}_{}", direction.prefix(), semantic.name(), index)
}

/// Constructors for the parameters features resolve through functions
pub struct ParameterFactory;

impl ParameterFactory {
    fn varying(
        direction: Direction,
        ty: GpuConstantType,
        semantic: Semantic,
        index: i32,
        content: Content,
    ) -> ParameterPtr {
        Rc::new(Parameter::new(
            ty,
            varying_name(direction, semantic, index),
            semantic,
            index,
            content,
            0,
        ))
    }

    pub fn create_in_position(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float4,
            Semantic::Position,
            index,
            Content::PositionObjectSpace,
        )
    }

    pub fn create_out_position(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::Out,
            GpuConstantType::Float4,
            Semantic::Position,
            index,
            Content::PositionProjectiveSpace,
        )
    }

    pub fn create_in_normal(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float3,
            Semantic::Normal,
            index,
            Content::NormalObjectSpace,
        )
    }

    pub fn create_out_normal(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::Out,
            GpuConstantType::Float3,
            Semantic::Normal,
            index,
            Content::NormalObjectSpace,
        )
    }

    pub fn create_in_weights(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float4,
            Semantic::BlendWeights,
            index,
            Content::BlendWeights,
        )
    }

    pub fn create_in_indices(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float4,
            Semantic::BlendIndices,
            index,
            Content::BlendIndices,
        )
    }

    pub fn create_in_binormal(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float3,
            Semantic::Binormal,
            index,
            Content::BinormalObjectSpace,
        )
    }

    pub fn create_out_binormal(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::Out,
            GpuConstantType::Float3,
            Semantic::Binormal,
            index,
            Content::BinormalObjectSpace,
        )
    }

    pub fn create_in_tangent(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float3,
            Semantic::Tangent,
            index,
            Content::TangentObjectSpace,
        )
    }

    pub fn create_out_tangent(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::Out,
            GpuConstantType::Float3,
            Semantic::Tangent,
            index,
            Content::TangentObjectSpace,
        )
    }

    /// Colour 0 is diffuse, any other index specular
    pub fn create_in_color(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::In,
            GpuConstantType::Float4,
            Semantic::Color,
            index,
            color_content(index),
        )
    }

    pub fn create_out_color(index: i32) -> ParameterPtr {
        Self::varying(
            Direction::Out,
            GpuConstantType::Float4,
            Semantic::Color,
            index,
            color_content(index),
        )
    }

    pub fn create_in_texcoord(ty: GpuConstantType, index: i32, content: Content) -> ParameterPtr {
        Self::varying(
            Direction::In,
            ty,
            Semantic::TextureCoordinates,
            index,
            content,
        )
    }

    pub fn create_out_texcoord(ty: GpuConstantType, index: i32, content: Content) -> ParameterPtr {
        Self::varying(
            Direction::Out,
            ty,
            Semantic::TextureCoordinates,
            index,
            content,
        )
    }

    /// Manually updated uniform named `<suggested_name><index>`
    pub fn create_uniform(
        ty: GpuConstantType,
        index: i32,
        variability: GpuParamVariability,
        suggested_name: &str,
        size: usize,
    ) -> ParameterPtr {
        Rc::new(Parameter::uniform(
            ty,
            format!("{}{}", suggested_name, index),
            index,
            variability,
            size,
        ))
    }

    pub fn create_constant_float(value: f32) -> ParameterPtr {
        Rc::new(Parameter::constant_float(value))
    }
}

fn color_content(index: i32) -> Content {
    if index == 0 {
        Content::ColorDiffuse
    } else {
        Content::ColorSpecular
    }
}
