//! Operands: a parameter reference inside one statement

use bitflags::bitflags;

use super::{GpuConstantType, ParameterPtr};
use crate::RtssError;

/// How a statement uses the operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpSemantic {
    In,
    Out,
    InOut,
}

impl OpSemantic {
    /// Parameter qualifier keyword (identical in Cg, HLSL and GLSL)
    pub fn keyword(self) -> &'static str {
        match self {
            OpSemantic::In => "in",
            OpSemantic::Out => "out",
            OpSemantic::InOut => "inout",
        }
    }

    pub fn writes(self) -> bool {
        matches!(self, OpSemantic::Out | OpSemantic::InOut)
    }
}

bitflags! {
    /// Component selection of an operand
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpMask: u32 {
        const ALL = 1 << 0;
        const X = 1 << 1;
        const Y = 1 << 2;
        const Z = 1 << 3;
        const W = 1 << 4;
        const XY = Self::X.bits() | Self::Y.bits();
        const XYZ = Self::XY.bits() | Self::Z.bits();
        const XYZW = Self::XYZ.bits() | Self::W.bits();
    }
}

const COMPONENTS: [(OpMask, char); 4] = [
    (OpMask::X, 'x'),
    (OpMask::Y, 'y'),
    (OpMask::Z, 'z'),
    (OpMask::W, 'w'),
];

impl OpMask {
    /// Single-component mask for component `index` (0 = x)
    pub fn component(index: usize) -> Option<Self> {
        COMPONENTS.get(index).map(|(mask, _)| *mask)
    }

    /// Number of selected components; 0 for `ALL`
    pub fn component_count(self) -> usize {
        COMPONENTS
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .count()
    }

    /// Swizzle suffix without the dot; empty for `ALL`
    pub fn swizzle(self) -> String {
        if self.contains(OpMask::ALL) {
            return String::new();
        }
        COMPONENTS
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, c)| *c)
            .collect()
    }

    /// Float type a swizzle of this mask yields
    pub fn to_constant_type(self) -> Option<GpuConstantType> {
        if self.contains(OpMask::ALL) {
            return None;
        }
        GpuConstantType::float_with_components(self.component_count())
    }

    fn highest_component(self) -> Option<usize> {
        COMPONENTS
            .iter()
            .rposition(|(mask, _)| self.contains(*mask))
    }
}

/// A typed reference to a parameter within one statement
#[derive(Debug, Clone)]
pub struct Operand {
    parameter: ParameterPtr,
    semantic: OpSemantic,
    mask: OpMask,
    indirection_level: u16,
}

impl Operand {
    /// Create an operand, canonicalizing and validating the mask.
    ///
    /// `ALL` combined with component bits collapses to `ALL`. Component
    /// masks are only valid on scalar/vector parameters and must stay within
    /// the parameter width.
    pub fn new(
        parameter: &ParameterPtr,
        semantic: OpSemantic,
        mask: OpMask,
        indirection_level: u16,
    ) -> Result<Self, RtssError> {
        let mask = if mask.contains(OpMask::ALL) {
            OpMask::ALL
        } else {
            mask
        };

        if mask != OpMask::ALL {
            let width = parameter.ty().component_count();
            let valid = match (width, mask.highest_component()) {
                (Some(width), Some(highest)) => highest < width,
                _ => false,
            };
            if !valid {
                return Err(RtssError::InvalidOperandMask {
                    parameter: parameter.name().to_string(),
                    mask: mask.bits(),
                });
            }
        }

        Ok(Self {
            parameter: parameter.clone(),
            semantic,
            mask,
            indirection_level,
        })
    }

    pub fn parameter(&self) -> &ParameterPtr {
        &self.parameter
    }

    pub fn semantic(&self) -> OpSemantic {
        self.semantic
    }

    pub fn mask(&self) -> OpMask {
        self.mask
    }

    pub fn indirection_level(&self) -> u16 {
        self.indirection_level
    }

    /// Default rendering: `name` or `name.swizzle`
    pub fn to_source(&self) -> String {
        render_with_name(self.parameter.name(), self.mask)
    }
}

/// Render `name` with the swizzle of `mask` appended
pub fn render_with_name(name: &str, mask: OpMask) -> String {
    let swizzle = mask.swizzle();
    if swizzle.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", name, swizzle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Content, Parameter, Semantic};
    use std::rc::Rc;

    fn float_param(ty: GpuConstantType) -> ParameterPtr {
        Rc::new(Parameter::new(ty, "p", Semantic::Unknown, 0, Content::Unknown, 0))
    }

    #[test]
    fn test_swizzle_strings() {
        assert_eq!(OpMask::ALL.swizzle(), "");
        assert_eq!(OpMask::XYZ.swizzle(), "xyz");
        assert_eq!((OpMask::X | OpMask::W).swizzle(), "xw");
        assert_eq!(OpMask::component(3), Some(OpMask::W));
        assert_eq!(OpMask::component(4), None);
    }

    #[test]
    fn test_mask_to_type() {
        assert_eq!(OpMask::XY.to_constant_type(), Some(GpuConstantType::Float2));
        assert_eq!(OpMask::W.to_constant_type(), Some(GpuConstantType::Float1));
        assert_eq!(OpMask::ALL.to_constant_type(), None);
        assert_eq!(OpMask::empty().to_constant_type(), None);
    }

    #[test]
    fn test_all_is_canonical() {
        let param = float_param(GpuConstantType::Float4);
        let op = Operand::new(&param, OpSemantic::In, OpMask::ALL | OpMask::X, 0).unwrap();
        assert_eq!(op.mask(), OpMask::ALL);
        assert_eq!(op.to_source(), "p");
    }

    #[test]
    fn test_mask_must_fit_parameter() {
        let param = float_param(GpuConstantType::Float2);
        assert!(Operand::new(&param, OpSemantic::In, OpMask::XY, 0).is_ok());
        assert!(matches!(
            Operand::new(&param, OpSemantic::In, OpMask::XYZ, 0),
            Err(RtssError::InvalidOperandMask { .. })
        ));
        assert!(Operand::new(&param, OpSemantic::In, OpMask::empty(), 0).is_err());
    }

    #[test]
    fn test_mask_rejected_on_matrix() {
        let param = float_param(GpuConstantType::Matrix4x4);
        assert!(Operand::new(&param, OpSemantic::In, OpMask::X, 0).is_err());
        assert!(Operand::new(&param, OpSemantic::In, OpMask::ALL, 0).is_ok());
    }
}
