//! Error types for shader variant generation

use crate::ir::{ProgramStage, Semantic};

/// Errors raised while building, writing or compiling a shader variant.
///
/// None of these are recoverable within a single acquisition: the program
/// manager aborts the whole variant and leaves the pass untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RtssError {
    /// A parameter slot (semantic/index or name) is already taken by a parameter of another type
    #[error("can not resolve parameter <{parameter}> in function <{function}>: mismatching types")]
    ParameterTypeMismatch { function: String, parameter: String },

    /// A parameter with the same name (or semantic/index pair) already exists in the list
    #[error("parameter <{parameter}> already declared in function <{function}>")]
    DuplicateParameter { function: String, parameter: String },

    /// No factory exists for resolving this semantic in the requested direction
    #[error("can not resolve parameter with semantic {semantic:?}: not supported")]
    UnsupportedSemantic { semantic: Semantic },

    /// A writer has no target syntax for a constant type or component mask
    #[error("{language} writer has no mapping for {what}")]
    UnknownTypeMapping { language: String, what: String },

    /// The external compile step rejected a generated program
    #[error("failed to compile gpu program <{program}>: {log}")]
    BackendCompileFailure { program: String, log: String },

    /// A writer was asked to serialize a stage it does not support
    #[error("{language} writer does not support {stage:?} programs")]
    UnsupportedStage { language: String, stage: ProgramStage },

    /// An operand mask selects components outside the parameter width
    #[error("operand mask {mask:#x} is invalid for parameter <{parameter}>")]
    InvalidOperandMask { parameter: String, mask: u32 },

    /// An atom was added without a group execution order
    #[error("function <{function}> received atom <{atom}> with unset execution order")]
    UnsetExecutionOrder { function: String, atom: String },

    /// A fragment input has no vertex output feeding it
    #[error("fragment input <{parameter}> has no matching vertex output")]
    UnresolvedVarying { parameter: String },

    /// A program has no entry point function
    #[error("{stage:?} program has no entry point function")]
    MissingEntryPoint { stage: ProgramStage },

    /// No program writer is registered for the language
    #[error("no program writer registered for language <{0}>")]
    NoWriter(String),

    /// No program processor is registered for the language
    #[error("no program processor registered for language <{0}>")]
    NoProcessor(String),

    /// A sub-render-state phase failed without a more specific error
    #[error("sub render state <{name}> failed during {phase}")]
    SubRenderStateFailed { name: String, phase: &'static str },

    /// A texcoord set (material, atlas index or unit) past the vertex limit
    #[error("texcoord set {set} is out of range (at most {max} sets)")]
    TexcoordSetOutOfRange { set: u32, max: u32 },

    /// The render state has not built its programs yet
    #[error("render state has no program set")]
    MissingProgramSet,

    /// Writing source text failed
    #[error("source formatting failed")]
    Format,

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<std::fmt::Error> for RtssError {
    fn from(_: std::fmt::Error) -> Self {
        RtssError::Format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RtssError::ParameterTypeMismatch {
                function: "main".to_string(),
                parameter: "iPosition_0".to_string(),
            }
            .to_string(),
            "can not resolve parameter <iPosition_0> in function <main>: mismatching types"
        );
        assert_eq!(
            RtssError::NoWriter("hlsl".to_string()).to_string(),
            "no program writer registered for language <hlsl>"
        );
        assert_eq!(
            RtssError::UnsupportedStage {
                language: "glsl".to_string(),
                stage: ProgramStage::Geometry,
            }
            .to_string(),
            "glsl writer does not support Geometry programs"
        );
    }
}
