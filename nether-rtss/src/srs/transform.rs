//! Object-space to projective-space vertex transform

use super::{
    FFP_FUNC_TRANSFORM, FFP_LIB_COMMON, FFP_LIB_TRANSFORM, InvocationCounter, SubRenderState,
    ffp_stage, resolved, vs_stage,
};
use crate::RtssError;
use crate::ir::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, OpSemantic, ParameterPtr,
    ProgramSet, Semantic,
};

pub(super) const TYPE_NAME: &str = "FFP_Transform";

/// `oPosition = worldviewproj * iPosition`
#[derive(Debug, Default)]
pub struct FfpTransform {
    world_view_proj: Option<ParameterPtr>,
    in_position: Option<ParameterPtr>,
    out_position: Option<ParameterPtr>,
}

impl FfpTransform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubRenderState for FfpTransform {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::TRANSFORM
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let vs = program_set.vertex_program_mut();
        self.world_view_proj =
            Some(vs.resolve_auto_parameter_int(AutoConstantType::WorldViewProjMatrix, 0, 0)?);

        let vs_main = vs.entry_point_function_mut()?;
        self.in_position = Some(vs_main.resolve_input_parameter(
            Semantic::Position,
            0,
            Content::PositionObjectSpace,
            GpuConstantType::Float4,
        )?);
        self.out_position = Some(vs_main.resolve_output_parameter(
            Semantic::Position,
            0,
            Content::PositionProjectiveSpace,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let vs = program_set.vertex_program_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        vs.add_dependency(FFP_LIB_TRANSFORM);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        const PHASE: &str = "add_function_invocations";
        let mut counter = InvocationCounter::new();

        let mut transform =
            FunctionInvocation::new(FFP_FUNC_TRANSFORM, vs_stage::TRANSFORM, counter.next_order());
        transform.push_operand(&resolved(&self.world_view_proj, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        transform.push_operand(&resolved(&self.in_position, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        transform.push_operand(&resolved(&self.out_position, TYPE_NAME, PHASE)?, OpSemantic::Out)?;

        program_set
            .vertex_program_mut()
            .entry_point_function_mut()?
            .add_atom_instance(transform)
    }
}
