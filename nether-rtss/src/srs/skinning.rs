//! Linear blend skinning on the GPU
//!
//! Replaces the plain transform feature (same execution order). Meshes
//! without skinning data fall back to the plain world-view-projection
//! transform.

use super::{
    FFP_FUNC_ADD, FFP_FUNC_ASSIGN, FFP_FUNC_MODULATE, FFP_FUNC_TRANSFORM, FFP_LIB_COMMON,
    FFP_LIB_TRANSFORM, InvocationCounter, SubRenderState, ffp_stage, resolved, vs_stage,
};
use crate::RtssError;
use crate::host::{PassDescription, PassOverrides};
use crate::ir::{
    AutoConstantType, Content, Function, FunctionInvocation, GpuConstantType, OpMask, OpSemantic,
    ParameterFactory, ParameterPtr, ProgramSet, Semantic,
};

pub(super) const TYPE_NAME: &str = "SGX_HardwareSkinning";

const MAX_WEIGHT_COUNT: u16 = 4;
const PHASE: &str = "add_function_invocations";

#[derive(Debug)]
pub struct LinearSkinning {
    default_weight_count: u16,
    bone_count: u16,
    weight_count: u16,
    do_bone_calculations: bool,
    world_matrices: Option<ParameterPtr>,
    view_proj: Option<ParameterPtr>,
    world_view_proj: Option<ParameterPtr>,
    in_position: Option<ParameterPtr>,
    in_indices: Option<ParameterPtr>,
    in_weights: Option<ParameterPtr>,
    out_position: Option<ParameterPtr>,
    local_world_position: Option<ParameterPtr>,
    temp: Option<ParameterPtr>,
}

impl LinearSkinning {
    pub fn new(default_weight_count: u16) -> Self {
        Self {
            default_weight_count: default_weight_count.clamp(1, MAX_WEIGHT_COUNT),
            bone_count: 0,
            weight_count: 0,
            do_bone_calculations: false,
            world_matrices: None,
            view_proj: None,
            world_view_proj: None,
            in_position: None,
            in_indices: None,
            in_weights: None,
            out_position: None,
            local_world_position: None,
            temp: None,
        }
    }

    pub fn bone_count(&self) -> u16 {
        self.bone_count
    }

    pub fn weight_count(&self) -> u16 {
        self.weight_count
    }

    pub fn does_bone_calculations(&self) -> bool {
        self.do_bone_calculations
    }

    /// World position accumulation for influence `index`
    fn add_indexed_position_weight(
        &self,
        vs_main: &mut Function,
        index: usize,
        counter: &mut InvocationCounter,
    ) -> Result<(), RtssError> {
        let mask = OpMask::component(index).ok_or_else(|| RtssError::SubRenderStateFailed {
            name: TYPE_NAME.to_string(),
            phase: PHASE,
        })?;
        let matrices = resolved(&self.world_matrices, TYPE_NAME, PHASE)?;
        let indices = resolved(&self.in_indices, TYPE_NAME, PHASE)?;
        let weights = resolved(&self.in_weights, TYPE_NAME, PHASE)?;
        let position = resolved(&self.in_position, TYPE_NAME, PHASE)?;
        let temp = resolved(&self.temp, TYPE_NAME, PHASE)?;
        let world = resolved(&self.local_world_position, TYPE_NAME, PHASE)?;

        // temp.xyz = bones[indices[i]] * position
        let mut transform =
            FunctionInvocation::new(FFP_FUNC_TRANSFORM, vs_stage::TRANSFORM, counter.next_order());
        transform.push_operand(&matrices, OpSemantic::In)?;
        transform.push_operand_masked(&indices, OpSemantic::In, mask, 1)?;
        transform.push_operand(&position, OpSemantic::In)?;
        transform.push_operand_masked(&temp, OpSemantic::Out, OpMask::XYZ, 0)?;
        vs_main.add_atom_instance(transform)?;

        let mut one = FunctionInvocation::new(FFP_FUNC_ASSIGN, vs_stage::TRANSFORM, counter.next_order());
        one.push_operand(&ParameterFactory::create_constant_float(1.0), OpSemantic::In)?;
        one.push_operand_masked(&temp, OpSemantic::Out, OpMask::W, 0)?;
        vs_main.add_atom_instance(one)?;

        let mut weight =
            FunctionInvocation::new(FFP_FUNC_MODULATE, vs_stage::TRANSFORM, counter.next_order());
        weight.push_operand(&temp, OpSemantic::In)?;
        weight.push_operand_masked(&weights, OpSemantic::In, mask, 0)?;
        weight.push_operand(&temp, OpSemantic::Out)?;
        vs_main.add_atom_instance(weight)?;

        let accumulate = if index == 0 {
            let mut assign =
                FunctionInvocation::new(FFP_FUNC_ASSIGN, vs_stage::TRANSFORM, counter.next_order());
            assign.push_operand(&temp, OpSemantic::In)?;
            assign.push_operand(&world, OpSemantic::Out)?;
            assign
        } else {
            let mut add = FunctionInvocation::new(FFP_FUNC_ADD, vs_stage::TRANSFORM, counter.next_order());
            add.push_operand(&temp, OpSemantic::In)?;
            add.push_operand(&world, OpSemantic::In)?;
            add.push_operand(&world, OpSemantic::Out)?;
            add
        };
        vs_main.add_atom_instance(accumulate)
    }
}

impl SubRenderState for LinearSkinning {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::TRANSFORM
    }

    fn pre_add_to_render_state(&mut self, src: &PassDescription, _dst: &mut PassOverrides) -> bool {
        match src.skinning {
            Some(skinning) if skinning.bone_count > 0 => {
                self.do_bone_calculations = true;
                self.bone_count = skinning.bone_count;
                self.weight_count = match skinning.weight_count {
                    0 => self.default_weight_count,
                    count => count.min(MAX_WEIGHT_COUNT),
                };
            }
            _ => {
                self.do_bone_calculations = false;
                self.bone_count = 0;
                self.weight_count = 0;
            }
        }
        true
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let vs = program_set.vertex_program_mut();

        if self.do_bone_calculations {
            vs.set_skeletal_animation_included(true);
            self.world_matrices = Some(vs.resolve_auto_parameter_int(
                AutoConstantType::WorldMatrixArray3x4,
                0,
                self.bone_count as usize,
            )?);
            self.view_proj = Some(vs.resolve_auto_parameter_int(AutoConstantType::ViewProjMatrix, 0, 0)?);
        } else {
            self.world_view_proj =
                Some(vs.resolve_auto_parameter_int(AutoConstantType::WorldViewProjMatrix, 0, 0)?);
        }

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

        if self.do_bone_calculations {
            self.in_indices = Some(vs_main.resolve_input_parameter(
                Semantic::BlendIndices,
                0,
                Content::BlendIndices,
                GpuConstantType::Float4,
            )?);
            self.in_weights = Some(vs_main.resolve_input_parameter(
                Semantic::BlendWeights,
                0,
                Content::BlendWeights,
                GpuConstantType::Float4,
            )?);
            self.local_world_position = Some(vs_main.resolve_local_parameter_by_content(
                Semantic::Position,
                0,
                Content::PositionWorldSpace,
                GpuConstantType::Float4,
            )?);
            self.temp = Some(vs_main.resolve_local_parameter(
                Semantic::Unknown,
                0,
                "TempVal4",
                GpuConstantType::Float4,
            )?);
        }
        Ok(())
    }

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let vs = program_set.vertex_program_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        vs.add_dependency(FFP_LIB_TRANSFORM);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let vs_main = program_set.vertex_program_mut().entry_point_function_mut()?;
        let mut counter = InvocationCounter::new();
        let out_position = resolved(&self.out_position, TYPE_NAME, PHASE)?;

        if !self.do_bone_calculations {
            let mut transform =
                FunctionInvocation::new(FFP_FUNC_TRANSFORM, vs_stage::TRANSFORM, counter.next_order());
            transform.push_operand(&resolved(&self.world_view_proj, TYPE_NAME, PHASE)?, OpSemantic::In)?;
            transform.push_operand(&resolved(&self.in_position, TYPE_NAME, PHASE)?, OpSemantic::In)?;
            transform.push_operand(&out_position, OpSemantic::Out)?;
            return vs_main.add_atom_instance(transform);
        }

        for index in 0..self.weight_count as usize {
            self.add_indexed_position_weight(vs_main, index, &mut counter)?;
        }

        let mut project =
            FunctionInvocation::new(FFP_FUNC_TRANSFORM, vs_stage::TRANSFORM, counter.next_order());
        project.push_operand(&resolved(&self.view_proj, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        project.push_operand(&resolved(&self.local_world_position, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        project.push_operand(&out_position, OpSemantic::Out)?;
        vs_main.add_atom_instance(project)
    }
}
