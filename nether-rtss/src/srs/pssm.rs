//! Integrated parallel-split shadow mapping with three shadow textures

use super::{
    FFP_FUNC_ASSIGN, FFP_FUNC_MODULATE, FFP_FUNC_TRANSFORM, FFP_LIB_COMMON,
    SGX_LIB_INTEGRATED_PSSM, InvocationCounter, SubRenderState, ffp_stage, ps_stage, resolved,
    vs_stage,
};
use crate::RtssError;
use crate::host::{Pass, PassDescription, PassOverrides, ShadowSettings};
use crate::ir::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, GpuParamVariability, OpMask,
    OpSemantic, ParameterPtr, ProgramSet, ProgramStage, Semantic, parameter_by_semantic,
};

pub(super) const TYPE_NAME: &str = "SGX_IntegratedPSSM3";

/// Number of shadow map splits
pub const SHADOW_TEXTURE_COUNT: usize = 3;

const SPLIT_POINTS_NAME: &str = "pssm_split_points";
const SHADOW_SAMPLER_NAME: &str = "shadow_map";
const FUNC_COMPUTE_SHADOW_COLOUR: &str = "SGX_ComputeShadowFactor_PSSM3";
const FUNC_APPLY_SHADOW_FACTOR_DIFFUSE: &str = "SGX_ApplyShadowFactor_Diffuse";
const PHASE: &str = "add_function_invocations";

#[derive(Debug)]
struct ShadowTextureParams {
    sampler_index: usize,
    world_view_proj: Option<ParameterPtr>,
    vs_out_light_position: Option<ParameterPtr>,
    ps_in_light_position: Option<ParameterPtr>,
    sampler: Option<ParameterPtr>,
    inv_texture_size: Option<ParameterPtr>,
}

#[derive(Debug)]
pub struct IntegratedPssm3 {
    settings: ShadowSettings,
    shadow_textures: Vec<ShadowTextureParams>,
    vs_in_position: Option<ParameterPtr>,
    vs_out_position: Option<ParameterPtr>,
    vs_out_depth: Option<ParameterPtr>,
    ps_in_depth: Option<ParameterPtr>,
    ps_diffuse: Option<ParameterPtr>,
    ps_out_diffuse: Option<ParameterPtr>,
    ps_specular: Option<ParameterPtr>,
    ps_shadow_factor: Option<ParameterPtr>,
    ps_split_points: Option<ParameterPtr>,
    ps_derived_scene_color: Option<ParameterPtr>,
}

impl IntegratedPssm3 {
    pub fn new() -> Self {
        Self {
            settings: ShadowSettings::default(),
            shadow_textures: Vec::new(),
            vs_in_position: None,
            vs_out_position: None,
            vs_out_depth: None,
            ps_in_depth: None,
            ps_diffuse: None,
            ps_out_diffuse: None,
            ps_specular: None,
            ps_shadow_factor: None,
            ps_split_points: None,
            ps_derived_scene_color: None,
        }
    }

    /// Far distance of each split followed by 0
    pub fn split_distances(&self) -> [f32; 4] {
        let points = self.settings.split_points;
        [points[1], points[2], points[3], 0.0]
    }

    /// Texture units the shadow maps are bound to
    pub fn shadow_sampler_indices(&self) -> Vec<usize> {
        self.shadow_textures.iter().map(|t| t.sampler_index).collect()
    }
}

impl Default for IntegratedPssm3 {
    fn default() -> Self {
        Self::new()
    }
}

impl SubRenderState for IntegratedPssm3 {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::TEXTURING + 1
    }

    fn pre_add_to_render_state(&mut self, src: &PassDescription, _dst: &mut PassOverrides) -> bool {
        if !src.lighting_enabled || !src.receive_shadows {
            return false;
        }
        self.settings = src.shadow.unwrap_or_default();

        // Shadow maps follow the material's own texture units
        let first_unit = src.texture_units.len();
        self.shadow_textures = (0..SHADOW_TEXTURE_COUNT)
            .map(|i| ShadowTextureParams {
                sampler_index: first_unit + i,
                world_view_proj: None,
                vs_out_light_position: None,
                ps_in_light_position: None,
                sampler: None,
                inv_texture_size: None,
            })
            .collect();
        true
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();

        {
            let vs_main = vs.entry_point_function_mut()?;
            let ps_main = ps.entry_point_function_mut()?;

            self.vs_in_position = Some(vs_main.resolve_input_parameter(
                Semantic::Position,
                0,
                Content::PositionObjectSpace,
                GpuConstantType::Float4,
            )?);
            self.vs_out_position = Some(vs_main.resolve_output_parameter(
                Semantic::Position,
                0,
                Content::PositionProjectiveSpace,
                GpuConstantType::Float4,
            )?);
            let vs_out_depth = vs_main.resolve_output_parameter(
                Semantic::TextureCoordinates,
                -1,
                Content::DepthViewSpace,
                GpuConstantType::Float1,
            )?;
            self.ps_in_depth = Some(ps_main.resolve_input_parameter(
                Semantic::TextureCoordinates,
                vs_out_depth.index(),
                vs_out_depth.content(),
                GpuConstantType::Float1,
            )?);
            self.vs_out_depth = Some(vs_out_depth);

            // Colours flow in from the vertex stage when the colour feature forwards them
            self.ps_diffuse = Some(
                match parameter_by_semantic(ps_main.input_parameters(), Semantic::Color, 0) {
                    Some(input) => input,
                    None => ps_main.resolve_local_parameter_by_content(
                        Semantic::Color,
                        0,
                        Content::ColorDiffuse,
                        GpuConstantType::Float4,
                    )?,
                },
            );
            self.ps_out_diffuse = Some(ps_main.resolve_output_parameter(
                Semantic::Color,
                0,
                Content::ColorDiffuse,
                GpuConstantType::Float4,
            )?);
            self.ps_specular = parameter_by_semantic(ps_main.input_parameters(), Semantic::Color, 1);
            self.ps_shadow_factor = Some(ps_main.resolve_local_parameter(
                Semantic::Unknown,
                0,
                "lShadowFactor",
                GpuConstantType::Float1,
            )?);
        }

        self.ps_split_points = Some(ps.resolve_named_parameter(
            GpuConstantType::Float4,
            SPLIT_POINTS_NAME,
            GpuParamVariability::GLOBAL,
            0,
        )?);
        self.ps_derived_scene_color =
            Some(ps.resolve_auto_parameter_int(AutoConstantType::DerivedSceneColor, 0, 0)?);

        for (light_index, shadow) in self.shadow_textures.iter_mut().enumerate() {
            shadow.world_view_proj = Some(vs.resolve_auto_parameter_int(
                AutoConstantType::TextureWorldViewProjMatrix,
                light_index,
                0,
            )?);
            let vs_out = vs.entry_point_function_mut()?.resolve_output_parameter(
                Semantic::TextureCoordinates,
                -1,
                Content::PositionLightSpace(light_index as u8),
                GpuConstantType::Float4,
            )?;
            shadow.ps_in_light_position = Some(ps.entry_point_function_mut()?.resolve_input_parameter(
                Semantic::TextureCoordinates,
                vs_out.index(),
                vs_out.content(),
                GpuConstantType::Float4,
            )?);
            shadow.vs_out_light_position = Some(vs_out);
            shadow.sampler = Some(ps.resolve_parameter(
                GpuConstantType::Sampler2D,
                shadow.sampler_index as i32,
                GpuParamVariability::GLOBAL,
                SHADOW_SAMPLER_NAME,
                0,
            )?);
            shadow.inv_texture_size = Some(ps.resolve_auto_parameter_int(
                AutoConstantType::InverseTextureSize,
                shadow.sampler_index,
                0,
            )?);
        }
        Ok(())
    }

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        ps.add_dependency(SGX_LIB_INTEGRATED_PSSM);
        ps.add_dependency(FFP_LIB_COMMON);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;
        let mut counter = InvocationCounter::new();

        // Vertex stage: view depth and light-space positions
        let mut depth = FunctionInvocation::new(FFP_FUNC_ASSIGN, vs_stage::TEXTURING, counter.next_order());
        depth.push_operand_masked(
            &resolved(&self.vs_out_position, TYPE_NAME, PHASE)?,
            OpSemantic::In,
            OpMask::W,
            0,
        )?;
        depth.push_operand(&resolved(&self.vs_out_depth, TYPE_NAME, PHASE)?, OpSemantic::Out)?;
        vs_main.add_atom_instance(depth)?;

        let in_position = resolved(&self.vs_in_position, TYPE_NAME, PHASE)?;
        for shadow in &self.shadow_textures {
            let mut transform =
                FunctionInvocation::new(FFP_FUNC_TRANSFORM, vs_stage::TEXTURING, counter.next_order());
            transform.push_operand(&resolved(&shadow.world_view_proj, TYPE_NAME, PHASE)?, OpSemantic::In)?;
            transform.push_operand(&in_position, OpSemantic::In)?;
            transform.push_operand(
                &resolved(&shadow.vs_out_light_position, TYPE_NAME, PHASE)?,
                OpSemantic::Out,
            )?;
            vs_main.add_atom_instance(transform)?;
        }

        // Fragment stage: shadow factor, then darken diffuse/specular
        let group = ps_stage::COLOR_BEGIN + 2;
        let shadow_factor = resolved(&self.ps_shadow_factor, TYPE_NAME, PHASE)?;
        let diffuse = resolved(&self.ps_diffuse, TYPE_NAME, PHASE)?;

        let mut compute = FunctionInvocation::new(FUNC_COMPUTE_SHADOW_COLOUR, group, counter.next_order());
        compute.push_operand(&resolved(&self.ps_in_depth, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        compute.push_operand(&resolved(&self.ps_split_points, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        for shadow in &self.shadow_textures {
            compute.push_operand(&resolved(&shadow.ps_in_light_position, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        }
        for shadow in &self.shadow_textures {
            compute.push_operand(&resolved(&shadow.sampler, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        }
        for shadow in &self.shadow_textures {
            compute.push_operand(&resolved(&shadow.inv_texture_size, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        }
        compute.push_operand(&shadow_factor, OpSemantic::Out)?;
        ps_main.add_atom_instance(compute)?;

        let mut apply = FunctionInvocation::new(FUNC_APPLY_SHADOW_FACTOR_DIFFUSE, group, counter.next_order());
        apply.push_operand(&resolved(&self.ps_derived_scene_color, TYPE_NAME, PHASE)?, OpSemantic::In)?;
        apply.push_operand(&diffuse, OpSemantic::In)?;
        apply.push_operand(&shadow_factor, OpSemantic::In)?;
        apply.push_operand(&diffuse, OpSemantic::Out)?;
        ps_main.add_atom_instance(apply)?;

        if let Some(specular) = &self.ps_specular {
            let mut modulate = FunctionInvocation::new(FFP_FUNC_MODULATE, group, counter.next_order());
            modulate.push_operand(&shadow_factor, OpSemantic::In)?;
            modulate.push_operand_masked(specular, OpSemantic::In, OpMask::XYZ, 0)?;
            modulate.push_operand_masked(specular, OpSemantic::Out, OpMask::XYZ, 0)?;
            ps_main.add_atom_instance(modulate)?;
        }

        let mut assign = FunctionInvocation::new(FFP_FUNC_ASSIGN, group, counter.next_order());
        assign.push_operand(&diffuse, OpSemantic::In)?;
        assign.push_operand(&resolved(&self.ps_out_diffuse, TYPE_NAME, PHASE)?, OpSemantic::Out)?;
        ps_main.add_atom_instance(assign)
    }

    fn update_gpu_programs_params(&self, pass: &mut Pass) {
        if let (Some(param), Some(program)) =
            (&self.ps_split_points, pass.program_mut(ProgramStage::Fragment))
        {
            param.set_gpu_value(&mut program.parameters, &self.split_distances());
        }
    }
}
