//! Shader fog, computed per vertex or per pixel

use glam::Vec4;

use super::{
    FFP_FUNC_LERP, FFP_LIB_COMMON, FFP_LIB_FOG, InvocationCounter, SubRenderState, ffp_stage,
    ps_stage, resolved, vs_stage,
};
use crate::RtssError;
use crate::host::{FogMode, FogSettings, Pass, PassDescription, PassOverrides};
use crate::ir::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, GpuParamVariability,
    OpSemantic, ParameterPtr, ProgramSet, ProgramStage, Semantic,
};

pub(super) const TYPE_NAME: &str = "FFP_Fog";

const FOG_COLOR_NAME: &str = "gFogColor";
const FOG_PARAMS_NAME: &str = "gFogParams";
const FFP_FUNC_PIXELFOG_DEPTH: &str = "FFP_PixelFog_Depth";

/// Fog parameter vector: (density, start, end, 1 / (end - start)).
///
/// The last component is 0 when the range is empty.
pub fn derive_fog_params(start: f32, end: f32, density: f32) -> Vec4 {
    let inv_range = if end != start { 1.0 / (end - start) } else { 0.0 };
    Vec4::new(density, start, end, inv_range)
}

fn vertex_fog_function(mode: FogMode) -> Option<&'static str> {
    match mode {
        FogMode::Linear => Some("FFP_VertexFog_Linear"),
        FogMode::Exp => Some("FFP_VertexFog_Exp"),
        FogMode::Exp2 => Some("FFP_VertexFog_Exp2"),
        FogMode::None => None,
    }
}

fn pixel_fog_function(mode: FogMode) -> Option<&'static str> {
    match mode {
        FogMode::Linear => Some("FFP_PixelFog_Linear"),
        FogMode::Exp => Some("FFP_PixelFog_Exp"),
        FogMode::Exp2 => Some("FFP_PixelFog_Exp2"),
        FogMode::None => None,
    }
}

/// Replaces fixed-function fog with shader fog
#[derive(Debug)]
pub struct FfpFog {
    per_pixel: bool,
    settings: FogSettings,
    world_view_proj: Option<ParameterPtr>,
    fog_color: Option<ParameterPtr>,
    fog_params: Option<ParameterPtr>,
    vs_in_position: Option<ParameterPtr>,
    vs_out_fog: Option<ParameterPtr>,
    ps_in_fog: Option<ParameterPtr>,
    ps_out_diffuse: Option<ParameterPtr>,
}

impl FfpFog {
    pub fn new(per_pixel: bool) -> Self {
        Self {
            per_pixel,
            settings: FogSettings::none(),
            world_view_proj: None,
            fog_color: None,
            fog_params: None,
            vs_in_position: None,
            vs_out_fog: None,
            ps_in_fog: None,
            ps_out_diffuse: None,
        }
    }

    pub fn is_per_pixel(&self) -> bool {
        self.per_pixel
    }

    pub fn settings(&self) -> &FogSettings {
        &self.settings
    }

    /// Stage holding the fog parameter uniform
    fn params_stage(&self) -> ProgramStage {
        if self.per_pixel {
            ProgramStage::Fragment
        } else {
            ProgramStage::Vertex
        }
    }
}

impl SubRenderState for FfpFog {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::FOG
    }

    fn pre_add_to_render_state(&mut self, src: &PassDescription, dst: &mut PassOverrides) -> bool {
        let fog = src.effective_fog();
        if fog.mode == FogMode::None {
            return false;
        }
        self.settings = fog;
        // Fog now happens in the shader
        dst.fog = Some(FogSettings {
            mode: FogMode::None,
            ..fog
        });
        true
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let per_pixel = self.per_pixel;
        let (vs, ps) = program_set.programs_mut();

        self.world_view_proj =
            Some(vs.resolve_auto_parameter_int(AutoConstantType::WorldViewProjMatrix, 0, 0)?);
        self.fog_color = Some(ps.resolve_named_parameter(
            GpuConstantType::Float4,
            FOG_COLOR_NAME,
            GpuParamVariability::GLOBAL,
            0,
        )?);
        let params_program = if per_pixel { &mut *ps } else { &mut *vs };
        self.fog_params = Some(params_program.resolve_named_parameter(
            GpuConstantType::Float4,
            FOG_PARAMS_NAME,
            GpuParamVariability::GLOBAL,
            0,
        )?);

        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;

        self.vs_in_position = Some(vs_main.resolve_input_parameter(
            Semantic::Position,
            0,
            Content::PositionObjectSpace,
            GpuConstantType::Float4,
        )?);

        // Per-vertex fog interpolates the factor, per-pixel fog the view depth
        let content = if per_pixel {
            Content::DepthViewSpace
        } else {
            Content::Unknown
        };
        let vs_out = vs_main.resolve_output_parameter(
            Semantic::TextureCoordinates,
            -1,
            content,
            GpuConstantType::Float1,
        )?;
        self.ps_in_fog = Some(ps_main.resolve_input_parameter(
            Semantic::TextureCoordinates,
            vs_out.index(),
            vs_out.content(),
            GpuConstantType::Float1,
        )?);
        self.vs_out_fog = Some(vs_out);

        self.ps_out_diffuse = Some(ps_main.resolve_output_parameter(
            Semantic::Color,
            0,
            Content::ColorDiffuse,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        vs.add_dependency(FFP_LIB_FOG);
        ps.add_dependency(FFP_LIB_COMMON);
        ps.add_dependency(FFP_LIB_FOG);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        const PHASE: &str = "add_function_invocations";
        let failed = || RtssError::SubRenderStateFailed {
            name: TYPE_NAME.to_string(),
            phase: PHASE,
        };

        let wvp = resolved(&self.world_view_proj, TYPE_NAME, PHASE)?;
        let in_position = resolved(&self.vs_in_position, TYPE_NAME, PHASE)?;
        let vs_out = resolved(&self.vs_out_fog, TYPE_NAME, PHASE)?;
        let ps_in = resolved(&self.ps_in_fog, TYPE_NAME, PHASE)?;
        let fog_color = resolved(&self.fog_color, TYPE_NAME, PHASE)?;
        let fog_params = resolved(&self.fog_params, TYPE_NAME, PHASE)?;
        let out_diffuse = resolved(&self.ps_out_diffuse, TYPE_NAME, PHASE)?;

        let (vs, ps) = program_set.programs_mut();
        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;
        let mut counter = InvocationCounter::new();

        if self.per_pixel {
            let mut depth =
                FunctionInvocation::new(FFP_FUNC_PIXELFOG_DEPTH, vs_stage::FOG, counter.next_order());
            depth.push_operand(&wvp, OpSemantic::In)?;
            depth.push_operand(&in_position, OpSemantic::In)?;
            depth.push_operand(&vs_out, OpSemantic::Out)?;
            vs_main.add_atom_instance(depth)?;

            let function = pixel_fog_function(self.settings.mode).ok_or_else(failed)?;
            let mut fog = FunctionInvocation::new(function, ps_stage::FOG, counter.next_order());
            fog.push_operand(&ps_in, OpSemantic::In)?;
            fog.push_operand(&fog_params, OpSemantic::In)?;
            fog.push_operand(&fog_color, OpSemantic::In)?;
            fog.push_operand(&out_diffuse, OpSemantic::In)?;
            fog.push_operand(&out_diffuse, OpSemantic::Out)?;
            ps_main.add_atom_instance(fog)?;
        } else {
            let function = vertex_fog_function(self.settings.mode).ok_or_else(failed)?;
            let mut factor = FunctionInvocation::new(function, vs_stage::FOG, counter.next_order());
            factor.push_operand(&wvp, OpSemantic::In)?;
            factor.push_operand(&in_position, OpSemantic::In)?;
            factor.push_operand(&fog_params, OpSemantic::In)?;
            factor.push_operand(&vs_out, OpSemantic::Out)?;
            vs_main.add_atom_instance(factor)?;

            let mut lerp = FunctionInvocation::new(FFP_FUNC_LERP, ps_stage::FOG, counter.next_order());
            lerp.push_operand(&fog_color, OpSemantic::In)?;
            lerp.push_operand(&out_diffuse, OpSemantic::In)?;
            lerp.push_operand(&ps_in, OpSemantic::In)?;
            lerp.push_operand(&out_diffuse, OpSemantic::Out)?;
            ps_main.add_atom_instance(lerp)?;
        }
        Ok(())
    }

    fn update_gpu_programs_params(&self, pass: &mut Pass) {
        let params = derive_fog_params(self.settings.start, self.settings.end, self.settings.density);

        if let (Some(param), Some(program)) = (&self.fog_params, pass.program_mut(self.params_stage())) {
            param.set_gpu_value(&mut program.parameters, &params.to_array());
        }
        if let (Some(param), Some(program)) = (&self.fog_color, pass.program_mut(ProgramStage::Fragment)) {
            param.set_gpu_value(&mut program.parameters, &self.settings.color);
        }
    }
}
