//! Per-unit texture sampling modulated into the diffuse output

use super::{
    FFP_FUNC_MODULATE, FFP_FUNC_SAMPLE_TEXTURE, FFP_LIB_COMMON, FFP_LIB_TEXTURING,
    InvocationCounter, SubRenderState, ffp_stage, ps_stage, texcoord_set, vs_stage,
};
use crate::RtssError;
use crate::host::{PassDescription, PassOverrides, TextureType, TextureUnitDescription};
use crate::ir::{
    AssignmentAtom, Content, FunctionInvocation, GpuConstantType, GpuParamVariability, OpMask,
    OpSemantic, Operand, ParameterPtr, ProgramSet, Semantic,
};

pub(super) const TYPE_NAME: &str = "FFP_Texturing";

/// Name prefix of the per-unit sampler uniforms (`gTextureSampler0`, ...)
pub const SAMPLER_NAME: &str = "gTextureSampler";

fn sampler_type(texture_type: TextureType) -> GpuConstantType {
    match texture_type {
        TextureType::Tex1D => GpuConstantType::Sampler1D,
        TextureType::Tex2D => GpuConstantType::Sampler2D,
        TextureType::Tex3D => GpuConstantType::Sampler3D,
        TextureType::Cube => GpuConstantType::SamplerCube,
    }
}

fn texcoord_type(texture_type: TextureType) -> GpuConstantType {
    match texture_type {
        TextureType::Tex1D => GpuConstantType::Float1,
        TextureType::Tex2D => GpuConstantType::Float2,
        TextureType::Tex3D | TextureType::Cube => GpuConstantType::Float3,
    }
}

#[derive(Debug)]
struct TextureUnitParams {
    sampler: ParameterPtr,
    vs_input: ParameterPtr,
    vs_output: ParameterPtr,
    ps_input: ParameterPtr,
    texel: ParameterPtr,
}

/// Texcoord pass-through, `FFP_SampleTexture` and `FFP_Modulate` per unit
#[derive(Debug, Default)]
pub struct FfpTexturing {
    units: Vec<TextureUnitDescription>,
    unit_params: Vec<TextureUnitParams>,
    ps_out_diffuse: Option<ParameterPtr>,
}

impl FfpTexturing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture_unit_count(&self) -> usize {
        self.units.len()
    }
}

impl SubRenderState for FfpTexturing {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::TEXTURING
    }

    fn pre_add_to_render_state(&mut self, src: &PassDescription, _dst: &mut PassOverrides) -> bool {
        self.units = src.texture_units.clone();
        !self.units.is_empty()
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        self.unit_params.clear();

        for (i, unit) in self.units.iter().enumerate() {
            let ty = texcoord_type(unit.texture_type);
            // Each unit forwards one varying, so units share the texcoord limit
            let unit_set = texcoord_set(u32::try_from(i).unwrap_or(u32::MAX))?;
            let sampler = ps.resolve_parameter(
                sampler_type(unit.texture_type),
                i32::from(unit_set),
                GpuParamVariability::GLOBAL,
                SAMPLER_NAME,
                0,
            )?;

            let vs_main = vs.entry_point_function_mut()?;
            let set = texcoord_set(unit.tex_coord_set)?;
            let vs_input = vs_main.resolve_input_parameter(
                Semantic::TextureCoordinates,
                i32::from(set),
                Content::TextureCoordinate(set),
                ty,
            )?;
            let vs_output = vs_main.resolve_output_parameter(
                Semantic::TextureCoordinates,
                -1,
                Content::TextureCoordinate(unit_set),
                ty,
            )?;

            let ps_main = ps.entry_point_function_mut()?;
            let ps_input = ps_main.resolve_input_parameter(
                Semantic::TextureCoordinates,
                vs_output.index(),
                vs_output.content(),
                ty,
            )?;
            let texel = ps_main.resolve_local_parameter(
                Semantic::Unknown,
                0,
                &format!("texel_{}", i),
                GpuConstantType::Float4,
            )?;

            self.unit_params.push(TextureUnitParams {
                sampler,
                vs_input,
                vs_output,
                ps_input,
                texel,
            });
        }

        self.ps_out_diffuse = Some(ps.entry_point_function_mut()?.resolve_output_parameter(
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
        ps.add_dependency(FFP_LIB_COMMON);
        ps.add_dependency(FFP_LIB_TEXTURING);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let out_diffuse = super::resolved(&self.ps_out_diffuse, TYPE_NAME, "add_function_invocations")?;
        let (vs, ps) = program_set.programs_mut();
        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;
        let mut counter = InvocationCounter::new();

        for unit in &self.unit_params {
            vs_main.add_atom_instance(AssignmentAtom::new(
                Operand::new(&unit.vs_output, OpSemantic::Out, OpMask::ALL, 0)?,
                Operand::new(&unit.vs_input, OpSemantic::In, OpMask::ALL, 0)?,
                vs_stage::TEXTURING,
                counter.next_order(),
            ))?;

            let mut sample =
                FunctionInvocation::new(FFP_FUNC_SAMPLE_TEXTURE, ps_stage::SAMPLING, counter.next_order());
            sample.push_operand(&unit.sampler, OpSemantic::In)?;
            sample.push_operand(&unit.ps_input, OpSemantic::In)?;
            sample.push_operand(&unit.texel, OpSemantic::Out)?;
            ps_main.add_atom_instance(sample)?;

            let mut modulate =
                FunctionInvocation::new(FFP_FUNC_MODULATE, ps_stage::TEXTURING, counter.next_order());
            modulate.push_operand(&unit.texel, OpSemantic::In)?;
            modulate.push_operand(&out_diffuse, OpSemantic::In)?;
            modulate.push_operand(&out_diffuse, OpSemantic::Out)?;
            ps_main.add_atom_instance(modulate)?;
        }
        Ok(())
    }
}
