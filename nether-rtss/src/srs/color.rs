//! Diffuse/specular colour flow from vertex stream to pixel output

use bitflags::bitflags;

use super::{
    FFP_FUNC_ADD, FFP_FUNC_ASSIGN, FFP_FUNC_CONSTRUCT, FFP_LIB_COMMON, InvocationCounter,
    SubRenderState, ffp_stage, ps_stage, resolved, vs_stage,
};
use crate::RtssError;
use crate::host::{PassDescription, PassOverrides, TrackVertexColor};
use crate::ir::{
    Content, Function, FunctionInvocation, GpuConstantType, OpMask, OpSemantic, ParameterFactory,
    ParameterPtr, ProgramSet, Semantic,
};

pub(super) const TYPE_NAME: &str = "FFP_Color";

bitflags! {
    /// Which colour parameters the feature resolves
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColorStageFlags: u32 {
        const VS_INPUT_DIFFUSE = 1 << 1;
        const VS_INPUT_SPECULAR = 1 << 2;
        const VS_OUTPUT_DIFFUSE = 1 << 3;
        const VS_OUTPUT_SPECULAR = 1 << 4;
        const PS_INPUT_DIFFUSE = 1 << 5;
        const PS_INPUT_SPECULAR = 1 << 6;
        const PS_OUTPUT_DIFFUSE = 1 << 7;
        const PS_OUTPUT_SPECULAR = 1 << 8;
    }
}

/// Vertex colour pass-through and pixel colour initialization.
///
/// Each stage flag is tested for presence (`contains`), so every flag bit
/// enables its branch regardless of its numeric value.
#[derive(Debug)]
pub struct FfpColor {
    /// Baseline plus masks added or removed through the API
    requested_flags: ColorStageFlags,
    /// Requested flags plus those derived from the current pass
    flags: ColorStageFlags,
    vs_input_diffuse: Option<ParameterPtr>,
    vs_input_specular: Option<ParameterPtr>,
    vs_output_diffuse: Option<ParameterPtr>,
    vs_output_specular: Option<ParameterPtr>,
    ps_input_diffuse: Option<ParameterPtr>,
    ps_input_specular: Option<ParameterPtr>,
    ps_output_diffuse: Option<ParameterPtr>,
}

impl FfpColor {
    pub fn new() -> Self {
        Self {
            requested_flags: ColorStageFlags::PS_OUTPUT_DIFFUSE,
            flags: ColorStageFlags::PS_OUTPUT_DIFFUSE,
            vs_input_diffuse: None,
            vs_input_specular: None,
            vs_output_diffuse: None,
            vs_output_specular: None,
            ps_input_diffuse: None,
            ps_input_specular: None,
            ps_output_diffuse: None,
        }
    }

    pub fn resolve_stage_flags(&self) -> ColorStageFlags {
        self.flags
    }

    pub fn add_resolve_stage_mask(&mut self, mask: ColorStageFlags) {
        self.requested_flags |= mask;
        self.flags |= mask;
    }

    fn clear_parameters(&mut self) {
        self.vs_input_diffuse = None;
        self.vs_input_specular = None;
        self.vs_output_diffuse = None;
        self.vs_output_specular = None;
        self.ps_input_diffuse = None;
        self.ps_input_specular = None;
        self.ps_output_diffuse = None;
    }

    pub fn remove_resolve_stage_mask(&mut self, mask: ColorStageFlags) {
        self.requested_flags &= !mask;
        self.flags &= !mask;
    }
}

impl Default for FfpColor {
    fn default() -> Self {
        Self::new()
    }
}

fn color_local(func: &mut Function, index: i32) -> Result<ParameterPtr, RtssError> {
    let content = if index == 0 {
        Content::ColorDiffuse
    } else {
        Content::ColorSpecular
    };
    func.resolve_local_parameter_by_content(Semantic::Color, index, content, GpuConstantType::Float4)
}

/// `FFP_Construct(r, g, b, a, dst)`
fn construct(
    dst: &ParameterPtr,
    value: f32,
    group: i32,
    internal: i32,
) -> Result<FunctionInvocation, RtssError> {
    let mut inv = FunctionInvocation::new(FFP_FUNC_CONSTRUCT, group, internal);
    for _ in 0..4 {
        inv.push_operand(&ParameterFactory::create_constant_float(value), OpSemantic::In)?;
    }
    inv.push_operand(dst, OpSemantic::Out)?;
    Ok(inv)
}

fn assign(
    src: &ParameterPtr,
    dst: &ParameterPtr,
    group: i32,
    internal: i32,
) -> Result<FunctionInvocation, RtssError> {
    let mut inv = FunctionInvocation::new(FFP_FUNC_ASSIGN, group, internal);
    inv.push_operand(src, OpSemantic::In)?;
    inv.push_operand(dst, OpSemantic::Out)?;
    Ok(inv)
}

impl SubRenderState for FfpColor {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::COLOR
    }

    fn pre_add_to_render_state(&mut self, src: &PassDescription, _dst: &mut PassOverrides) -> bool {
        // Tracking flags from a previous pass must not leak into this one
        self.flags = self.requested_flags;
        let tracking = src.vertex_color_tracking;
        if !tracking.is_empty() {
            self.flags |= ColorStageFlags::VS_INPUT_DIFFUSE;
        }
        if tracking.contains(TrackVertexColor::SPECULAR) {
            self.flags |= ColorStageFlags::VS_INPUT_SPECULAR;
        }
        true
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let flags = self.flags;
        self.clear_parameters();
        let (vs, ps) = program_set.programs_mut();
        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;

        let color = |func: &mut Function, input: bool, index: i32| {
            let content = if index == 0 {
                Content::ColorDiffuse
            } else {
                Content::ColorSpecular
            };
            if input {
                func.resolve_input_parameter(Semantic::Color, index, content, GpuConstantType::Float4)
            } else {
                func.resolve_output_parameter(Semantic::Color, index, content, GpuConstantType::Float4)
            }
        };

        if flags.contains(ColorStageFlags::VS_INPUT_DIFFUSE) {
            self.vs_input_diffuse = Some(color(vs_main, true, 0)?);
        }
        if flags.contains(ColorStageFlags::VS_INPUT_SPECULAR) {
            self.vs_input_specular = Some(color(vs_main, true, 1)?);
        }

        // Vertex stream colours are always forwarded
        if self.vs_input_diffuse.is_some() || flags.contains(ColorStageFlags::VS_OUTPUT_DIFFUSE) {
            self.vs_output_diffuse = Some(color(vs_main, false, 0)?);
        }
        if self.vs_input_specular.is_some() || flags.contains(ColorStageFlags::VS_OUTPUT_SPECULAR) {
            self.vs_output_specular = Some(color(vs_main, false, 1)?);
        }

        if self.vs_output_diffuse.is_some() || flags.contains(ColorStageFlags::PS_INPUT_DIFFUSE) {
            self.ps_input_diffuse = Some(color(ps_main, true, 0)?);
        }
        if self.vs_output_specular.is_some() || flags.contains(ColorStageFlags::PS_INPUT_SPECULAR) {
            self.ps_input_specular = Some(color(ps_main, true, 1)?);
        }

        self.ps_output_diffuse = Some(color(ps_main, false, 0)?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        program_set.vertex_program_mut().add_dependency(FFP_LIB_COMMON);
        program_set.fragment_program_mut().add_dependency(FFP_LIB_COMMON);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;

        let mut counter = InvocationCounter::new();

        // Vertex stage
        let vs_diffuse = match &self.vs_input_diffuse {
            Some(input) => input.clone(),
            None => {
                let local = color_local(vs_main, 0)?;
                vs_main.add_atom_instance(construct(&local, 1.0, vs_stage::COLOR, counter.next_order())?)?;
                local
            }
        };
        if let Some(output) = &self.vs_output_diffuse {
            vs_main.add_atom_instance(assign(&vs_diffuse, output, vs_stage::COLOR, counter.next_order())?)?;
        }

        if let Some(output) = &self.vs_output_specular {
            let vs_specular = match &self.vs_input_specular {
                Some(input) => input.clone(),
                None => {
                    let local = color_local(vs_main, 1)?;
                    vs_main.add_atom_instance(construct(&local, 0.0, vs_stage::COLOR, counter.next_order())?)?;
                    local
                }
            };
            vs_main.add_atom_instance(assign(&vs_specular, output, vs_stage::COLOR, counter.next_order())?)?;
        }

        // Fragment stage
        let ps_output = resolved(&self.ps_output_diffuse, TYPE_NAME, "add_function_invocations")?;
        let group = ps_stage::COLOR_BEGIN + 1;

        let ps_diffuse = match &self.ps_input_diffuse {
            Some(input) => input.clone(),
            None => {
                let local = color_local(ps_main, 0)?;
                ps_main.add_atom_instance(construct(&local, 1.0, group, counter.next_order())?)?;
                local
            }
        };
        ps_main.add_atom_instance(assign(&ps_diffuse, &ps_output, group, counter.next_order())?)?;

        if let Some(ps_specular) = &self.ps_input_specular {
            let mut add = FunctionInvocation::new(FFP_FUNC_ADD, ps_stage::COLOR_END, counter.next_order());
            add.push_operand_masked(&ps_output, OpSemantic::In, OpMask::XYZ, 0)?;
            add.push_operand_masked(ps_specular, OpSemantic::In, OpMask::XYZ, 0)?;
            add.push_operand_masked(&ps_output, OpSemantic::Out, OpMask::XYZ, 0)?;
            ps_main.add_atom_instance(add)?;
        }
        Ok(())
    }
}
