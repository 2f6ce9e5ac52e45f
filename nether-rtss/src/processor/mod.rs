//! Per-language program processors
//!
//! A processor normalizes the CPU programs before source generation
//! (vertex/fragment interface compaction) and finishes the compiled programs
//! afterwards (auto-constant and sampler binding).

mod cg;
mod glsl;

pub use cg::CgProgramProcessor;
pub use glsl::GlslProgramProcessor;

use std::rc::Rc;

use crate::RtssError;
use crate::host::{GpuParameters, GpuProgramBackend, GpuProgramHandle};
use crate::ir::{
    Content, Direction, Parameter, ParameterPtr, Program, ProgramSet, ProgramStage,
    parameter_by_semantic, varying_name,
};
use crate::language;

pub trait ProgramProcessor {
    fn target_language(&self) -> &'static str;

    /// Runs on the CPU programs before any source is written
    fn pre_create_gpu_programs(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError>;

    /// Runs once both programs compiled
    fn post_create_gpu_programs(
        &mut self,
        program_set: &ProgramSet,
        backend: &mut dyn GpuProgramBackend,
    ) -> Result<(), RtssError>;
}

/// Processor for a target language, `None` when the language is unknown
pub fn create_program_processor(target_language: &str) -> Option<Box<dyn ProgramProcessor>> {
    match target_language {
        language::CG => Some(Box::new(CgProgramProcessor::new(language::CG))),
        language::HLSL => Some(Box::new(CgProgramProcessor::new(language::HLSL))),
        language::GLSL => Some(Box::new(GlslProgramProcessor::new(language::GLSL))),
        language::GLSLES => Some(Box::new(GlslProgramProcessor::new(language::GLSLES))),
        _ => None,
    }
}

/// Drop interpolants nothing consumes.
///
/// Fragment inputs no fragment statement reads are removed first. Vertex
/// outputs left without a fragment input at the same (semantic, index) become
/// vertex locals, so the statements writing them stay valid; the clip-space
/// position is always kept. Remaining parameters keep their order.
pub fn compact_vs_outputs(program_set: &mut ProgramSet) -> Result<(), RtssError> {
    let (vs, ps) = program_set.programs_mut();
    let vs_main = vs.entry_point_function_mut()?;
    let ps_main = ps.entry_point_function_mut()?;

    let unused_inputs: Vec<ParameterPtr> = ps_main
        .input_parameters()
        .iter()
        .filter(|input| !ps_main.references_parameter(input))
        .cloned()
        .collect();
    for input in &unused_inputs {
        tracing::trace!("removing unread fragment input {}", input.name());
        ps_main.delete_input_parameter(input);
    }

    let unconsumed: Vec<ParameterPtr> = vs_main
        .output_parameters()
        .iter()
        .filter(|output| output.content() != Content::PositionProjectiveSpace)
        .filter(|output| {
            parameter_by_semantic(ps_main.input_parameters(), output.semantic(), output.index())
                .is_none()
        })
        .cloned()
        .collect();
    for output in &unconsumed {
        tracing::trace!("demoting unconsumed vertex output {}", output.name());
        vs_main.delete_output_parameter(output);
        vs_main.add_local_parameter(output.clone())?;
    }

    if let Some(orphan) = ps_main.input_parameters().iter().find(|input| {
        parameter_by_semantic(vs_main.output_parameters(), input.semantic(), input.index()).is_none()
    }) {
        return Err(RtssError::UnresolvedVarying {
            parameter: orphan.name().to_string(),
        });
    }

    tracing::debug!(
        "compacted interface: {} vertex outputs, {} fragment inputs",
        vs_main.output_parameters().len(),
        ps_main.input_parameters().len()
    );
    Ok(())
}

/// Make the fragment inputs mirror the vertex outputs one to one.
///
/// Shader model 4 matches the interface by layout, so the fragment entry
/// point receives every vertex output in vertex order. An existing fragment
/// input with the same slot and content is kept; other slots get a fresh
/// input-named copy of the vertex output.
pub fn synchronize_pixel_inputs(program_set: &mut ProgramSet) -> Result<(), RtssError> {
    let (vs, ps) = program_set.programs_mut();
    let vs_main = vs.entry_point_function()?;
    let ps_main = ps.entry_point_function_mut()?;

    let original: Vec<ParameterPtr> = ps_main.input_parameters().to_vec();
    let mut synced = Vec::with_capacity(vs_main.output_parameters().len());

    for output in vs_main.output_parameters() {
        let existing = original.iter().find(|input| {
            input.semantic() == output.semantic()
                && input.index() == output.index()
                && input.content() == output.content()
        });
        let input = match existing {
            Some(input) => input.clone(),
            None => Rc::new(Parameter::new(
                output.ty(),
                varying_name(Direction::In, output.semantic(), output.index()),
                output.semantic(),
                output.index(),
                output.content(),
                output.size(),
            )),
        };
        synced.push(input);
    }

    // Inputs without a vertex counterpart stay at the end
    for input in &original {
        if !synced.iter().any(|p| Rc::ptr_eq(p, input)) {
            tracing::warn!("fragment input {} has no vertex output", input.name());
            synced.push(input.clone());
        }
    }

    ps_main.delete_all_input_parameters();
    for input in synced {
        ps_main.add_input_parameter(input)?;
    }
    Ok(())
}

/// Bind every uniform of `program` into the compiled program's table.
///
/// Auto constants get their auto binding; manual uniforms get their
/// variability. Uniforms the compiler dropped are skipped.
pub fn bind_auto_parameters(program: &Program, params: &mut GpuParameters) -> usize {
    let mut bound = 0;
    for param in program.parameters() {
        let ok = match param.auto_constant_info() {
            Some((auto_type, data)) => params.set_named_auto_constant(param.name(), auto_type, data),
            None => params.set_variability(param.name(), param.variability()),
        };
        if ok {
            bound += 1;
        } else {
            tracing::trace!("uniform {} not present in compiled program", param.name());
        }
    }
    bound
}

/// Write each sampler's texture unit into its uniform
pub fn bind_texture_samplers(program: &Program, params: &mut GpuParameters) -> usize {
    program
        .parameters()
        .iter()
        .filter(|p| p.ty().is_sampler())
        .filter(|p| params.set_named_int(p.name(), p.index()))
        .count()
}

/// Compiled handle and default table of one stage
fn compiled_parameters<'b>(
    program_set: &ProgramSet,
    stage: ProgramStage,
    backend: &'b mut dyn GpuProgramBackend,
) -> Result<(GpuProgramHandle, &'b mut GpuParameters), RtssError> {
    let handle = program_set
        .gpu_program(stage)
        .cloned()
        .ok_or(RtssError::MissingProgramSet)?;
    let params = backend
        .default_parameters_mut(&handle)
        .ok_or_else(|| RtssError::BackendCompileFailure {
            program: handle.name().to_string(),
            log: "no parameter table for compiled program".to_string(),
        })?;
    Ok((handle, params))
}

#[cfg(test)]
mod tests;
