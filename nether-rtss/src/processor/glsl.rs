//! GLSL and GLSL ES processor

use super::{
    ProgramProcessor, bind_auto_parameters, bind_texture_samplers, compact_vs_outputs,
    compiled_parameters,
};
use crate::RtssError;
use crate::host::GpuProgramBackend;
use crate::ir::{ProgramSet, ProgramStage};

/// GLSL has no register annotations: sampler units are written into the
/// sampler uniforms, and library sources are linked as separate objects.
#[derive(Debug)]
pub struct GlslProgramProcessor {
    language: &'static str,
}

impl GlslProgramProcessor {
    pub fn new(language: &'static str) -> Self {
        Self { language }
    }
}

impl ProgramProcessor for GlslProgramProcessor {
    fn target_language(&self) -> &'static str {
        self.language
    }

    fn pre_create_gpu_programs(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        compact_vs_outputs(program_set)
    }

    fn post_create_gpu_programs(
        &mut self,
        program_set: &ProgramSet,
        backend: &mut dyn GpuProgramBackend,
    ) -> Result<(), RtssError> {
        for stage in [ProgramStage::Vertex, ProgramStage::Fragment] {
            let Some(program) = program_set.cpu_program(stage) else {
                continue;
            };
            let (handle, params) = compiled_parameters(program_set, stage, backend)?;
            let bound = bind_auto_parameters(program, params);
            let samplers = bind_texture_samplers(program, params);
            tracing::debug!("{}: bound {} uniforms, {} samplers", handle.name(), bound, samplers);

            for library in program.dependencies() {
                backend
                    .attach_library(&handle, library)
                    .map_err(|log| RtssError::BackendCompileFailure {
                        program: library.clone(),
                        log,
                    })?;
            }
        }
        Ok(())
    }
}
