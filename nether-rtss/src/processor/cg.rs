//! Cg and HLSL processor

use super::{ProgramProcessor, bind_auto_parameters, compact_vs_outputs, compiled_parameters};
use crate::RtssError;
use crate::host::GpuProgramBackend;
use crate::ir::{ProgramSet, ProgramStage};

/// Samplers carry explicit `register(sN)` annotations, so only auto
/// constants need binding after compilation.
#[derive(Debug)]
pub struct CgProgramProcessor {
    language: &'static str,
}

impl CgProgramProcessor {
    pub fn new(language: &'static str) -> Self {
        Self { language }
    }
}

impl ProgramProcessor for CgProgramProcessor {
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
            tracing::debug!("{}: bound {} uniforms", handle.name(), bound);
        }
        Ok(())
    }
}
