//! Program manager
//!
//! Drives a pass from features to bound GPU programs:
//!
//! 1. build the CPU programs from the render state's features
//! 2. run the language processor's pre-pass (and the shader model 4
//!    interface sync for HLSL)
//! 3. write both sources and compile them through the program cache
//! 4. run the processor's post-pass and bind every uniform to the pass
//!
//! Any failure aborts the acquisition and leaves the pass as it was.

mod cache;

pub use cache::{GpuProgramCache, program_name};

use hashbrown::HashMap;

use crate::RtssError;
use crate::config::RtssConfig;
use crate::host::{GpuProgramBackend, GpuProgramDesc, GpuProgramHandle, Pass, PassProgram};
use crate::ir::{ENTRY_POINT_NAME, Program, ProgramSet, ProgramStage};
use crate::language;
use crate::processor::{ProgramProcessor, create_program_processor, synchronize_pixel_inputs};
use crate::srs::RenderState;
use crate::writer::{ProgramWriter, create_program_writer};

pub struct ProgramManager {
    config: RtssConfig,
    writers: HashMap<String, Box<dyn ProgramWriter>>,
    processors: HashMap<String, Box<dyn ProgramProcessor>>,
    cache: GpuProgramCache,
}

impl ProgramManager {
    pub fn new(config: RtssConfig) -> Self {
        Self {
            config,
            writers: HashMap::new(),
            processors: HashMap::new(),
            cache: GpuProgramCache::new(),
        }
    }

    pub fn config(&self) -> &RtssConfig {
        &self.config
    }

    pub fn target_language(&self) -> &str {
        &self.config.target_language
    }

    /// Switch the language of subsequent acquisitions
    pub fn set_target_language(&mut self, target_language: &str) {
        self.config.target_language = target_language.to_string();
    }

    pub fn cache(&self) -> &GpuProgramCache {
        &self.cache
    }

    /// Writer and processor for `target_language`, created on first use
    fn ensure_registered(&mut self, target_language: &str) -> Result<(), RtssError> {
        if !self.writers.contains_key(target_language) {
            let writer = create_program_writer(target_language, &self.config)
                .ok_or_else(|| RtssError::NoWriter(target_language.to_string()))?;
            tracing::debug!("registered {} writer", target_language);
            self.writers.insert(target_language.to_string(), writer);
        }
        if !self.processors.contains_key(target_language) {
            let processor = create_program_processor(target_language)
                .ok_or_else(|| RtssError::NoProcessor(target_language.to_string()))?;
            tracing::debug!("registered {} processor", target_language);
            self.processors.insert(target_language.to_string(), processor);
        }
        Ok(())
    }

    fn requires_interface_sync(&self, target_language: &str) -> bool {
        target_language == language::HLSL && self.config.hlsl.shader_model_4
    }

    /// Generate, compile and bind the programs of `pass`.
    ///
    /// The new programs are built aside and only handed to the render state
    /// once they compiled and bound. Programs the pass held before are
    /// released once the new ones are attached.
    pub fn acquire_programs(
        &mut self,
        pass: &mut Pass,
        render_state: &mut RenderState,
        backend: &mut dyn GpuProgramBackend,
    ) -> Result<(), RtssError> {
        let target_language = self.config.target_language.clone();
        self.ensure_registered(&target_language)?;

        let (overrides, mut program_set) = match render_state.build_cpu_programs(pass.description()) {
            Ok(built) => built,
            Err(err) => {
                restore_render_state(pass, render_state);
                return Err(err);
            }
        };

        if let Err(err) = self.create_gpu_programs(&target_language, &mut program_set, backend) {
            restore_render_state(pass, render_state);
            return Err(err);
        }
        let (vertex, fragment) = match Self::bind_programs(&program_set, backend) {
            Ok(programs) => programs,
            Err(err) => {
                self.release_program_set(&program_set, backend);
                restore_render_state(pass, render_state);
                return Err(err);
            }
        };

        self.release_programs(pass, backend);
        tracing::info!(
            "acquired {} programs {} / {}",
            target_language,
            vertex.name,
            fragment.name
        );
        pass.set_programs(vertex, fragment);
        pass.apply_overrides(&overrides);
        render_state.set_program_set(program_set);
        render_state.update_gpu_programs_params(pass);
        Ok(())
    }

    /// Pre-process, write, compile and post-process both programs
    fn create_gpu_programs(
        &mut self,
        target_language: &str,
        program_set: &mut ProgramSet,
        backend: &mut dyn GpuProgramBackend,
    ) -> Result<(), RtssError> {
        let processor = self
            .processors
            .get_mut(target_language)
            .ok_or_else(|| RtssError::NoProcessor(target_language.to_string()))?;
        processor.pre_create_gpu_programs(program_set)?;
        // After compaction, which would otherwise drop the mirrored inputs again
        if self.requires_interface_sync(target_language) {
            synchronize_pixel_inputs(program_set)?;
        }

        let writer = self
            .writers
            .get(target_language)
            .ok_or_else(|| RtssError::NoWriter(target_language.to_string()))?;
        let vertex_source = write_source(writer.as_ref(), program_set.vertex_program())?;
        let fragment_source = write_source(writer.as_ref(), program_set.fragment_program())?;

        let vertex = compile(
            &mut self.cache,
            backend,
            target_language,
            program_set.vertex_program(),
            &vertex_source,
        )?;
        let fragment = match compile(
            &mut self.cache,
            backend,
            target_language,
            program_set.fragment_program(),
            &fragment_source,
        ) {
            Ok(handle) => handle,
            Err(err) => {
                self.cache.release(vertex.name(), backend);
                return Err(err);
            }
        };
        program_set.set_gpu_programs(vertex, fragment);

        let processor = self
            .processors
            .get_mut(target_language)
            .ok_or_else(|| RtssError::NoProcessor(target_language.to_string()))?;
        if let Err(err) = processor.post_create_gpu_programs(program_set, backend) {
            self.release_program_set(program_set, backend);
            return Err(err);
        }
        Ok(())
    }

    /// Clone each compiled program's default table and bind the uniforms to it
    fn bind_programs(
        program_set: &ProgramSet,
        backend: &dyn GpuProgramBackend,
    ) -> Result<(PassProgram, PassProgram), RtssError> {
        let bind = |stage: ProgramStage| -> Result<PassProgram, RtssError> {
            let handle = program_set
                .gpu_program(stage)
                .ok_or(RtssError::MissingProgramSet)?;
            let program = program_set
                .cpu_program(stage)
                .ok_or(RtssError::MissingProgramSet)?;
            let parameters = backend
                .default_parameters(handle)
                .cloned()
                .ok_or_else(|| RtssError::BackendCompileFailure {
                    program: handle.name().to_string(),
                    log: "no parameter table for compiled program".to_string(),
                })?;

            for param in program.parameters() {
                if !param.bind(&parameters) {
                    tracing::trace!("uniform {} has no constant in {}", param.name(), handle.name());
                }
            }
            Ok(PassProgram {
                name: handle.name().to_string(),
                parameters,
            })
        };
        Ok((bind(ProgramStage::Vertex)?, bind(ProgramStage::Fragment)?))
    }

    fn release_program_set(&mut self, program_set: &ProgramSet, backend: &mut dyn GpuProgramBackend) {
        for stage in [ProgramStage::Vertex, ProgramStage::Fragment] {
            if let Some(handle) = program_set.gpu_program(stage) {
                self.cache.release(handle.name(), backend);
            }
        }
    }

    /// Detach the pass from its programs, unloading those no other pass uses
    pub fn release_programs(&mut self, pass: &mut Pass, backend: &mut dyn GpuProgramBackend) {
        let (vertex, fragment) = pass.take_programs();
        for program in [vertex, fragment].into_iter().flatten() {
            self.cache.release(&program.name, backend);
        }
    }

    /// Unload every compiled program and forget the language registries
    pub fn flush_gpu_programs_cache(&mut self, backend: &mut dyn GpuProgramBackend) {
        let count = self.cache.flush(backend);
        self.writers.clear();
        self.processors.clear();
        tracing::info!("flushed {} gpu programs", count);
    }
}

impl std::fmt::Debug for ProgramManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramManager")
            .field("target_language", &self.config.target_language)
            .field("cached_programs", &self.cache.len())
            .finish()
    }
}

/// Point the features back at the programs still attached to `pass`.
///
/// A failed acquisition has already re-run the features against the discarded
/// programs. Rebuilding for the same pass and binding the uniforms by name to
/// the pass tables keeps per-frame updates reaching the live programs.
fn restore_render_state(pass: &Pass, render_state: &mut RenderState) {
    let (Some(vertex), Some(fragment)) = (
        pass.program(ProgramStage::Vertex),
        pass.program(ProgramStage::Fragment),
    ) else {
        return;
    };

    let mut program_set = match render_state.build_cpu_programs(pass.description()) {
        Ok((_, program_set)) => program_set,
        Err(err) => {
            tracing::warn!("could not restore render state after failed acquisition: {}", err);
            return;
        }
    };
    for (stage, bound) in [(ProgramStage::Vertex, vertex), (ProgramStage::Fragment, fragment)] {
        if let Some(program) = program_set.cpu_program(stage) {
            for param in program.parameters() {
                param.bind(&bound.parameters);
            }
        }
    }
    program_set.set_gpu_programs(
        GpuProgramHandle::new(vertex.name.as_str(), ProgramStage::Vertex),
        GpuProgramHandle::new(fragment.name.as_str(), ProgramStage::Fragment),
    );
    render_state.set_program_set(program_set);
    tracing::debug!("render state restored to {} / {}", vertex.name, fragment.name);
}

fn write_source(writer: &dyn ProgramWriter, program: &Program) -> Result<String, RtssError> {
    let mut source = String::new();
    writer.write_source_code(&mut source, program)?;
    Ok(source)
}

fn compile(
    cache: &mut GpuProgramCache,
    backend: &mut dyn GpuProgramBackend,
    target_language: &str,
    program: &Program,
    source: &str,
) -> Result<GpuProgramHandle, RtssError> {
    let name = program_name(source, program.stage());
    cache.get_or_create(
        backend,
        &GpuProgramDesc {
            name: &name,
            language: target_language,
            stage: program.stage(),
            entry_point: ENTRY_POINT_NAME,
            source,
            uniforms: program.parameters(),
        },
    )
}
