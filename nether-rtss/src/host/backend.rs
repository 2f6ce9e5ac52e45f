//! GPU program compile backend
//!
//! The external "compile program from source" step. Real engines wrap their
//! shader compiler here; [`MemoryBackend`] records sources and synthesizes
//! parameter tables from the declared uniforms.

use hashbrown::HashMap;

use super::GpuParameters;
use crate::ir::{ParameterPtr, ProgramStage};

/// Weak reference to an externally compiled program
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GpuProgramHandle {
    name: String,
    stage: ProgramStage,
}

impl GpuProgramHandle {
    pub fn new(name: impl Into<String>, stage: ProgramStage) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> ProgramStage {
        self.stage
    }
}

/// Everything the backend needs to compile one generated program
#[derive(Debug, Clone, Copy)]
pub struct GpuProgramDesc<'a> {
    pub name: &'a str,
    pub language: &'a str,
    pub stage: ProgramStage,
    pub entry_point: &'a str,
    pub source: &'a str,
    /// Uniforms declared by the source, in declaration order
    pub uniforms: &'a [ParameterPtr],
}

pub trait GpuProgramBackend {
    /// Compile a program; the error string is the compiler log
    fn compile(&mut self, desc: &GpuProgramDesc<'_>) -> Result<GpuProgramHandle, String>;

    /// Default parameter table of a compiled program
    fn default_parameters(&self, handle: &GpuProgramHandle) -> Option<&GpuParameters>;

    fn default_parameters_mut(&mut self, handle: &GpuProgramHandle) -> Option<&mut GpuParameters>;

    /// Link a library source into the program (GLSL family)
    fn attach_library(&mut self, _handle: &GpuProgramHandle, _library: &str) -> Result<(), String> {
        Ok(())
    }

    /// Unload a compiled program
    fn remove(&mut self, handle: &GpuProgramHandle);
}

/// Program recorded by [`MemoryBackend`]
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub language: String,
    pub stage: ProgramStage,
    pub entry_point: String,
    pub source: String,
    pub parameters: GpuParameters,
    pub libraries: Vec<String>,
}

type FailureHook = Box<dyn Fn(&GpuProgramDesc<'_>) -> Option<String>>;

/// In-memory backend: "compiling" stores the source and defines one constant
/// per declared uniform.
#[derive(Default)]
pub struct MemoryBackend {
    programs: HashMap<String, CompiledProgram>,
    compile_count: usize,
    failure: Option<FailureHook>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make compiles fail whenever `hook` returns a log
    pub fn set_failure_hook(
        &mut self,
        hook: impl Fn(&GpuProgramDesc<'_>) -> Option<String> + 'static,
    ) {
        self.failure = Some(Box::new(hook));
    }

    pub fn clear_failure_hook(&mut self) {
        self.failure = None;
    }

    /// Number of successful compiles so far
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    pub fn program(&self, name: &str) -> Option<&CompiledProgram> {
        self.programs.get(name)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}

impl GpuProgramBackend for MemoryBackend {
    fn compile(&mut self, desc: &GpuProgramDesc<'_>) -> Result<GpuProgramHandle, String> {
        if let Some(log) = self.failure.as_ref().and_then(|hook| hook(desc)) {
            tracing::warn!("memory backend rejected {}: {}", desc.name, log);
            return Err(log);
        }

        let mut parameters = GpuParameters::new();
        for uniform in desc.uniforms {
            parameters.define(uniform.name(), uniform.ty(), uniform.size());
        }

        self.programs.insert(
            desc.name.to_string(),
            CompiledProgram {
                language: desc.language.to_string(),
                stage: desc.stage,
                entry_point: desc.entry_point.to_string(),
                source: desc.source.to_string(),
                parameters,
                libraries: Vec::new(),
            },
        );
        self.compile_count += 1;
        tracing::debug!("memory backend compiled {} ({} uniforms)", desc.name, desc.uniforms.len());

        Ok(GpuProgramHandle::new(desc.name, desc.stage))
    }

    fn default_parameters(&self, handle: &GpuProgramHandle) -> Option<&GpuParameters> {
        self.programs.get(handle.name()).map(|p| &p.parameters)
    }

    fn default_parameters_mut(&mut self, handle: &GpuProgramHandle) -> Option<&mut GpuParameters> {
        self.programs.get_mut(handle.name()).map(|p| &mut p.parameters)
    }

    fn attach_library(&mut self, handle: &GpuProgramHandle, library: &str) -> Result<(), String> {
        let program = self
            .programs
            .get_mut(handle.name())
            .ok_or_else(|| format!("unknown program {}", handle.name()))?;
        if !program.libraries.iter().any(|lib| lib == library) {
            program.libraries.push(library.to_string());
        }
        Ok(())
    }

    fn remove(&mut self, handle: &GpuProgramHandle) {
        self.programs.remove(handle.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AutoConstantType, Parameter};
    use std::rc::Rc;

    fn desc<'a>(name: &'a str, uniforms: &'a [ParameterPtr]) -> GpuProgramDesc<'a> {
        GpuProgramDesc {
            name,
            language: "cg",
            stage: ProgramStage::Vertex,
            entry_point: "main",
            source: "void main() {}",
            uniforms,
        }
    }

    #[test]
    fn test_compile_defines_uniforms() {
        let uniforms = vec![Rc::new(Parameter::auto_constant(
            AutoConstantType::WorldViewProjMatrix,
            crate::ir::AutoConstantData::Int(0),
            0,
        ))];
        let mut backend = MemoryBackend::new();
        let handle = backend.compile(&desc("abc_VS", &uniforms)).unwrap();

        assert_eq!(handle.name(), "abc_VS");
        assert_eq!(backend.compile_count(), 1);
        let params = backend.default_parameters(&handle).unwrap();
        assert!(params.find_physical_index("worldviewproj_matrix").is_some());
    }

    #[test]
    fn test_failure_hook() {
        let mut backend = MemoryBackend::new();
        backend.set_failure_hook(|desc| {
            desc.name
                .ends_with("_FS")
                .then(|| "syntax error".to_string())
        });

        assert!(backend.compile(&desc("a_VS", &[])).is_ok());
        assert_eq!(
            backend.compile(&desc("a_FS", &[])).unwrap_err(),
            "syntax error"
        );
        assert_eq!(backend.program_count(), 1);

        backend.clear_failure_hook();
        assert!(backend.compile(&desc("a_FS", &[])).is_ok());
    }

    #[test]
    fn test_attach_and_remove() {
        let mut backend = MemoryBackend::new();
        let handle = backend.compile(&desc("a_VS", &[])).unwrap();
        backend.attach_library(&handle, "FFPLib_Common").unwrap();
        backend.attach_library(&handle, "FFPLib_Common").unwrap();
        assert_eq!(backend.program("a_VS").unwrap().libraries, ["FFPLib_Common"]);

        backend.remove(&handle);
        assert!(backend.program("a_VS").is_none());
        assert!(backend.attach_library(&handle, "FFPLib_Common").is_err());
    }
}
