//! Compiled GPU program cache
//!
//! Programs are keyed by their generated name (source hash + stage suffix),
//! so two passes producing identical source share one compiled program.
//! Entries are reference counted per acquiring pass.

use hashbrown::HashMap;
use xxhash_rust::xxh3::xxh3_64;

use crate::RtssError;
use crate::host::{GpuProgramBackend, GpuProgramDesc, GpuProgramHandle};
use crate::ir::ProgramStage;

/// Cache name of a generated program: 16 hex digits of the source hash plus
/// the stage suffix
pub fn program_name(source: &str, stage: ProgramStage) -> String {
    format!("{:016x}{}", xxh3_64(source.as_bytes()), stage.name_suffix())
}

struct CacheEntry {
    handle: GpuProgramHandle,
    ref_count: usize,
}

#[derive(Default)]
pub struct GpuProgramCache {
    programs: HashMap<String, CacheEntry>,
}

impl GpuProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or compile the program named by `desc`
    ///
    /// A hit reuses the compiled program; a miss compiles it through the
    /// backend. Either way the entry gains one reference.
    pub fn get_or_create(
        &mut self,
        backend: &mut dyn GpuProgramBackend,
        desc: &GpuProgramDesc<'_>,
    ) -> Result<GpuProgramHandle, RtssError> {
        if let Some(entry) = self.programs.get_mut(desc.name) {
            entry.ref_count += 1;
            tracing::debug!("gpu program cache hit: {} (refs={})", desc.name, entry.ref_count);
            return Ok(entry.handle.clone());
        }

        tracing::debug!("gpu program cache miss: compiling {} ({})", desc.name, desc.language);
        let handle = backend
            .compile(desc)
            .map_err(|log| RtssError::BackendCompileFailure {
                program: desc.name.to_string(),
                log,
            })?;
        self.programs.insert(
            desc.name.to_string(),
            CacheEntry {
                handle: handle.clone(),
                ref_count: 1,
            },
        );
        Ok(handle)
    }

    /// Drop one reference; the last one unloads the program. Returns true
    /// when the program was evicted.
    pub fn release(&mut self, name: &str, backend: &mut dyn GpuProgramBackend) -> bool {
        let Some(entry) = self.programs.get_mut(name) else {
            tracing::warn!("releasing unknown gpu program {}", name);
            return false;
        };
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return false;
        }

        if let Some(entry) = self.programs.remove(name) {
            backend.remove(&entry.handle);
        }
        tracing::debug!("evicted gpu program {}", name);
        true
    }

    /// Unload every cached program regardless of references
    pub fn flush(&mut self, backend: &mut dyn GpuProgramBackend) -> usize {
        let count = self.programs.len();
        for (_, entry) in self.programs.drain() {
            backend.remove(&entry.handle);
        }
        count
    }

    pub fn ref_count(&self, name: &str) -> Option<usize> {
        self.programs.get(name).map(|entry| entry.ref_count)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryBackend;

    fn desc(name: &str) -> GpuProgramDesc<'_> {
        GpuProgramDesc {
            name,
            language: "cg",
            stage: ProgramStage::Vertex,
            entry_point: "main",
            source: "void main() {}",
            uniforms: &[],
        }
    }

    #[test]
    fn test_program_name_format() {
        let name = program_name("void main() {}", ProgramStage::Fragment);
        assert_eq!(name.len(), 16 + "_FS".len());
        assert!(name.ends_with("_FS"));
        assert_eq!(name, program_name("void main() {}", ProgramStage::Fragment));
        assert_ne!(name, program_name("void main() { }", ProgramStage::Fragment));
    }

    #[test]
    fn test_hit_reuses_compiled_program() {
        let mut backend = MemoryBackend::new();
        let mut cache = GpuProgramCache::new();

        let first = cache.get_or_create(&mut backend, &desc("a_VS")).unwrap();
        let second = cache.get_or_create(&mut backend, &desc("a_VS")).unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.compile_count(), 1);
        assert_eq!(cache.ref_count("a_VS"), Some(2));
    }

    #[test]
    fn test_last_release_evicts() {
        let mut backend = MemoryBackend::new();
        let mut cache = GpuProgramCache::new();
        cache.get_or_create(&mut backend, &desc("a_VS")).unwrap();
        cache.get_or_create(&mut backend, &desc("a_VS")).unwrap();

        assert!(!cache.release("a_VS", &mut backend));
        assert!(backend.program("a_VS").is_some());
        assert!(cache.release("a_VS", &mut backend));
        assert!(backend.program("a_VS").is_none());
        assert!(cache.is_empty());
        assert!(!cache.release("a_VS", &mut backend));
    }

    #[test]
    fn test_compile_failure_is_not_cached() {
        let mut backend = MemoryBackend::new();
        backend.set_failure_hook(|_| Some("syntax error".to_string()));
        let mut cache = GpuProgramCache::new();

        assert_eq!(
            cache.get_or_create(&mut backend, &desc("bad_VS")).unwrap_err(),
            RtssError::BackendCompileFailure {
                program: "bad_VS".to_string(),
                log: "syntax error".to_string(),
            }
        );
        assert!(!cache.contains("bad_VS"));
    }

    #[test]
    fn test_flush_unloads_everything() {
        let mut backend = MemoryBackend::new();
        let mut cache = GpuProgramCache::new();
        cache.get_or_create(&mut backend, &desc("a_VS")).unwrap();
        cache.get_or_create(&mut backend, &desc("b_VS")).unwrap();

        assert_eq!(cache.flush(&mut backend), 2);
        assert_eq!(backend.program_count(), 0);
        assert_eq!(cache.len(), 0);
    }
}
