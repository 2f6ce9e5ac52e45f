//! Ordered feature chain for one pass

use super::{SubRenderState, SubRenderStateContext, create_sub_render_state, color, fog, texturing, transform};
use crate::RtssError;
use crate::host::{Pass, PassDescription, PassOverrides};
use crate::ir::ProgramSet;

struct Entry {
    srs: Box<dyn SubRenderState>,
    active: bool,
}

/// Features of a pass, kept sorted by execution order.
///
/// At most one feature per execution order: adding a feature whose order is
/// already taken replaces the previous one (skinning replaces transform).
#[derive(Default)]
pub struct RenderState {
    entries: Vec<Entry>,
    program_set: Option<ProgramSet>,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed-function emulation chain: transform, colour, texturing, fog
    pub fn with_defaults(ctx: SubRenderStateContext<'_>) -> Self {
        let mut state = Self::new();
        for type_name in [
            transform::TYPE_NAME,
            color::TYPE_NAME,
            texturing::TYPE_NAME,
            fog::TYPE_NAME,
        ] {
            if let Some(srs) = create_sub_render_state(type_name, ctx) {
                state.add_template_sub_render_state(srs);
            }
        }
        state
    }

    pub fn add_template_sub_render_state(&mut self, srs: Box<dyn SubRenderState>) {
        let order = srs.execution_order();
        let entry = Entry { srs, active: true };

        if let Some(existing) = self.entries.iter_mut().find(|e| e.srs.execution_order() == order) {
            tracing::debug!(
                "{} replaces {} at order {}",
                entry.srs.type_name(),
                existing.srs.type_name(),
                order
            );
            *existing = entry;
            return;
        }

        let pos = self
            .entries
            .iter()
            .position(|e| e.srs.execution_order() > order)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
    }

    /// Remove the feature registered under `type_name`
    pub fn remove_sub_render_state(&mut self, type_name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.srs.type_name() != type_name);
        self.entries.len() != before
    }

    /// Type names in execution order
    pub fn sub_render_states(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.srs.type_name()).collect()
    }

    /// Type names that survived the last pre-add pass
    pub fn active_sub_render_states(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.srs.type_name())
            .collect()
    }

    /// Build fresh CPU programs for a pass.
    ///
    /// Every feature inspects the material first; vetoed features sit out.
    /// The rest run their three phases in execution order, then each program's
    /// statements are sorted. Returns the fixed-function state the pass must
    /// now override.
    pub fn create_cpu_programs(&mut self, src: &PassDescription) -> Result<PassOverrides, RtssError> {
        let (overrides, program_set) = self.build_cpu_programs(src)?;
        self.program_set = Some(program_set);
        Ok(overrides)
    }

    /// Same as [`RenderState::create_cpu_programs`], but hands the programs
    /// back instead of storing them
    pub fn build_cpu_programs(
        &mut self,
        src: &PassDescription,
    ) -> Result<(PassOverrides, ProgramSet), RtssError> {
        let mut overrides = PassOverrides::default();
        for entry in &mut self.entries {
            entry.active = entry.srs.pre_add_to_render_state(src, &mut overrides);
            if !entry.active {
                tracing::warn!("{} vetoed for this pass", entry.srs.type_name());
            }
        }

        let mut program_set = ProgramSet::new();
        for entry in self.entries.iter_mut().filter(|e| e.active) {
            entry.srs.create_cpu_sub_programs(&mut program_set)?;
        }
        program_set.vertex_program_mut().sort_atoms();
        program_set.fragment_program_mut().sort_atoms();

        tracing::debug!(
            "built cpu programs from {} features",
            self.entries.iter().filter(|e| e.active).count()
        );
        Ok((overrides, program_set))
    }

    pub fn set_program_set(&mut self, program_set: ProgramSet) {
        self.program_set = Some(program_set);
    }

    pub fn program_set(&self) -> Option<&ProgramSet> {
        self.program_set.as_ref()
    }

    /// Let every active feature write its uniform values into the pass
    pub fn update_gpu_programs_params(&self, pass: &mut Pass) {
        for entry in self.entries.iter().filter(|e| e.active) {
            entry.srs.update_gpu_programs_params(pass);
        }
    }
}

impl std::fmt::Debug for RenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderState")
            .field("sub_render_states", &self.sub_render_states())
            .field("has_program_set", &self.program_set.is_some())
            .finish()
    }
}
