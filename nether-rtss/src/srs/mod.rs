//! Sub-render-states: composable feature generators
//!
//! Each feature contributes parameters, library dependencies and statements
//! to a shared [`ProgramSet`] through a three-phase protocol. Features run in
//! ascending [`SubRenderState::execution_order`]; each finishes all three
//! phases before the next one starts, which is what lets later features
//! reuse parameters resolved by earlier ones.

mod atlas;
mod color;
mod fog;
mod pssm;
mod render_state;
mod skinning;
mod texturing;
mod transform;

pub use atlas::{
    IndexPositionMode, TextureAtlasRecord, TextureAtlasSampler, TextureAtlasSamplerFactory,
    TextureAtlasTable, parse_texture_atlas_definition,
};
pub use color::{ColorStageFlags, FfpColor};
pub use fog::{FfpFog, derive_fog_params};
pub use pssm::{IntegratedPssm3, SHADOW_TEXTURE_COUNT};
pub use render_state::RenderState;
pub use skinning::LinearSkinning;
pub use texturing::FfpTexturing;
pub use transform::FfpTransform;

use crate::RtssError;
use crate::config::RtssConfig;
use crate::host::{Pass, PassDescription, PassOverrides};
use crate::ir::{ParameterPtr, ProgramSet};

/// Feature execution order (which feature runs its phases first)
pub mod ffp_stage {
    pub const PRE_PROCESS: i32 = 0;
    pub const TRANSFORM: i32 = 100;
    pub const COLOR: i32 = 200;
    pub const LIGHTING: i32 = 300;
    pub const TEXTURING: i32 = 400;
    pub const FOG: i32 = 500;
    pub const POST_PROCESS: i32 = 2000;
}

/// Statement group order inside the vertex entry point
pub mod vs_stage {
    pub const PRE_PROCESS: i32 = 0;
    pub const TRANSFORM: i32 = 100;
    pub const COLOR: i32 = 200;
    pub const LIGHTING: i32 = 300;
    pub const TEXTURING: i32 = 400;
    pub const FOG: i32 = 500;
    pub const POST_PROCESS: i32 = 2000;
}

/// Statement group order inside the fragment entry point
pub mod ps_stage {
    pub const PRE_PROCESS: i32 = 0;
    pub const COLOR_BEGIN: i32 = 100;
    pub const SAMPLING: i32 = 150;
    pub const TEXTURING: i32 = 200;
    pub const COLOR_END: i32 = 300;
    pub const FOG: i32 = 400;
    pub const POST_PROCESS: i32 = 500;
}

// Library sources features depend on
pub const FFP_LIB_COMMON: &str = "FFPLib_Common";
pub const FFP_LIB_TRANSFORM: &str = "FFPLib_Transform";
pub const FFP_LIB_FOG: &str = "FFPLib_Fog";
pub const FFP_LIB_TEXTURING: &str = "FFPLib_Texturing";
pub const SGX_LIB_INTEGRATED_PSSM: &str = "SGXLib_IntegratedPSSM";
pub const SGX_LIB_TEXTURE_ATLAS: &str = "SGXLib_TextureAtlas";

// Library routines shared by several features
pub const FFP_FUNC_TRANSFORM: &str = "FFP_Transform";
pub const FFP_FUNC_ASSIGN: &str = "FFP_Assign";
pub const FFP_FUNC_CONSTRUCT: &str = "FFP_Construct";
pub const FFP_FUNC_MODULATE: &str = "FFP_Modulate";
pub const FFP_FUNC_ADD: &str = "FFP_Add";
pub const FFP_FUNC_LERP: &str = "FFP_Lerp";
pub const FFP_FUNC_SAMPLE_TEXTURE: &str = "FFP_SampleTexture";

/// Texcoord sets a vertex can carry
pub const MAX_TEXCOORD_SETS: u32 = 8;

/// Validate a texcoord set against [`MAX_TEXCOORD_SETS`]
fn texcoord_set(set: u32) -> Result<u8, RtssError> {
    u8::try_from(set)
        .ok()
        .filter(|&narrow| u32::from(narrow) < MAX_TEXCOORD_SETS)
        .ok_or(RtssError::TexcoordSetOutOfRange {
            set,
            max: MAX_TEXCOORD_SETS,
        })
}

/// Feature-local internal order counter, restarted per emission call
#[derive(Debug, Default)]
pub struct InvocationCounter(i32);

impl InvocationCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next_order(&mut self) -> i32 {
        let order = self.0;
        self.0 += 1;
        order
    }
}

/// A composable feature generator
pub trait SubRenderState {
    /// Registered type name (`FFP_Fog`, `SGX_IntegratedPSSM3`, ...)
    fn type_name(&self) -> &'static str;

    /// Position in the feature chain; equal orders replace each other
    fn execution_order(&self) -> i32;

    /// Inspect the material and configure; false vetoes the feature
    fn pre_add_to_render_state(&mut self, _src: &PassDescription, _dst: &mut PassOverrides) -> bool {
        true
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError>;

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError>;

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError>;

    /// Run the three phases in order, stopping at the first failure
    fn create_cpu_sub_programs(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        tracing::debug!("{}: resolving parameters", self.type_name());
        self.resolve_parameters(program_set)?;
        self.resolve_dependencies(program_set)?;
        tracing::debug!("{}: adding invocations", self.type_name());
        self.add_function_invocations(program_set)
    }

    /// Write per-frame uniform values into the pass's bound parameter tables
    fn update_gpu_programs_params(&self, _pass: &mut Pass) {}
}

/// Shared inputs for building features by name
#[derive(Clone, Copy)]
pub struct SubRenderStateContext<'a> {
    pub config: &'a RtssConfig,
    pub atlas_factory: Option<&'a TextureAtlasSamplerFactory>,
}

/// Build a built-in feature from its type name
pub fn create_sub_render_state(
    type_name: &str,
    ctx: SubRenderStateContext<'_>,
) -> Option<Box<dyn SubRenderState>> {
    let srs: Box<dyn SubRenderState> = match type_name {
        transform::TYPE_NAME => Box::new(FfpTransform::new()),
        color::TYPE_NAME => Box::new(FfpColor::new()),
        fog::TYPE_NAME => Box::new(FfpFog::new(ctx.config.fog.per_pixel)),
        texturing::TYPE_NAME => Box::new(FfpTexturing::new()),
        skinning::TYPE_NAME => {
            Box::new(LinearSkinning::new(ctx.config.skinning.default_weight_count))
        }
        pssm::TYPE_NAME => Box::new(IntegratedPssm3::new()),
        atlas::TYPE_NAME => match ctx.atlas_factory {
            Some(factory) => Box::new(TextureAtlasSampler::new(factory)),
            None => Box::new(TextureAtlasSampler::new(&TextureAtlasSamplerFactory::new())),
        },
        _ => return None,
    };
    Some(srs)
}

/// Type names accepted by [`create_sub_render_state`]
pub fn sub_render_state_types() -> [&'static str; 7] {
    [
        transform::TYPE_NAME,
        color::TYPE_NAME,
        fog::TYPE_NAME,
        texturing::TYPE_NAME,
        skinning::TYPE_NAME,
        pssm::TYPE_NAME,
        atlas::TYPE_NAME,
    ]
}

/// Parameter resolved in an earlier phase, or a phase failure
fn resolved(
    slot: &Option<ParameterPtr>,
    feature: &str,
    phase: &'static str,
) -> Result<ParameterPtr, RtssError> {
    slot.clone().ok_or_else(|| RtssError::SubRenderStateFailed {
        name: feature.to_string(),
        phase,
    })
}
