//! Nether RTSS - Run-time shader system
//!
//! Generates vertex/fragment shader variants for a material pass from a set
//! of composable features, then compiles and binds them through a host
//! backend.
//!
//! # Architecture
//!
//! - [`ir`] - Shader IR: parameters, operands, statements, functions, programs
//! - [`srs`] - Features (sub-render-states) that populate the IR, and the
//!   [`RenderState`](srs::RenderState) chaining them
//! - [`processor`] - Per-language normalization before and binding after compile
//! - [`writer`] - Per-language source writers (Cg, HLSL, GLSL, GLSL ES)
//! - [`manager`] - [`ProgramManager`](manager::ProgramManager): the full
//!   pipeline plus the compiled program cache
//! - [`host`] - What the engine provides: pass snapshots, parameter tables,
//!   the compile backend

pub mod config;
mod error;
pub mod host;
pub mod ir;
pub mod manager;
pub mod processor;
pub mod srs;
pub mod writer;

pub use config::RtssConfig;
pub use error::RtssError;
pub use manager::ProgramManager;

/// Target language identifiers
pub mod language {
    pub const CG: &str = "cg";
    pub const HLSL: &str = "hlsl";
    pub const GLSL: &str = "glsl";
    pub const GLSLES: &str = "glsles";
}
