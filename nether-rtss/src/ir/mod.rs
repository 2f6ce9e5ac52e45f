//! Intermediate shader representation
//!
//! Parameters and operands, statements (atoms), functions, programs and
//! program sets. Features populate this model; processors normalize it and
//! writers serialize it to source text.

mod atom;
mod auto_constant;
pub mod factory;
mod function;
mod operand;
mod parameter;
mod program;
mod types;

pub use atom::{AssignmentAtom, FunctionAtom, FunctionInvocation, UNSET_EXECUTION_ORDER};
pub use auto_constant::{AutoConstantData, AutoConstantType};
pub use factory::{Direction, ParameterFactory, varying_name};
pub use function::{Function, parameter_by_content, parameter_by_name, parameter_by_semantic};
pub use operand::{OpMask, OpSemantic, Operand, render_with_name};
pub use parameter::{Parameter, ParameterClass, ParameterPtr, UniformData};
pub use program::{ENTRY_POINT_NAME, Program, ProgramSet};
pub use types::{Content, FunctionKind, GpuConstantType, GpuParamVariability, ProgramStage, Semantic};
