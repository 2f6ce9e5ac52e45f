//! Per-language source writers
//!
//! A writer serializes one CPU [`Program`] to shader source: header comment,
//! library includes, uniforms, then every function with its parameters,
//! locals and sorted statements.

mod cg;
mod glsl;

pub use cg::CgProgramWriter;
pub use glsl::GlslProgramWriter;

use std::fmt::Write;

use crate::RtssError;
use crate::config::RtssConfig;
use crate::ir::{Function, FunctionAtom, Operand, Parameter, Program};
use crate::language;

pub trait ProgramWriter {
    fn target_language(&self) -> &'static str;

    /// Append the source of `program` to `out`
    fn write_source_code(&self, out: &mut String, program: &Program) -> Result<(), RtssError>;
}

/// Writer for a target language, `None` when the language is unknown
pub fn create_program_writer(
    target_language: &str,
    config: &RtssConfig,
) -> Option<Box<dyn ProgramWriter>> {
    match target_language {
        language::CG => Some(Box::new(CgProgramWriter::cg())),
        language::HLSL => Some(Box::new(CgProgramWriter::hlsl(config.hlsl.shader_model_4))),
        language::GLSL => Some(Box::new(GlslProgramWriter::glsl(config.glsl.version))),
        language::GLSLES => Some(Box::new(GlslProgramWriter::glsles(&config.glsles.precision))),
        _ => None,
    }
}

const RULE: &str = "//-----------------------------------------------------------------------------";

fn write_program_title(out: &mut String, program: &Program, language: &str) -> Result<(), RtssError> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "// Program Type: {}", program.stage().description())?;
    writeln!(out, "// Language: {}", language)?;
    writeln!(out, "// Created by nether-rtss. DO NOT MODIFY")?;
    writeln!(out, "{}", RULE)?;
    Ok(())
}

fn write_function_title(out: &mut String, function: &Function) -> Result<(), RtssError> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "//                         FUNCTION NAME: {}", function.name())?;
    writeln!(out, "//                         FUNCTION DESC: {}", function.description())?;
    writeln!(out, "{}", RULE)?;
    Ok(())
}

/// Render an operand list, turning indirection levels into subscripts.
///
/// An operand whose successor has a deeper indirection level opens `[`; the
/// indexed operands follow and the brackets close when the level drops back,
/// so `(bones, idx@1, pos)` renders as `bones[idx], pos`.
fn render_operands<'a, I, F>(operands: I, render: F) -> Result<String, RtssError>
where
    I: IntoIterator<Item = &'a Operand>,
    F: Fn(&Operand) -> Result<String, RtssError>,
{
    let mut text = String::new();
    let mut current_level = 0u16;
    let mut iter = operands.into_iter().peekable();

    while let Some(operand) = iter.next() {
        text.push_str(&render(operand)?);
        let next_level = iter.peek().map_or(0, |next| next.indirection_level());

        if current_level < next_level {
            while current_level < next_level {
                current_level += 1;
                text.push('[');
            }
        } else {
            while current_level > next_level {
                current_level -= 1;
                text.push(']');
            }
            if next_level != 0 {
                text.push_str("][");
            } else if iter.peek().is_some() {
                text.push_str(", ");
            }
        }
    }
    Ok(text)
}

/// `\tname(op, ...);` or `\tdst = src;`
fn write_atom<F>(out: &mut String, atom: &FunctionAtom, render: F) -> Result<(), RtssError>
where
    F: Fn(&Operand) -> Result<String, RtssError>,
{
    match atom {
        FunctionAtom::Invocation(invocation) => {
            let operands = render_operands(invocation.operands(), &render)?;
            writeln!(out, "\t{}({});", invocation.function_name(), operands)?;
        }
        FunctionAtom::Assignment(assignment) => {
            writeln!(
                out,
                "\t{} = {};",
                render(assignment.destination())?,
                render(assignment.source())?
            )?;
        }
    }
    Ok(())
}

/// Array suffix of a declaration (`[n]`), empty for scalars
fn array_suffix(param: &Parameter) -> String {
    if param.is_array() {
        format!("[{}]", param.size())
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests;
