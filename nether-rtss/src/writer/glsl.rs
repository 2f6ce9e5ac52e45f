//! GLSL and GLSL ES writer
//!
//! GLSL has no parameter semantics, so the entry point becomes `void main()`
//! and its parameters turn into globals:
//! - vertex inputs are attributes, renamed to the fixed attribute names the
//!   host binds vertex streams to (`vertex`, `normal`, `uv0`, ...);
//! - vertex outputs and fragment inputs are varyings, paired by name: a
//!   fragment input takes the name of the vertex output at its slot;
//! - the clip-space position (picked by content, not semantic) and the
//!   colour outputs map to `gl_Position`, `gl_FragColor` and `gl_FragData[n]`.
//!
//! Library routines are linked separately, so every routine the program
//! calls gets a forward declaration.

use std::fmt::Write;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};

use super::{ProgramWriter, array_suffix, write_atom, write_function_title, write_program_title};
use crate::RtssError;
use crate::ir::{
    Content, Direction, Function, FunctionAtom, GpuConstantType, OpMask, Operand,
    Parameter, ParameterPtr, Program, ProgramStage, Semantic, render_with_name, varying_name,
};
use crate::language;

/// Prefix of the writable copies of fragment inputs
const LOCAL_COPY_PREFIX: &str = "local_";
/// Texcoord sets with a fixed attribute name
const MAX_TEXCOORD_ATTRIBUTES: u8 = 8;

#[derive(Debug, Clone)]
pub struct GlslProgramWriter {
    language: &'static str,
    version: u32,
    /// Default float precision (GLSL ES only)
    precision: Option<String>,
}

impl GlslProgramWriter {
    pub fn glsl(version: u32) -> Self {
        Self {
            language: language::GLSL,
            version,
            precision: None,
        }
    }

    /// GLSL ES 1.00 with the given default float precision
    pub fn glsles(precision: &str) -> Self {
        Self {
            language: language::GLSLES,
            version: 100,
            precision: Some(precision.to_string()),
        }
    }

    fn is_es(&self) -> bool {
        self.precision.is_some()
    }

    fn unknown_type(&self, what: impl Into<String>) -> RtssError {
        RtssError::UnknownTypeMapping {
            language: self.language.to_string(),
            what: what.into(),
        }
    }

    fn type_name(&self, ty: GpuConstantType) -> Result<&'static str, RtssError> {
        let name = match ty {
            GpuConstantType::Float1 => "float",
            GpuConstantType::Float2 => "vec2",
            GpuConstantType::Float3 => "vec3",
            GpuConstantType::Float4 => "vec4",
            GpuConstantType::Sampler2D => "sampler2D",
            GpuConstantType::SamplerCube => "samplerCube",
            GpuConstantType::Matrix2x2 => "mat2",
            GpuConstantType::Matrix3x3 => "mat3",
            GpuConstantType::Matrix4x4 => "mat4",
            GpuConstantType::Int1 => "int",
            GpuConstantType::Int2 => "ivec2",
            GpuConstantType::Int3 => "ivec3",
            GpuConstantType::Int4 => "ivec4",
            // Desktop only
            other if self.is_es() => return Err(self.unknown_type(format!("{:?}", other))),
            GpuConstantType::Sampler1D => "sampler1D",
            GpuConstantType::Sampler3D => "sampler3D",
            GpuConstantType::Sampler1DShadow => "sampler1DShadow",
            GpuConstantType::Sampler2DShadow => "sampler2DShadow",
            GpuConstantType::Matrix2x3 => "mat2x3",
            GpuConstantType::Matrix2x4 => "mat2x4",
            GpuConstantType::Matrix3x2 => "mat3x2",
            GpuConstantType::Matrix3x4 => "mat3x4",
            GpuConstantType::Matrix4x2 => "mat4x2",
            GpuConstantType::Matrix4x3 => "mat4x3",
        };
        Ok(name)
    }

    /// Declared type of an operand: the mask width when masked
    fn operand_type(&self, operand: &Operand) -> Result<&'static str, RtssError> {
        if operand.mask() == OpMask::ALL {
            return self.type_name(operand.parameter().ty());
        }
        let ty = operand
            .mask()
            .to_constant_type()
            .ok_or_else(|| self.unknown_type(format!("operand mask {:#x}", operand.mask().bits())))?;
        self.type_name(ty)
    }

    fn attribute_keyword(&self) -> &'static str {
        if self.version >= 130 && !self.is_es() {
            "in"
        } else {
            "attribute"
        }
    }

    fn varying_keyword(&self, stage: ProgramStage) -> &'static str {
        match (self.version >= 130 && !self.is_es(), stage) {
            (true, ProgramStage::Vertex) => "out",
            (true, _) => "in",
            (false, _) => "varying",
        }
    }

    /// `void name(in vec4, out vec4);` for every distinct signature, in first-use order
    fn forward_declarations(&self, program: &Program) -> Result<Vec<String>, RtssError> {
        let mut seen = HashSet::new();
        let mut declarations = Vec::new();

        for function in program.functions() {
            for atom in function.atom_instances() {
                let FunctionAtom::Invocation(invocation) = atom else {
                    continue;
                };
                let mut args = Vec::new();
                for operand in invocation.operands() {
                    // Indices fold into the subscripted operand before them
                    if operand.indirection_level() > 0 {
                        continue;
                    }
                    args.push(format!(
                        "{} {}",
                        operand.semantic().keyword(),
                        self.operand_type(operand)?
                    ));
                }
                let declaration = format!("void {}({});", invocation.function_name(), args.join(", "));
                if seen.insert(declaration.clone()) {
                    declarations.push(declaration);
                }
            }
        }
        Ok(declarations)
    }
}

/// Fixed attribute name of a vertex input, by content
fn attribute_name(param: &Parameter) -> Option<String> {
    let name = match param.content() {
        Content::PositionObjectSpace => "vertex".to_string(),
        Content::NormalObjectSpace => "normal".to_string(),
        Content::TangentObjectSpace => "tangent".to_string(),
        Content::BinormalObjectSpace => "binormal".to_string(),
        Content::BlendWeights => "blendWeights".to_string(),
        Content::BlendIndices => "blendIndices".to_string(),
        Content::ColorDiffuse => "colour".to_string(),
        Content::ColorSpecular => "secondary_colour".to_string(),
        Content::TextureCoordinate(set) if set < MAX_TEXCOORD_ATTRIBUTES => format!("uv{}", set),
        _ => return None,
    };
    Some(name)
}

/// Swizzle selecting the logical width of a texcoord passed as a vec4
fn texcoord_swizzle(ty: GpuConstantType) -> &'static str {
    match ty.component_count() {
        Some(1) => ".x",
        Some(2) => ".xy",
        Some(3) => ".xyz",
        _ => ".xyzw",
    }
}

/// How the parameters of one entry point are spelled in the body
#[derive(Default)]
struct NameMap {
    renames: HashMap<String, String>,
    /// Texcoord attributes: declared vec4, read with their logical width
    widened: HashSet<String>,
}

impl NameMap {
    fn name<'p>(&'p self, param: &'p Parameter) -> &'p str {
        self.renames
            .get(param.name())
            .map(String::as_str)
            .unwrap_or(param.name())
    }

    fn render(&self, operand: &Operand) -> String {
        let param = operand.parameter();
        let mut text = render_with_name(self.name(param), operand.mask());
        if operand.mask() == OpMask::ALL && self.widened.contains(param.name()) {
            text.push_str(texcoord_swizzle(param.ty()));
        }
        // Array subscripts must be integers
        if operand.indirection_level() > 0 {
            text = format!("int({})", text);
        }
        text
    }
}

impl GlslProgramWriter {
    fn write_vertex_interface(
        &self,
        out: &mut String,
        function: &Function,
        names: &mut NameMap,
    ) -> Result<(), RtssError> {
        for input in function.input_parameters() {
            match attribute_name(input) {
                Some(attribute) => {
                    let widened = matches!(input.content(), Content::TextureCoordinate(_));
                    let ty = if widened { "vec4" } else { self.type_name(input.ty())? };
                    writeln!(out, "{} {} {};", self.attribute_keyword(), ty, attribute)?;
                    if widened {
                        names.widened.insert(input.name().to_string());
                    }
                    names.renames.insert(input.name().to_string(), attribute);
                }
                None => {
                    writeln!(
                        out,
                        "{} {} {};",
                        self.attribute_keyword(),
                        self.type_name(input.ty())?,
                        input.name()
                    )?;
                }
            }
        }

        for output in function.output_parameters() {
            if output.content() == Content::PositionProjectiveSpace {
                names
                    .renames
                    .insert(output.name().to_string(), "gl_Position".to_string());
                continue;
            }
            writeln!(
                out,
                "{} {} {}{};",
                self.varying_keyword(ProgramStage::Vertex),
                self.type_name(output.ty())?,
                output.name(),
                array_suffix(output)
            )?;
        }
        Ok(())
    }

    fn write_fragment_interface(
        &self,
        out: &mut String,
        function: &Function,
        names: &mut NameMap,
    ) -> Result<(), RtssError> {
        for input in function.input_parameters() {
            let varying = varying_name(Direction::Out, input.semantic(), input.index());
            writeln!(
                out,
                "{} {} {}{};",
                self.varying_keyword(ProgramStage::Fragment),
                self.type_name(input.ty())?,
                varying,
                array_suffix(input)
            )?;
            names.renames.insert(input.name().to_string(), varying);
        }

        // gl_FragColor and gl_FragData can not be mixed
        let multiple_targets = function
            .output_parameters()
            .iter()
            .any(|p| p.semantic() == Semantic::Color && p.index() > 0);
        for output in function.output_parameters() {
            if output.semantic() != Semantic::Color {
                return Err(RtssError::UnsupportedSemantic {
                    semantic: output.semantic(),
                });
            }
            let builtin = if multiple_targets {
                format!("gl_FragData[{}]", output.index())
            } else {
                "gl_FragColor".to_string()
            };
            names.renames.insert(output.name().to_string(), builtin);
        }
        Ok(())
    }

    /// Fragment inputs some statement writes to
    fn written_inputs(function: &Function) -> Vec<ParameterPtr> {
        function
            .input_parameters()
            .iter()
            .filter(|input| {
                function.atom_instances().iter().any(|atom| {
                    atom.operands()
                        .iter()
                        .any(|op| op.semantic().writes() && Rc::ptr_eq(op.parameter(), *input))
                })
            })
            .cloned()
            .collect()
    }

    fn write_entry_point(
        &self,
        out: &mut String,
        stage: ProgramStage,
        function: &Function,
    ) -> Result<(), RtssError> {
        let mut names = NameMap::default();
        match stage {
            ProgramStage::Vertex => self.write_vertex_interface(out, function, &mut names)?,
            ProgramStage::Fragment => self.write_fragment_interface(out, function, &mut names)?,
            ProgramStage::Geometry => {
                return Err(RtssError::UnsupportedStage {
                    language: self.language.to_string(),
                    stage,
                });
            }
        }
        writeln!(out)?;

        write_function_title(out, function)?;
        writeln!(out, "void main()")?;
        writeln!(out, "{{")?;

        for local in function.local_parameters() {
            writeln!(out, "\t{} {}{};", self.type_name(local.ty())?, local.name(), array_suffix(local))?;
        }

        // Varyings are read-only in the fragment stage
        if stage == ProgramStage::Fragment {
            for input in Self::written_inputs(function) {
                let varying = names.name(&input).to_string();
                let copy = format!("{}{}", LOCAL_COPY_PREFIX, varying);
                writeln!(out, "\t{} {} = {};", self.type_name(input.ty())?, copy, varying)?;
                names.renames.insert(input.name().to_string(), copy);
            }
        }
        writeln!(out)?;

        for atom in function.atom_instances() {
            write_atom(out, atom, |op: &Operand| Ok(names.render(op)))?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
        Ok(())
    }

    /// Non-entry helper functions keep their parameter lists
    fn write_helper(&self, out: &mut String, function: &Function) -> Result<(), RtssError> {
        write_function_title(out, function)?;
        let mut params = Vec::new();
        for input in function.input_parameters() {
            params.push(format!("in {} {}", self.type_name(input.ty())?, input.name()));
        }
        for output in function.output_parameters() {
            params.push(format!("out {} {}", self.type_name(output.ty())?, output.name()));
        }
        writeln!(out, "void {}({})", function.name(), params.join(", "))?;
        writeln!(out, "{{")?;
        for local in function.local_parameters() {
            writeln!(out, "\t{} {}{};", self.type_name(local.ty())?, local.name(), array_suffix(local))?;
        }
        let names = NameMap::default();
        for atom in function.atom_instances() {
            write_atom(out, atom, |op: &Operand| Ok(names.render(op)))?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
        Ok(())
    }
}

impl ProgramWriter for GlslProgramWriter {
    fn target_language(&self) -> &'static str {
        self.language
    }

    fn write_source_code(&self, out: &mut String, program: &Program) -> Result<(), RtssError> {
        if program.stage() == ProgramStage::Geometry {
            return Err(RtssError::UnsupportedStage {
                language: self.language.to_string(),
                stage: program.stage(),
            });
        }

        write_program_title(out, program, self.language)?;
        writeln!(out, "#version {}", self.version)?;
        if let Some(precision) = &self.precision {
            writeln!(out, "precision {} float;", precision)?;
        }
        writeln!(out)?;

        let declarations = self.forward_declarations(program)?;
        if !declarations.is_empty() {
            writeln!(out, "// Forward declarations")?;
            for declaration in &declarations {
                writeln!(out, "{}", declaration)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "// Global uniforms")?;
        for param in program.parameters() {
            writeln!(
                out,
                "uniform {} {}{};",
                self.type_name(param.ty())?,
                param.name(),
                array_suffix(param)
            )?;
        }
        writeln!(out)?;

        for function in program.functions() {
            if program.is_entry_point(function) {
                self.write_entry_point(out, program.stage(), function)?;
            } else {
                self.write_helper(out, function)?;
            }
        }
        Ok(())
    }
}
