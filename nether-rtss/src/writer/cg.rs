//! Cg and HLSL writer

use std::fmt::Write;

use super::{ProgramWriter, array_suffix, write_atom, write_function_title, write_program_title};
use crate::RtssError;
use crate::ir::{Function, GpuConstantType, Operand, Parameter, Program, ProgramStage, Semantic};
use crate::language;

/// Writes Cg, or HLSL when built with [`CgProgramWriter::hlsl`].
///
/// Parameters carry explicit semantics (`: POSITION`, `: TEXCOORD2`) and
/// samplers an explicit `register(sN)` binding.
#[derive(Debug, Clone)]
pub struct CgProgramWriter {
    language: &'static str,
    include_extension: &'static str,
    shader_model_4: bool,
}

impl CgProgramWriter {
    pub fn cg() -> Self {
        Self {
            language: language::CG,
            include_extension: "cg",
            shader_model_4: false,
        }
    }

    /// HLSL; shader model 4 switches to `SV_Position` / `SV_Target{n}`
    pub fn hlsl(shader_model_4: bool) -> Self {
        Self {
            language: language::HLSL,
            include_extension: "hlsl",
            shader_model_4,
        }
    }

    fn type_name(&self, ty: GpuConstantType) -> &'static str {
        match ty {
            GpuConstantType::Float1 => "float",
            GpuConstantType::Float2 => "float2",
            GpuConstantType::Float3 => "float3",
            GpuConstantType::Float4 => "float4",
            GpuConstantType::Sampler1D | GpuConstantType::Sampler1DShadow => "sampler1D",
            GpuConstantType::Sampler2D | GpuConstantType::Sampler2DShadow => "sampler2D",
            GpuConstantType::Sampler3D => "sampler3D",
            GpuConstantType::SamplerCube => "samplerCUBE",
            GpuConstantType::Matrix2x2 => "float2x2",
            GpuConstantType::Matrix2x3 => "float2x3",
            GpuConstantType::Matrix2x4 => "float2x4",
            GpuConstantType::Matrix3x2 => "float3x2",
            GpuConstantType::Matrix3x3 => "float3x3",
            GpuConstantType::Matrix3x4 => "float3x4",
            GpuConstantType::Matrix4x2 => "float4x2",
            GpuConstantType::Matrix4x3 => "float4x3",
            GpuConstantType::Matrix4x4 => "float4x4",
            GpuConstantType::Int1 => "int",
            GpuConstantType::Int2 => "int2",
            GpuConstantType::Int3 => "int3",
            GpuConstantType::Int4 => "int4",
        }
    }

    /// Semantic annotation of a function parameter, `None` when it has no semantic
    fn semantic_annotation(
        &self,
        param: &Parameter,
        stage: ProgramStage,
        is_output: bool,
    ) -> Option<String> {
        let index = param.index();
        let annotation = match param.semantic() {
            Semantic::Unknown => return None,
            Semantic::Position => {
                let vertex_input = stage == ProgramStage::Vertex && !is_output;
                if self.shader_model_4 && !vertex_input {
                    "SV_Position".to_string()
                } else {
                    "POSITION".to_string()
                }
            }
            Semantic::BlendWeights => "BLENDWEIGHT".to_string(),
            Semantic::BlendIndices => "BLENDINDICES".to_string(),
            Semantic::Normal => "NORMAL".to_string(),
            Semantic::Tangent => "TANGENT".to_string(),
            Semantic::Binormal => format!("BINORMAL{}", index),
            Semantic::TextureCoordinates => format!("TEXCOORD{}", index),
            Semantic::Color => {
                if self.shader_model_4 && stage == ProgramStage::Fragment && is_output {
                    format!("SV_Target{}", index)
                } else if index == 0 {
                    "COLOR".to_string()
                } else {
                    format!("COLOR{}", index)
                }
            }
        };
        Some(annotation)
    }

    fn write_uniforms(&self, out: &mut String, program: &Program) -> Result<(), RtssError> {
        writeln!(out, "// Global uniforms")?;
        for param in program.parameters() {
            write!(
                out,
                "uniform\t{}\t{}{}",
                self.type_name(param.ty()),
                param.name(),
                array_suffix(param)
            )?;
            if param.ty().is_sampler() {
                write!(out, " : register(s{})", param.index())?;
            }
            writeln!(out, ";")?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_function(
        &self,
        out: &mut String,
        stage: ProgramStage,
        function: &Function,
    ) -> Result<(), RtssError> {
        write_function_title(out, function)?;
        writeln!(out, "void {}", function.name())?;
        writeln!(out, "(")?;

        let inputs = function.input_parameters().iter().map(|p| (p, false));
        let outputs = function.output_parameters().iter().map(|p| (p, true));
        let declarations: Vec<String> = inputs
            .chain(outputs)
            .map(|(param, is_output)| {
                let mut decl = format!(
                    "\t{} {} {}{}",
                    if is_output { "out" } else { "in" },
                    self.type_name(param.ty()),
                    param.name(),
                    array_suffix(param)
                );
                if let Some(semantic) = self.semantic_annotation(param, stage, is_output) {
                    decl.push_str(" : ");
                    decl.push_str(&semantic);
                }
                decl
            })
            .collect();
        if !declarations.is_empty() {
            writeln!(out, "{}", declarations.join(",\n"))?;
        }
        writeln!(out, ")")?;
        writeln!(out, "{{")?;

        for local in function.local_parameters() {
            writeln!(out, "\t{} {}{};", self.type_name(local.ty()), local.name(), array_suffix(local))?;
        }
        if !function.local_parameters().is_empty() {
            writeln!(out)?;
        }

        for atom in function.atom_instances() {
            write_atom(out, atom, |op: &Operand| Ok(op.to_source()))?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
        Ok(())
    }
}

impl ProgramWriter for CgProgramWriter {
    fn target_language(&self) -> &'static str {
        self.language
    }

    fn write_source_code(&self, out: &mut String, program: &Program) -> Result<(), RtssError> {
        write_program_title(out, program, self.language)?;
        writeln!(out)?;

        if !program.dependencies().is_empty() {
            writeln!(out, "// Dependencies")?;
            for dependency in program.dependencies() {
                writeln!(out, "#include \"{}.{}\"", dependency, self.include_extension)?;
            }
            writeln!(out)?;
        }

        self.write_uniforms(out, program)?;

        for function in program.functions() {
            self.write_function(out, program.stage(), function)?;
        }
        Ok(())
    }
}
