use super::*;
use crate::ir::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, GpuParamVariability, OpMask,
    OpSemantic, ProgramSet, ProgramStage, Semantic,
};

/// Vertex: transform position, pass texcoord 0 through.
/// Fragment: sample texture unit 0 into the colour output.
fn textured_program_set() -> ProgramSet {
    let mut set = ProgramSet::new();
    let (vs, ps) = set.programs_mut();

    vs.add_dependency("FFPLib_Transform");
    let wvp = vs
        .resolve_auto_parameter_int(AutoConstantType::WorldViewProjMatrix, 0, 0)
        .unwrap();
    let vs_main = vs.entry_point_function_mut().unwrap();
    let position = vs_main
        .resolve_input_parameter(Semantic::Position, 0, Content::PositionObjectSpace, GpuConstantType::Float4)
        .unwrap();
    let uv_in = vs_main
        .resolve_input_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    let projected = vs_main
        .resolve_output_parameter(
            Semantic::Position,
            0,
            Content::PositionProjectiveSpace,
            GpuConstantType::Float4,
        )
        .unwrap();
    let uv_out = vs_main
        .resolve_output_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();

    let mut transform = FunctionInvocation::new("FFP_Transform", 100, 0);
    transform.push_operand(&wvp, OpSemantic::In).unwrap();
    transform.push_operand(&position, OpSemantic::In).unwrap();
    transform.push_operand(&projected, OpSemantic::Out).unwrap();
    vs_main.add_atom_instance(transform).unwrap();

    let mut assign = FunctionInvocation::new("FFP_Assign", 200, 0);
    assign.push_operand(&uv_in, OpSemantic::In).unwrap();
    assign.push_operand(&uv_out, OpSemantic::Out).unwrap();
    vs_main.add_atom_instance(assign).unwrap();

    ps.add_dependency("FFPLib_Texturing");
    let sampler = ps
        .resolve_parameter(GpuConstantType::Sampler2D, 0, GpuParamVariability::GLOBAL, "gTextureSampler", 0)
        .unwrap();
    let ps_main = ps.entry_point_function_mut().unwrap();
    let uv = ps_main
        .resolve_input_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    let color = ps_main
        .resolve_output_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();

    let mut sample = FunctionInvocation::new("FFP_SampleTexture", 300, 0);
    sample.push_operand(&sampler, OpSemantic::In).unwrap();
    sample.push_operand(&uv, OpSemantic::In).unwrap();
    sample.push_operand(&color, OpSemantic::Out).unwrap();
    ps_main.add_atom_instance(sample).unwrap();

    set
}

fn write(writer: &dyn ProgramWriter, program: &Program) -> String {
    let mut out = String::new();
    writer.write_source_code(&mut out, program).unwrap();
    out
}

// ============================================================================
// Operand rendering
// ============================================================================

#[test]
fn test_render_operands_indirection() {
    let mut set = ProgramSet::new();
    let vs = set.vertex_program_mut();
    let bones = vs
        .resolve_auto_parameter_int(AutoConstantType::WorldMatrixArray3x4, 0, 24)
        .unwrap();
    let vs_main = vs.entry_point_function_mut().unwrap();
    let indices = vs_main
        .resolve_input_parameter(Semantic::BlendIndices, 0, Content::BlendIndices, GpuConstantType::Float4)
        .unwrap();
    let position = vs_main
        .resolve_input_parameter(Semantic::Position, 0, Content::PositionObjectSpace, GpuConstantType::Float4)
        .unwrap();

    let mut invocation = FunctionInvocation::new("FFP_Transform", 100, 0);
    invocation.push_operand(&bones, OpSemantic::In).unwrap();
    invocation
        .push_operand_masked(&indices, OpSemantic::In, OpMask::X, 1)
        .unwrap();
    invocation.push_operand(&position, OpSemantic::In).unwrap();

    let text = render_operands(invocation.operands(), |op: &Operand| Ok(op.to_source())).unwrap();
    assert_eq!(text, "world_matrix_array_3x4[iBlendIndices_0.x], iPosition_0");
}

#[test]
fn test_render_operands_plain_list() {
    let set = textured_program_set();
    let vs_main = set.vertex_program().entry_point_function().unwrap();
    let FunctionAtom::Invocation(transform) = &vs_main.atom_instances()[0] else {
        panic!("expected an invocation");
    };
    let text = render_operands(transform.operands(), |op: &Operand| Ok(op.to_source())).unwrap();
    assert_eq!(text, "worldviewproj_matrix, iPosition_0, oPosition_0");
}

// ============================================================================
// Cg / HLSL
// ============================================================================

#[test]
fn test_cg_vertex_program() {
    let set = textured_program_set();
    let source = write(&CgProgramWriter::cg(), set.vertex_program());

    assert!(source.contains("// Program Type: Vertex shader"));
    assert!(source.contains("// Language: cg"));
    assert!(source.contains("#include \"FFPLib_Transform.cg\""));
    assert!(source.contains("uniform\tfloat4x4\tworldviewproj_matrix;"));
    assert!(source.contains(
        "void main\n(\n\
         \tin float4 iPosition_0 : POSITION,\n\
         \tin float2 iTexcoord_0 : TEXCOORD0,\n\
         \tout float4 oPosition_0 : POSITION,\n\
         \tout float2 oTexcoord_0 : TEXCOORD0\n\
         )\n{\n"
    ));
    assert_eq!(
        source
            .matches("\tFFP_Transform(worldviewproj_matrix, iPosition_0, oPosition_0);")
            .count(),
        1
    );
    assert!(source.contains("\tFFP_Assign(iTexcoord_0, oTexcoord_0);"));
}

#[test]
fn test_cg_fragment_program() {
    let set = textured_program_set();
    let source = write(&CgProgramWriter::cg(), set.fragment_program());

    assert!(source.contains("// Program Type: Fragment shader"));
    assert!(source.contains("uniform\tsampler2D\tgTextureSampler0 : register(s0);"));
    assert!(source.contains("\tout float4 oColor_0 : COLOR\n"));
    assert!(source.contains("\tFFP_SampleTexture(gTextureSampler0, iTexcoord_0, oColor_0);"));
}

#[test]
fn test_cg_array_uniform() {
    let mut set = ProgramSet::new();
    set.vertex_program_mut()
        .resolve_auto_parameter_int(AutoConstantType::WorldMatrixArray3x4, 0, 24)
        .unwrap();
    let source = write(&CgProgramWriter::cg(), set.vertex_program());
    assert!(source.contains("uniform\tfloat3x4\tworld_matrix_array_3x4[24];"));
}

#[test]
fn test_hlsl_shader_model_4_semantics() {
    let set = textured_program_set();
    let writer = CgProgramWriter::hlsl(true);

    let vs = write(&writer, set.vertex_program());
    assert!(vs.contains("#include \"FFPLib_Transform.hlsl\""));
    // Vertex inputs keep the legacy semantic
    assert!(vs.contains("\tin float4 iPosition_0 : POSITION"));
    assert!(vs.contains("\tout float4 oPosition_0 : SV_Position"));

    let ps = write(&writer, set.fragment_program());
    assert!(ps.contains("\tout float4 oColor_0 : SV_Target0"));
}

#[test]
fn test_hlsl_legacy_semantics() {
    let set = textured_program_set();
    let ps = write(&CgProgramWriter::hlsl(false), set.fragment_program());
    assert!(ps.contains("// Language: hlsl"));
    assert!(ps.contains("\tout float4 oColor_0 : COLOR\n"));
}

// ============================================================================
// GLSL
// ============================================================================

#[test]
fn test_glsl_vertex_program() {
    let set = textured_program_set();
    let source = write(&GlslProgramWriter::glsl(120), set.vertex_program());

    assert!(source.contains("#version 120"));
    assert!(source.contains("attribute vec4 vertex;"));
    // Texcoord attributes are always vec4
    assert!(source.contains("attribute vec4 uv0;"));
    assert!(source.contains("varying vec2 oTexcoord_0;"));
    assert!(!source.contains("oPosition_0"));
    assert!(source.contains("uniform mat4 worldviewproj_matrix;"));
    assert!(source.contains("void FFP_Transform(in mat4, in vec4, out vec4);"));
    assert!(source.contains("void FFP_Assign(in vec2, out vec2);"));
    assert!(source.contains("void main()\n{"));
    assert!(source.contains("\tFFP_Transform(worldviewproj_matrix, vertex, gl_Position);"));
    assert!(source.contains("\tFFP_Assign(uv0.xy, oTexcoord_0);"));
}

#[test]
fn test_glsl_fragment_program() {
    let set = textured_program_set();
    let source = write(&GlslProgramWriter::glsl(120), set.fragment_program());

    // Fragment inputs take the name of the vertex output feeding them
    assert!(source.contains("varying vec2 oTexcoord_0;"));
    assert!(source.contains("uniform sampler2D gTextureSampler0;"));
    assert!(source.contains("\tFFP_SampleTexture(gTextureSampler0, oTexcoord_0, gl_FragColor);"));
    assert!(!source.contains("iTexcoord_0"));
}

#[test]
fn test_glsl_130_keywords() {
    let set = textured_program_set();
    let writer = GlslProgramWriter::glsl(150);

    let vs = write(&writer, set.vertex_program());
    assert!(vs.contains("in vec4 vertex;"));
    assert!(vs.contains("out vec2 oTexcoord_0;"));

    let ps = write(&writer, set.fragment_program());
    assert!(ps.contains("in vec2 oTexcoord_0;"));
}

#[test]
fn test_glsl_written_input_gets_local_copy() {
    let mut set = ProgramSet::new();
    let ps_main = set.fragment_program_mut().entry_point_function_mut().unwrap();
    let diffuse = ps_main
        .resolve_input_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    let out = ps_main
        .resolve_output_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();

    let mut saturate = FunctionInvocation::new("FFP_Saturate", 100, 0);
    saturate.push_operand(&diffuse, OpSemantic::InOut).unwrap();
    ps_main.add_atom_instance(saturate).unwrap();
    let mut assign = FunctionInvocation::new("FFP_Assign", 100, 1);
    assign.push_operand(&diffuse, OpSemantic::In).unwrap();
    assign.push_operand(&out, OpSemantic::Out).unwrap();
    ps_main.add_atom_instance(assign).unwrap();

    let source = write(&GlslProgramWriter::glsl(120), set.fragment_program());
    assert!(source.contains("varying vec4 oColor_0;"));
    assert!(source.contains("\tvec4 local_oColor_0 = oColor_0;"));
    assert!(source.contains("\tFFP_Saturate(local_oColor_0);"));
    assert!(source.contains("\tFFP_Assign(local_oColor_0, gl_FragColor);"));
    assert!(source.contains("void FFP_Saturate(inout vec4);"));
}

#[test]
fn test_glsl_clip_space_output_picked_by_content() {
    let mut set = ProgramSet::new();
    let vs_main = set.vertex_program_mut().entry_point_function_mut().unwrap();
    let position = vs_main
        .resolve_input_parameter(Semantic::Position, 0, Content::PositionObjectSpace, GpuConstantType::Float4)
        .unwrap();
    // Object-space position takes slot 0 ahead of the clip-space one
    let object = vs_main
        .resolve_output_parameter(Semantic::Position, 0, Content::PositionObjectSpace, GpuConstantType::Float4)
        .unwrap();
    let projected = vs_main
        .resolve_output_parameter(
            Semantic::Position,
            -1,
            Content::PositionProjectiveSpace,
            GpuConstantType::Float4,
        )
        .unwrap();
    assert_eq!(object.name(), "oPosition_0");
    assert_eq!(projected.name(), "oPosition_1");

    let mut forward = FunctionInvocation::new("FFP_Assign", 100, 0);
    forward.push_operand(&position, OpSemantic::In).unwrap();
    forward.push_operand(&object, OpSemantic::Out).unwrap();
    vs_main.add_atom_instance(forward).unwrap();
    let mut project = FunctionInvocation::new("FFP_Assign", 100, 1);
    project.push_operand(&position, OpSemantic::In).unwrap();
    project.push_operand(&projected, OpSemantic::Out).unwrap();
    vs_main.add_atom_instance(project).unwrap();

    let source = write(&GlslProgramWriter::glsl(120), set.vertex_program());
    assert!(source.contains("varying vec4 oPosition_0;"));
    assert!(source.contains("\tFFP_Assign(vertex, oPosition_0);"));
    assert!(source.contains("\tFFP_Assign(vertex, gl_Position);"));
    assert!(!source.contains("oPosition_1"));
}

#[test]
fn test_glsl_forward_declarations_are_unique() {
    let mut set = ProgramSet::new();
    let vs_main = set.vertex_program_mut().entry_point_function_mut().unwrap();
    let color = vs_main
        .resolve_input_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    let color_out = vs_main
        .resolve_output_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    let specular_out = vs_main
        .resolve_output_parameter(Semantic::Color, 1, Content::ColorSpecular, GpuConstantType::Float4)
        .unwrap();

    for (internal, target) in [(0, &color_out), (1, &specular_out)] {
        let mut assign = FunctionInvocation::new("FFP_Assign", 100, internal);
        assign.push_operand(&color, OpSemantic::In).unwrap();
        assign.push_operand(target, OpSemantic::Out).unwrap();
        vs_main.add_atom_instance(assign).unwrap();
    }
    let mut scalar = FunctionInvocation::new("FFP_Assign", 100, 2);
    scalar
        .push_operand_masked(&color, OpSemantic::In, OpMask::W, 0)
        .unwrap();
    scalar
        .push_operand_masked(&specular_out, OpSemantic::Out, OpMask::W, 0)
        .unwrap();
    vs_main.add_atom_instance(scalar).unwrap();

    let source = write(&GlslProgramWriter::glsl(120), set.vertex_program());
    assert_eq!(source.matches("void FFP_Assign(in vec4, out vec4);").count(), 1);
    assert_eq!(source.matches("void FFP_Assign(in float, out float);").count(), 1);
    assert!(source.contains("attribute vec4 colour;"));
    assert!(source.contains("\tFFP_Assign(colour.w, oColor_1.w);"));
}

#[test]
fn test_glsl_indirection_casts_index() {
    let mut set = ProgramSet::new();
    let vs = set.vertex_program_mut();
    let bones = vs
        .resolve_auto_parameter_int(AutoConstantType::WorldMatrixArray3x4, 0, 24)
        .unwrap();
    let vs_main = vs.entry_point_function_mut().unwrap();
    let indices = vs_main
        .resolve_input_parameter(Semantic::BlendIndices, 0, Content::BlendIndices, GpuConstantType::Float4)
        .unwrap();
    let position = vs_main
        .resolve_input_parameter(Semantic::Position, 0, Content::PositionObjectSpace, GpuConstantType::Float4)
        .unwrap();
    let local = vs_main
        .resolve_local_parameter(Semantic::Position, 0, "lPositionWorld", GpuConstantType::Float4)
        .unwrap();

    let mut invocation = FunctionInvocation::new("FFP_Transform", 100, 0);
    invocation.push_operand(&bones, OpSemantic::In).unwrap();
    invocation
        .push_operand_masked(&indices, OpSemantic::In, OpMask::X, 1)
        .unwrap();
    invocation.push_operand(&position, OpSemantic::In).unwrap();
    invocation.push_operand(&local, OpSemantic::Out).unwrap();
    vs_main.add_atom_instance(invocation).unwrap();

    let source = write(&GlslProgramWriter::glsl(120), set.vertex_program());
    assert!(source.contains("uniform mat3x4 world_matrix_array_3x4[24];"));
    assert!(source.contains("\tvec4 lPositionWorld;"));
    assert!(source.contains(
        "\tFFP_Transform(world_matrix_array_3x4[int(blendIndices.x)], vertex, lPositionWorld);"
    ));
    // The index folds into the array argument
    assert!(source.contains("void FFP_Transform(in mat3x4, in vec4, out vec4);"));
}

#[test]
fn test_glsl_multiple_render_targets() {
    let mut set = ProgramSet::new();
    let ps_main = set.fragment_program_mut().entry_point_function_mut().unwrap();
    let first = ps_main
        .resolve_output_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    let second = ps_main
        .resolve_output_parameter(Semantic::Color, 1, Content::ColorSpecular, GpuConstantType::Float4)
        .unwrap();
    let mut assign = FunctionInvocation::new("FFP_Assign", 100, 0);
    assign.push_operand(&first, OpSemantic::In).unwrap();
    assign.push_operand(&second, OpSemantic::Out).unwrap();
    ps_main.add_atom_instance(assign).unwrap();

    let source = write(&GlslProgramWriter::glsl(120), set.fragment_program());
    assert!(source.contains("\tFFP_Assign(gl_FragData[0], gl_FragData[1]);"));
    assert!(!source.contains("gl_FragColor"));
}

#[test]
fn test_glsles_header_and_type_limits() {
    let set = textured_program_set();
    let writer = GlslProgramWriter::glsles("mediump");
    let source = write(&writer, set.fragment_program());
    assert!(source.contains("#version 100\nprecision mediump float;\n"));
    assert_eq!(writer.target_language(), language::GLSLES);

    let mut set = ProgramSet::new();
    set.fragment_program_mut()
        .resolve_parameter(GpuConstantType::Sampler3D, 0, GpuParamVariability::GLOBAL, "gVolume", 0)
        .unwrap();
    let mut out = String::new();
    assert_eq!(
        writer.write_source_code(&mut out, set.fragment_program()).unwrap_err(),
        RtssError::UnknownTypeMapping {
            language: "glsles".to_string(),
            what: "Sampler3D".to_string(),
        }
    );

    // Desktop GLSL has it
    let source = write(&GlslProgramWriter::glsl(120), set.fragment_program());
    assert!(source.contains("uniform sampler3D gVolume0;"));
}

#[test]
fn test_glsl_rejects_geometry_stage() {
    let program = Program::new(ProgramStage::Geometry);
    let mut out = String::new();
    assert_eq!(
        GlslProgramWriter::glsl(150)
            .write_source_code(&mut out, &program)
            .unwrap_err(),
        RtssError::UnsupportedStage {
            language: "glsl".to_string(),
            stage: ProgramStage::Geometry,
        }
    );
    assert!(out.is_empty());
}

#[test]
fn test_writer_registry() {
    let config = RtssConfig::default();
    for language in [language::CG, language::HLSL, language::GLSL, language::GLSLES] {
        assert_eq!(
            create_program_writer(language, &config).unwrap().target_language(),
            language
        );
    }
    assert!(create_program_writer("metal", &config).is_none());
}
