use super::*;
use crate::host::{GpuProgramDesc, MemoryBackend};
use crate::ir::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, GpuParamVariability, OpSemantic,
    Semantic,
};

fn output_names(program_set: &ProgramSet) -> Vec<String> {
    program_set
        .vertex_program()
        .entry_point_function()
        .unwrap()
        .output_parameters()
        .iter()
        .map(|p| p.name().to_string())
        .collect()
}

fn input_names(program_set: &ProgramSet) -> Vec<String> {
    program_set
        .fragment_program()
        .entry_point_function()
        .unwrap()
        .input_parameters()
        .iter()
        .map(|p| p.name().to_string())
        .collect()
}

/// Vertex outputs {Position, Color0, TexCoord0}; fragment inputs {Color0, TexCoord0}
fn interface_program_set(read_texcoord: bool) -> ProgramSet {
    let mut set = ProgramSet::new();
    let (vs, ps) = set.programs_mut();
    let vs_main = vs.entry_point_function_mut().unwrap();
    for (semantic, content, ty) in [
        (Semantic::Position, Content::PositionProjectiveSpace, GpuConstantType::Float4),
        (Semantic::Color, Content::ColorDiffuse, GpuConstantType::Float4),
        (Semantic::TextureCoordinates, Content::TextureCoordinate(0), GpuConstantType::Float2),
    ] {
        vs_main.resolve_output_parameter(semantic, 0, content, ty).unwrap();
    }

    let ps_main = ps.entry_point_function_mut().unwrap();
    let color = ps_main
        .resolve_input_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();
    let texcoord = ps_main
        .resolve_input_parameter(
            Semantic::TextureCoordinates,
            0,
            Content::TextureCoordinate(0),
            GpuConstantType::Float2,
        )
        .unwrap();
    let out = ps_main
        .resolve_output_parameter(Semantic::Color, 0, Content::ColorDiffuse, GpuConstantType::Float4)
        .unwrap();

    let mut assign = FunctionInvocation::new("FFP_Assign", 101, 0);
    assign.push_operand(&color, OpSemantic::In).unwrap();
    assign.push_operand(&out, OpSemantic::Out).unwrap();
    ps_main.add_atom_instance(assign).unwrap();

    if read_texcoord {
        let mut modulate = FunctionInvocation::new("FFP_Modulate", 200, 1);
        modulate.push_operand(&texcoord, OpSemantic::In).unwrap();
        modulate.push_operand(&out, OpSemantic::In).unwrap();
        modulate.push_operand(&out, OpSemantic::Out).unwrap();
        ps_main.add_atom_instance(modulate).unwrap();
    }
    set
}

// ============================================================================
// Interface compaction
// ============================================================================

#[test]
fn test_compaction_removes_unconsumed_output() {
    let mut set = interface_program_set(false);
    compact_vs_outputs(&mut set).unwrap();

    assert_eq!(output_names(&set), vec!["oPosition_0", "oColor_0"]);
    assert_eq!(input_names(&set), vec!["iColor_0"]);

    // The vertex statements writing it still have a target
    let vs_main = set.vertex_program().entry_point_function().unwrap();
    assert!(vs_main.local_parameters().iter().any(|p| p.name() == "oTexcoord_0"));
}

#[test]
fn test_compaction_keeps_consumed_outputs() {
    let mut set = interface_program_set(true);
    compact_vs_outputs(&mut set).unwrap();

    assert_eq!(output_names(&set), vec!["oPosition_0", "oColor_0", "oTexcoord_0"]);
    assert_eq!(input_names(&set), vec!["iColor_0", "iTexcoord_0"]);
}

#[test]
fn test_compaction_rejects_orphan_input() {
    let mut set = interface_program_set(true);
    let vs_main = set.vertex_program_mut().entry_point_function_mut().unwrap();
    let texcoord = vs_main.output_parameters()[2].clone();
    vs_main.delete_output_parameter(&texcoord);

    assert_eq!(
        compact_vs_outputs(&mut set).unwrap_err(),
        RtssError::UnresolvedVarying {
            parameter: "iTexcoord_0".to_string()
        }
    );
}

#[test]
fn test_synchronize_mirrors_vertex_outputs() {
    let mut set = interface_program_set(false);
    let ps_color = set.fragment_program().entry_point_function().unwrap().input_parameters()[0].clone();
    synchronize_pixel_inputs(&mut set).unwrap();

    assert_eq!(input_names(&set), vec!["iPosition_0", "iColor_0", "iTexcoord_0"]);
    let ps_main = set.fragment_program().entry_point_function().unwrap();
    // Matching inputs keep their instance
    assert!(Rc::ptr_eq(&ps_main.input_parameters()[1], &ps_color));
}

// ============================================================================
// Binding
// ============================================================================

fn compile_all(set: &mut ProgramSet, backend: &mut MemoryBackend) {
    let mut handles = Vec::new();
    for (stage, name) in [(ProgramStage::Vertex, "t_VS"), (ProgramStage::Fragment, "t_FS")] {
        let program = set.cpu_program(stage).unwrap();
        let handle = backend
            .compile(&GpuProgramDesc {
                name,
                language: "glsl",
                stage,
                entry_point: "main",
                source: "",
                uniforms: program.parameters(),
            })
            .unwrap();
        handles.push(handle);
    }
    let fragment = handles.pop().unwrap();
    let vertex = handles.pop().unwrap();
    set.set_gpu_programs(vertex, fragment);
}

fn binding_program_set() -> ProgramSet {
    let mut set = ProgramSet::new();
    let (vs, ps) = set.programs_mut();
    vs.resolve_auto_parameter_int(AutoConstantType::WorldViewProjMatrix, 0, 0)
        .unwrap();
    vs.resolve_named_parameter(GpuConstantType::Float4, "gFogParams", GpuParamVariability::GLOBAL, 0)
        .unwrap();
    ps.resolve_parameter(GpuConstantType::Sampler2D, 0, GpuParamVariability::GLOBAL, "gTextureSampler", 0)
        .unwrap();
    ps.resolve_parameter(GpuConstantType::Sampler2D, 3, GpuParamVariability::GLOBAL, "shadow_map", 0)
        .unwrap();
    ps.add_dependency("FFPLib_Common");
    set
}

#[test]
fn test_glsl_post_binds_samplers_and_libraries() {
    let mut set = binding_program_set();
    let mut backend = MemoryBackend::new();
    compile_all(&mut set, &mut backend);

    let mut processor = GlslProgramProcessor::new(language::GLSL);
    processor.post_create_gpu_programs(&set, &mut backend).unwrap();

    let vs = backend.program("t_VS").unwrap();
    assert_eq!(vs.parameters.auto_constants().len(), 1);

    let fs = backend.program("t_FS").unwrap();
    assert_eq!(fs.parameters.named_int("gTextureSampler0"), Some(0));
    assert_eq!(fs.parameters.named_int("shadow_map3"), Some(3));
    assert_eq!(fs.libraries, ["FFPLib_Common"]);
}

#[test]
fn test_cg_post_leaves_samplers_to_registers() {
    let mut set = binding_program_set();
    let mut backend = MemoryBackend::new();
    compile_all(&mut set, &mut backend);

    let mut processor = CgProgramProcessor::new(language::CG);
    processor.post_create_gpu_programs(&set, &mut backend).unwrap();

    let fs = backend.program("t_FS").unwrap();
    assert_eq!(fs.parameters.named_int("shadow_map3"), Some(0));
    assert!(fs.libraries.is_empty());
    assert_eq!(backend.program("t_VS").unwrap().parameters.auto_constants().len(), 1);
}

#[test]
fn test_post_requires_compiled_programs() {
    let set = binding_program_set();
    let mut backend = MemoryBackend::new();
    let mut processor = CgProgramProcessor::new(language::HLSL);
    assert_eq!(
        processor.post_create_gpu_programs(&set, &mut backend).unwrap_err(),
        RtssError::MissingProgramSet
    );
}

#[test]
fn test_processor_registry() {
    for language in [language::CG, language::HLSL, language::GLSL, language::GLSLES] {
        assert_eq!(create_program_processor(language).unwrap().target_language(), language);
    }
    assert!(create_program_processor("metal").is_none());
}
