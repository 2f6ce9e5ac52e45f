//! End-to-end shader generation through the in-memory backend

use nether_rtss::host::{
    AddressingMode, FogMode, FogSettings, MemoryBackend, Pass, PassDescription, SkinningSettings,
    TextureType, TextureUnitDescription,
};
use nether_rtss::ir::ProgramStage;
use nether_rtss::srs::{
    RenderState, SubRenderStateContext, TextureAtlasSamplerFactory, create_sub_render_state,
};
use nether_rtss::{ProgramManager, RtssConfig, RtssError, language};

const TERRAIN_ATLAS: &str = "\
# original, atlas, index, type, u, v, w, width, height
rock.png, terrain.png, 0, 2D, 0.0, 0.0, 0.0, 0.5, 0.5
grass.png, terrain.png, 0, 2D, 0.5, 0.0, 0.0, 0.5, 0.5
";

fn textured_pass(texture_name: &str) -> PassDescription {
    PassDescription {
        texture_units: vec![TextureUnitDescription {
            name: "diffuse".to_string(),
            texture_name: texture_name.to_string(),
            texture_type: TextureType::Tex2D,
            addressing_mode: AddressingMode::Wrap,
            tex_coord_set: 0,
        }],
        ..Default::default()
    }
}

fn render_state(config: &RtssConfig, extra: &[&str], atlas: Option<&TextureAtlasSamplerFactory>) -> RenderState {
    let ctx = SubRenderStateContext {
        config,
        atlas_factory: atlas,
    };
    let mut state = RenderState::with_defaults(ctx);
    for type_name in extra {
        let srs = create_sub_render_state(type_name, ctx).unwrap();
        state.add_template_sub_render_state(srs);
    }
    state
}

fn sources(pass: &Pass, backend: &MemoryBackend) -> (String, String) {
    let source = |stage| {
        let name = &pass.program(stage).unwrap().name;
        backend.program(name).unwrap().source.clone()
    };
    (source(ProgramStage::Vertex), source(ProgramStage::Fragment))
}

#[test]
fn test_cg_textured_fog_pipeline() {
    let config = RtssConfig::default();
    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &[], None);
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(PassDescription {
        scene_fog: FogSettings {
            mode: FogMode::Linear,
            start: 10.0,
            end: 100.0,
            ..Default::default()
        },
        ..textured_pass("rock.png")
    });

    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();
    assert_eq!(
        state.active_sub_render_states(),
        ["FFP_Transform", "FFP_Color", "FFP_Texturing", "FFP_Fog"]
    );

    let (vs, fs) = sources(&pass, &backend);
    assert!(vs.contains("// Language: cg"));
    assert!(vs.contains("#include \"FFPLib_Transform.cg\""));
    assert!(vs.contains("\tin float4 iPosition_0 : POSITION"));
    assert_eq!(vs.matches("\tFFP_Transform(").count(), 1);

    assert!(fs.contains("#include \"FFPLib_Texturing.cg\""));
    assert!(fs.contains("#include \"FFPLib_Fog.cg\""));
    assert!(fs.contains("uniform\tsampler2D\tgTextureSampler0 : register(s0);"));
    assert!(fs.contains("FFP_SampleTexture(gTextureSampler0"));
    assert!(fs.contains("\tFFP_Lerp("));
    // Sampling precedes modulation precedes fog
    let sample = fs.find("FFP_SampleTexture(").unwrap();
    let modulate = fs.find("FFP_Modulate(").unwrap();
    let lerp = fs.find("FFP_Lerp(").unwrap();
    assert!(sample < modulate && modulate < lerp);
}

#[test]
fn test_skinned_pipeline_replaces_transform() {
    let config = RtssConfig::default();
    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &["SGX_HardwareSkinning"], None);
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(PassDescription {
        skinning: Some(SkinningSettings {
            bone_count: 24,
            weight_count: 2,
        }),
        ..Default::default()
    });

    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();
    assert!(!state.sub_render_states().contains(&"FFP_Transform"));

    let (vs, _) = sources(&pass, &backend);
    assert!(vs.contains("uniform\tfloat3x4\tworld_matrix_array_3x4[24];"));
    assert!(vs.contains("\tin float4 iBlendIndices_0 : BLENDINDICES"));
    assert!(vs.contains("FFP_Transform(world_matrix_array_3x4[iBlendIndices_0.x], iPosition_0, TempVal4.xyz);"));
    assert!(vs.contains("FFP_Transform(world_matrix_array_3x4[iBlendIndices_0.y], iPosition_0, TempVal4.xyz);"));
    assert!(!vs.contains("iBlendIndices_0.z"));
}

#[test]
fn test_glsl_skinned_pipeline() {
    let config = RtssConfig::from_toml_str(
        r#"
        target_language = "glsl"

        [glsl]
        version = 150
        "#,
    )
    .unwrap();
    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &["SGX_HardwareSkinning"], None);
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(PassDescription {
        skinning: Some(SkinningSettings {
            bone_count: 16,
            weight_count: 1,
        }),
        ..Default::default()
    });

    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();

    let (vs, fs) = sources(&pass, &backend);
    assert!(vs.contains("#version 150"));
    assert!(vs.contains("in vec4 vertex;"));
    assert!(vs.contains("in vec4 blendIndices;"));
    assert!(vs.contains("uniform mat3x4 world_matrix_array_3x4[16];"));
    assert!(vs.contains("world_matrix_array_3x4[int(blendIndices.x)]"));
    assert!(vs.contains("gl_Position);"));
    assert!(fs.contains("gl_FragColor"));

    let vs_program = backend
        .program(&pass.program(ProgramStage::Vertex).unwrap().name)
        .unwrap();
    assert_eq!(vs_program.language, "glsl");
    assert!(vs_program.libraries.iter().any(|lib| lib == "FFPLib_Transform"));
}

#[test]
fn test_atlas_pipeline_uploads_tables() {
    let config = RtssConfig::default();
    let mut factory = TextureAtlasSamplerFactory::new();
    assert_eq!(factory.add_texture_atlas_definition(TERRAIN_ATLAS), 2);

    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &["SGX_TextureAtlasSampler"], Some(&factory));
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(textured_pass("terrain.png"));

    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();

    let (vs, fs) = sources(&pass, &backend);
    assert!(vs.contains("uniform\tfloat4\tatlasTable0[2];"));
    assert!(fs.contains("#include \"SGXLib_TextureAtlas.cg\""));
    assert!(fs.contains("SGX_Atlas_Wrap("));
    assert!(fs.contains("SGX_Atlas_Map("));
    assert!(fs.contains("FFP_SampleTexture(gTextureSampler0, atlasCoord_0"));

    let table = pass
        .program(ProgramStage::Vertex)
        .unwrap()
        .parameters
        .named_float_constants("atlasTable0")
        .unwrap();
    assert_eq!(table, [0.0, 0.0, 0.5, 0.5, 0.5, 0.0, 0.5, 0.5]);
}

#[test]
fn test_atlas_without_table_is_vetoed() {
    let config = RtssConfig::default();
    let factory = TextureAtlasSamplerFactory::new();
    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &["SGX_TextureAtlasSampler"], Some(&factory));
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(textured_pass("rock.png"));

    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();

    assert!(!state.active_sub_render_states().contains(&"SGX_TextureAtlasSampler"));
    let (_, fs) = sources(&pass, &backend);
    assert!(fs.contains("FFP_SampleTexture(gTextureSampler0, iTexcoord_0"));
    assert!(!fs.contains("SGX_Atlas"));
}

#[test]
fn test_shared_programs_across_materials() {
    let config = RtssConfig::default();
    let mut manager = ProgramManager::new(config.clone());
    let mut backend = MemoryBackend::new();

    let mut passes: Vec<Pass> = (0..4)
        .map(|_| Pass::new(textured_pass("rock.png")))
        .collect();
    for pass in &mut passes {
        manager
            .acquire_programs(pass, &mut render_state(&config, &[], None), &mut backend)
            .unwrap();
    }
    assert_eq!(backend.compile_count(), 2);
    assert_eq!(manager.cache().len(), 2);

    for pass in &mut passes[1..] {
        manager.release_programs(pass, &mut backend);
    }
    assert_eq!(backend.program_count(), 2);
    manager.release_programs(&mut passes[0], &mut backend);
    assert_eq!(backend.program_count(), 0);
}

#[test]
fn test_compile_failure_leaves_pass_untouched() {
    let config = RtssConfig::default();
    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &[], None);
    let mut backend = MemoryBackend::new();
    backend.set_failure_hook(|desc| desc.source.contains("FFP_SampleTexture").then(|| "bad sampler".to_string()));
    let mut pass = Pass::new(textured_pass("rock.png"));

    let err = manager
        .acquire_programs(&mut pass, &mut state, &mut backend)
        .unwrap_err();
    assert!(matches!(err, RtssError::BackendCompileFailure { ref log, .. } if log == "bad sampler"));
    assert!(!pass.has_programs());
    assert_eq!(pass.fog_override(), None);
    assert_eq!(backend.program_count(), 0);

    backend.clear_failure_hook();
    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();
    assert!(pass.has_programs());
}

#[test]
fn test_hlsl_shader_model_4_pipeline() {
    let mut config = RtssConfig::default();
    config.target_language = language::HLSL.to_string();
    config.hlsl.shader_model_4 = true;
    let mut manager = ProgramManager::new(config.clone());
    let mut state = render_state(&config, &[], None);
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(textured_pass("rock.png"));

    manager.acquire_programs(&mut pass, &mut state, &mut backend).unwrap();

    let (vs, fs) = sources(&pass, &backend);
    assert!(vs.contains("#include \"FFPLib_Transform.hlsl\""));
    assert!(vs.contains("\tout float4 oPosition_0 : SV_Position"));
    // The fragment stage receives every vertex output, in vertex order
    let position = fs.find("iPosition_0 : SV_Position").unwrap();
    let color = fs.find("iColor_0 : COLOR").unwrap();
    let texcoord = fs.find("iTexcoord_0 : TEXCOORD0").unwrap();
    assert!(position < color && color < texcoord);
    assert!(fs.contains("oColor_0 : SV_Target0"));
}
