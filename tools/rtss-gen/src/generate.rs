//! Generate command - material description to shader sources

use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::{Path, PathBuf};

use nether_rtss::host::{MemoryBackend, Pass};
use nether_rtss::ir::ProgramStage;
use nether_rtss::srs::{
    RenderState, SubRenderStateContext, TextureAtlasSamplerFactory, create_sub_render_state,
    sub_render_state_types,
};
use nether_rtss::{ProgramManager, RtssConfig, language};

use crate::material::Material;

/// Arguments for the generate command
#[derive(Args)]
pub struct GenerateArgs {
    /// Material description (TOML)
    pub material: PathBuf,

    /// Generator configuration (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target language, overriding the configuration
    #[arg(short, long)]
    pub language: Option<String>,

    /// Texture atlas definition, overriding the material's
    #[arg(long)]
    pub atlas: Option<PathBuf>,

    /// Directory to write the sources to (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Sources generated for one material
#[derive(Debug)]
pub struct GeneratedPrograms {
    pub language: String,
    pub vertex: GeneratedSource,
    pub fragment: GeneratedSource,
}

#[derive(Debug)]
pub struct GeneratedSource {
    /// Cache name (source hash + stage suffix)
    pub name: String,
    pub source: String,
}

/// Execute the generate command
pub fn execute(args: GenerateArgs) -> Result<()> {
    let material = Material::load(&args.material)?;
    let generated = generate(&args, &material)?;

    match &args.output {
        Some(dir) => {
            for path in write_sources(dir, &material.name, &generated)? {
                println!("Wrote {}", path.display());
            }
        }
        None => {
            print!("{}", generated.vertex.source);
            println!();
            print!("{}", generated.fragment.source);
        }
    }
    Ok(())
}

fn load_config(args: &GenerateArgs) -> Result<RtssConfig> {
    let mut config = match &args.config {
        Some(path) => RtssConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RtssConfig::default(),
    };
    if let Some(language) = &args.language {
        config.target_language = language.clone();
    }
    Ok(config)
}

fn load_atlas(path: Option<&Path>) -> Result<TextureAtlasSamplerFactory> {
    let mut factory = TextureAtlasSamplerFactory::new();
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read atlas definition {}", path.display()))?;
        let records = factory.add_texture_atlas_definition(&text);
        tracing::info!("Loaded {} atlas records from {}", records, path.display());
    }
    Ok(factory)
}

fn build_render_state(material: &Material, ctx: SubRenderStateContext<'_>) -> Result<RenderState> {
    if material.features.is_empty() {
        return Ok(RenderState::with_defaults(ctx));
    }

    let mut state = RenderState::new();
    for type_name in &material.features {
        let Some(srs) = create_sub_render_state(type_name, ctx) else {
            bail!(
                "Unknown feature '{}' (known: {})",
                type_name,
                sub_render_state_types().join(", ")
            );
        };
        state.add_template_sub_render_state(srs);
    }
    Ok(state)
}

/// Run the whole pipeline for one material against the in-memory backend
pub fn generate(args: &GenerateArgs, material: &Material) -> Result<GeneratedPrograms> {
    let config = load_config(args)?;
    let atlas_path = args.atlas.as_deref().or(material.atlas.as_deref());
    let factory = load_atlas(atlas_path)?;

    let ctx = SubRenderStateContext {
        config: &config,
        atlas_factory: Some(&factory),
    };
    let mut state = build_render_state(material, ctx)?;
    tracing::debug!("Features: {:?}", state.sub_render_states());

    let mut manager = ProgramManager::new(config.clone());
    let mut backend = MemoryBackend::new();
    let mut pass = Pass::new(material.pass.clone());
    manager
        .acquire_programs(&mut pass, &mut state, &mut backend)
        .with_context(|| format!("Failed to generate programs for '{}'", material.name))?;
    tracing::info!(
        "Generated {} programs with features {:?}",
        config.target_language,
        state.active_sub_render_states()
    );

    let source = |stage: ProgramStage| -> Result<GeneratedSource> {
        let name = pass
            .program(stage)
            .map(|program| program.name.clone())
            .context("Pass has no program attached")?;
        let compiled = backend
            .program(&name)
            .with_context(|| format!("Program {} missing from backend", name))?;
        Ok(GeneratedSource {
            name,
            source: compiled.source.clone(),
        })
    };

    Ok(GeneratedPrograms {
        language: config.target_language.clone(),
        vertex: source(ProgramStage::Vertex)?,
        fragment: source(ProgramStage::Fragment)?,
    })
}

fn file_extension(target_language: &str) -> &'static str {
    match target_language {
        language::HLSL => "hlsl",
        language::GLSL | language::GLSLES => "glsl",
        _ => "cg",
    }
}

/// Write `<name>_VS.<ext>` and `<name>_FS.<ext>` into `dir`
pub fn write_sources(dir: &Path, name: &str, generated: &GeneratedPrograms) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let extension = file_extension(&generated.language);
    let mut written = Vec::new();
    for (stage, program) in [
        (ProgramStage::Vertex, &generated.vertex),
        (ProgramStage::Fragment, &generated.fragment),
    ] {
        let path = dir.join(format!("{}{}.{}", name, stage.name_suffix(), extension));
        std::fs::write(&path, &program.source)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
