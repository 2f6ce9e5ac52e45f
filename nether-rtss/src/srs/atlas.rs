//! Texture atlas sampling
//!
//! Textures packed into an atlas are sampled through a remapped texcoord.
//! The vertex stage looks up the sub-texture record by the per-vertex atlas
//! index; the fragment stage applies the unit's addressing mode inside the
//! sub-texture and rewrites the texturing feature's sample call.

use hashbrown::HashMap;

use super::texturing::SAMPLER_NAME;
use super::{
    FFP_FUNC_ASSIGN, FFP_FUNC_SAMPLE_TEXTURE, FFP_LIB_COMMON, InvocationCounter,
    SGX_LIB_TEXTURE_ATLAS, SubRenderState, ffp_stage, ps_stage, texcoord_set, vs_stage,
};
use crate::RtssError;
use crate::host::{AddressingMode, Pass, PassDescription, PassOverrides, TextureType};
use crate::ir::{
    AutoConstantType, Content, FunctionInvocation, GpuConstantType, GpuParamVariability, OpMask,
    OpSemantic, Operand, ParameterPtr, ProgramSet, ProgramStage, Semantic,
};

pub(super) const TYPE_NAME: &str = "SGX_TextureAtlasSampler";

const ATLAS_TABLE_NAME: &str = "atlasTable";
const FUNC_ATLAS_MAP: &str = "SGX_Atlas_Map";
const PHASE: &str = "add_function_invocations";
/// Fields per definition line
const RECORD_FIELD_COUNT: usize = 9;
/// Atlas lookups per vertex: one index component per texture unit
const MAX_ATLAS_UNITS: usize = 4;

/// One sub-texture inside an atlas
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAtlasRecord {
    pub original_texture_name: String,
    pub atlas_texture_name: String,
    pub pos_u: f32,
    pub pos_v: f32,
    pub width: f32,
    pub height: f32,
    pub index_in_atlas: usize,
}

pub type TextureAtlasTable = Vec<TextureAtlasRecord>;

/// Parse an atlas definition into tables keyed by atlas texture name.
///
/// Each record is `original, atlas, atlasIndex, atlasType, u, v, w, width,
/// height` separated by commas and/or tabs. Lines starting with `#` and lines
/// with fewer than nine fields are skipped; unparsable numbers read as 0.
pub fn parse_texture_atlas_definition(text: &str) -> HashMap<String, TextureAtlasTable> {
    let mut tables: HashMap<String, TextureAtlasTable> = HashMap::new();

    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split([',', '\t'])
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() < RECORD_FIELD_COUNT {
            continue;
        }

        let number = |i: usize| fields[i].parse::<f32>().unwrap_or(0.0);
        let table = tables.entry(fields[1].to_string()).or_default();
        table.push(TextureAtlasRecord {
            original_texture_name: fields[0].to_string(),
            atlas_texture_name: fields[1].to_string(),
            pos_u: number(4),
            pos_v: number(5),
            width: number(7),
            height: number(8),
            index_in_atlas: table.len(),
        });
    }
    tables
}

/// Where the per-vertex atlas index lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPositionMode {
    /// Texcoord set `offset` after the highest set the material uses
    Relative(u32),
    /// Fixed texcoord set
    Absolute(u32),
}

/// Registry of atlas tables handed to atlas sampler features
#[derive(Debug, Clone)]
pub struct TextureAtlasSamplerFactory {
    tables: HashMap<String, TextureAtlasTable>,
    index_position: IndexPositionMode,
}

impl TextureAtlasSamplerFactory {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            index_position: IndexPositionMode::Relative(1),
        }
    }

    /// Parse and register every table of a definition; returns records added
    pub fn add_texture_atlas_definition(&mut self, text: &str) -> usize {
        let parsed = parse_texture_atlas_definition(text);
        let mut added = 0;
        for (atlas_name, table) in parsed {
            added += table.len();
            tracing::debug!("registered atlas {} with {} records", atlas_name, table.len());
            self.set_texture_atlas_table(&atlas_name, table);
        }
        added
    }

    /// Register a table; an empty table removes the entry
    pub fn set_texture_atlas_table(&mut self, atlas_name: &str, table: TextureAtlasTable) {
        if table.is_empty() {
            self.tables.remove(atlas_name);
        } else {
            self.tables.insert(atlas_name.to_string(), table);
        }
    }

    pub fn remove_texture_atlas_table(&mut self, atlas_name: &str) -> bool {
        self.tables.remove(atlas_name).is_some()
    }

    pub fn texture_atlas_table(&self, atlas_name: &str) -> Option<&TextureAtlasTable> {
        self.tables.get(atlas_name)
    }

    pub fn set_index_position(&mut self, mode: IndexPositionMode) {
        self.index_position = mode;
    }

    pub fn index_position(&self) -> IndexPositionMode {
        self.index_position
    }
}

impl Default for TextureAtlasSamplerFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn addressing_function(mode: AddressingMode) -> &'static str {
    match mode {
        AddressingMode::Wrap => "SGX_Atlas_Wrap",
        AddressingMode::Mirror => "SGX_Atlas_Mirror",
        AddressingMode::Clamp | AddressingMode::Border => "SGX_Atlas_Clamp",
    }
}

#[derive(Debug)]
struct AtlasUnit {
    unit_index: usize,
    addressing: AddressingMode,
    table: TextureAtlasTable,
    vs_table: Option<ParameterPtr>,
    vs_out_data: Option<ParameterPtr>,
    ps_in_data: Option<ParameterPtr>,
    ps_inv_size: Option<ParameterPtr>,
    ps_atlas_coord: Option<ParameterPtr>,
}

#[derive(Debug)]
pub struct TextureAtlasSampler {
    tables: HashMap<String, TextureAtlasTable>,
    index_position: IndexPositionMode,
    index_texcoord_set: u32,
    units: Vec<AtlasUnit>,
    vs_in_index: Option<ParameterPtr>,
}

impl TextureAtlasSampler {
    pub fn new(factory: &TextureAtlasSamplerFactory) -> Self {
        Self {
            tables: factory.tables.clone(),
            index_position: factory.index_position,
            index_texcoord_set: 0,
            units: Vec::new(),
            vs_in_index: None,
        }
    }

    /// Texcoord set carrying the atlas indices
    pub fn index_texcoord_set(&self) -> u32 {
        self.index_texcoord_set
    }

    /// Texture units sampled through an atlas
    pub fn atlas_units(&self) -> Vec<usize> {
        self.units.iter().map(|u| u.unit_index).collect()
    }
}

impl SubRenderState for TextureAtlasSampler {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        ffp_stage::TEXTURING + 25
    }

    fn pre_add_to_render_state(&mut self, src: &PassDescription, _dst: &mut PassOverrides) -> bool {
        self.units.clear();
        for (unit_index, unit) in src.texture_units.iter().enumerate() {
            if unit.texture_type != TextureType::Tex2D || self.units.len() == MAX_ATLAS_UNITS {
                continue;
            }
            let Some(table) = self.tables.get(&unit.texture_name) else {
                continue;
            };
            self.units.push(AtlasUnit {
                unit_index,
                addressing: unit.addressing_mode,
                table: table.clone(),
                vs_table: None,
                vs_out_data: None,
                ps_in_data: None,
                ps_inv_size: None,
                ps_atlas_coord: None,
            });
        }

        if self.units.is_empty() {
            return false;
        }

        self.index_texcoord_set = match self.index_position {
            IndexPositionMode::Absolute(set) => set,
            IndexPositionMode::Relative(offset) => {
                let highest = src.texture_units.iter().map(|u| u.tex_coord_set).max().unwrap_or(0);
                // Out-of-range sets are rejected when parameters resolve
                highest.saturating_add(offset)
            }
        };
        true
    }

    fn resolve_parameters(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        let set = texcoord_set(self.index_texcoord_set)?;
        self.vs_in_index = Some(vs.entry_point_function_mut()?.resolve_input_parameter(
            Semantic::TextureCoordinates,
            i32::from(set),
            Content::TextureCoordinate(set),
            GpuConstantType::Float4,
        )?);

        for unit in &mut self.units {
            let i = unit.unit_index;
            unit.vs_table = Some(vs.resolve_named_parameter(
                GpuConstantType::Float4,
                &format!("{}{}", ATLAS_TABLE_NAME, i),
                GpuParamVariability::GLOBAL,
                unit.table.len(),
            )?);

            let vs_out = vs.entry_point_function_mut()?.resolve_output_parameter(
                Semantic::TextureCoordinates,
                -1,
                Content::Unknown,
                GpuConstantType::Float4,
            )?;
            let ps_main = ps.entry_point_function_mut()?;
            unit.ps_in_data = Some(ps_main.resolve_input_parameter(
                Semantic::TextureCoordinates,
                vs_out.index(),
                vs_out.content(),
                GpuConstantType::Float4,
            )?);
            unit.vs_out_data = Some(vs_out);
            unit.ps_atlas_coord = Some(ps_main.resolve_local_parameter(
                Semantic::Unknown,
                0,
                &format!("atlasCoord_{}", i),
                GpuConstantType::Float2,
            )?);
            unit.ps_inv_size =
                Some(ps.resolve_auto_parameter_int(AutoConstantType::InverseTextureSize, i, 0)?);
        }
        Ok(())
    }

    fn resolve_dependencies(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let (vs, ps) = program_set.programs_mut();
        vs.add_dependency(FFP_LIB_COMMON);
        ps.add_dependency(SGX_LIB_TEXTURE_ATLAS);
        Ok(())
    }

    fn add_function_invocations(&mut self, program_set: &mut ProgramSet) -> Result<(), RtssError> {
        let failed = || RtssError::SubRenderStateFailed {
            name: TYPE_NAME.to_string(),
            phase: PHASE,
        };
        let vs_in_index = self.vs_in_index.clone().ok_or_else(failed)?;

        let (vs, ps) = program_set.programs_mut();
        let vs_main = vs.entry_point_function_mut()?;
        let ps_main = ps.entry_point_function_mut()?;
        let mut counter = InvocationCounter::new();

        for (slot, unit) in self.units.iter().enumerate() {
            let table = unit.vs_table.clone().ok_or_else(failed)?;
            let vs_out = unit.vs_out_data.clone().ok_or_else(failed)?;
            let ps_in = unit.ps_in_data.clone().ok_or_else(failed)?;
            let inv_size = unit.ps_inv_size.clone().ok_or_else(failed)?;
            let atlas_coord = unit.ps_atlas_coord.clone().ok_or_else(failed)?;
            let component = OpMask::component(slot).ok_or_else(failed)?;

            // oData = atlasTable[iIndex.<slot>]
            let mut lookup = FunctionInvocation::new(FFP_FUNC_ASSIGN, vs_stage::TEXTURING, counter.next_order());
            lookup.push_operand(&table, OpSemantic::In)?;
            lookup.push_operand_masked(&vs_in_index, OpSemantic::In, component, 1)?;
            lookup.push_operand(&vs_out, OpSemantic::Out)?;
            vs_main.add_atom_instance(lookup)?;

            // Find the sample call of this unit and its original texcoord
            let sampler_name = format!("{}{}", SAMPLER_NAME, unit.unit_index);
            let sample = ps_main
                .atom_instances_mut()
                .iter_mut()
                .filter_map(|atom| atom.as_invocation_mut())
                .find(|inv| {
                    inv.function_name() == FFP_FUNC_SAMPLE_TEXTURE
                        && inv
                            .operands()
                            .first()
                            .is_some_and(|op| op.parameter().name() == sampler_name)
                })
                .ok_or_else(failed)?;
            let texcoord = sample.operands().get(1).ok_or_else(failed)?.parameter().clone();
            sample.set_operand(1, Operand::new(&atlas_coord, OpSemantic::In, OpMask::ALL, 0)?);

            let group = ps_stage::SAMPLING - 1;
            let mut address = FunctionInvocation::new(addressing_function(unit.addressing), group, counter.next_order());
            address.push_operand(&texcoord, OpSemantic::In)?;
            address.push_operand(&atlas_coord, OpSemantic::Out)?;
            ps_main.add_atom_instance(address)?;

            let mut map = FunctionInvocation::new(FUNC_ATLAS_MAP, group, counter.next_order());
            map.push_operand(&atlas_coord, OpSemantic::In)?;
            map.push_operand(&ps_in, OpSemantic::In)?;
            map.push_operand(&inv_size, OpSemantic::In)?;
            map.push_operand(&atlas_coord, OpSemantic::Out)?;
            ps_main.add_atom_instance(map)?;
        }
        Ok(())
    }

    fn update_gpu_programs_params(&self, pass: &mut Pass) {
        let Some(program) = pass.program_mut(ProgramStage::Vertex) else {
            return;
        };
        for unit in &self.units {
            let Some(param) = &unit.vs_table else {
                continue;
            };
            let data: Vec<f32> = unit
                .table
                .iter()
                .flat_map(|r| [r.pos_u, r.pos_v, r.width, r.height])
                .collect();
            param.set_gpu_value(&mut program.parameters, &data);
        }
    }
}
