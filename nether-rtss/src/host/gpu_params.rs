//! Live GPU parameter tables
//!
//! A compiled program exposes a default table; each pass using the program
//! holds a clone it binds uniforms against and writes per-frame values into.

use glam::{Mat4, Vec4};
use hashbrown::HashMap;

use crate::ir::{AutoConstantData, AutoConstantType, GpuConstantType, GpuParamVariability};

/// Layout of one named constant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantDefinition {
    pub ty: GpuConstantType,
    /// Offset into the float buffer, or the int buffer for ints and samplers
    pub physical_index: usize,
    /// Slots per array element
    pub element_size: usize,
    /// Element count (1 for non-arrays)
    pub array_size: usize,
    pub variability: GpuParamVariability,
}

impl ConstantDefinition {
    pub fn slot_count(&self) -> usize {
        self.element_size * self.array_size
    }

    pub fn is_int_buffer(&self) -> bool {
        self.ty.is_sampler() || self.ty.is_int()
    }
}

/// Auto constant bound to a physical location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoConstantEntry {
    pub auto_type: AutoConstantType,
    pub data: AutoConstantData,
    pub physical_index: usize,
    pub slot_count: usize,
    pub element_size: usize,
}

/// Value handed out by the host for an auto constant
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Scalar(f32),
    Vector(Vec4),
    Matrix(Mat4),
    /// Pre-packed raw data (bone palettes)
    Array(Vec<f32>),
}

impl ConstantValue {
    /// Raw floats in upload order; matrices are written row-major and
    /// truncated to `element_size` slots (3x4 keeps the first three rows)
    pub fn to_floats(&self, element_size: usize) -> Vec<f32> {
        match self {
            ConstantValue::Scalar(v) => vec![*v],
            ConstantValue::Vector(v) => v.to_array()[..element_size.min(4)].to_vec(),
            ConstantValue::Matrix(m) => {
                let rows = m.transpose().to_cols_array();
                rows[..element_size.min(16)].to_vec()
            }
            ConstantValue::Array(values) => values.clone(),
        }
    }
}

/// Host-side source of auto constant values (camera, lights, fog globals)
pub trait AutoParamSource {
    fn auto_constant(&self, auto_type: AutoConstantType, data: AutoConstantData) -> Option<ConstantValue>;
}

/// Auto constant source backed by a fixed list of values
#[derive(Debug, Clone, Default)]
pub struct StaticAutoParams {
    values: Vec<(AutoConstantType, AutoConstantData, ConstantValue)>,
}

impl StaticAutoParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, auto_type: AutoConstantType, data: AutoConstantData, value: ConstantValue) {
        match self
            .values
            .iter_mut()
            .find(|(t, d, _)| *t == auto_type && *d == data)
        {
            Some(entry) => entry.2 = value,
            None => self.values.push((auto_type, data, value)),
        }
    }
}

impl AutoParamSource for StaticAutoParams {
    fn auto_constant(&self, auto_type: AutoConstantType, data: AutoConstantData) -> Option<ConstantValue> {
        self.values
            .iter()
            .find(|(t, d, _)| *t == auto_type && *d == data)
            .map(|(_, _, value)| value.clone())
    }
}

/// Named constant table of one compiled program
#[derive(Debug, Clone, Default)]
pub struct GpuParameters {
    definitions: HashMap<String, ConstantDefinition>,
    float_constants: Vec<f32>,
    int_constants: Vec<i32>,
    auto_constants: Vec<AutoConstantEntry>,
}

impl GpuParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a constant and return its physical index.
    ///
    /// Redefining an existing name returns the original index.
    pub fn define(&mut self, name: &str, ty: GpuConstantType, array_size: usize) -> usize {
        if let Some(existing) = self.definitions.get(name) {
            return existing.physical_index;
        }

        let element_size = ty.element_size();
        let array_size = array_size.max(1);
        let slots = element_size * array_size;

        let physical_index = if ty.is_sampler() || ty.is_int() {
            let index = self.int_constants.len();
            self.int_constants.resize(index + slots, 0);
            index
        } else {
            let index = self.float_constants.len();
            self.float_constants.resize(index + slots, 0.0);
            index
        };

        self.definitions.insert(
            name.to_string(),
            ConstantDefinition {
                ty,
                physical_index,
                element_size,
                array_size,
                variability: GpuParamVariability::GLOBAL,
            },
        );
        physical_index
    }

    pub fn definition(&self, name: &str) -> Option<&ConstantDefinition> {
        self.definitions.get(name)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn find_physical_index(&self, name: &str) -> Option<usize> {
        self.definitions.get(name).map(|def| def.physical_index)
    }

    /// Bind `name` to an auto constant; false when the name is not defined
    pub fn set_named_auto_constant(
        &mut self,
        name: &str,
        auto_type: AutoConstantType,
        data: AutoConstantData,
    ) -> bool {
        let Some(def) = self.definitions.get_mut(name) else {
            return false;
        };
        def.variability = auto_type.variability();

        let entry = AutoConstantEntry {
            auto_type,
            data,
            physical_index: def.physical_index,
            slot_count: def.slot_count(),
            element_size: def.element_size,
        };
        match self
            .auto_constants
            .iter_mut()
            .find(|e| e.physical_index == entry.physical_index)
        {
            Some(existing) => *existing = entry,
            None => self.auto_constants.push(entry),
        }
        true
    }

    pub fn set_variability(&mut self, name: &str, variability: GpuParamVariability) -> bool {
        match self.definitions.get_mut(name) {
            Some(def) => {
                def.variability = variability;
                true
            }
            None => false,
        }
    }

    /// Write an int constant (sampler unit bindings)
    pub fn set_named_int(&mut self, name: &str, value: i32) -> bool {
        let Some(def) = self.definitions.get(name) else {
            return false;
        };
        if !def.is_int_buffer() {
            return false;
        }
        match self.int_constants.get_mut(def.physical_index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn named_int(&self, name: &str) -> Option<i32> {
        let def = self.definitions.get(name)?;
        if !def.is_int_buffer() {
            return None;
        }
        self.int_constants.get(def.physical_index).copied()
    }

    /// Write raw floats starting at `physical_index`; excess values are dropped
    pub fn write_float_constants(&mut self, physical_index: usize, values: &[f32]) {
        let start = physical_index.min(self.float_constants.len());
        let end = (physical_index + values.len()).min(self.float_constants.len());
        let count = end - start;
        self.float_constants[start..end].copy_from_slice(&values[..count]);
    }

    pub fn float_constants(&self, physical_index: usize, count: usize) -> &[f32] {
        let start = physical_index.min(self.float_constants.len());
        let end = (physical_index + count).min(self.float_constants.len());
        &self.float_constants[start..end]
    }

    /// All float slots of a named constant
    pub fn named_float_constants(&self, name: &str) -> Option<&[f32]> {
        let def = self.definitions.get(name)?;
        if def.is_int_buffer() {
            return None;
        }
        Some(self.float_constants(def.physical_index, def.slot_count()))
    }

    pub fn auto_constants(&self) -> &[AutoConstantEntry] {
        &self.auto_constants
    }

    /// Refresh every auto constant from the host.
    ///
    /// Returns the number of entries written; entries the source has no value
    /// for keep their previous contents.
    pub fn update_auto_constants(&mut self, source: &dyn AutoParamSource) -> usize {
        let mut written = 0;
        for i in 0..self.auto_constants.len() {
            let entry = self.auto_constants[i];
            let Some(value) = source.auto_constant(entry.auto_type, entry.data) else {
                tracing::trace!("no value for auto constant {:?}", entry.auto_type);
                continue;
            };
            let mut floats = value.to_floats(entry.element_size);
            floats.truncate(entry.slot_count);
            self.write_float_constants(entry.physical_index, &floats);
            written += 1;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_layout() {
        let mut table = GpuParameters::new();
        let wvp = table.define("worldviewproj_matrix", GpuConstantType::Matrix4x4, 0);
        let fog = table.define("gFogParams", GpuConstantType::Float4, 0);
        let sampler = table.define("gTextureSampler0", GpuConstantType::Sampler2D, 0);
        let again = table.define("gFogParams", GpuConstantType::Float4, 0);

        assert_eq!(wvp, 0);
        assert_eq!(fog, 16);
        assert_eq!(again, 16);
        assert_eq!(sampler, 0);
        assert!(table.definition("gTextureSampler0").unwrap().is_int_buffer());
        assert_eq!(table.definition_count(), 3);
    }

    #[test]
    fn test_array_slots() {
        let mut table = GpuParameters::new();
        table.define("world_matrix_array_3x4", GpuConstantType::Matrix3x4, 24);
        let def = table.definition("world_matrix_array_3x4").unwrap();
        assert_eq!(def.slot_count(), 12 * 24);
    }

    #[test]
    fn test_write_is_clamped() {
        let mut table = GpuParameters::new();
        let index = table.define("gParam", GpuConstantType::Float2, 0);
        table.write_float_constants(index, &[1.0, 2.0, 3.0]);
        assert_eq!(table.named_float_constants("gParam").unwrap(), &[1.0, 2.0]);
        table.write_float_constants(10, &[5.0]);
        assert_eq!(table.float_constants(0, 8), &[1.0, 2.0]);
    }

    #[test]
    fn test_sampler_binding() {
        let mut table = GpuParameters::new();
        table.define("gTextureSampler1", GpuConstantType::Sampler2D, 0);
        table.define("gFogColor", GpuConstantType::Float4, 0);
        assert!(table.set_named_int("gTextureSampler1", 1));
        assert!(!table.set_named_int("gFogColor", 1));
        assert!(!table.set_named_int("missing", 1));
        assert_eq!(table.named_int("gTextureSampler1"), Some(1));
    }

    #[test]
    fn test_auto_constant_update() {
        let mut table = GpuParameters::new();
        table.define("worldviewproj_matrix", GpuConstantType::Matrix4x4, 0);
        table.define("fog_colour", GpuConstantType::Float4, 0);
        assert!(table.set_named_auto_constant(
            "worldviewproj_matrix",
            AutoConstantType::WorldViewProjMatrix,
            AutoConstantData::Int(0),
        ));
        assert!(table.set_named_auto_constant(
            "fog_colour",
            AutoConstantType::FogColor,
            AutoConstantData::Int(0),
        ));
        assert!(!table.set_named_auto_constant(
            "missing",
            AutoConstantType::Time,
            AutoConstantData::Int(0),
        ));

        let mut source = StaticAutoParams::new();
        source.set(
            AutoConstantType::WorldViewProjMatrix,
            AutoConstantData::Int(0),
            ConstantValue::Matrix(Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0))),
        );

        assert_eq!(table.update_auto_constants(&source), 1);
        let matrix = table.named_float_constants("worldviewproj_matrix").unwrap();
        // Row-major: translation ends up in the last column of each row
        assert_eq!(matrix[3], 1.0);
        assert_eq!(matrix[7], 2.0);
        assert_eq!(matrix[11], 3.0);
        assert_eq!(
            table.definition("fog_colour").unwrap().variability,
            GpuParamVariability::GLOBAL
        );
    }

    #[test]
    fn test_matrix_3x4_truncation() {
        let value = ConstantValue::Matrix(Mat4::IDENTITY);
        let floats = value.to_floats(12);
        assert_eq!(floats.len(), 12);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[5], 1.0);
        assert_eq!(floats[10], 1.0);
    }
}
