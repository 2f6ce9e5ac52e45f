//! Shader parameters: varyings, locals, uniforms and literal constants

use std::cell::Cell;
use std::rc::Rc;

use super::{AutoConstantData, AutoConstantType, Content, GpuConstantType, GpuParamVariability, Semantic};
use crate::host::GpuParameters;

/// Shared handle to a parameter.
///
/// Functions and programs own their parameter lists; operands and features
/// hold clones of the handle so that identity (`Rc::ptr_eq`) is what
/// deduplication and reference checks compare.
pub type ParameterPtr = Rc<Parameter>;

/// A typed, named shader variable
#[derive(Debug)]
pub struct Parameter {
    name: String,
    ty: GpuConstantType,
    semantic: Semantic,
    index: i32,
    content: Content,
    /// Array size, 0 for non-array parameters
    size: Cell<usize>,
    class: ParameterClass,
}

/// What kind of storage a parameter describes
#[derive(Debug)]
pub enum ParameterClass {
    /// Function input, output or local
    Varying,
    /// Program-level uniform
    Uniform(UniformData),
    /// Literal value; the name is the literal text
    Constant,
}

/// Uniform-specific state
#[derive(Debug)]
pub struct UniformData {
    auto_constant: Option<(AutoConstantType, AutoConstantData)>,
    variability: GpuParamVariability,
    /// Physical index inside the parameter table the uniform was last bound to
    physical_index: Cell<Option<usize>>,
}

impl Parameter {
    /// Create a varying (input/output/local) parameter
    pub fn new(
        ty: GpuConstantType,
        name: impl Into<String>,
        semantic: Semantic,
        index: i32,
        content: Content,
        size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            semantic,
            index,
            content,
            size: Cell::new(size),
            class: ParameterClass::Varying,
        }
    }

    /// Create a manually updated uniform
    pub fn uniform(
        ty: GpuConstantType,
        name: impl Into<String>,
        index: i32,
        variability: GpuParamVariability,
        size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            semantic: Semantic::Unknown,
            index,
            content: Content::Unknown,
            size: Cell::new(size),
            class: ParameterClass::Uniform(UniformData {
                auto_constant: None,
                variability,
                physical_index: Cell::new(None),
            }),
        }
    }

    /// Create an auto-constant uniform named after its type and data
    pub fn auto_constant(auto_type: AutoConstantType, data: AutoConstantData, size: usize) -> Self {
        let name = format!("{}{}", auto_type.name(), data.name_suffix());
        Self {
            name,
            ty: auto_type.element_type(),
            semantic: Semantic::Unknown,
            index: 0,
            content: Content::Unknown,
            size: Cell::new(size),
            class: ParameterClass::Uniform(UniformData {
                auto_constant: Some((auto_type, data)),
                variability: auto_type.variability(),
                physical_index: Cell::new(None),
            }),
        }
    }

    /// Create a literal operand such as `1.0`
    pub fn constant(ty: GpuConstantType, literal: impl Into<String>) -> Self {
        Self {
            name: literal.into(),
            ty,
            semantic: Semantic::Unknown,
            index: 0,
            content: Content::Unknown,
            size: Cell::new(0),
            class: ParameterClass::Constant,
        }
    }

    /// Scalar float literal
    pub fn constant_float(value: f32) -> Self {
        let literal = if value.fract() == 0.0 {
            format!("{:.1}", value)
        } else {
            value.to_string()
        };
        Self::constant(GpuConstantType::Float1, literal)
    }

    /// Copy of a varying carrying a different content tag
    pub fn with_content(&self, content: Content) -> Self {
        Self::new(
            self.ty,
            self.name.clone(),
            self.semantic,
            self.index,
            content,
            self.size.get(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> GpuConstantType {
        self.ty
    }

    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn content(&self) -> Content {
        self.content
    }

    pub fn class(&self) -> &ParameterClass {
        &self.class
    }

    /// Array size (0 when not an array)
    pub fn size(&self) -> usize {
        self.size.get()
    }

    pub fn set_size(&self, size: usize) {
        self.size.set(size);
    }

    pub fn is_array(&self) -> bool {
        self.size.get() > 0
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self.class, ParameterClass::Uniform(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.class, ParameterClass::Constant)
    }

    fn uniform_data(&self) -> Option<&UniformData> {
        match &self.class {
            ParameterClass::Uniform(data) => Some(data),
            _ => None,
        }
    }

    /// Auto-constant type and data, if this is an auto-constant uniform
    pub fn auto_constant_info(&self) -> Option<(AutoConstantType, AutoConstantData)> {
        self.uniform_data().and_then(|data| data.auto_constant)
    }

    pub fn is_auto_constant(&self) -> bool {
        self.auto_constant_info().is_some()
    }

    /// Variability class; varyings and constants report `GLOBAL`
    pub fn variability(&self) -> GpuParamVariability {
        self.uniform_data()
            .map(|data| data.variability)
            .unwrap_or(GpuParamVariability::GLOBAL)
    }

    /// Bind the uniform to a live parameter table by name.
    ///
    /// Returns false when the table has no such constant (for instance
    /// because the backend compiler stripped an unused uniform).
    pub fn bind(&self, table: &GpuParameters) -> bool {
        let Some(data) = self.uniform_data() else {
            return false;
        };
        let index = table.find_physical_index(&self.name);
        data.physical_index.set(index);
        index.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.physical_index().is_some()
    }

    pub fn physical_index(&self) -> Option<usize> {
        self.uniform_data().and_then(|data| data.physical_index.get())
    }

    /// Write raw float data at the bound physical index.
    ///
    /// Does nothing for unbound uniforms.
    pub fn set_gpu_value(&self, table: &mut GpuParameters, values: &[f32]) {
        if let Some(index) = self.physical_index() {
            table.write_float_constants(index, values);
        }
    }
}
