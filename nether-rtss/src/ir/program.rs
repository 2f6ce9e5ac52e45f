//! Programs (one shader stage) and program sets (vertex + fragment pair)

use std::rc::Rc;

use super::{
    AutoConstantData, AutoConstantType, Function, FunctionKind, GpuConstantType,
    GpuParamVariability, Parameter, ParameterPtr, ProgramStage,
};
use crate::RtssError;
use crate::host::GpuProgramHandle;
use crate::ir::factory::ParameterFactory;
use crate::ir::function::parameter_by_name;

/// Entry point name shared by every generated stage
pub const ENTRY_POINT_NAME: &str = "main";

/// Complete IR of one shader stage
#[derive(Debug)]
pub struct Program {
    stage: ProgramStage,
    functions: Vec<Function>,
    entry_point: Option<usize>,
    parameters: Vec<ParameterPtr>,
    dependencies: Vec<String>,
    skeletal_animation: bool,
}

impl Program {
    pub fn new(stage: ProgramStage) -> Self {
        Self {
            stage,
            functions: Vec::new(),
            entry_point: None,
            parameters: Vec::new(),
            dependencies: Vec::new(),
            skeletal_animation: false,
        }
    }

    pub fn stage(&self) -> ProgramStage {
        self.stage
    }

    /// Create a function and return its position
    pub fn create_function(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: FunctionKind,
    ) -> usize {
        self.functions.push(Function::new(name, description, kind));
        self.functions.len() - 1
    }

    pub fn set_entry_point_function(&mut self, name: &str) -> Result<(), RtssError> {
        let index = self
            .functions
            .iter()
            .position(|f| f.name() == name)
            .ok_or(RtssError::MissingEntryPoint { stage: self.stage })?;
        self.entry_point = Some(index);
        Ok(())
    }

    pub fn entry_point_function(&self) -> Result<&Function, RtssError> {
        self.entry_point
            .and_then(|index| self.functions.get(index))
            .ok_or(RtssError::MissingEntryPoint { stage: self.stage })
    }

    pub fn entry_point_function_mut(&mut self) -> Result<&mut Function, RtssError> {
        let stage = self.stage;
        self.entry_point
            .and_then(|index| self.functions.get_mut(index))
            .ok_or(RtssError::MissingEntryPoint { stage })
    }

    pub fn is_entry_point(&self, function: &Function) -> bool {
        self.entry_point
            .and_then(|index| self.functions.get(index))
            .is_some_and(|entry| std::ptr::eq(entry, function))
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut [Function] {
        &mut self.functions
    }

    /// Sort the statements of every function
    pub fn sort_atoms(&mut self) {
        for function in &mut self.functions {
            function.sort_atom_instances();
        }
    }

    pub fn parameters(&self) -> &[ParameterPtr] {
        &self.parameters
    }

    /// Resolve a manually updated uniform.
    ///
    /// An explicit index returns the existing uniform of that (type, index)
    /// when there is one; `-1` always appends a new uniform after the others
    /// of the same type.
    pub fn resolve_parameter(
        &mut self,
        ty: GpuConstantType,
        index: i32,
        variability: GpuParamVariability,
        suggested_name: &str,
        size: usize,
    ) -> Result<ParameterPtr, RtssError> {
        // Named uniforms carry index -1 and never take part in indexed lookup
        let manual =
            |p: &&ParameterPtr| p.ty() == ty && !p.is_auto_constant() && p.index() != -1;

        let index = if index == -1 {
            self.parameters.iter().filter(manual).count() as i32
        } else {
            if let Some(found) = self
                .parameters
                .iter()
                .filter(manual)
                .find(|p| p.index() == index)
            {
                return Ok(found.clone());
            }
            index
        };

        let param = ParameterFactory::create_uniform(ty, index, variability, suggested_name, size);
        self.add_parameter(param.clone())?;
        Ok(param)
    }

    /// Resolve a manually updated uniform by exact name
    pub fn resolve_named_parameter(
        &mut self,
        ty: GpuConstantType,
        name: &str,
        variability: GpuParamVariability,
        size: usize,
    ) -> Result<ParameterPtr, RtssError> {
        if let Some(found) = self.parameter_by_name(name) {
            if found.ty() != ty || found.is_auto_constant() {
                return Err(RtssError::ParameterTypeMismatch {
                    function: format!("{:?} program", self.stage),
                    parameter: name.to_string(),
                });
            }
            return Ok(found);
        }

        let param = Rc::new(Parameter::uniform(ty, name, -1, variability, size));
        self.add_parameter(param.clone())?;
        Ok(param)
    }

    /// Resolve an auto constant with integer data (light index, texture unit)
    pub fn resolve_auto_parameter_int(
        &mut self,
        auto_type: AutoConstantType,
        data: usize,
        size: usize,
    ) -> Result<ParameterPtr, RtssError> {
        self.resolve_auto_parameter(auto_type, AutoConstantData::Int(data), size)
    }

    /// Resolve an auto constant with real data (time factor)
    pub fn resolve_auto_parameter_real(
        &mut self,
        auto_type: AutoConstantType,
        data: f32,
        size: usize,
    ) -> Result<ParameterPtr, RtssError> {
        self.resolve_auto_parameter(auto_type, AutoConstantData::Real(data), size)
    }

    fn resolve_auto_parameter(
        &mut self,
        auto_type: AutoConstantType,
        data: AutoConstantData,
        size: usize,
    ) -> Result<ParameterPtr, RtssError> {
        if let Some(found) = self
            .parameters
            .iter()
            .find(|p| p.auto_constant_info() == Some((auto_type, data)))
        {
            if size > found.size() {
                found.set_size(size);
            }
            return Ok(found.clone());
        }

        let param = Rc::new(Parameter::auto_constant(auto_type, data, size));
        self.add_parameter(param.clone())?;
        Ok(param)
    }

    pub fn add_parameter(&mut self, param: ParameterPtr) -> Result<(), RtssError> {
        if self.parameter_by_name(param.name()).is_some() {
            return Err(RtssError::DuplicateParameter {
                function: format!("{:?} program", self.stage),
                parameter: param.name().to_string(),
            });
        }
        self.parameters.push(param);
        Ok(())
    }

    pub fn remove_parameter(&mut self, param: &ParameterPtr) -> bool {
        match self.parameters.iter().position(|p| Rc::ptr_eq(p, param)) {
            Some(pos) => {
                self.parameters.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn parameter_by_name(&self, name: &str) -> Option<ParameterPtr> {
        parameter_by_name(&self.parameters, name)
    }

    /// First auto constant of the given type, whatever its data
    pub fn parameter_by_auto_type(&self, auto_type: AutoConstantType) -> Option<ParameterPtr> {
        self.parameters
            .iter()
            .find(|p| matches!(p.auto_constant_info(), Some((t, _)) if t == auto_type))
            .cloned()
    }

    /// Register a library include; adding the same name twice is a no-op
    pub fn add_dependency(&mut self, name: &str) {
        if !self.dependencies.iter().any(|dep| dep == name) {
            self.dependencies.push(name.to_string());
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn skeletal_animation_included(&self) -> bool {
        self.skeletal_animation
    }

    pub fn set_skeletal_animation_included(&mut self, included: bool) {
        self.skeletal_animation = included;
    }
}

/// A vertex + fragment program pair and their compiled handles
#[derive(Debug)]
pub struct ProgramSet {
    vertex: Program,
    fragment: Program,
    vertex_gpu: Option<GpuProgramHandle>,
    fragment_gpu: Option<GpuProgramHandle>,
}

impl ProgramSet {
    /// Create both programs, each with an empty `main` entry point
    pub fn new() -> Self {
        let mut vertex = Program::new(ProgramStage::Vertex);
        let vs_main = vertex.create_function(
            ENTRY_POINT_NAME,
            "Vertex Program Entry point",
            FunctionKind::VertexMain,
        );
        vertex.entry_point = Some(vs_main);

        let mut fragment = Program::new(ProgramStage::Fragment);
        let ps_main = fragment.create_function(
            ENTRY_POINT_NAME,
            "Pixel Program Entry point",
            FunctionKind::PixelMain,
        );
        fragment.entry_point = Some(ps_main);

        Self {
            vertex,
            fragment,
            vertex_gpu: None,
            fragment_gpu: None,
        }
    }

    pub fn vertex_program(&self) -> &Program {
        &self.vertex
    }

    pub fn fragment_program(&self) -> &Program {
        &self.fragment
    }

    pub fn vertex_program_mut(&mut self) -> &mut Program {
        &mut self.vertex
    }

    pub fn fragment_program_mut(&mut self) -> &mut Program {
        &mut self.fragment
    }

    /// Mutable access to both programs at once
    pub fn programs_mut(&mut self) -> (&mut Program, &mut Program) {
        (&mut self.vertex, &mut self.fragment)
    }

    pub fn cpu_program(&self, stage: ProgramStage) -> Option<&Program> {
        match stage {
            ProgramStage::Vertex => Some(&self.vertex),
            ProgramStage::Fragment => Some(&self.fragment),
            ProgramStage::Geometry => None,
        }
    }

    pub fn gpu_program(&self, stage: ProgramStage) -> Option<&GpuProgramHandle> {
        match stage {
            ProgramStage::Vertex => self.vertex_gpu.as_ref(),
            ProgramStage::Fragment => self.fragment_gpu.as_ref(),
            ProgramStage::Geometry => None,
        }
    }

    pub fn set_gpu_programs(&mut self, vertex: GpuProgramHandle, fragment: GpuProgramHandle) {
        self.vertex_gpu = Some(vertex);
        self.fragment_gpu = Some(fragment);
    }
}

impl Default for ProgramSet {
    fn default() -> Self {
        Self::new()
    }
}
