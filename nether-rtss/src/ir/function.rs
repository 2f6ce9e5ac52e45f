//! Shader functions and the parameter resolution protocol

use std::rc::Rc;

use super::factory::{Direction, ParameterFactory};
use super::{Content, FunctionAtom, FunctionKind, GpuConstantType, Parameter, ParameterPtr, Semantic};
use crate::RtssError;
use crate::ir::atom::UNSET_EXECUTION_ORDER;

/// Prefix of locals created by content resolution
const LOCAL_PARAM_PREFIX: &str = "lLocalParam_";

/// One shader routine: parameter lists plus an ordered statement list
#[derive(Debug)]
pub struct Function {
    name: String,
    description: String,
    kind: FunctionKind,
    inputs: Vec<ParameterPtr>,
    outputs: Vec<ParameterPtr>,
    locals: Vec<ParameterPtr>,
    atoms: Vec<FunctionAtom>,
}

impl Function {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locals: Vec::new(),
            atoms: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn input_parameters(&self) -> &[ParameterPtr] {
        &self.inputs
    }

    pub fn output_parameters(&self) -> &[ParameterPtr] {
        &self.outputs
    }

    pub fn local_parameters(&self) -> &[ParameterPtr] {
        &self.locals
    }

    /// Resolve an input parameter, reusing an existing one where possible.
    ///
    /// Order of checks:
    /// 1. an input with the same non-`Unknown` content and type is returned;
    /// 2. `index == -1` appends after the existing inputs of `semantic`;
    /// 3. an input at (semantic, index) with the same content is returned,
    ///    or rejected if its type differs;
    /// 4. otherwise a new parameter is created through the factory.
    pub fn resolve_input_parameter(
        &mut self,
        semantic: Semantic,
        index: i32,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr, RtssError> {
        if let Some(found) = self.resolve_existing(Direction::In, semantic, index, content, ty)? {
            return Ok(found);
        }
        let index = next_index(&self.inputs, semantic, index);
        let param = self.create_varying(Direction::In, semantic, index, content, ty)?;
        self.add_input_parameter(param.clone())?;
        Ok(param)
    }

    /// Output counterpart of [`Function::resolve_input_parameter`].
    ///
    /// Blend weights and indices have no output form.
    pub fn resolve_output_parameter(
        &mut self,
        semantic: Semantic,
        index: i32,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr, RtssError> {
        if matches!(semantic, Semantic::BlendWeights | Semantic::BlendIndices) {
            return Err(RtssError::UnsupportedSemantic { semantic });
        }
        if let Some(found) = self.resolve_existing(Direction::Out, semantic, index, content, ty)? {
            return Ok(found);
        }
        let index = next_index(&self.outputs, semantic, index);
        let param = self.create_varying(Direction::Out, semantic, index, content, ty)?;
        self.add_output_parameter(param.clone())?;
        Ok(param)
    }

    fn resolve_existing(
        &self,
        direction: Direction,
        semantic: Semantic,
        index: i32,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<Option<ParameterPtr>, RtssError> {
        let list = match direction {
            Direction::In => &self.inputs,
            Direction::Out => &self.outputs,
        };

        if content != Content::Unknown {
            if let Some(found) = parameter_by_content(list, content, ty) {
                return Ok(Some(found));
            }
        }

        if index == -1 {
            return Ok(None);
        }

        match parameter_by_semantic(list, semantic, index) {
            Some(found) if found.content() == content => {
                if found.ty() == ty {
                    Ok(Some(found))
                } else {
                    Err(self.type_mismatch(found.name()))
                }
            }
            _ => Ok(None),
        }
    }

    fn create_varying(
        &self,
        direction: Direction,
        semantic: Semantic,
        index: i32,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr, RtssError> {
        let param = match (direction, semantic) {
            (Direction::In, Semantic::Position) => ParameterFactory::create_in_position(index),
            (Direction::Out, Semantic::Position) => ParameterFactory::create_out_position(index),
            (Direction::In, Semantic::BlendWeights) => ParameterFactory::create_in_weights(index),
            (Direction::In, Semantic::BlendIndices) => ParameterFactory::create_in_indices(index),
            (Direction::In, Semantic::Normal) => ParameterFactory::create_in_normal(index),
            (Direction::Out, Semantic::Normal) => ParameterFactory::create_out_normal(index),
            (Direction::In, Semantic::Color) => ParameterFactory::create_in_color(index),
            (Direction::Out, Semantic::Color) => ParameterFactory::create_out_color(index),
            (Direction::In, Semantic::TextureCoordinates) => {
                ParameterFactory::create_in_texcoord(ty, index, content)
            }
            (Direction::Out, Semantic::TextureCoordinates) => {
                ParameterFactory::create_out_texcoord(ty, index, content)
            }
            (Direction::In, Semantic::Binormal) => ParameterFactory::create_in_binormal(index),
            (Direction::Out, Semantic::Binormal) => ParameterFactory::create_out_binormal(index),
            (Direction::In, Semantic::Tangent) => ParameterFactory::create_in_tangent(index),
            (Direction::Out, Semantic::Tangent) => ParameterFactory::create_out_tangent(index),
            _ => return Err(RtssError::UnsupportedSemantic { semantic }),
        };

        if param.ty() != ty {
            return Err(self.type_mismatch(param.name()));
        }
        if content != Content::Unknown && param.content() != content {
            return Ok(Rc::new(param.with_content(content)));
        }
        Ok(param)
    }

    /// Resolve a local by exact name, creating it when absent
    pub fn resolve_local_parameter(
        &mut self,
        semantic: Semantic,
        index: i32,
        name: &str,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr, RtssError> {
        if let Some(found) = parameter_by_name(&self.locals, name) {
            if found.ty() == ty && found.semantic() == semantic && found.index() == index {
                return Ok(found);
            }
            return Err(self.type_mismatch(name));
        }

        let param = Rc::new(Parameter::new(ty, name, semantic, index, Content::Unknown, 0));
        self.add_local_parameter(param.clone())?;
        Ok(param)
    }

    /// Resolve a local by content, naming new locals by their ordinal
    pub fn resolve_local_parameter_by_content(
        &mut self,
        semantic: Semantic,
        index: i32,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr, RtssError> {
        if content != Content::Unknown {
            if let Some(found) = parameter_by_content(&self.locals, content, ty) {
                return Ok(found);
            }
        }

        let name = format!("{}{}", LOCAL_PARAM_PREFIX, self.locals.len());
        let param = Rc::new(Parameter::new(ty, name, semantic, index, content, 0));
        self.add_local_parameter(param.clone())?;
        Ok(param)
    }

    pub fn add_input_parameter(&mut self, param: ParameterPtr) -> Result<(), RtssError> {
        self.check_unique(&param, &self.inputs)?;
        self.inputs.push(param);
        Ok(())
    }

    pub fn add_output_parameter(&mut self, param: ParameterPtr) -> Result<(), RtssError> {
        self.check_unique(&param, &self.outputs)?;
        self.outputs.push(param);
        Ok(())
    }

    pub fn add_local_parameter(&mut self, param: ParameterPtr) -> Result<(), RtssError> {
        if self.find_by_name(param.name()).is_some() {
            return Err(self.duplicate(param.name()));
        }
        self.locals.push(param);
        Ok(())
    }

    /// Names are unique across inputs, outputs and locals; (semantic, index)
    /// slots are unique within one list.
    fn check_unique(&self, param: &ParameterPtr, list: &[ParameterPtr]) -> Result<(), RtssError> {
        if self.find_by_name(param.name()).is_some() {
            return Err(self.duplicate(param.name()));
        }
        if param.semantic() != Semantic::Unknown
            && parameter_by_semantic(list, param.semantic(), param.index()).is_some()
        {
            return Err(self.duplicate(param.name()));
        }
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Option<ParameterPtr> {
        parameter_by_name(&self.inputs, name)
            .or_else(|| parameter_by_name(&self.outputs, name))
            .or_else(|| parameter_by_name(&self.locals, name))
    }

    pub fn delete_input_parameter(&mut self, param: &ParameterPtr) -> bool {
        remove_ptr(&mut self.inputs, param)
    }

    pub fn delete_output_parameter(&mut self, param: &ParameterPtr) -> bool {
        remove_ptr(&mut self.outputs, param)
    }

    pub fn delete_all_input_parameters(&mut self) {
        self.inputs.clear();
    }

    pub fn delete_all_output_parameters(&mut self) {
        self.outputs.clear();
    }

    /// Append a statement; its group order must have been set
    pub fn add_atom_instance(&mut self, atom: impl Into<FunctionAtom>) -> Result<(), RtssError> {
        let atom = atom.into();
        if atom.group_execution_order() == UNSET_EXECUTION_ORDER {
            return Err(RtssError::UnsetExecutionOrder {
                function: self.name.clone(),
                atom: atom.label().to_string(),
            });
        }
        self.atoms.push(atom);
        Ok(())
    }

    /// Order statements by (group, internal) ascending
    pub fn sort_atom_instances(&mut self) {
        self.atoms.sort_by_key(FunctionAtom::order_key);
    }

    pub fn atom_instances(&self) -> &[FunctionAtom] {
        &self.atoms
    }

    pub fn atom_instances_mut(&mut self) -> &mut [FunctionAtom] {
        &mut self.atoms
    }

    /// True when any statement uses `param` as an operand
    pub fn references_parameter(&self, param: &ParameterPtr) -> bool {
        self.atoms.iter().any(|atom| {
            atom.operands()
                .iter()
                .any(|op| Rc::ptr_eq(op.parameter(), param))
        })
    }

    fn type_mismatch(&self, parameter: &str) -> RtssError {
        RtssError::ParameterTypeMismatch {
            function: self.name.clone(),
            parameter: parameter.to_string(),
        }
    }

    fn duplicate(&self, parameter: &str) -> RtssError {
        RtssError::DuplicateParameter {
            function: self.name.clone(),
            parameter: parameter.to_string(),
        }
    }
}

fn next_index(list: &[ParameterPtr], semantic: Semantic, index: i32) -> i32 {
    if index != -1 {
        return index;
    }
    list.iter().filter(|p| p.semantic() == semantic).count() as i32
}

fn remove_ptr(list: &mut Vec<ParameterPtr>, param: &ParameterPtr) -> bool {
    match list.iter().position(|p| Rc::ptr_eq(p, param)) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

pub fn parameter_by_name(list: &[ParameterPtr], name: &str) -> Option<ParameterPtr> {
    list.iter().find(|p| p.name() == name).cloned()
}

pub fn parameter_by_semantic(
    list: &[ParameterPtr],
    semantic: Semantic,
    index: i32,
) -> Option<ParameterPtr> {
    list.iter()
        .find(|p| p.semantic() == semantic && p.index() == index)
        .cloned()
}

pub fn parameter_by_content(
    list: &[ParameterPtr],
    content: Content,
    ty: GpuConstantType,
) -> Option<ParameterPtr> {
    list.iter()
        .find(|p| p.content() == content && p.ty() == ty)
        .cloned()
}
