//! Function atoms: the statements of a generated function

use smallvec::SmallVec;

use super::{OpMask, OpSemantic, Operand, ParameterPtr};
use crate::RtssError;

/// Group order value marking an atom whose producer never set it
pub const UNSET_EXECUTION_ORDER: i32 = -1;

/// Invocation of a library routine: `name(op0, op1, ...);`
#[derive(Debug, Clone)]
pub struct FunctionInvocation {
    function_name: String,
    group_execution_order: i32,
    internal_execution_order: i32,
    operands: SmallVec<[Operand; 6]>,
}

impl FunctionInvocation {
    pub fn new(
        function_name: impl Into<String>,
        group_execution_order: i32,
        internal_execution_order: i32,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            group_execution_order,
            internal_execution_order,
            operands: SmallVec::new(),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Append an operand covering the whole parameter
    pub fn push_operand(
        &mut self,
        parameter: &ParameterPtr,
        semantic: OpSemantic,
    ) -> Result<(), RtssError> {
        self.push_operand_masked(parameter, semantic, OpMask::ALL, 0)
    }

    /// Append an operand with an explicit component mask and indirection level
    pub fn push_operand_masked(
        &mut self,
        parameter: &ParameterPtr,
        semantic: OpSemantic,
        mask: OpMask,
        indirection_level: u16,
    ) -> Result<(), RtssError> {
        self.operands
            .push(Operand::new(parameter, semantic, mask, indirection_level)?);
        Ok(())
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Replace the operand at `index`; returns false when out of range
    pub fn set_operand(&mut self, index: usize, operand: Operand) -> bool {
        match self.operands.get_mut(index) {
            Some(slot) => {
                *slot = operand;
                true
            }
            None => false,
        }
    }
}

/// Plain assignment: `dst = src;`
#[derive(Debug, Clone)]
pub struct AssignmentAtom {
    group_execution_order: i32,
    internal_execution_order: i32,
    destination: Operand,
    source: Operand,
}

impl AssignmentAtom {
    pub fn new(
        destination: Operand,
        source: Operand,
        group_execution_order: i32,
        internal_execution_order: i32,
    ) -> Self {
        Self {
            group_execution_order,
            internal_execution_order,
            destination,
            source,
        }
    }

    pub fn destination(&self) -> &Operand {
        &self.destination
    }

    pub fn source(&self) -> &Operand {
        &self.source
    }
}

/// One statement of a function
#[derive(Debug, Clone)]
pub enum FunctionAtom {
    Invocation(FunctionInvocation),
    Assignment(AssignmentAtom),
}

impl FunctionAtom {
    pub fn group_execution_order(&self) -> i32 {
        match self {
            FunctionAtom::Invocation(inv) => inv.group_execution_order,
            FunctionAtom::Assignment(assign) => assign.group_execution_order,
        }
    }

    pub fn internal_execution_order(&self) -> i32 {
        match self {
            FunctionAtom::Invocation(inv) => inv.internal_execution_order,
            FunctionAtom::Assignment(assign) => assign.internal_execution_order,
        }
    }

    /// Sort key: (group, internal)
    pub fn order_key(&self) -> (i32, i32) {
        (self.group_execution_order(), self.internal_execution_order())
    }

    /// Display label for diagnostics
    pub fn label(&self) -> &str {
        match self {
            FunctionAtom::Invocation(inv) => inv.function_name(),
            FunctionAtom::Assignment(_) => "=",
        }
    }

    /// All operands in source order
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            FunctionAtom::Invocation(inv) => inv.operands().iter().collect(),
            FunctionAtom::Assignment(assign) => vec![&assign.destination, &assign.source],
        }
    }

    pub fn as_invocation(&self) -> Option<&FunctionInvocation> {
        match self {
            FunctionAtom::Invocation(inv) => Some(inv),
            FunctionAtom::Assignment(_) => None,
        }
    }

    pub fn as_invocation_mut(&mut self) -> Option<&mut FunctionInvocation> {
        match self {
            FunctionAtom::Invocation(inv) => Some(inv),
            FunctionAtom::Assignment(_) => None,
        }
    }
}

impl From<FunctionInvocation> for FunctionAtom {
    fn from(inv: FunctionInvocation) -> Self {
        FunctionAtom::Invocation(inv)
    }
}

impl From<AssignmentAtom> for FunctionAtom {
    fn from(assign: AssignmentAtom) -> Self {
        FunctionAtom::Assignment(assign)
    }
}
