//! Debug-info model and the precomputed global-variable index over it.

use crate::handle::define_handle;
use crate::{GlobalId, Module};

define_handle!(
    /// Handle to a [`DiType`].
    DiTypeId,
    "DiTypeId"
);

define_handle!(
    /// Handle to a [`DiGlobalVariable`].
    DiGlobalVariableId,
    "DiGlobalVariableId"
);

define_handle!(
    /// Handle to a [`DiCompileUnit`].
    DiCompileUnitId,
    "DiCompileUnitId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiTypeTag {
    Basic,
    Composite,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiType {
    pub tag: DiTypeTag,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub size_in_bits: u64,
    pub align_in_bits: u64,
    pub offset_in_bits: u64,
    pub scope: Option<DiTypeId>,
    /// Underlying type of a member.
    pub base_type: Option<DiTypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiGlobalVariable {
    pub name: String,
    pub linkage_name: String,
    pub file: String,
    pub line: u32,
    pub ty: DiTypeId,
    pub is_local: bool,
    pub is_definition: bool,
    /// The global this record describes. `None` once the global has been optimized away.
    pub variable: Option<GlobalId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiCompileUnit {
    pub file: String,
    pub producer: String,
    /// Global variables in declaration order.
    pub globals: Vec<DiGlobalVariableId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    types: Vec<DiType>,
    globals: Vec<DiGlobalVariable>,
    units: Vec<DiCompileUnit>,
}

impl DebugInfo {
    pub fn add_compile_unit(
        &mut self,
        file: impl Into<String>,
        producer: impl Into<String>,
    ) -> DiCompileUnitId {
        let id = DiCompileUnitId::from_index(self.units.len());
        self.units.push(DiCompileUnit {
            file: file.into(),
            producer: producer.into(),
            globals: Vec::new(),
        });
        id
    }

    pub fn add_type(&mut self, ty: DiType) -> DiTypeId {
        let id = DiTypeId::from_index(self.types.len());
        self.types.push(ty);
        id
    }

    /// Creates a member type describing a slice of `base` at the given bit geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn create_member_type(
        &mut self,
        scope: Option<DiTypeId>,
        name: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        size_in_bits: u64,
        align_in_bits: u64,
        offset_in_bits: u64,
        base: DiTypeId,
    ) -> DiTypeId {
        self.add_type(DiType {
            tag: DiTypeTag::Member,
            name: name.into(),
            file: file.into(),
            line,
            size_in_bits,
            align_in_bits,
            offset_in_bits,
            scope,
            base_type: Some(base),
        })
    }

    /// Creates a global-variable record without attaching it to any compile unit.
    pub fn create_global_variable(&mut self, var: DiGlobalVariable) -> DiGlobalVariableId {
        let id = DiGlobalVariableId::from_index(self.globals.len());
        self.globals.push(var);
        id
    }

    /// Creates a global-variable record and appends it to `unit`'s global list.
    pub fn add_global_variable(
        &mut self,
        unit: DiCompileUnitId,
        var: DiGlobalVariable,
    ) -> DiGlobalVariableId {
        let id = self.create_global_variable(var);
        self.units[unit.index()].globals.push(id);
        id
    }

    pub fn ty(&self, id: DiTypeId) -> &DiType {
        &self.types[id.index()]
    }

    pub fn global_variable(&self, id: DiGlobalVariableId) -> &DiGlobalVariable {
        &self.globals[id.index()]
    }

    pub fn compile_unit(&self, id: DiCompileUnitId) -> &DiCompileUnit {
        &self.units[id.index()]
    }

    pub fn compile_unit_mut(&mut self, id: DiCompileUnitId) -> &mut DiCompileUnit {
        &mut self.units[id.index()]
    }

    pub fn compile_units(&self) -> impl Iterator<Item = DiCompileUnitId> + '_ {
        (0..self.units.len()).map(DiCompileUnitId::from_index)
    }
}

/// Index of the compile units and global-variable records reachable from a module.
///
/// The finder is a snapshot: records created after [`DebugInfoFinder::process_module`] are
/// only visible once appended with [`DebugInfoFinder::append_global_variable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfoFinder {
    compile_units: Vec<DiCompileUnitId>,
    global_variables: Vec<DiGlobalVariableId>,
}

impl DebugInfoFinder {
    pub fn process_module(module: &Module) -> Self {
        let debug_info = module.debug_info();
        let mut finder = Self::default();
        for unit in debug_info.compile_units() {
            finder.compile_units.push(unit);
            for &var in &debug_info.compile_unit(unit).globals {
                finder.append_global_variable(var);
            }
        }
        finder
    }

    pub fn compile_units(&self) -> &[DiCompileUnitId] {
        &self.compile_units
    }

    pub fn global_variables(&self) -> &[DiGlobalVariableId] {
        &self.global_variables
    }

    /// Returns `false` if the record was already indexed.
    pub fn append_global_variable(&mut self, var: DiGlobalVariableId) -> bool {
        if self.global_variables.contains(&var) {
            return false;
        }
        self.global_variables.push(var);
        true
    }

    /// Replaces `old` with `new` in place, keeping the index order.
    pub fn replace_global_variable(&mut self, old: DiGlobalVariableId, new: DiGlobalVariableId) {
        match self.global_variables.iter().position(|&v| v == old) {
            Some(pos) => self.global_variables[pos] = new,
            None => {
                self.append_global_variable(new);
            }
        }
    }
}
