use std::collections::{BTreeMap, HashMap};

use crate::error::{IrError, Result};
use crate::types::TypeTable;
use crate::{
    AddressSpace, ConstId, Constant, DebugInfo, Function, FunctionId, GlobalId, GlobalVariable,
    InstId, InstKind, Instruction, MdId, Metadata, Type, TypeId, Value,
};

/// A host IR module: types, constants, globals, functions, instructions and metadata.
///
/// Every entity lives in an arena and is addressed by a handle. Erased globals, functions and
/// instructions leave tombstones, so a stale handle resolves to `None` rather than to an
/// unrelated entity.
#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    types: TypeTable,
    constants: Vec<Constant>,
    constant_lookup: HashMap<Constant, ConstId>,
    globals: Vec<Option<GlobalVariable>>,
    global_order: Vec<GlobalId>,
    functions: Vec<Option<Function>>,
    function_order: Vec<FunctionId>,
    insts: Vec<Option<Instruction>>,
    metadata: Vec<Metadata>,
    metadata_lookup: HashMap<Metadata, MdId>,
    named_metadata: BTreeMap<String, Vec<MdId>>,
    debug_info: DebugInfo,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Types.

    pub fn intern_type(&mut self, ty: Type) -> TypeId {
        self.types.intern(ty)
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        self.types.get(id)
    }

    /// Textual form of a type, e.g. `<4 x float>` or `%class.Texture2D<float4>*`.
    pub fn type_name(&self, id: TypeId) -> String {
        self.types.name(id)
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern_type(Type::Void)
    }

    pub fn int_type(&mut self, bits: u32) -> TypeId {
        self.intern_type(Type::Int { bits })
    }

    pub fn f32_type(&mut self) -> TypeId {
        self.intern_type(Type::Float { bits: 32 })
    }

    pub fn vector_type(&mut self, element: TypeId, len: u32) -> TypeId {
        self.intern_type(Type::Vector { element, len })
    }

    pub fn array_type(&mut self, element: TypeId, len: u64) -> TypeId {
        self.intern_type(Type::Array { element, len })
    }

    pub fn struct_type(&mut self, name: impl Into<String>, fields: Vec<TypeId>) -> TypeId {
        self.intern_type(Type::Struct {
            name: name.into(),
            fields,
        })
    }

    pub fn pointer_type(&mut self, pointee: TypeId, address_space: AddressSpace) -> TypeId {
        self.intern_type(Type::Pointer {
            pointee,
            address_space,
        })
    }

    pub fn function_type(&mut self, ret: TypeId, params: Vec<TypeId>) -> TypeId {
        self.intern_type(Type::Function { ret, params })
    }

    pub fn pointee_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.ty(ty) {
            Type::Pointer { pointee, .. } => Some(*pointee),
            _ => None,
        }
    }

    // Constants.

    pub fn constant(&mut self, constant: Constant) -> ConstId {
        if let Some(&id) = self.constant_lookup.get(&constant) {
            return id;
        }
        let id = ConstId::from_index(self.constants.len());
        self.constants.push(constant.clone());
        self.constant_lookup.insert(constant, id);
        id
    }

    pub fn const_int(&mut self, bits: u32, value: i64) -> ConstId {
        let ty = self.int_type(bits);
        self.constant(Constant::Int { ty, value })
    }

    pub fn const_i32(&mut self, value: i32) -> ConstId {
        self.const_int(32, i64::from(value))
    }

    pub fn const_bool(&mut self, value: bool) -> ConstId {
        self.const_int(1, i64::from(value))
    }

    pub fn const_f32(&mut self, value: f32) -> ConstId {
        let ty = self.f32_type();
        self.constant(Constant::Float {
            ty,
            bits: f64::from(value).to_bits(),
        })
    }

    pub fn const_bytes(&mut self, bytes: Vec<u8>) -> ConstId {
        self.constant(Constant::Bytes(bytes))
    }

    pub fn undef(&mut self, ty: TypeId) -> ConstId {
        self.constant(Constant::Undef(ty))
    }

    pub fn get_constant(&self, id: ConstId) -> Option<&Constant> {
        self.constants.get(id.index())
    }

    // Globals.

    pub fn add_global(&mut self, global: GlobalVariable) -> GlobalId {
        let id = GlobalId::from_index(self.globals.len());
        self.globals.push(Some(global));
        self.global_order.push(id);
        id
    }

    pub fn global(&self, id: GlobalId) -> Option<&GlobalVariable> {
        self.globals.get(id.index()).and_then(Option::as_ref)
    }

    pub fn global_mut(&mut self, id: GlobalId) -> Option<&mut GlobalVariable> {
        self.globals.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains_global(&self, id: GlobalId) -> bool {
        self.global(id).is_some()
    }

    /// Live globals in module order.
    pub fn globals(&self) -> impl Iterator<Item = GlobalId> + '_ {
        self.global_order.iter().copied()
    }

    pub fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        self.globals()
            .find(|&id| self.global(id).is_some_and(|g| g.name == name))
    }

    /// Removes a global from the module's global list. Remaining uses become dangling and
    /// resolve as unknown.
    pub fn erase_global(&mut self, id: GlobalId) -> Result<GlobalVariable> {
        let global = self
            .globals
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(IrError::UnknownGlobal(id))?;
        self.global_order.retain(|&g| g != id);
        Ok(global)
    }

    // Functions.

    pub fn add_function(&mut self, name: impl Into<String>, ty: TypeId) -> Result<FunctionId> {
        let name = name.into();
        if !matches!(self.ty(ty), Type::Function { .. }) {
            return Err(IrError::NotAFunctionType(self.type_name(ty)));
        }
        if self.function_by_name(&name).is_some() {
            return Err(IrError::DuplicateFunction(name));
        }
        let id = FunctionId::from_index(self.functions.len());
        self.functions.push(Some(Function {
            name,
            ty,
            body: Vec::new(),
            metadata: BTreeMap::new(),
        }));
        self.function_order.push(id);
        Ok(id)
    }

    /// Returns the function named `name`, declaring it with `ty` if it does not exist yet.
    pub fn get_or_insert_function(&mut self, name: &str, ty: TypeId) -> Result<FunctionId> {
        match self.function_by_name(name) {
            Some(id) => Ok(id),
            None => self.add_function(name, ty),
        }
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index()).and_then(Option::as_ref)
    }

    pub fn contains_function(&self, id: FunctionId) -> bool {
        self.function(id).is_some()
    }

    pub fn functions(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.function_order.iter().copied()
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions()
            .find(|&id| self.function(id).is_some_and(|f| f.name == name))
    }

    /// Erases a function together with its body.
    pub fn erase_function(&mut self, id: FunctionId) -> Result<Function> {
        let function = self
            .functions
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(IrError::UnknownFunction(id))?;
        for inst in &function.body {
            if let Some(slot) = self.insts.get_mut(inst.index()) {
                *slot = None;
            }
        }
        self.function_order.retain(|&f| f != id);
        Ok(function)
    }

    pub fn set_function_metadata(
        &mut self,
        id: FunctionId,
        kind: &str,
        node: Option<MdId>,
    ) -> Result<()> {
        let function = self
            .functions
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(IrError::UnknownFunction(id))?;
        match node {
            Some(node) => {
                function.metadata.insert(kind.to_owned(), node);
            }
            None => {
                function.metadata.remove(kind);
            }
        }
        Ok(())
    }

    pub fn function_metadata(&self, id: FunctionId, kind: &str) -> Option<MdId> {
        self.function(id)
            .and_then(|f| f.metadata.get(kind).copied())
    }

    // Instructions.

    pub fn append_inst(&mut self, function: FunctionId, kind: InstKind) -> Result<InstId> {
        let len = self
            .function(function)
            .ok_or(IrError::UnknownFunction(function))?
            .body
            .len();
        self.insert_inst_at(function, len, kind)
    }

    pub fn insert_inst_after(&mut self, anchor: InstId, kind: InstKind) -> Result<InstId> {
        let (function, pos) = self.position_of(anchor)?;
        self.insert_inst_at(function, pos + 1, kind)
    }

    pub fn insert_inst_before(&mut self, anchor: InstId, kind: InstKind) -> Result<InstId> {
        let (function, pos) = self.position_of(anchor)?;
        self.insert_inst_at(function, pos, kind)
    }

    /// Inserts at `pos` in `function`'s body (clamped to the body length).
    pub fn insert_inst_at(
        &mut self,
        function: FunctionId,
        pos: usize,
        kind: InstKind,
    ) -> Result<InstId> {
        if !self.contains_function(function) {
            return Err(IrError::UnknownFunction(function));
        }
        let ty = self.result_type(&kind)?;
        let id = InstId::from_index(self.insts.len());
        self.insts.push(Some(Instruction {
            parent: function,
            kind,
            ty,
            metadata: BTreeMap::new(),
        }));
        let body = &mut self.functions[function.index()]
            .as_mut()
            .ok_or(IrError::UnknownFunction(function))?
            .body;
        let pos = pos.min(body.len());
        body.insert(pos, id);
        Ok(id)
    }

    pub fn inst(&self, id: InstId) -> Option<&Instruction> {
        self.insts.get(id.index()).and_then(Option::as_ref)
    }

    pub fn contains_inst(&self, id: InstId) -> bool {
        self.inst(id).is_some()
    }

    pub fn erase_inst(&mut self, id: InstId) -> Result<Instruction> {
        let inst = self
            .insts
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(IrError::UnknownInstruction(id))?;
        if let Some(function) = self
            .functions
            .get_mut(inst.parent.index())
            .and_then(Option::as_mut)
        {
            function.body.retain(|&i| i != id);
        }
        Ok(inst)
    }

    pub fn set_inst_metadata(&mut self, id: InstId, kind: &str, node: Option<MdId>) -> Result<()> {
        let inst = self
            .insts
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(IrError::UnknownInstruction(id))?;
        match node {
            Some(node) => {
                inst.metadata.insert(kind.to_owned(), node);
            }
            None => {
                inst.metadata.remove(kind);
            }
        }
        Ok(())
    }

    pub fn inst_metadata(&self, id: InstId, kind: &str) -> Option<MdId> {
        self.inst(id).and_then(|i| i.metadata(kind))
    }

    /// Live instructions that use `value` as an operand, in function then program order.
    pub fn users(&self, value: Value) -> Vec<InstId> {
        let mut users = Vec::new();
        for function in self.functions() {
            let Some(f) = self.function(function) else {
                continue;
            };
            for &inst in &f.body {
                if self
                    .inst(inst)
                    .is_some_and(|i| i.kind.operands().contains(&value))
                {
                    users.push(inst);
                }
            }
        }
        users
    }

    /// Rewrites every instruction operand equal to `from` to `to`. Returns the number of
    /// instructions touched.
    pub fn replace_all_uses_with(&mut self, from: Value, to: Value) -> usize {
        let mut touched = 0;
        for inst in self.insts.iter_mut().flatten() {
            if inst.kind.replace_operand(from, to) {
                touched += 1;
            }
        }
        touched
    }

    pub fn value_type(&mut self, value: Value) -> Result<TypeId> {
        match value {
            Value::Inst(id) => self
                .inst(id)
                .map(|i| i.ty)
                .ok_or(IrError::UnknownInstruction(id)),
            Value::Global(id) => {
                let global = self.global(id).ok_or(IrError::UnknownGlobal(id))?;
                let (pointee, address_space) = (global.value_type, global.address_space);
                Ok(self.pointer_type(pointee, address_space))
            }
            Value::Function(id) => self
                .function(id)
                .map(|f| f.ty)
                .ok_or(IrError::UnknownFunction(id)),
            Value::Argument { function, index } => {
                let f = self
                    .function(function)
                    .ok_or(IrError::UnknownFunction(function))?;
                match self.ty(f.ty) {
                    Type::Function { params, .. } => params
                        .get(index as usize)
                        .copied()
                        .ok_or(IrError::UnknownArgument { function, index }),
                    _ => Err(IrError::NotAFunctionType(self.type_name(f.ty))),
                }
            }
            Value::Const(id) => match self.get_constant(id) {
                Some(Constant::Int { ty, .. })
                | Some(Constant::Float { ty, .. })
                | Some(Constant::Undef(ty))
                | Some(Constant::Null(ty)) => Ok(*ty),
                Some(Constant::Bytes(bytes)) => {
                    let len = bytes.len() as u64;
                    let i8_ty = self.int_type(8);
                    Ok(self.array_type(i8_ty, len))
                }
                None => Err(IrError::UnknownConstant(id)),
            },
        }
    }

    fn position_of(&self, anchor: InstId) -> Result<(FunctionId, usize)> {
        let parent = self
            .inst(anchor)
            .ok_or(IrError::UnknownInstruction(anchor))?
            .parent;
        let pos = self
            .function(parent)
            .and_then(|f| f.body.iter().position(|&i| i == anchor))
            .ok_or(IrError::UnknownInstruction(anchor))?;
        Ok((parent, pos))
    }

    fn result_type(&mut self, kind: &InstKind) -> Result<TypeId> {
        match kind {
            InstKind::Alloca { allocated } => {
                Ok(self.pointer_type(*allocated, AddressSpace::Default))
            }
            InstKind::Load { ptr } => {
                let ptr_ty = self.value_type(*ptr)?;
                self.pointee_type(ptr_ty)
                    .ok_or_else(|| IrError::NotAPointerType(self.type_name(ptr_ty)))
            }
            InstKind::Store { ptr, .. } => {
                let ptr_ty = self.value_type(*ptr)?;
                if self.pointee_type(ptr_ty).is_none() {
                    return Err(IrError::NotAPointerType(self.type_name(ptr_ty)));
                }
                Ok(self.void_type())
            }
            InstKind::Binary { lhs, .. } => self.value_type(*lhs),
            InstKind::Call { callee, args } => {
                let f = self
                    .function(*callee)
                    .ok_or(IrError::UnknownFunction(*callee))?;
                match self.ty(f.ty) {
                    Type::Function { ret, params } => {
                        if params.len() != args.len() {
                            return Err(IrError::ArgumentCount {
                                callee: *callee,
                                expected: params.len(),
                                actual: args.len(),
                            });
                        }
                        Ok(*ret)
                    }
                    _ => Err(IrError::NotAFunctionType(self.type_name(f.ty))),
                }
            }
            InstKind::Ret { .. } => Ok(self.void_type()),
        }
    }

    // Metadata.

    pub fn md_string(&mut self, s: impl Into<String>) -> MdId {
        self.push_metadata(Metadata::String(s.into()))
    }

    pub fn md_value(&mut self, value: impl Into<Value>) -> MdId {
        self.push_metadata(Metadata::Value(value.into()))
    }

    pub fn md_tuple(&mut self, operands: Vec<Option<MdId>>) -> MdId {
        self.push_metadata(Metadata::Tuple(operands))
    }

    pub fn metadata(&self, id: MdId) -> Option<&Metadata> {
        self.metadata.get(id.index())
    }

    pub fn named_metadata(&self, name: &str) -> Option<&[MdId]> {
        self.named_metadata.get(name).map(Vec::as_slice)
    }

    /// Replaces the operand list of a named metadata entry, creating it if needed.
    pub fn set_named_metadata(&mut self, name: &str, operands: Vec<MdId>) {
        self.named_metadata.insert(name.to_owned(), operands);
    }

    pub fn add_named_metadata_operand(&mut self, name: &str, operand: MdId) {
        self.named_metadata
            .entry(name.to_owned())
            .or_default()
            .push(operand);
    }

    pub fn remove_named_metadata(&mut self, name: &str) -> bool {
        self.named_metadata.remove(name).is_some()
    }

    pub fn named_metadata_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.named_metadata.keys().map(String::as_str)
    }

    /// Nodes are uniqued: structurally equal nodes share one handle.
    fn push_metadata(&mut self, node: Metadata) -> MdId {
        if let Some(&id) = self.metadata_lookup.get(&node) {
            return id;
        }
        let id = MdId::from_index(self.metadata.len());
        self.metadata.push(node.clone());
        self.metadata_lookup.insert(node, id);
        id
    }

    // Debug info.

    pub fn debug_info(&self) -> &DebugInfo {
        &self.debug_info
    }

    pub fn debug_info_mut(&mut self) -> &mut DebugInfo {
        &mut self.debug_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryOp;
    use pretty_assertions::assert_eq;

    fn void_fn(module: &mut Module, name: &str) -> FunctionId {
        let void = module.void_type();
        let ty = module.function_type(void, Vec::new());
        module.add_function(name, ty).unwrap()
    }

    #[test]
    fn erased_global_leaves_tombstone() {
        let mut module = Module::new("m");
        let f32_ty = module.f32_type();
        let a = module.add_global(GlobalVariable::new("a", f32_ty));
        let b = module.add_global(GlobalVariable::new("b", f32_ty));

        module.erase_global(a).unwrap();
        assert!(module.global(a).is_none());
        assert_eq!(module.globals().collect::<Vec<_>>(), vec![b]);
        assert_eq!(module.erase_global(a), Err(IrError::UnknownGlobal(a)));

        let c = module.add_global(GlobalVariable::new("c", f32_ty));
        assert_ne!(a, c);
    }

    #[test]
    fn instruction_result_types() {
        let mut module = Module::new("m");
        let f = void_fn(&mut module, "main");
        let f32_ty = module.f32_type();
        let one = module.const_f32(1.0);

        let slot = module
            .append_inst(f, InstKind::Alloca { allocated: f32_ty })
            .unwrap();
        let sum = module
            .append_inst(
                f,
                InstKind::Binary {
                    op: BinaryOp::FAdd,
                    lhs: one.into(),
                    rhs: one.into(),
                },
            )
            .unwrap();
        let load = module
            .append_inst(f, InstKind::Load { ptr: slot.into() })
            .unwrap();

        assert_eq!(module.type_name(module.inst(slot).unwrap().ty()), "float*");
        assert_eq!(module.inst(sum).unwrap().ty(), f32_ty);
        assert_eq!(module.inst(load).unwrap().ty(), f32_ty);

        let err = module
            .append_inst(f, InstKind::Load { ptr: sum.into() })
            .unwrap_err();
        assert_eq!(err, IrError::NotAPointerType("float".to_owned()));
    }

    #[test]
    fn insert_after_and_replace_uses() {
        let mut module = Module::new("m");
        let f = void_fn(&mut module, "main");
        let f32_ty = module.f32_type();
        let one = module.const_f32(1.0);
        let two = module.const_f32(2.0);

        let slot = module
            .append_inst(f, InstKind::Alloca { allocated: f32_ty })
            .unwrap();
        let ret = module.append_inst(f, InstKind::Ret { value: None }).unwrap();
        let store = module
            .insert_inst_after(
                slot,
                InstKind::Store {
                    ptr: slot.into(),
                    value: one.into(),
                },
            )
            .unwrap();
        assert_eq!(module.function(f).unwrap().body(), &[slot, store, ret]);
        assert_eq!(module.users(slot.into()), vec![store]);

        assert_eq!(module.replace_all_uses_with(one.into(), two.into()), 1);
        assert_eq!(
            module.inst(store).unwrap().kind(),
            &InstKind::Store {
                ptr: slot.into(),
                value: two.into()
            }
        );
    }

    #[test]
    fn call_arity_is_checked() {
        let mut module = Module::new("m");
        let f = void_fn(&mut module, "main");
        let void = module.void_type();
        let f32_ty = module.f32_type();
        let callee_ty = module.function_type(void, vec![f32_ty]);
        let callee = module.add_function("callee", callee_ty).unwrap();

        let err = module
            .append_inst(
                f,
                InstKind::Call {
                    callee,
                    args: Vec::new(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, IrError::ArgumentCount { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn named_metadata_can_be_replaced_and_removed() {
        let mut module = Module::new("m");
        let s = module.md_string("hello");
        let t = module.md_tuple(vec![Some(s), None]);
        module.add_named_metadata_operand("x", t);
        module.add_named_metadata_operand("x", s);
        assert_eq!(module.named_metadata("x"), Some(&[t, s][..]));

        module.set_named_metadata("x", vec![s]);
        assert_eq!(module.named_metadata("x"), Some(&[s][..]));

        assert!(module.remove_named_metadata("x"));
        assert!(!module.remove_named_metadata("x"));
        assert!(module.named_metadata("x").is_none());
    }

    #[test]
    fn metadata_nodes_are_uniqued() {
        let mut module = Module::new("m");
        let one = module.const_i32(1);
        let a = module.md_string("a");
        assert_eq!(module.md_string("a"), a);
        assert_ne!(module.md_string("b"), a);

        let v = module.md_value(one);
        let t = module.md_tuple(vec![Some(a), None, Some(v)]);
        assert_eq!(module.md_value(one), v);
        assert_eq!(module.md_tuple(vec![Some(a), None, Some(v)]), t);
        assert_ne!(module.md_tuple(vec![Some(a), Some(v)]), t);
    }
}
