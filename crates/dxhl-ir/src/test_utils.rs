use crate::{FunctionId, InstId, InstKind, Module, Result, Type, Value};

/// Promotes stack slots in `function` to SSA values, the way a register-promotion pass would.
///
/// A slot is promotable when every use is a load from it, a store to it, or an annotation
/// call: a call to a void declaration whose only argument is the slot. Loads are replaced by
/// the most recently stored value (or `undef` before the first store), and the slot, its
/// stores and its loads are deleted. Annotation calls are not dropped: each one is re-issued
/// after every store with the stored value as its argument, so the annotation follows the
/// promoted value.
///
/// Returns the number of promoted slots.
pub fn promote_allocas(module: &mut Module, function: FunctionId) -> Result<usize> {
    let Some(f) = module.function(function) else {
        return Ok(0);
    };
    let slots: Vec<InstId> = f
        .body()
        .iter()
        .copied()
        .filter(|&i| matches!(module.inst(i).map(|i| i.kind()), Some(InstKind::Alloca { .. })))
        .collect();

    let mut promoted = 0;
    for slot in slots {
        if promote_slot(module, function, slot)? {
            promoted += 1;
        }
    }
    Ok(promoted)
}

fn promote_slot(module: &mut Module, function: FunctionId, slot: InstId) -> Result<bool> {
    let slot_value = Value::Inst(slot);
    let allocated = match module.inst(slot).map(|i| i.kind()) {
        Some(InstKind::Alloca { allocated }) => *allocated,
        _ => return Ok(false),
    };

    let mut annotations = Vec::new();
    for user in module.users(slot_value) {
        let Some(inst) = module.inst(user) else {
            continue;
        };
        match inst.kind() {
            InstKind::Load { ptr } if *ptr == slot_value => {}
            InstKind::Store { ptr, value } if *ptr == slot_value && *value != slot_value => {}
            InstKind::Call { callee, args } if args.len() == 1 && args[0] == slot_value => {
                let is_annotation = module.function(*callee).is_some_and(|f| {
                    f.is_declaration() && returns_void(module, f.function_type())
                });
                if !is_annotation {
                    return Ok(false);
                }
                annotations.push((user, *callee));
            }
            _ => return Ok(false),
        }
    }

    let undef = module.undef(allocated);
    let mut current = Value::Const(undef);
    let mut loads: Vec<(InstId, Value)> = Vec::new();
    let mut stores: Vec<(InstId, Value)> = Vec::new();

    let body = module
        .function(function)
        .map(|f| f.body().to_vec())
        .unwrap_or_default();
    for inst in body {
        match module.inst(inst).map(|i| i.kind()) {
            Some(InstKind::Load { ptr }) if *ptr == slot_value => loads.push((inst, current)),
            Some(InstKind::Store { ptr, value }) if *ptr == slot_value => {
                // A stored value may itself be a load of this slot that is about to disappear.
                let value = loads
                    .iter()
                    .find(|(load, _)| Value::Inst(*load) == *value)
                    .map(|(_, replacement)| *replacement)
                    .unwrap_or(*value);
                current = value;
                stores.push((inst, value));
            }
            _ => {}
        }
    }

    for &(store, value) in &stores {
        for &(_, callee) in &annotations {
            module.insert_inst_after(
                store,
                InstKind::Call {
                    callee,
                    args: vec![value],
                },
            )?;
        }
    }
    for (load, replacement) in loads {
        module.replace_all_uses_with(Value::Inst(load), replacement);
        module.erase_inst(load)?;
    }
    for (call, _) in annotations {
        module.erase_inst(call)?;
    }
    for (store, _) in stores {
        module.erase_inst(store)?;
    }
    module.erase_inst(slot)?;
    Ok(true)
}

fn returns_void(module: &Module, fn_ty: crate::TypeId) -> bool {
    match module.ty(fn_ty) {
        Type::Function { ret, .. } => matches!(module.ty(*ret), Type::Void),
        _ => false,
    }
}
