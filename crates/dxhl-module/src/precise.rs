//! Precise markers: tagging values that must not be reassociated.
//!
//! The final form of the marker is `dx.precise` metadata on the instruction that defines
//! the value. Values that still live in stack slots are marked with a call to a
//! `dx.attribute.precise.<type>` declaration taking the slot pointer instead, because
//! register promotion deletes the slot and its stores. Promotion carries such calls over
//! to the stored values, and [`convert_precise_marker_calls`] then turns every surviving
//! call into metadata and deletes the calls. Until that sweep has run, marker calls are
//! still present in the IR and must not be taken for real side effects.

use std::collections::BTreeSet;

use dxhl_ir::{FunctionId, InstId, InstKind, Module, Value};
use tracing::trace;

use crate::error::{HlError, Result};

/// Metadata kind carried by precise instructions and marker declarations.
pub const PRECISE_MD_KIND: &str = "dx.precise";

/// Name prefix of the marker declarations.
pub const PRECISE_MARKER_PREFIX: &str = "dx.attribute.precise.";

pub fn has_precise_attribute_with_metadata(module: &Module, inst: InstId) -> bool {
    module.inst_metadata(inst, PRECISE_MD_KIND).is_some()
}

pub fn mark_precise_attribute_with_metadata(module: &mut Module, inst: InstId) -> Result<()> {
    let one = module.const_i32(1);
    let one = module.md_value(one);
    let node = module.md_tuple(vec![Some(one)]);
    module.set_inst_metadata(inst, PRECISE_MD_KIND, Some(node))?;
    Ok(())
}

pub fn clear_precise_attribute_with_metadata(module: &mut Module, inst: InstId) -> Result<()> {
    module.set_inst_metadata(inst, PRECISE_MD_KIND, None)?;
    Ok(())
}

/// Whether `function` is a marker declaration.
pub fn is_precise_marker_function(module: &Module, function: FunctionId) -> bool {
    module.function(function).is_some_and(|f| {
        f.is_declaration()
            && f.name().starts_with(PRECISE_MARKER_PREFIX)
            && module.function_metadata(function, PRECISE_MD_KIND).is_some()
    })
}

/// Whether `function` is precise as a whole or contains a precise instruction.
pub fn has_precise_attribute(module: &Module, function: FunctionId) -> bool {
    if module.function_metadata(function, PRECISE_MD_KIND).is_some() {
        return true;
    }
    module.function(function).is_some_and(|f| {
        f.body()
            .iter()
            .any(|&inst| has_precise_attribute_with_metadata(module, inst))
    })
}

fn marker_function(module: &mut Module, ptr_ty: dxhl_ir::TypeId) -> Result<FunctionId> {
    let pointee = module
        .pointee_type(ptr_ty)
        .ok_or_else(|| HlError::NotAPointer(module.type_name(ptr_ty)))?;
    let name = format!("{PRECISE_MARKER_PREFIX}{}", module.type_name(pointee));
    let void = module.void_type();
    let fn_ty = module.function_type(void, vec![ptr_ty]);
    let marker = module.get_or_insert_function(&name, fn_ty)?;
    if module.function_metadata(marker, PRECISE_MD_KIND).is_none() {
        let kind = module.md_string(PRECISE_MD_KIND);
        let node = module.md_tuple(vec![Some(kind)]);
        module.set_function_metadata(marker, PRECISE_MD_KIND, Some(node))?;
    }
    Ok(marker)
}

/// Functions containing a store through `ptr`, in module order.
fn storing_functions(module: &Module, ptr: Value) -> Vec<FunctionId> {
    let mut functions = Vec::new();
    for user in module.users(ptr) {
        let Some(inst) = module.inst(user) else {
            continue;
        };
        if matches!(inst.kind(), InstKind::Store { ptr: p, .. } if *p == ptr)
            && !functions.contains(&inst.parent())
        {
            functions.push(inst.parent());
        }
    }
    functions
}

/// Marks the value held in `ptr` as precise with a marker call that survives promotion.
///
/// For a stack slot the call follows the slot's allocation; for a function argument it
/// opens the function; for a global it opens every function storing to the global.
/// Returns the inserted calls.
pub fn mark_precise_attribute_on_ptr_with_function_call(
    module: &mut Module,
    ptr: Value,
) -> Result<Vec<InstId>> {
    let ptr_ty = module.value_type(ptr)?;
    let marker = marker_function(module, ptr_ty)?;
    let call = || InstKind::Call {
        callee: marker,
        args: vec![ptr],
    };

    let calls = match ptr {
        Value::Inst(slot) => vec![module.insert_inst_after(slot, call())?],
        Value::Argument { function, .. } => vec![module.insert_inst_at(function, 0, call())?],
        Value::Global(_) => storing_functions(module, ptr)
            .into_iter()
            .map(|f| module.insert_inst_at(f, 0, call()))
            .collect::<dxhl_ir::Result<_>>()?,
        Value::Function(_) | Value::Const(_) => {
            return Err(HlError::NotAPointer(module.type_name(ptr_ty)))
        }
    };
    trace!(?ptr, %marker, calls = calls.len(), "inserted precise marker calls");
    Ok(calls)
}

fn defining_inst(value: Value) -> Option<InstId> {
    match value {
        Value::Inst(inst) => Some(inst),
        _ => None,
    }
}

/// Converts every marker call into `dx.precise` metadata and deletes the calls.
///
/// A call on a non-pointer value marks the instruction defining that value. A call on a
/// pointer that is still in use marks the instructions defining each value stored through
/// it. Marker declarations left without calls are deleted. Returns the number of calls
/// converted.
pub fn convert_precise_marker_calls(module: &mut Module) -> Result<usize> {
    let markers: BTreeSet<FunctionId> = module
        .functions()
        .filter(|&f| is_precise_marker_function(module, f))
        .collect();
    if markers.is_empty() {
        return Ok(0);
    }

    let mut calls = Vec::new();
    for function in module.functions().collect::<Vec<_>>() {
        let Some(f) = module.function(function) else {
            continue;
        };
        for &inst in f.body() {
            if let Some(InstKind::Call { callee, args }) = module.inst(inst).map(|i| i.kind()) {
                if markers.contains(callee) {
                    calls.push((inst, args.first().copied()));
                }
            }
        }
    }

    for &(call, arg) in &calls {
        let mut targets = Vec::new();
        if let Some(arg) = arg {
            let arg_ty = module.value_type(arg)?;
            if module.pointee_type(arg_ty).is_some() {
                for user in module.users(arg) {
                    match module.inst(user).map(|i| i.kind()) {
                        Some(InstKind::Store { ptr, value }) if *ptr == arg => {
                            targets.extend(defining_inst(*value));
                        }
                        _ => {}
                    }
                }
            } else {
                targets.extend(defining_inst(arg));
            }
        }
        for target in targets {
            mark_precise_attribute_with_metadata(module, target)?;
        }
        module.erase_inst(call)?;
    }

    for marker in markers {
        if module.users(Value::Function(marker)).is_empty() {
            module.erase_function(marker)?;
        }
    }
    trace!(converted = calls.len(), "converted precise marker calls");
    Ok(calls.len())
}
