//! Keeps global-variable debug info in step with globals that legalization splits or
//! replaces.

use dxhl_ir::{
    DebugInfoFinder, DiCompileUnitId, DiGlobalVariable, DiGlobalVariableId, GlobalId, IrError,
    Module,
};
use tracing::trace;

use crate::error::{HlError, Result};

/// Bit geometry of an element carved out of an aggregate global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementGeometry {
    pub size_in_bits: u64,
    pub align_in_bits: u64,
    pub offset_in_bits: u64,
}

/// Finds the debug record describing `global`, if any.
pub fn find_global_variable_debug_info(
    module: &Module,
    global: GlobalId,
    finder: &DebugInfoFinder,
) -> Option<DiGlobalVariableId> {
    let debug_info = module.debug_info();
    finder
        .global_variables()
        .iter()
        .copied()
        .find(|&var| debug_info.global_variable(var).variable == Some(global))
}

fn global_name(module: &Module, global: GlobalId) -> Result<String> {
    module
        .global(global)
        .map(|g| g.name.clone())
        .ok_or(HlError::Ir(IrError::UnknownGlobal(global)))
}

/// Locates the compile unit listing `var`, and `var`'s position in its global list.
fn compile_unit_slot(
    module: &Module,
    finder: &DebugInfoFinder,
    var: DiGlobalVariableId,
) -> Option<(DiCompileUnitId, usize)> {
    let debug_info = module.debug_info();
    finder.compile_units().iter().find_map(|&unit| {
        debug_info
            .compile_unit(unit)
            .globals
            .iter()
            .position(|&g| g == var)
            .map(|pos| (unit, pos))
    })
}

/// Creates the debug record of `element`, a piece of the aggregate `global`.
///
/// The record's type is a member of the aggregate's type at `geometry`, and both the
/// record and its type are named after the aggregate with `element_name` appended. The
/// record is listed just before the aggregate's record in the same compile unit and is
/// added to `finder`.
pub fn create_element_global_variable_debug_info(
    module: &mut Module,
    global: GlobalId,
    finder: &mut DebugInfoFinder,
    element: GlobalId,
    geometry: ElementGeometry,
    element_name: &str,
) -> Result<DiGlobalVariableId> {
    let whole = find_global_variable_debug_info(module, global, finder)
        .ok_or(HlError::MissingDebugInfo(global))?;
    let (unit, pos) =
        compile_unit_slot(module, finder, whole).ok_or(HlError::DetachedDebugInfo(global))?;
    let linkage_name = global_name(module, element)?;

    let debug_info = module.debug_info_mut();
    let whole_var = debug_info.global_variable(whole).clone();
    let whole_ty = debug_info.ty(whole_var.ty).clone();
    let element_ty = debug_info.create_member_type(
        whole_ty.scope,
        format!("{}{element_name}", whole_ty.name),
        whole_ty.file,
        whole_ty.line,
        geometry.size_in_bits,
        geometry.align_in_bits,
        geometry.offset_in_bits,
        whole_var.ty,
    );
    let var = debug_info.create_global_variable(DiGlobalVariable {
        name: format!("{}{element_name}", whole_var.name),
        linkage_name,
        file: whole_var.file,
        line: whole_var.line,
        ty: element_ty,
        is_local: false,
        is_definition: true,
        variable: Some(element),
    });
    debug_info.compile_unit_mut(unit).globals.insert(pos, var);
    finder.append_global_variable(var);

    trace!(%global, %element, element_name, "created element debug info");
    Ok(var)
}

/// Points the debug record of `global` at `new_global`, which replaces it.
///
/// A copy of the record is made that refers to `new_global` and keeps every other field;
/// it takes the old record's place in its compile unit and in `finder`.
pub fn update_global_variable_debug_info(
    module: &mut Module,
    global: GlobalId,
    finder: &mut DebugInfoFinder,
    new_global: GlobalId,
) -> Result<DiGlobalVariableId> {
    let old = find_global_variable_debug_info(module, global, finder)
        .ok_or(HlError::MissingDebugInfo(global))?;
    let (unit, pos) =
        compile_unit_slot(module, finder, old).ok_or(HlError::DetachedDebugInfo(global))?;
    if !module.contains_global(new_global) {
        return Err(HlError::Ir(IrError::UnknownGlobal(new_global)));
    }

    let debug_info = module.debug_info_mut();
    let record = DiGlobalVariable {
        variable: Some(new_global),
        ..debug_info.global_variable(old).clone()
    };
    let var = debug_info.create_global_variable(record);
    debug_info.compile_unit_mut(unit).globals[pos] = var;
    finder.replace_global_variable(old, var);

    trace!(%global, %new_global, "updated global debug info");
    Ok(var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxhl_ir::{DiType, DiTypeTag, GlobalVariable};
    use pretty_assertions::assert_eq;

    struct Fixture {
        module: Module,
        whole: GlobalId,
        whole_var: DiGlobalVariableId,
        unit: DiCompileUnitId,
    }

    fn fixture() -> Fixture {
        let mut module = Module::new("t");
        let f32_ty = module.f32_type();
        let s = module.struct_type("struct.S", vec![f32_ty, f32_ty]);
        let whole = module.add_global(GlobalVariable::new("g", s));

        let debug_info = module.debug_info_mut();
        let unit = debug_info.add_compile_unit("a.hlsl", "dxc");
        let ty = debug_info.add_type(DiType {
            tag: DiTypeTag::Composite,
            name: "S".into(),
            file: "a.hlsl".into(),
            line: 3,
            size_in_bits: 64,
            align_in_bits: 32,
            offset_in_bits: 0,
            scope: None,
            base_type: None,
        });
        let whole_var = debug_info.add_global_variable(
            unit,
            DiGlobalVariable {
                name: "g".into(),
                linkage_name: "g".into(),
                file: "a.hlsl".into(),
                line: 7,
                ty,
                is_local: false,
                is_definition: true,
                variable: Some(whole),
            },
        );
        Fixture {
            module,
            whole,
            whole_var,
            unit,
        }
    }

    #[test]
    fn finds_records_by_global() {
        let fx = fixture();
        let finder = DebugInfoFinder::process_module(&fx.module);
        assert_eq!(
            find_global_variable_debug_info(&fx.module, fx.whole, &finder),
            Some(fx.whole_var)
        );
    }

    #[test]
    fn globals_without_records_are_not_found() {
        let mut fx = fixture();
        let f32_ty = fx.module.f32_type();
        let other = fx.module.add_global(GlobalVariable::new("h", f32_ty));
        let finder = DebugInfoFinder::process_module(&fx.module);
        assert_eq!(
            find_global_variable_debug_info(&fx.module, other, &finder),
            None
        );
    }

    #[test]
    fn element_records_precede_the_whole_record() {
        let mut fx = fixture();
        let f32_ty = fx.module.f32_type();
        let element = fx.module.add_global(GlobalVariable::new("g.1", f32_ty));
        let mut finder = DebugInfoFinder::process_module(&fx.module);

        let var = create_element_global_variable_debug_info(
            &mut fx.module,
            fx.whole,
            &mut finder,
            element,
            ElementGeometry {
                size_in_bits: 32,
                align_in_bits: 32,
                offset_in_bits: 32,
            },
            ".y",
        )
        .unwrap();

        let debug_info = fx.module.debug_info();
        let record = debug_info.global_variable(var);
        assert_eq!(record.name, "g.y");
        assert_eq!(record.linkage_name, "g.1");
        assert_eq!(record.line, 7);
        assert_eq!(record.variable, Some(element));

        let ty = debug_info.ty(record.ty);
        assert_eq!(ty.tag, DiTypeTag::Member);
        assert_eq!(ty.name, "S.y");
        assert_eq!(ty.line, 3);
        assert_eq!(ty.offset_in_bits, 32);
        assert_eq!(ty.base_type, Some(debug_info.global_variable(fx.whole_var).ty));

        assert_eq!(
            debug_info.compile_unit(fx.unit).globals,
            vec![var, fx.whole_var]
        );
        assert_eq!(
            find_global_variable_debug_info(&fx.module, element, &finder),
            Some(var)
        );
    }

    #[test]
    fn updates_replace_the_record_in_place() {
        let mut fx = fixture();
        let s = fx.module.global(fx.whole).unwrap().value_type;
        let replacement = fx.module.add_global(GlobalVariable::new("g.new", s));
        let mut finder = DebugInfoFinder::process_module(&fx.module);

        let var =
            update_global_variable_debug_info(&mut fx.module, fx.whole, &mut finder, replacement)
                .unwrap();

        let debug_info = fx.module.debug_info();
        let record = debug_info.global_variable(var);
        let old = debug_info.global_variable(fx.whole_var);
        assert_eq!(record.name, old.name);
        assert_eq!(record.ty, old.ty);
        // Only the variable changes; the linkage name stays the source-level one.
        assert_eq!(record.linkage_name, "g");
        assert_eq!(record.variable, Some(replacement));
        assert_eq!(debug_info.compile_unit(fx.unit).globals, vec![var]);
        assert_eq!(finder.global_variables(), &[var]);
        assert_eq!(
            find_global_variable_debug_info(&fx.module, fx.whole, &finder),
            None
        );
    }

    #[test]
    fn missing_records_are_reported() {
        let mut fx = fixture();
        let f32_ty = fx.module.f32_type();
        let orphan = fx.module.add_global(GlobalVariable::new("orphan", f32_ty));
        let mut finder = DebugInfoFinder::process_module(&fx.module);
        assert_eq!(
            update_global_variable_debug_info(&mut fx.module, orphan, &mut finder, fx.whole),
            Err(HlError::MissingDebugInfo(orphan))
        );
    }
}
