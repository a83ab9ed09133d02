use dxhl_ir::MdId;

use super::{Reader, Writer};
use crate::dxil::{
    ComponentType, InputQualifier, InterpolationMode, MatrixOrientation, ResourceClass,
    ResourceKind,
};
use crate::error::Result;
use crate::type_system::{
    FieldAnnotation, FunctionAnnotation, ParameterAnnotation, ResourceTypeAnnotations,
    StructAnnotation, TypeSystem,
};

const STRUCT_FIELDS: usize = 3;
const FIELD_FIELDS: usize = 6;
const FUNCTION_FIELDS: usize = 3;
const RESOURCE_TYPE_FIELDS: usize = 3;

/// Parameter records grew the matrix orientation in minor 1.
fn parameter_fields(minor: u32) -> usize {
    4 + usize::from(minor >= 1)
}

fn emit_field(w: &mut Writer<'_>, field: &FieldAnnotation) -> MdId {
    let ops = vec![
        w.string(&field.name),
        w.u32(field.cbuffer_offset),
        w.u32(field.component_type.to_u32()),
        w.u32(field.matrix_orientation.to_u32()),
        w.opt_string(field.semantic.as_deref()),
        w.bool(field.precise),
    ];
    w.tuple(ops)
}

fn emit_parameter(w: &mut Writer<'_>, param: &ParameterAnnotation) -> MdId {
    let ops = vec![
        w.u32(param.input_qualifier.to_u32()),
        w.opt_string(param.semantic.as_deref()),
        w.u32(param.interpolation_mode.to_u32()),
        w.bool(param.precise),
        w.u32(param.matrix_orientation.to_u32()),
    ];
    w.tuple(ops)
}

/// Two operands: the struct annotations, then the function annotations.
pub(super) fn emit_type_system(w: &mut Writer<'_>, types: &TypeSystem) -> Vec<MdId> {
    let structs = types
        .struct_annotations()
        .map(|(ty, annotation)| {
            let placeholder = w.module().undef(ty);
            let fields = annotation
                .fields
                .iter()
                .map(|field| emit_field(w, field))
                .collect();
            let ops = vec![
                w.value(placeholder),
                w.u32(annotation.cbuffer_size),
                w.list(fields),
            ];
            Some(w.tuple(ops))
        })
        .collect();
    let functions = types
        .function_annotations()
        .map(|(f, annotation)| {
            let params = annotation
                .params
                .iter()
                .map(|p| emit_parameter(w, p))
                .collect();
            let ops = vec![
                w.value(f),
                Some(emit_parameter(w, &annotation.ret)),
                w.list(params),
            ];
            Some(w.tuple(ops))
        })
        .collect();
    vec![w.tuple(structs), w.tuple(functions)]
}

fn load_field(r: &Reader<'_>, node: Option<MdId>) -> Result<FieldAnnotation> {
    let node = node.ok_or_else(|| r.malformed("field annotation is null"))?;
    let f = r.record(node, FIELD_FIELDS, "field annotation")?;
    Ok(FieldAnnotation {
        name: r.string(f[0], "field name")?.to_owned(),
        cbuffer_offset: r.u32(f[1], "cbuffer offset")?,
        component_type: r.enumerated(f[2], "component type", ComponentType::from_u32)?,
        matrix_orientation: r.enumerated(
            f[3],
            "matrix orientation",
            MatrixOrientation::from_u32,
        )?,
        semantic: r.opt_string(f[4], "field semantic")?.map(str::to_owned),
        precise: r.bool(f[5], "field precise")?,
    })
}

fn load_parameter(r: &Reader<'_>, node: Option<MdId>) -> Result<ParameterAnnotation> {
    let node = node.ok_or_else(|| r.malformed("parameter annotation is null"))?;
    let f = r.record(node, parameter_fields(r.minor()), "parameter annotation")?;
    let matrix_orientation = match f.get(4) {
        Some(&op) => r.enumerated(op, "matrix orientation", MatrixOrientation::from_u32)?,
        None => MatrixOrientation::Undefined,
    };
    Ok(ParameterAnnotation {
        input_qualifier: r.enumerated(f[0], "input qualifier", InputQualifier::from_u32)?,
        semantic: r.opt_string(f[1], "parameter semantic")?.map(str::to_owned),
        interpolation_mode: r.enumerated(
            f[2],
            "interpolation mode",
            InterpolationMode::from_u32,
        )?,
        precise: r.bool(f[3], "parameter precise")?,
        matrix_orientation,
    })
}

pub(super) fn load_type_system(r: &Reader<'_>, operands: &[MdId]) -> Result<TypeSystem> {
    let [structs, functions] = operands else {
        return Err(r.malformed(format!("expected 2 operands, found {}", operands.len())));
    };
    let mut types = TypeSystem::default();
    for &node in r.tuple(*structs)? {
        let node = node.ok_or_else(|| r.malformed("struct annotation is null"))?;
        let ops = r.record(node, STRUCT_FIELDS, "struct annotation")?;
        let ty = r.ty(ops[0], "annotated struct")?;
        let fields = r
            .opt_tuple(ops[2])?
            .iter()
            .map(|&f| load_field(r, f))
            .collect::<Result<_>>()?;
        types.add_struct_annotation(
            ty,
            StructAnnotation {
                fields,
                cbuffer_size: r.u32(ops[1], "cbuffer size")?,
            },
        );
    }
    for &node in r.tuple(*functions)? {
        let node = node.ok_or_else(|| r.malformed("function annotation is null"))?;
        let ops = r.record(node, FUNCTION_FIELDS, "function annotation")?;
        let function = r.function(ops[0], "annotated function")?;
        let params = r
            .opt_tuple(ops[2])?
            .iter()
            .map(|&p| load_parameter(r, p))
            .collect::<Result<_>>()?;
        types.add_function_annotation(
            function,
            FunctionAnnotation {
                ret: load_parameter(r, ops[1])?,
                params,
            },
        );
    }
    Ok(types)
}

/// A single operand holding every annotation, or nothing when the table is empty.
pub(super) fn emit_resource_types(
    w: &mut Writer<'_>,
    table: &ResourceTypeAnnotations,
) -> Vec<MdId> {
    let entries: Vec<MdId> = table
        .iter()
        .map(|(ty, class, kind)| {
            let placeholder = w.module().undef(ty);
            let ops = vec![
                w.value(placeholder),
                w.u32(class.to_u32()),
                w.u32(kind.to_u32()),
            ];
            w.tuple(ops)
        })
        .collect();
    w.list(entries).into_iter().collect()
}

pub(super) fn load_resource_types(r: &Reader<'_>, node: MdId) -> Result<ResourceTypeAnnotations> {
    let mut table = ResourceTypeAnnotations::default();
    for &entry in r.tuple(node)? {
        let entry = entry.ok_or_else(|| r.malformed("resource type annotation is null"))?;
        let ops = r.record(entry, RESOURCE_TYPE_FIELDS, "resource type annotation")?;
        table.add(
            r.ty(ops[0], "annotated type")?,
            r.enumerated(ops[1], "resource class", ResourceClass::from_u32)?,
            r.enumerated(ops[2], "resource kind", ResourceKind::from_u32)?,
        );
    }
    Ok(table)
}
