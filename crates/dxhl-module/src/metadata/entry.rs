use dxhl_ir::MdId;

use super::{Reader, Writer};
use crate::dxil::{ComponentType, InterpolationMode, SemanticKind, ShaderKind};
use crate::error::Result;
use crate::module::HlTables;
use crate::shader_model::ShaderModel;
use crate::signature::{Signature, SignatureElement, SignatureKind};

const SIGNATURE_ELEMENT_FIELDS: usize = 11;

pub(super) fn emit_shader_model(w: &mut Writer<'_>, sm: &ShaderModel) -> MdId {
    let ops = vec![
        w.string(sm.kind.prefix()),
        w.u32(sm.major),
        w.u32(sm.minor),
    ];
    w.tuple(ops)
}

pub(super) fn load_shader_model(r: &Reader<'_>, node: MdId) -> Result<ShaderModel> {
    let ops = r.record(node, 3, "shader model")?;
    let prefix = r.string(ops[0], "shader kind")?;
    let kind = ShaderKind::from_prefix(prefix)
        .ok_or_else(|| r.malformed(format!("unknown shader kind `{prefix}`")))?;
    Ok(ShaderModel::new(
        kind,
        r.u32(ops[1], "major")?,
        r.u32(ops[2], "minor")?,
    ))
}

fn emit_element(w: &mut Writer<'_>, e: &SignatureElement) -> MdId {
    let indices = e.semantic_indices.iter().map(|&i| w.u32(i)).collect();
    let indices = Some(w.tuple(indices));
    let ops = vec![
        w.u32(e.id),
        w.string(&e.semantic_name),
        w.u32(e.component_type.to_u32()),
        w.u32(e.semantic_kind.to_u32()),
        indices,
        w.u32(e.interpolation_mode.to_u32()),
        w.u32(e.rows),
        w.u32(e.cols),
        w.opt_u32(e.start_row),
        w.opt_u32(e.start_col),
        w.u32(e.output_stream),
    ];
    w.tuple(ops)
}

fn emit_signature(w: &mut Writer<'_>, sig: &Signature) -> Option<MdId> {
    let elements = sig.elements().iter().map(|e| emit_element(w, e)).collect();
    w.list(elements)
}

pub(super) fn emit_entry_point(w: &mut Writer<'_>, tables: &HlTables) -> MdId {
    let signatures = SignatureKind::ALL
        .iter()
        .map(|&kind| emit_signature(w, tables.signatures.get(kind)))
        .collect();
    let signatures = Some(w.tuple(signatures));
    let ops = vec![
        w.opt_value(tables.entry_function),
        w.string(&tables.entry_name),
        signatures,
    ];
    w.tuple(ops)
}

fn load_element(r: &Reader<'_>, node: MdId) -> Result<SignatureElement> {
    let ops = r.record(node, SIGNATURE_ELEMENT_FIELDS, "signature element")?;
    let semantic_indices = r
        .tuple(ops[4].ok_or_else(|| r.malformed("semantic indices are null"))?)?
        .iter()
        .map(|&i| r.u32(i, "semantic index"))
        .collect::<Result<_>>()?;
    Ok(SignatureElement {
        id: r.u32(ops[0], "element id")?,
        semantic_name: r.string(ops[1], "semantic name")?.to_owned(),
        component_type: r.enumerated(ops[2], "component type", ComponentType::from_u32)?,
        semantic_kind: r.enumerated(ops[3], "semantic kind", SemanticKind::from_u32)?,
        semantic_indices,
        interpolation_mode: r.enumerated(
            ops[5],
            "interpolation mode",
            InterpolationMode::from_u32,
        )?,
        rows: r.u32(ops[6], "rows")?,
        cols: r.u32(ops[7], "cols")?,
        start_row: r.opt_u32(ops[8], "start row")?,
        start_col: r.opt_u32(ops[9], "start col")?,
        output_stream: r.u32(ops[10], "output stream")?,
    })
}

pub(super) fn load_entry_point(r: &Reader<'_>, node: MdId, tables: &mut HlTables) -> Result<()> {
    let ops = r.record(node, 3, "entry point")?;
    tables.entry_function = r.opt_function(ops[0], "entry function")?;
    tables.entry_name = r.string(ops[1], "entry name")?.to_owned();

    let signatures = r.record(
        ops[2].ok_or_else(|| r.malformed("signature list is null"))?,
        SignatureKind::ALL.len(),
        "signature list",
    )?;
    for (&kind, &op) in SignatureKind::ALL.iter().zip(signatures) {
        let sig = tables.signatures.get_mut(kind);
        for &element in r.opt_tuple(op)? {
            let element = element.ok_or_else(|| r.malformed("signature element is null"))?;
            let element = load_element(r, element)?;
            if element.id as usize != sig.len() {
                return Err(r.malformed(format!(
                    "{kind:?} signature element {} out of order",
                    element.id
                )));
            }
            sig.append_element(element);
        }
    }
    Ok(())
}
