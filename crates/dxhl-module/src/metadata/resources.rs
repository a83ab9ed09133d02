use dxhl_ir::MdId;

use super::{Reader, Writer};
use crate::dxil::{ComponentType, ResourceClass, ResourceKind, SamplerKind};
use crate::error::Result;
use crate::resource::{
    BoundResource, CBuffer, Resource, ResourceBinding, ResourceList, ResourceRegistry, Sampler,
};

const BINDING_FIELDS: usize = 6;
const SRV_FIELDS: usize = BINDING_FIELDS + 4;
const CBUFFER_FIELDS: usize = BINDING_FIELDS + 1;
const SAMPLER_FIELDS: usize = BINDING_FIELDS + 1;

/// UAV records grew the rasterizer-ordered flag in minor 1.
fn uav_fields(minor: u32) -> usize {
    BINDING_FIELDS + 5 + usize::from(minor >= 1)
}

/// The id field is the record's position, whatever the in-memory id says.
fn binding_fields(w: &mut Writer<'_>, id: u32, b: &ResourceBinding) -> Vec<Option<MdId>> {
    vec![
        w.u32(id),
        w.value(b.global),
        w.string(&b.name),
        w.u32(b.space),
        w.u32(b.lower_bound),
        w.u32(b.range_size),
    ]
}

fn emit_list<T>(
    w: &mut Writer<'_>,
    list: &ResourceList<T>,
    suffix: impl Fn(&mut Writer<'_>, &T) -> Vec<Option<MdId>>,
) -> Option<MdId>
where
    T: BoundResource,
{
    let records = list
        .iter()
        .enumerate()
        .map(|(pos, record)| {
            let mut ops = binding_fields(w, pos as u32, record.binding());
            ops.extend(suffix(w, record));
            w.tuple(ops)
        })
        .collect();
    w.list(records)
}

pub(super) fn emit(w: &mut Writer<'_>, registry: &ResourceRegistry) -> MdId {
    let srvs = emit_list(w, registry.srvs(), |w, r| {
        vec![
            w.u32(r.kind.to_u32()),
            w.u32(r.component_type.to_u32()),
            w.u32(r.element_stride),
            w.u32(r.sample_count),
        ]
    });
    let uavs = emit_list(w, registry.uavs(), |w, r| {
        vec![
            w.u32(r.kind.to_u32()),
            w.u32(r.component_type.to_u32()),
            w.u32(r.element_stride),
            w.bool(r.globally_coherent),
            w.bool(r.has_counter),
            w.bool(r.rasterizer_ordered),
        ]
    });
    let cbuffers = emit_list(w, registry.cbuffers(), |w, cb| vec![w.u32(cb.size_in_bytes)]);
    let samplers = emit_list(w, registry.samplers(), |w, s| vec![w.u32(s.kind.to_u32())]);
    w.tuple(vec![srvs, uavs, cbuffers, samplers])
}

fn load_binding(r: &Reader<'_>, ops: &[Option<MdId>]) -> Result<ResourceBinding> {
    Ok(ResourceBinding {
        id: r.u32(ops[0], "resource id")?,
        global: r.global(ops[1], "resource global")?,
        name: r.string(ops[2], "resource name")?.to_owned(),
        space: r.u32(ops[3], "register space")?,
        lower_bound: r.u32(ops[4], "lower bound")?,
        range_size: r.u32(ops[5], "range size")?,
    })
}

fn load_list<T>(
    r: &Reader<'_>,
    class: ResourceClass,
    op: Option<MdId>,
    arity: usize,
    decode: impl Fn(ResourceBinding, &[Option<MdId>]) -> Result<T>,
) -> Result<ResourceList<T>>
where
    T: BoundResource,
{
    let mut records = Vec::new();
    for (pos, &node) in r.opt_tuple(op)?.iter().enumerate() {
        let node = node.ok_or_else(|| r.malformed(format!("{class:?} record {pos} is null")))?;
        let ops = r.record(node, arity, "resource record")?;
        let binding = load_binding(r, ops)?;
        if binding.id as usize != pos {
            return Err(r.malformed(format!(
                "{class:?} record at position {pos} carries id {}",
                binding.id
            )));
        }
        records.push(decode(binding, &ops[BINDING_FIELDS..])?);
    }
    Ok(ResourceList::from_records(class, records))
}

pub(super) fn load(r: &Reader<'_>, node: MdId) -> Result<ResourceRegistry> {
    let ops = r.record(node, 4, "resource table")?;

    let srvs = load_list(r, ResourceClass::Srv, ops[0], SRV_FIELDS, |binding, f| {
        Ok(Resource {
            class: ResourceClass::Srv,
            kind: r.enumerated(f[0], "resource kind", ResourceKind::from_u32)?,
            component_type: r.enumerated(f[1], "component type", ComponentType::from_u32)?,
            element_stride: r.u32(f[2], "element stride")?,
            sample_count: r.u32(f[3], "sample count")?,
            ..Resource::new(binding, ResourceKind::Invalid)
        })
    })?;
    let uavs = load_list(r, ResourceClass::Uav, ops[1], uav_fields(r.minor()), |binding, f| {
        let rasterizer_ordered = match f.get(5) {
            Some(&op) => r.bool(op, "rasterizer ordered")?,
            None => false,
        };
        Ok(Resource {
            class: ResourceClass::Uav,
            kind: r.enumerated(f[0], "resource kind", ResourceKind::from_u32)?,
            component_type: r.enumerated(f[1], "component type", ComponentType::from_u32)?,
            element_stride: r.u32(f[2], "element stride")?,
            globally_coherent: r.bool(f[3], "globally coherent")?,
            has_counter: r.bool(f[4], "has counter")?,
            rasterizer_ordered,
            ..Resource::new(binding, ResourceKind::Invalid)
        })
    })?;
    let cbuffers = load_list(r, ResourceClass::CBuffer, ops[2], CBUFFER_FIELDS, |binding, f| {
        Ok(CBuffer::new(binding, r.u32(f[0], "cbuffer size")?))
    })?;
    let samplers = load_list(r, ResourceClass::Sampler, ops[3], SAMPLER_FIELDS, |binding, f| {
        Ok(Sampler::new(
            binding,
            r.enumerated(f[0], "sampler kind", SamplerKind::from_u32)?,
        ))
    })?;

    Ok(ResourceRegistry {
        cbuffers,
        samplers,
        srvs,
        uavs,
    })
}
