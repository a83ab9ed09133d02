//! Serialization of the module's side-tables into named module metadata.
//!
//! Every group lives under one reserved name. The schema carries a single
//! `(major, minor)` version in `dx.version`:
//!
//! * a different major version is rejected;
//! * an older minor version loads with newer fields defaulted;
//! * a newer minor version loads with unknown trailing fields ignored.
//!
//! Emission builds every node before touching any named entry, and loading decodes every
//! group before the caller commits the result, so neither leaves a half-written state.

mod entry;
mod props;
mod reader;
mod resources;
mod types;

use dxhl_ir::{Constant, GlobalId, MdId, Module, Value};
use tracing::{debug, warn};

use crate::error::{HlError, Result};
use crate::module::HlTables;
use crate::options::HlOptions;
use crate::signature::RootSignatureHandle;

pub(crate) use self::reader::Reader;

pub const VERSION: &str = "dx.version";
pub const SHADER_MODEL: &str = "dx.shaderModel";
pub const ENTRY_POINTS: &str = "dx.entryPoints";
pub const RESOURCES: &str = "dx.resources";
pub const TYPE_ANNOTATIONS: &str = "dx.typeAnnotations";
pub const FUNCTION_PROPS: &str = "dx.fnprops";
pub const OPTIONS: &str = "dx.options";
pub const RESOURCE_TYPE_ANNOTATIONS: &str = "dx.resource.type.annotation";
pub const ROOT_SIGNATURE: &str = "dx.rootSignature";
pub const USED: &str = "dx.used";

/// Every named-metadata entry owned by the high-level module.
pub const RESERVED_NAMES: &[&str] = &[
    VERSION,
    SHADER_MODEL,
    ENTRY_POINTS,
    RESOURCES,
    TYPE_ANNOTATIONS,
    FUNCTION_PROPS,
    OPTIONS,
    RESOURCE_TYPE_ANNOTATIONS,
    ROOT_SIGNATURE,
    USED,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetadataVersion {
    pub major: u32,
    pub minor: u32,
}

/// The version this codec writes.
///
/// Minor 1 added the UAV rasterizer-ordered flag and the hull-shader max tessellation
/// factor.
pub const HL_METADATA_VERSION: MetadataVersion = MetadataVersion { major: 1, minor: 1 };

/// Deletes every reserved named-metadata entry from `module`.
pub fn clear_hl_metadata(module: &mut Module) {
    for name in RESERVED_NAMES {
        module.remove_named_metadata(name);
    }
}

/// Node builder over the host module.
pub(crate) struct Writer<'a> {
    module: &'a mut Module,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(module: &'a mut Module) -> Self {
        Self { module }
    }

    pub(crate) fn module(&mut self) -> &mut Module {
        &mut *self.module
    }

    pub(crate) fn u32(&mut self, value: u32) -> Option<MdId> {
        let c = self.module.const_int(32, i64::from(value));
        Some(self.module.md_value(c))
    }

    /// Optional unsigned field, written as `-1` when unset.
    pub(crate) fn opt_u32(&mut self, value: Option<u32>) -> Option<MdId> {
        let c = self
            .module
            .const_int(32, value.map_or(-1, i64::from));
        Some(self.module.md_value(c))
    }

    pub(crate) fn bool(&mut self, value: bool) -> Option<MdId> {
        let c = self.module.const_bool(value);
        Some(self.module.md_value(c))
    }

    pub(crate) fn f32(&mut self, value: f32) -> Option<MdId> {
        let c = self.module.const_f32(value);
        Some(self.module.md_value(c))
    }

    pub(crate) fn string(&mut self, value: &str) -> Option<MdId> {
        Some(self.module.md_string(value))
    }

    pub(crate) fn opt_string(&mut self, value: Option<&str>) -> Option<MdId> {
        value.map(|s| self.module.md_string(s))
    }

    pub(crate) fn value(&mut self, value: impl Into<Value>) -> Option<MdId> {
        Some(self.module.md_value(value))
    }

    pub(crate) fn opt_value<V: Into<Value>>(&mut self, value: Option<V>) -> Option<MdId> {
        value.map(|v| self.module.md_value(v))
    }

    pub(crate) fn tuple(&mut self, operands: Vec<Option<MdId>>) -> MdId {
        self.module.md_tuple(operands)
    }

    /// A tuple of `operands`, or null when there are none.
    pub(crate) fn list(&mut self, operands: Vec<MdId>) -> Option<MdId> {
        if operands.is_empty() {
            return None;
        }
        Some(self.module.md_tuple(operands.into_iter().map(Some).collect()))
    }
}

/// Returns the single operand of a reserved named entry, `None` if the entry is absent.
fn single_operand(module: &Module, name: &'static str) -> Result<Option<MdId>> {
    match module.named_metadata(name) {
        None => Ok(None),
        Some([node]) => Ok(Some(*node)),
        Some(ops) => Err(HlError::malformed(
            name,
            format!("expected one operand, found {}", ops.len()),
        )),
    }
}

fn check_references(module: &Module, tables: &HlTables) -> Result<()> {
    let dangling =
        |group: &'static str, entity: String| HlError::DanglingReference { group, entity };
    let check_global = |group, g: GlobalId| {
        if module.contains_global(g) {
            Ok(())
        } else {
            Err(dangling(group, g.to_string()))
        }
    };

    if let Some(f) = tables.entry_function {
        if !module.contains_function(f) {
            return Err(dangling(ENTRY_POINTS, f.to_string()));
        }
    }
    let registry = &tables.resources;
    let bindings = registry
        .cbuffers()
        .iter()
        .map(|r| &r.binding)
        .chain(registry.samplers().iter().map(|r| &r.binding))
        .chain(registry.srvs().iter().map(|r| &r.binding))
        .chain(registry.uavs().iter().map(|r| &r.binding));
    for binding in bindings {
        check_global(RESOURCES, binding.global)?;
    }
    for (&f, record) in &tables.function_props {
        let patch_constant = record.hull().and_then(|h| h.patch_constant_func);
        for f in std::iter::once(f).chain(patch_constant) {
            if !module.contains_function(f) {
                return Err(dangling(FUNCTION_PROPS, f.to_string()));
            }
        }
        if let Some(vertex) = record.vertex() {
            for g in vertex.clip_planes.iter().flatten() {
                check_global(FUNCTION_PROPS, *g)?;
            }
        }
    }
    for (f, _) in tables.type_system.function_annotations() {
        if !module.contains_function(f) {
            return Err(dangling(TYPE_ANNOTATIONS, f.to_string()));
        }
    }
    for &g in &tables.used {
        check_global(USED, g)?;
    }
    Ok(())
}

/// Writes every side-table into `module`, replacing previously emitted entries.
pub(crate) fn emit(module: &mut Module, tables: &HlTables) -> Result<()> {
    check_references(module, tables)?;

    let mut w = Writer::new(&mut *module);
    let mut named: Vec<(&'static str, Vec<MdId>)> = Vec::new();
    let mut absent: Vec<&'static str> = Vec::new();

    let version = {
        let ops = vec![
            w.u32(HL_METADATA_VERSION.major),
            w.u32(HL_METADATA_VERSION.minor),
        ];
        w.tuple(ops)
    };
    named.push((VERSION, vec![version]));

    match &tables.shader_model {
        Some(sm) => named.push((SHADER_MODEL, vec![entry::emit_shader_model(&mut w, sm)])),
        None => absent.push(SHADER_MODEL),
    }
    named.push((ENTRY_POINTS, vec![entry::emit_entry_point(&mut w, tables)]));
    named.push((RESOURCES, vec![resources::emit(&mut w, &tables.resources)]));
    named.push((TYPE_ANNOTATIONS, types::emit_type_system(&mut w, &tables.type_system)));

    let props = props::emit(&mut w, &tables.function_props);
    push_or_clear(&mut named, &mut absent, FUNCTION_PROPS, props);

    let options = {
        let ops = vec![w.u32(tables.options.to_raw())];
        w.tuple(ops)
    };
    named.push((OPTIONS, vec![options]));

    let annotations = types::emit_resource_types(&mut w, &tables.resource_types);
    push_or_clear(&mut named, &mut absent, RESOURCE_TYPE_ANNOTATIONS, annotations);

    let root = tables.signatures.root();
    let root = if root.is_empty() {
        Vec::new()
    } else {
        let bytes = w.module().const_bytes(root.serialized().to_vec());
        let ops = vec![w.value(bytes)];
        vec![w.tuple(ops)]
    };
    push_or_clear(&mut named, &mut absent, ROOT_SIGNATURE, root);

    let used = tables
        .used
        .iter()
        .map(|&g| w.module().md_value(g))
        .collect();
    push_or_clear(&mut named, &mut absent, USED, used);

    for (name, operands) in named {
        module.set_named_metadata(name, operands);
    }
    for name in absent {
        module.remove_named_metadata(name);
    }

    debug!(
        srvs = tables.resources.srvs().len(),
        uavs = tables.resources.uavs().len(),
        cbuffers = tables.resources.cbuffers().len(),
        samplers = tables.resources.samplers().len(),
        function_props = tables.function_props.len(),
        options = tables.options.to_raw(),
        "emitted HL metadata"
    );
    Ok(())
}

fn push_or_clear(
    named: &mut Vec<(&'static str, Vec<MdId>)>,
    absent: &mut Vec<&'static str>,
    name: &'static str,
    operands: Vec<MdId>,
) {
    if operands.is_empty() {
        absent.push(name);
    } else {
        named.push((name, operands));
    }
}

fn load_version(module: &Module) -> Result<MetadataVersion> {
    let node = single_operand(module, VERSION)?
        .ok_or_else(|| HlError::malformed(VERSION, "module carries no HL metadata version"))?;
    let r = Reader::new(module, VERSION, HL_METADATA_VERSION.minor);
    let ops = r.tuple(node)?;
    if ops.len() < 2 {
        return Err(r.malformed(format!("expected 2 fields, found {}", ops.len())));
    }
    let major = r.u32(ops[0], "major version")?;
    let minor = r.u32(ops[1], "minor version")?;
    if major != HL_METADATA_VERSION.major {
        return Err(HlError::UnsupportedVersion { major, minor });
    }
    Reader::new(module, VERSION, minor).record(node, 2, "version")?;
    Ok(MetadataVersion { major, minor })
}

/// Decodes every reserved group of `module` into fresh side-tables.
pub(crate) fn load(module: &Module) -> Result<HlTables> {
    let version = load_version(module)?;
    let minor = version.minor;
    if minor < HL_METADATA_VERSION.minor {
        warn!(minor, "loading older HL metadata; newer fields take their defaults");
    } else if minor > HL_METADATA_VERSION.minor {
        warn!(minor, "loading newer HL metadata; unknown trailing fields are ignored");
    }

    let mut tables = HlTables::default();

    if let Some(node) = single_operand(module, SHADER_MODEL)? {
        tables.shader_model = Some(entry::load_shader_model(
            &Reader::new(module, SHADER_MODEL, minor),
            node,
        )?);
    }
    if let Some(node) = single_operand(module, ENTRY_POINTS)? {
        entry::load_entry_point(&Reader::new(module, ENTRY_POINTS, minor), node, &mut tables)?;
    }
    if let Some(node) = single_operand(module, RESOURCES)? {
        tables.resources = resources::load(&Reader::new(module, RESOURCES, minor), node)?;
    }
    if let Some(ops) = module.named_metadata(TYPE_ANNOTATIONS) {
        tables.type_system =
            types::load_type_system(&Reader::new(module, TYPE_ANNOTATIONS, minor), ops)?;
    }
    if let Some(ops) = module.named_metadata(FUNCTION_PROPS) {
        tables.function_props = props::load(&Reader::new(module, FUNCTION_PROPS, minor), ops)?;
    }
    if let Some(node) = single_operand(module, OPTIONS)? {
        tables.options = load_options(&Reader::new(module, OPTIONS, minor), node)?;
    }
    if let Some(node) = single_operand(module, RESOURCE_TYPE_ANNOTATIONS)? {
        tables.resource_types = types::load_resource_types(
            &Reader::new(module, RESOURCE_TYPE_ANNOTATIONS, minor),
            node,
        )?;
    }
    if let Some(node) = single_operand(module, ROOT_SIGNATURE)? {
        let r = Reader::new(module, ROOT_SIGNATURE, minor);
        let ops = r.record(node, 1, "root signature")?;
        let bytes = r.bytes(ops[0], "serialized root signature")?;
        *tables.signatures.root_mut() = RootSignatureHandle::from_serialized(bytes.to_vec());
    }
    if let Some(ops) = module.named_metadata(USED) {
        let r = Reader::new(module, USED, minor);
        tables.used = ops
            .iter()
            .map(|&op| r.global(Some(op), "used global"))
            .collect::<Result<_>>()?;
    }
    // Group-shared globals are kept in module order, so the list is rebuilt as-is.
    tables.group_shared = module
        .globals()
        .filter(|&g| crate::module::is_shared_memory_global(module, g))
        .collect();

    debug!(
        major = version.major,
        minor,
        srvs = tables.resources.srvs().len(),
        uavs = tables.resources.uavs().len(),
        cbuffers = tables.resources.cbuffers().len(),
        samplers = tables.resources.samplers().len(),
        function_props = tables.function_props.len(),
        "loaded HL metadata"
    );
    Ok(tables)
}

fn load_options(r: &Reader<'_>, node: MdId) -> Result<HlOptions> {
    let ops = r.record(node, 1, "options")?;
    let raw = r.u32(ops[0], "options word")?;
    if r.minor() > HL_METADATA_VERSION.minor {
        Ok(HlOptions::from_raw_truncate(raw))
    } else {
        HlOptions::from_raw(raw)
            .map_err(|_| r.malformed(format!("reserved option bits in {raw:#x}")))
    }
}

/// Whether `constant` is an integer that fits `u32`.
pub(crate) fn as_u32(constant: &Constant) -> Option<u32> {
    constant.as_int().and_then(|v| u32::try_from(v).ok())
}
