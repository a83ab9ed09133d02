//! The high-level module: side-tables attached to a borrowed host IR module.

use std::collections::BTreeMap;

use dxhl_ir::{
    AddressSpace, DebugInfoFinder, DiGlobalVariableId, FunctionId, GlobalId, Linkage, Module,
    TypeId,
};
use tracing::debug;

use crate::debug_info::{self, ElementGeometry};
use crate::dxil::{ResourceClass, ResourceKind};
use crate::error::{HlError, Result};
use crate::metadata;
use crate::options::HlOptions;
use crate::props::FunctionProps;
use crate::resource::{CBuffer, Resource, ResourceList, ResourceRegistry, Sampler};
use crate::shader_model::ShaderModel;
use crate::signature::{RootSignatureHandle, Signature, SignatureKind, SignatureSet};
use crate::type_system::{
    self, FieldAnnotation, FunctionAnnotation, ResourceTypeAnnotations, TypeSystem,
};

/// Data layout of modules in high-level form.
pub const LEGACY_DATA_LAYOUT: &str = "e-m:e-p:32:32-i1:32:32-i8:32:32-i16:32:32-i32:32:32-\
                                      i64:64:64-f16:32:32-f32:32:32-f64:64:64-n8:16:32:64";

/// Every side-table the metadata codec persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct HlTables {
    pub(crate) shader_model: Option<ShaderModel>,
    pub(crate) options: HlOptions,
    pub(crate) entry_function: Option<FunctionId>,
    pub(crate) entry_name: String,
    pub(crate) resources: ResourceRegistry,
    pub(crate) signatures: SignatureSet,
    pub(crate) function_props: BTreeMap<FunctionId, FunctionProps>,
    pub(crate) resource_types: ResourceTypeAnnotations,
    pub(crate) type_system: TypeSystem,
    pub(crate) group_shared: Vec<GlobalId>,
    pub(crate) used: Vec<GlobalId>,
}

/// High-level shader module over a host IR module.
///
/// The wrapper owns its side-tables and borrows the host module for its whole lifetime.
/// Side-tables start empty; [`HlModule::load_hl_metadata`] rebuilds them from metadata
/// previously written by [`HlModule::emit_hl_metadata`].
pub struct HlModule<'m> {
    module: &'m mut Module,
    tables: HlTables,
    debug_info_finder: Option<DebugInfoFinder>,
}

impl<'m> HlModule<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            tables: HlTables::default(),
            debug_info_finder: None,
        }
    }

    pub fn module(&self) -> &Module {
        &*self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut *self.module
    }

    // Module identity.

    pub fn shader_model(&self) -> Option<&ShaderModel> {
        self.tables.shader_model.as_ref()
    }

    pub fn set_shader_model(&mut self, shader_model: ShaderModel) {
        self.tables.shader_model = Some(shader_model);
    }

    pub fn options(&self) -> HlOptions {
        self.tables.options
    }

    pub fn set_options(&mut self, options: HlOptions) {
        self.tables.options = options;
    }

    pub fn entry_function(&self) -> Option<FunctionId> {
        self.tables.entry_function
    }

    pub fn set_entry_function(&mut self, function: Option<FunctionId>) {
        self.tables.entry_function = function;
    }

    pub fn entry_function_name(&self) -> &str {
        &self.tables.entry_name
    }

    pub fn set_entry_function_name(&mut self, name: impl Into<String>) {
        self.tables.entry_name = name.into();
    }

    // Resources.

    pub fn resources(&self) -> &ResourceRegistry {
        &self.tables.resources
    }

    pub fn add_cbuffer(&mut self, cbuffer: CBuffer) -> u32 {
        self.tables.resources.add_cbuffer(cbuffer)
    }

    pub fn cbuffer(&self, index: u32) -> Result<&CBuffer> {
        self.tables.resources.cbuffers.get(index)
    }

    pub fn cbuffer_mut(&mut self, index: u32) -> Result<&mut CBuffer> {
        self.tables.resources.cbuffers.get_mut(index)
    }

    pub fn cbuffers(&self) -> &ResourceList<CBuffer> {
        self.tables.resources.cbuffers()
    }

    pub fn add_sampler(&mut self, sampler: Sampler) -> u32 {
        self.tables.resources.add_sampler(sampler)
    }

    pub fn sampler(&self, index: u32) -> Result<&Sampler> {
        self.tables.resources.samplers.get(index)
    }

    pub fn sampler_mut(&mut self, index: u32) -> Result<&mut Sampler> {
        self.tables.resources.samplers.get_mut(index)
    }

    pub fn samplers(&self) -> &ResourceList<Sampler> {
        self.tables.resources.samplers()
    }

    pub fn add_srv(&mut self, srv: Resource) -> u32 {
        self.tables.resources.add_srv(srv)
    }

    pub fn srv(&self, index: u32) -> Result<&Resource> {
        self.tables.resources.srvs.get(index)
    }

    pub fn srv_mut(&mut self, index: u32) -> Result<&mut Resource> {
        self.tables.resources.srvs.get_mut(index)
    }

    pub fn srvs(&self) -> &ResourceList<Resource> {
        self.tables.resources.srvs()
    }

    pub fn add_uav(&mut self, uav: Resource) -> u32 {
        self.tables.resources.add_uav(uav)
    }

    pub fn uav(&self, index: u32) -> Result<&Resource> {
        self.tables.resources.uavs.get(index)
    }

    pub fn uav_mut(&mut self, index: u32) -> Result<&mut Resource> {
        self.tables.resources.uavs.get_mut(index)
    }

    pub fn uavs(&self) -> &ResourceList<Resource> {
        self.tables.resources.uavs()
    }

    /// Removes every resource record bound to one of `globals` and erases those globals
    /// from the host module.
    ///
    /// Surviving records are renumbered to their new positions; indices taken before the
    /// call must not be reused. Returns the number of globals erased.
    pub fn remove_resources(&mut self, globals: &[GlobalId]) -> Result<usize> {
        let removed = self.tables.resources.remove_bound_to(globals);
        for &global in &removed {
            self.forget_global(global);
            if self.module.contains_global(global) {
                self.module.erase_global(global)?;
            }
        }
        debug!(
            requested = globals.len(),
            removed = removed.len(),
            "removed resources"
        );
        Ok(removed.len())
    }

    /// Removes `global` from every side-table and erases it from the host module.
    pub fn remove_global(&mut self, global: GlobalId) -> Result<()> {
        self.tables.resources.remove_bound_to(&[global]);
        self.forget_global(global);
        self.module.erase_global(global)?;
        Ok(())
    }

    fn forget_global(&mut self, global: GlobalId) {
        self.tables.group_shared.retain(|&g| g != global);
        self.tables.used.retain(|&g| g != global);
        for props in self.tables.function_props.values_mut() {
            if let Some(vertex) = props.vertex_mut() {
                for plane in vertex.clip_planes.iter_mut() {
                    if *plane == Some(global) {
                        *plane = None;
                    }
                }
            }
        }
    }

    /// Drops every side-table entry of `function` and erases it from the host module.
    pub fn remove_function(&mut self, function: FunctionId) -> Result<()> {
        self.tables.function_props.remove(&function);
        self.tables.type_system.remove_function_annotation(function);
        if self.tables.entry_function == Some(function) {
            self.tables.entry_function = None;
        }
        for props in self.tables.function_props.values_mut() {
            if let Some(hull) = props.hull_mut() {
                if hull.patch_constant_func == Some(function) {
                    hull.patch_constant_func = None;
                }
            }
        }
        self.module.erase_function(function)?;
        Ok(())
    }

    // Group-shared memory and used globals.

    /// Records `global` as group-shared memory, keeping the list in module order.
    ///
    /// The global must live in the group-shared address space. Returns whether it was
    /// newly added.
    pub fn add_group_shared_variable(&mut self, global: GlobalId) -> Result<bool> {
        if !is_shared_memory_global(self.module(), global) {
            return Err(HlError::NotGroupShared(global));
        }
        if self.tables.group_shared.contains(&global) {
            return Ok(false);
        }
        let listed = &self.tables.group_shared;
        let ordered = self
            .module
            .globals()
            .filter(|g| *g == global || listed.contains(g))
            .collect();
        self.tables.group_shared = ordered;
        Ok(true)
    }

    pub fn group_shared_variables(&self) -> &[GlobalId] {
        &self.tables.group_shared
    }

    /// Globals that must be kept alive even without uses, persisted in `dx.used`.
    pub fn used_globals(&self) -> &[GlobalId] {
        &self.tables.used
    }

    pub fn used_globals_mut(&mut self) -> &mut Vec<GlobalId> {
        &mut self.tables.used
    }

    // Signatures.

    pub fn signature(&self, kind: SignatureKind) -> &Signature {
        self.tables.signatures.get(kind)
    }

    pub fn signature_mut(&mut self, kind: SignatureKind) -> &mut Signature {
        self.tables.signatures.get_mut(kind)
    }

    /// Transfers the signature to the caller. The module keeps an empty signature.
    pub fn release_signature(&mut self, kind: SignatureKind) -> Signature {
        self.tables.signatures.release(kind)
    }

    pub fn root_signature(&self) -> &RootSignatureHandle {
        self.tables.signatures.root()
    }

    pub fn root_signature_mut(&mut self) -> &mut RootSignatureHandle {
        self.tables.signatures.root_mut()
    }

    pub fn release_root_signature(&mut self) -> RootSignatureHandle {
        self.tables.signatures.release_root()
    }

    // Shader-stage properties.

    pub fn has_function_props(&self, function: FunctionId) -> bool {
        self.tables.function_props.contains_key(&function)
    }

    pub fn function_props(&self, function: FunctionId) -> Result<&FunctionProps> {
        self.tables
            .function_props
            .get(&function)
            .ok_or(HlError::MissingFunctionProps(function))
    }

    pub fn function_props_mut(&mut self, function: FunctionId) -> Result<&mut FunctionProps> {
        self.tables
            .function_props
            .get_mut(&function)
            .ok_or(HlError::MissingFunctionProps(function))
    }

    /// Attaches `props` to `function`, replacing any existing record.
    pub fn add_function_props(&mut self, function: FunctionId, props: FunctionProps) {
        if let Some(previous) = self.tables.function_props.insert(function, props) {
            debug!(
                %function,
                previous = ?previous.shader_kind(),
                "replaced shader-stage properties"
            );
        }
    }

    // Type annotations.

    pub fn add_resource_type_annotation(
        &mut self,
        ty: TypeId,
        class: ResourceClass,
        kind: ResourceKind,
    ) {
        self.tables.resource_types.add(ty, class, kind);
    }

    pub fn resource_class(&self, ty: TypeId) -> ResourceClass {
        self.tables.resource_types.class(ty)
    }

    pub fn resource_kind(&self, ty: TypeId) -> ResourceKind {
        self.tables.resource_types.kind(ty)
    }

    pub fn resource_type_annotations(&self) -> &ResourceTypeAnnotations {
        &self.tables.resource_types
    }

    pub fn is_hlsl_object_type(&self, ty: TypeId) -> bool {
        type_system::is_hlsl_object_type(self.module(), &self.tables.resource_types, ty)
    }

    pub fn is_stream_output_type(&self, ty: TypeId) -> bool {
        type_system::is_stream_output_type(self.module(), ty)
    }

    pub fn is_stream_output_ptr_type(&self, ty: TypeId) -> bool {
        type_system::is_stream_output_ptr_type(self.module(), ty)
    }

    /// Legacy constant-buffer size of one element of a field, resolving nested structs
    /// through this module's type system.
    pub fn legacy_cbuffer_field_element_size(&self, field: &FieldAnnotation, ty: TypeId) -> u32 {
        type_system::legacy_cbuffer_field_element_size(
            self.module(),
            field,
            ty,
            &self.tables.type_system,
        )
    }

    pub fn type_system(&self) -> &TypeSystem {
        &self.tables.type_system
    }

    pub fn type_system_mut(&mut self) -> &mut TypeSystem {
        &mut self.tables.type_system
    }

    /// Transfers the type system to the caller. The module keeps an empty one.
    pub fn release_type_system(&mut self) -> TypeSystem {
        std::mem::take(&mut self.tables.type_system)
    }

    pub fn function_annotation(&self, function: FunctionId) -> Option<&FunctionAnnotation> {
        self.tables.type_system.function_annotation(function)
    }

    pub fn add_function_annotation(
        &mut self,
        function: FunctionId,
        annotation: FunctionAnnotation,
    ) {
        self.tables
            .type_system
            .add_function_annotation(function, annotation);
    }

    // Metadata.

    /// Writes every side-table into the host module's reserved named metadata.
    pub fn emit_hl_metadata(&mut self) -> Result<()> {
        metadata::emit(&mut *self.module, &self.tables)
    }

    /// Replaces every side-table with the contents of the host module's metadata.
    ///
    /// On error the side-tables are left untouched.
    pub fn load_hl_metadata(&mut self) -> Result<()> {
        self.tables = metadata::load(&*self.module)?;
        Ok(())
    }

    /// Deletes the reserved named metadata from the host module. Side-tables are kept.
    pub fn clear_hl_metadata(&mut self) {
        metadata::clear_hl_metadata(&mut *self.module);
    }

    // Debug info.

    /// Returns the debug-info index over the host module, building it on first use.
    pub fn debug_info_finder(&mut self) -> &mut DebugInfoFinder {
        self.module_and_finder().1
    }

    fn module_and_finder(&mut self) -> (&mut Module, &mut DebugInfoFinder) {
        let module = &mut *self.module;
        let finder = self
            .debug_info_finder
            .get_or_insert_with(|| DebugInfoFinder::process_module(module));
        (module, finder)
    }

    pub fn find_global_variable_debug_info(
        &mut self,
        global: GlobalId,
    ) -> Option<DiGlobalVariableId> {
        let (module, finder) = self.module_and_finder();
        debug_info::find_global_variable_debug_info(module, global, finder)
    }

    /// See [`debug_info::create_element_global_variable_debug_info`].
    pub fn create_element_global_variable_debug_info(
        &mut self,
        global: GlobalId,
        element: GlobalId,
        geometry: ElementGeometry,
        element_name: &str,
    ) -> Result<DiGlobalVariableId> {
        let (module, finder) = self.module_and_finder();
        debug_info::create_element_global_variable_debug_info(
            module,
            global,
            finder,
            element,
            geometry,
            element_name,
        )
    }

    /// See [`debug_info::update_global_variable_debug_info`].
    pub fn update_global_variable_debug_info(
        &mut self,
        global: GlobalId,
        new_global: GlobalId,
    ) -> Result<DiGlobalVariableId> {
        let (module, finder) = self.module_and_finder();
        debug_info::update_global_variable_debug_info(module, global, finder, new_global)
    }
}

/// Whether `global` is module-private storage in the default address space.
pub fn is_static_global(module: &Module, global: GlobalId) -> bool {
    module.global(global).is_some_and(|g| {
        g.linkage == Linkage::Internal && g.address_space == AddressSpace::Default
    })
}

/// Whether `global` lives in group-shared memory.
pub fn is_shared_memory_global(module: &Module, global: GlobalId) -> bool {
    module
        .global(global)
        .is_some_and(|g| g.address_space == AddressSpace::GroupShared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dxil::{SamplerKind, ShaderKind};
    use crate::props::{ComputeProps, HullProps, PixelProps, VertexProps};
    use crate::resource::ResourceBinding;
    use dxhl_ir::GlobalVariable;
    use pretty_assertions::assert_eq;

    fn function(module: &mut Module, name: &str) -> FunctionId {
        let void = module.void_type();
        let fn_ty = module.function_type(void, vec![]);
        module.add_function(name, fn_ty).unwrap()
    }

    fn global(module: &mut Module, name: &str) -> GlobalId {
        let i32_ty = module.int_type(32);
        module.add_global(GlobalVariable::new(name, i32_ty))
    }

    #[test]
    fn new_module_starts_empty() {
        let mut module = Module::new("t");
        let hl = HlModule::new(&mut module);
        assert!(hl.resources().is_empty());
        assert_eq!(hl.shader_model(), None);
        assert_eq!(hl.options(), HlOptions::empty());
        assert_eq!(hl.entry_function(), None);
        assert!(hl.signature(SignatureKind::Input).is_empty());
        assert!(hl.root_signature().is_empty());
        assert!(hl.type_system().is_empty());
    }

    #[test]
    fn missing_props_are_reported() {
        let mut module = Module::new("t");
        let main = function(&mut module, "main");
        let hl = HlModule::new(&mut module);
        assert!(!hl.has_function_props(main));
        assert_eq!(
            hl.function_props(main),
            Err(HlError::MissingFunctionProps(main))
        );
    }

    #[test]
    fn adding_props_twice_keeps_the_last_record() {
        let mut module = Module::new("t");
        let main = function(&mut module, "main");
        let mut hl = HlModule::new(&mut module);
        hl.add_function_props(main, ComputeProps::default().into());
        hl.add_function_props(
            main,
            PixelProps {
                early_depth_stencil: true,
            }
            .into(),
        );
        assert_eq!(
            hl.function_props(main).unwrap().shader_kind(),
            ShaderKind::Pixel
        );
    }

    #[test]
    fn removing_a_global_clears_every_reference() {
        let mut module = Module::new("t");
        let main = function(&mut module, "main");
        let sampler = global(&mut module, "s");
        let plane = global(&mut module, "plane");
        let mut hl = HlModule::new(&mut module);
        hl.add_sampler(Sampler::new(
            ResourceBinding::new(sampler, "s"),
            SamplerKind::Default,
        ));
        hl.used_globals_mut().extend([sampler, plane]);
        let mut clip_planes = [None; 6];
        clip_planes[0] = Some(plane);
        hl.add_function_props(main, VertexProps { clip_planes }.into());

        hl.remove_global(sampler).unwrap();
        hl.remove_global(plane).unwrap();

        assert!(hl.samplers().is_empty());
        assert!(hl.used_globals().is_empty());
        assert_eq!(
            hl.function_props(main).unwrap().expect_vertex().clip_planes,
            [None; 6]
        );
        assert!(!hl.module().contains_global(sampler));
        assert!(!hl.module().contains_global(plane));
    }

    #[test]
    fn removing_resources_erases_only_bound_globals() {
        let mut module = Module::new("t");
        let bound = global(&mut module, "cb");
        let unbound = global(&mut module, "x");
        let mut hl = HlModule::new(&mut module);
        hl.add_cbuffer(CBuffer::new(ResourceBinding::new(bound, "cb"), 16));

        assert_eq!(hl.remove_resources(&[bound, unbound]).unwrap(), 1);
        assert!(hl.cbuffers().is_empty());
        assert!(!hl.module().contains_global(bound));
        assert!(hl.module().contains_global(unbound));
    }

    #[test]
    fn removing_a_function_drops_its_entries() {
        let mut module = Module::new("t");
        let main = function(&mut module, "main");
        let patch = function(&mut module, "patch");
        let mut hl = HlModule::new(&mut module);
        hl.set_entry_function(Some(main));
        hl.add_function_props(
            main,
            HullProps {
                patch_constant_func: Some(patch),
                ..HullProps::default()
            }
            .into(),
        );
        hl.add_function_props(patch, ComputeProps::default().into());
        hl.add_function_annotation(patch, FunctionAnnotation::default());

        hl.remove_function(patch).unwrap();
        assert!(!hl.has_function_props(patch));
        assert_eq!(hl.function_annotation(patch), None);
        assert_eq!(
            hl.function_props(main).unwrap().expect_hull().patch_constant_func,
            None
        );
        assert_eq!(hl.entry_function(), Some(main));

        hl.remove_function(main).unwrap();
        assert_eq!(hl.entry_function(), None);
    }

    #[test]
    fn released_type_system_leaves_an_empty_one() {
        let mut module = Module::new("t");
        let main = function(&mut module, "main");
        let mut hl = HlModule::new(&mut module);
        hl.add_function_annotation(main, FunctionAnnotation::default());

        let released = hl.release_type_system();
        assert!(released.function_annotation(main).is_some());
        assert!(hl.type_system().is_empty());
    }

    #[test]
    fn global_classification() {
        let mut module = Module::new("t");
        let f32_ty = module.f32_type();
        let shared = module.add_global(
            GlobalVariable::new("tgsm", f32_ty).with_address_space(AddressSpace::GroupShared),
        );
        let private =
            module.add_global(GlobalVariable::new("p", f32_ty).with_linkage(Linkage::Internal));
        let external = module.add_global(GlobalVariable::new("e", f32_ty));

        assert!(is_shared_memory_global(&module, shared));
        assert!(!is_static_global(&module, shared));
        assert!(is_static_global(&module, private));
        assert!(!is_static_global(&module, external));
        assert!(!is_shared_memory_global(&module, external));
    }

    #[test]
    fn group_shared_list_keeps_module_order_across_reload() {
        let mut module = Module::new("t");
        let f32_ty = module.f32_type();
        let shared = |name: &str| {
            GlobalVariable::new(name, f32_ty).with_address_space(AddressSpace::GroupShared)
        };
        let a = module.add_global(shared("a"));
        let b = module.add_global(shared("b"));
        let private = global(&mut module, "p");
        let before = {
            let mut hl = HlModule::new(&mut module);
            assert_eq!(hl.add_group_shared_variable(b), Ok(true));
            assert_eq!(hl.add_group_shared_variable(a), Ok(true));
            assert_eq!(hl.add_group_shared_variable(b), Ok(false));
            assert_eq!(
                hl.add_group_shared_variable(private),
                Err(HlError::NotGroupShared(private))
            );
            hl.emit_hl_metadata().unwrap();
            hl.group_shared_variables().to_vec()
        };
        assert_eq!(before, vec![a, b]);

        let mut hl = HlModule::new(&mut module);
        hl.load_hl_metadata().unwrap();
        assert_eq!(hl.group_shared_variables(), &before[..]);
    }

    #[test]
    fn debug_info_finder_is_built_once() {
        let mut module = Module::new("t");
        module.debug_info_mut().add_compile_unit("a.hlsl", "dxc");
        let mut hl = HlModule::new(&mut module);
        assert_eq!(hl.debug_info_finder().compile_units().len(), 1);

        // Units added later are not picked up by the cached index.
        hl.module_mut()
            .debug_info_mut()
            .add_compile_unit("b.hlsl", "dxc");
        assert_eq!(hl.debug_info_finder().compile_units().len(), 1);
    }
}
