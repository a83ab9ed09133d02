//! Resource registry: four ordered collections of shader resource records.
//!
//! A record's id is its position in its collection. Ids are assigned on add and rewritten
//! when records are removed, so `list.get(r.binding().id)` always yields `r`.

use std::collections::HashSet;

use dxhl_ir::GlobalId;

use crate::dxil::{ComponentType, ResourceClass, ResourceKind, SamplerKind};
use crate::error::{HlError, Result};

/// Binding fields shared by every resource class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBinding {
    /// Position in the owning collection. Reassigned on add and removal, and persisted as
    /// the position regardless of its value.
    pub id: u32,
    /// The host global that represents the resource.
    pub global: GlobalId,
    pub name: String,
    pub space: u32,
    pub lower_bound: u32,
    /// Number of registers bound; `u32::MAX` for unbounded arrays.
    pub range_size: u32,
}

impl ResourceBinding {
    pub fn new(global: GlobalId, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            global,
            name: name.into(),
            space: 0,
            lower_bound: 0,
            range_size: 1,
        }
    }

    pub fn with_register(mut self, space: u32, lower_bound: u32) -> Self {
        self.space = space;
        self.lower_bound = lower_bound;
        self
    }

    pub fn with_range_size(mut self, range_size: u32) -> Self {
        self.range_size = range_size;
        self
    }
}

/// Common access to the binding part of a resource record.
pub trait BoundResource {
    fn binding(&self) -> &ResourceBinding;
    fn binding_mut(&mut self) -> &mut ResourceBinding;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CBuffer {
    pub binding: ResourceBinding,
    pub size_in_bytes: u32,
}

impl CBuffer {
    pub fn new(binding: ResourceBinding, size_in_bytes: u32) -> Self {
        Self {
            binding,
            size_in_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sampler {
    pub binding: ResourceBinding,
    pub kind: SamplerKind,
}

impl Sampler {
    pub fn new(binding: ResourceBinding, kind: SamplerKind) -> Self {
        Self { binding, kind }
    }
}

/// A shader resource view or unordered access view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub binding: ResourceBinding,
    /// [`ResourceClass::Srv`] or [`ResourceClass::Uav`]; set by the collection on add.
    pub class: ResourceClass,
    pub kind: ResourceKind,
    pub component_type: ComponentType,
    /// Element stride of structured buffers, 0 otherwise.
    pub element_stride: u32,
    /// Sample count of multisampled textures, 0 otherwise.
    pub sample_count: u32,
    pub globally_coherent: bool,
    pub has_counter: bool,
    pub rasterizer_ordered: bool,
}

impl Resource {
    pub fn new(binding: ResourceBinding, kind: ResourceKind) -> Self {
        Self {
            binding,
            class: ResourceClass::Invalid,
            kind,
            component_type: ComponentType::Invalid,
            element_stride: 0,
            sample_count: 0,
            globally_coherent: false,
            has_counter: false,
            rasterizer_ordered: false,
        }
    }

    pub fn with_component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    pub fn with_element_stride(mut self, stride: u32) -> Self {
        self.element_stride = stride;
        self
    }
}

macro_rules! impl_bound_resource {
    ($($ty:ty),+) => {
        $(
            impl BoundResource for $ty {
                fn binding(&self) -> &ResourceBinding {
                    &self.binding
                }

                fn binding_mut(&mut self) -> &mut ResourceBinding {
                    &mut self.binding
                }
            }
        )+
    };
}

impl_bound_resource!(CBuffer, Sampler, Resource);

/// One ordered collection of resource records of a single class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceList<T> {
    class: ResourceClass,
    records: Vec<T>,
}

impl<T: BoundResource> ResourceList<T> {
    fn new(class: ResourceClass) -> Self {
        Self {
            class,
            records: Vec::new(),
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    /// Appends `record`, overwriting its id with its position. Returns the id.
    pub fn add(&mut self, mut record: T) -> u32 {
        let id = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
        record.binding_mut().id = id;
        self.records.push(record);
        id
    }

    pub fn get(&self, index: u32) -> Result<&T> {
        let len = self.records.len();
        self.records
            .get(index as usize)
            .ok_or(HlError::ResourceIndexOutOfRange {
                class: self.class,
                index,
                len,
            })
    }

    pub fn get_mut(&mut self, index: u32) -> Result<&mut T> {
        let (class, len) = (self.class, self.records.len());
        self.records
            .get_mut(index as usize)
            .ok_or(HlError::ResourceIndexOutOfRange { class, index, len })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record bound to one of `globals`, compacts the collection and
    /// renumbers the survivors. Returns the globals of the dropped records.
    pub(crate) fn remove_bound_to(&mut self, globals: &HashSet<GlobalId>) -> Vec<GlobalId> {
        let mut removed = Vec::new();
        self.records.retain(|r| {
            let global = r.binding().global;
            let keep = !globals.contains(&global);
            if !keep {
                removed.push(global);
            }
            keep
        });
        self.renumber();
        removed
    }

    /// Rewrites ids to match positions.
    pub(crate) fn renumber(&mut self) {
        for (pos, record) in self.records.iter_mut().enumerate() {
            record.binding_mut().id = pos as u32;
        }
    }

    pub(crate) fn from_records(class: ResourceClass, records: Vec<T>) -> Self {
        let mut list = Self { class, records };
        list.renumber();
        list
    }
}

impl<'a, T> IntoIterator for &'a ResourceList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// The four resource collections of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRegistry {
    pub(crate) cbuffers: ResourceList<CBuffer>,
    pub(crate) samplers: ResourceList<Sampler>,
    pub(crate) srvs: ResourceList<Resource>,
    pub(crate) uavs: ResourceList<Resource>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self {
            cbuffers: ResourceList::new(ResourceClass::CBuffer),
            samplers: ResourceList::new(ResourceClass::Sampler),
            srvs: ResourceList::new(ResourceClass::Srv),
            uavs: ResourceList::new(ResourceClass::Uav),
        }
    }
}

impl ResourceRegistry {
    pub fn cbuffers(&self) -> &ResourceList<CBuffer> {
        &self.cbuffers
    }

    pub fn samplers(&self) -> &ResourceList<Sampler> {
        &self.samplers
    }

    pub fn srvs(&self) -> &ResourceList<Resource> {
        &self.srvs
    }

    pub fn uavs(&self) -> &ResourceList<Resource> {
        &self.uavs
    }

    pub fn add_cbuffer(&mut self, cbuffer: CBuffer) -> u32 {
        self.cbuffers.add(cbuffer)
    }

    pub fn add_sampler(&mut self, sampler: Sampler) -> u32 {
        self.samplers.add(sampler)
    }

    pub fn add_srv(&mut self, mut srv: Resource) -> u32 {
        srv.class = ResourceClass::Srv;
        self.srvs.add(srv)
    }

    pub fn add_uav(&mut self, mut uav: Resource) -> u32 {
        uav.class = ResourceClass::Uav;
        self.uavs.add(uav)
    }

    /// Removes every record, of any class, bound to one of `globals`. Returns the globals
    /// that had at least one record.
    pub(crate) fn remove_bound_to(&mut self, globals: &[GlobalId]) -> Vec<GlobalId> {
        let set: HashSet<GlobalId> = globals.iter().copied().collect();
        let mut removed = self.cbuffers.remove_bound_to(&set);
        removed.extend(self.samplers.remove_bound_to(&set));
        removed.extend(self.srvs.remove_bound_to(&set));
        removed.extend(self.uavs.remove_bound_to(&set));
        let mut seen = HashSet::new();
        removed.retain(|g| seen.insert(*g));
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.cbuffers.is_empty()
            && self.samplers.is_empty()
            && self.srvs.is_empty()
            && self.uavs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dxhl_ir::{GlobalVariable, Module};
    use pretty_assertions::assert_eq;

    fn globals(n: usize) -> Vec<GlobalId> {
        let mut module = Module::new("t");
        let i32_ty = module.int_type(32);
        (0..n)
            .map(|i| module.add_global(GlobalVariable::new(format!("g{i}"), i32_ty)))
            .collect()
    }

    #[test]
    fn ids_are_positions() {
        let g = globals(2);
        let mut registry = ResourceRegistry::default();
        let a = registry.add_srv(Resource::new(
            ResourceBinding::new(g[0], "a"),
            ResourceKind::Texture2D,
        ));
        let b = registry.add_srv(Resource::new(
            ResourceBinding::new(g[1], "b"),
            ResourceKind::RawBuffer,
        ));
        assert_eq!((a, b), (0, 1));
        assert_eq!(registry.srvs().get(1).unwrap().binding.name, "b");
        assert_eq!(registry.srvs().get(1).unwrap().class, ResourceClass::Srv);
    }

    #[test]
    fn caller_supplied_ids_are_overwritten() {
        let g = globals(1);
        let mut registry = ResourceRegistry::default();
        let mut binding = ResourceBinding::new(g[0], "cb");
        binding.id = 42;
        assert_eq!(registry.add_cbuffer(CBuffer::new(binding, 16)), 0);
        assert_eq!(registry.cbuffers().get(0).unwrap().binding.id, 0);
    }

    #[test]
    fn out_of_range_lookup_reports_class_and_length() {
        let registry = ResourceRegistry::default();
        assert_eq!(
            registry.uavs().get(3),
            Err(HlError::ResourceIndexOutOfRange {
                class: ResourceClass::Uav,
                index: 3,
                len: 0,
            })
        );
    }

    #[test]
    fn removal_compacts_and_renumbers() {
        let g = globals(3);
        let mut registry = ResourceRegistry::default();
        for (i, &global) in g.iter().enumerate() {
            registry.add_sampler(Sampler::new(
                ResourceBinding::new(global, format!("s{i}")),
                SamplerKind::Default,
            ));
        }
        assert_eq!(registry.remove_bound_to(&[g[1]]), vec![g[1]]);

        let names: Vec<_> = registry
            .samplers()
            .iter()
            .map(|s| (s.binding.id, s.binding.name.as_str()))
            .collect();
        assert_eq!(names, vec![(0, "s0"), (1, "s2")]);
    }

    #[test]
    fn removing_unbound_globals_is_a_no_op() {
        let g = globals(2);
        let mut registry = ResourceRegistry::default();
        registry.add_cbuffer(CBuffer::new(ResourceBinding::new(g[0], "cb"), 16));
        assert!(registry.remove_bound_to(&[g[1]]).is_empty());
        assert_eq!(registry.cbuffers().len(), 1);
    }
}
