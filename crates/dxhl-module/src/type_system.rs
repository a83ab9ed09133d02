//! Resource type annotations, struct/function annotations and HLSL object-type predicates.

use std::collections::BTreeMap;

use dxhl_ir::{FunctionId, Module, Type, TypeId};

use crate::dxil::{
    ComponentType, InputQualifier, InterpolationMode, MatrixOrientation, ResourceClass,
    ResourceKind,
};

/// Maps host types to the resource class and kind they represent.
///
/// Lookups on unannotated types return the `Invalid` sentinels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTypeAnnotations {
    entries: BTreeMap<TypeId, (ResourceClass, ResourceKind)>,
}

impl ResourceTypeAnnotations {
    /// Inserts or overwrites the annotation for `ty`.
    pub fn add(&mut self, ty: TypeId, class: ResourceClass, kind: ResourceKind) {
        self.entries.insert(ty, (class, kind));
    }

    pub fn class(&self, ty: TypeId) -> ResourceClass {
        self.entries
            .get(&ty)
            .map_or(ResourceClass::Invalid, |&(class, _)| class)
    }

    pub fn kind(&self, ty: TypeId) -> ResourceKind {
        self.entries
            .get(&ty)
            .map_or(ResourceKind::Invalid, |&(_, kind)| kind)
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.entries.contains_key(&ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, ResourceClass, ResourceKind)> + '_ {
        self.entries
            .iter()
            .map(|(&ty, &(class, kind))| (ty, class, kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnnotation {
    pub name: String,
    pub cbuffer_offset: u32,
    pub component_type: ComponentType,
    pub matrix_orientation: MatrixOrientation,
    pub semantic: Option<String>,
    pub precise: bool,
}

impl FieldAnnotation {
    pub fn new(name: impl Into<String>, component_type: ComponentType) -> Self {
        Self {
            name: name.into(),
            cbuffer_offset: 0,
            component_type,
            matrix_orientation: MatrixOrientation::Undefined,
            semantic: None,
            precise: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructAnnotation {
    pub fields: Vec<FieldAnnotation>,
    pub cbuffer_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAnnotation {
    pub input_qualifier: InputQualifier,
    pub semantic: Option<String>,
    pub interpolation_mode: InterpolationMode,
    pub precise: bool,
    /// Packing of a matrix parameter. `Undefined` reads as column-major, HLSL's default.
    pub matrix_orientation: MatrixOrientation,
}

impl Default for ParameterAnnotation {
    fn default() -> Self {
        Self {
            input_qualifier: InputQualifier::In,
            semantic: None,
            interpolation_mode: InterpolationMode::Undefined,
            precise: false,
            matrix_orientation: MatrixOrientation::Undefined,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionAnnotation {
    pub ret: ParameterAnnotation,
    pub params: Vec<ParameterAnnotation>,
}

/// Struct and function annotations gathered during code generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSystem {
    structs: BTreeMap<TypeId, StructAnnotation>,
    functions: BTreeMap<FunctionId, FunctionAnnotation>,
}

impl TypeSystem {
    pub fn struct_annotation(&self, ty: TypeId) -> Option<&StructAnnotation> {
        self.structs.get(&ty)
    }

    pub fn struct_annotation_mut(&mut self, ty: TypeId) -> Option<&mut StructAnnotation> {
        self.structs.get_mut(&ty)
    }

    pub fn add_struct_annotation(&mut self, ty: TypeId, annotation: StructAnnotation) {
        self.structs.insert(ty, annotation);
    }

    pub fn struct_annotations(&self) -> impl Iterator<Item = (TypeId, &StructAnnotation)> {
        self.structs.iter().map(|(&ty, a)| (ty, a))
    }

    pub fn function_annotation(&self, function: FunctionId) -> Option<&FunctionAnnotation> {
        self.functions.get(&function)
    }

    pub fn function_annotation_mut(
        &mut self,
        function: FunctionId,
    ) -> Option<&mut FunctionAnnotation> {
        self.functions.get_mut(&function)
    }

    pub fn add_function_annotation(
        &mut self,
        function: FunctionId,
        annotation: FunctionAnnotation,
    ) {
        self.functions.insert(function, annotation);
    }

    pub fn remove_function_annotation(
        &mut self,
        function: FunctionId,
    ) -> Option<FunctionAnnotation> {
        self.functions.remove(&function)
    }

    pub fn function_annotations(
        &self,
    ) -> impl Iterator<Item = (FunctionId, &FunctionAnnotation)> {
        self.functions.iter().map(|(&f, a)| (f, a))
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty() && self.functions.is_empty()
    }
}

const HLSL_OBJECT_NAMES: &[&str] = &[
    "SamplerState",
    "SamplerComparisonState",
    "Texture1D",
    "Texture1DArray",
    "Texture2D",
    "Texture2DArray",
    "Texture2DMS",
    "Texture2DMSArray",
    "Texture3D",
    "TextureCube",
    "TextureCubeArray",
    "RWTexture1D",
    "RWTexture1DArray",
    "RWTexture2D",
    "RWTexture2DArray",
    "RWTexture3D",
    "Buffer",
    "RWBuffer",
    "ByteAddressBuffer",
    "RWByteAddressBuffer",
    "StructuredBuffer",
    "RWStructuredBuffer",
    "AppendStructuredBuffer",
    "ConsumeStructuredBuffer",
    "ConstantBuffer",
    "TextureBuffer",
    "RasterizerOrderedBuffer",
    "RasterizerOrderedByteAddressBuffer",
    "RasterizerOrderedStructuredBuffer",
    "RasterizerOrderedTexture1D",
    "RasterizerOrderedTexture1DArray",
    "RasterizerOrderedTexture2D",
    "RasterizerOrderedTexture2DArray",
    "RasterizerOrderedTexture3D",
    "InputPatch",
    "OutputPatch",
    "PointStream",
    "LineStream",
    "TriangleStream",
];

const STREAM_OUTPUT_PREFIXES: &[&str] =
    &["class.PointStream", "class.LineStream", "class.TriangleStream"];

fn struct_name(module: &Module, ty: TypeId) -> Option<&str> {
    match module.ty(ty) {
        Type::Struct { name, .. } => Some(name.as_str()),
        _ => None,
    }
}

/// Whether `ty` is a stream-output object (`PointStream<T>` and friends).
pub fn is_stream_output_type(module: &Module, ty: TypeId) -> bool {
    struct_name(module, ty).is_some_and(|name| {
        STREAM_OUTPUT_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
    })
}

/// Whether `ty` points to a stream-output object.
pub fn is_stream_output_ptr_type(module: &Module, ty: TypeId) -> bool {
    module
        .pointee_type(ty)
        .is_some_and(|pointee| is_stream_output_type(module, pointee))
}

/// Whether `ty` is an HLSL object (resource, sampler, patch or stream type).
///
/// Annotated types always qualify. Otherwise the struct name is matched, ignoring the
/// `class.`/`struct.` prefix and any template arguments.
pub fn is_hlsl_object_type(
    module: &Module,
    annotations: &ResourceTypeAnnotations,
    ty: TypeId,
) -> bool {
    if annotations.contains(ty) {
        return true;
    }
    let Some(name) = struct_name(module, ty) else {
        return false;
    };
    if name.ends_with("_slice_type") {
        return false;
    }
    let name = name
        .strip_prefix("class.")
        .or_else(|| name.strip_prefix("struct."))
        .unwrap_or(name);
    let base = name.split('<').next().unwrap_or(name);
    HLSL_OBJECT_NAMES.contains(&base)
}

/// Rows and columns of an HLSL matrix type: `class.matrix.<elem>.<R>.<C>`, laid out as
/// `{ [R x <C x elem>] }`.
pub fn matrix_shape(module: &Module, ty: TypeId) -> Option<(u32, u32)> {
    let Type::Struct { name, fields } = module.ty(ty) else {
        return None;
    };
    if !name.starts_with("class.matrix.") {
        return None;
    }
    let [body] = fields.as_slice() else {
        return None;
    };
    let Type::Array { element, len: rows } = module.ty(*body) else {
        return None;
    };
    let Type::Vector { len: cols, .. } = module.ty(*element) else {
        return None;
    };
    Some((u32::try_from(*rows).ok()?, *cols))
}

/// Peels array layers off `ty`, returning the element type and the total element count.
fn strip_arrays(module: &Module, mut ty: TypeId) -> (TypeId, u64) {
    let mut count = 1u64;
    while let Type::Array { element, len } = module.ty(ty) {
        count = count.saturating_mul(*len);
        ty = *element;
    }
    (ty, count)
}

/// Size in bytes of one element of a constant-buffer field under legacy packing.
///
/// Arrays report their element size. A component takes 4 bytes, 8 when 64-bit. A matrix
/// takes a full 16-byte register per row except the last, which holds only its columns;
/// column-major matrices are packed transposed. Annotated structs report their recorded
/// size. Unannotated structs and matrices without an orientation report 0.
pub fn legacy_cbuffer_field_element_size(
    module: &Module,
    field: &FieldAnnotation,
    ty: TypeId,
    types: &TypeSystem,
) -> u32 {
    let (ty, _) = strip_arrays(module, ty);
    let component = if field.component_type.is_64_bit() { 8 } else { 4 };
    match module.ty(ty) {
        Type::Vector { len, .. } => component * len,
        Type::Struct { .. } => {
            if let Some(annotation) = types.struct_annotation(ty) {
                return annotation.cbuffer_size;
            }
            let Some((rows, cols)) = matrix_shape(module, ty) else {
                return 0;
            };
            let (rows, cols) = match field.matrix_orientation {
                MatrixOrientation::RowMajor => (rows, cols),
                MatrixOrientation::ColumnMajor => (cols, rows),
                MatrixOrientation::Undefined => return 0,
            };
            rows.saturating_sub(1) * 16 + cols * component
        }
        _ => component,
    }
}

/// Signature rows and columns taken by a parameter of type `ty`.
///
/// Arrays multiply the rows. Matrices are transposed unless row-major.
pub fn parameter_rows_and_cols(
    module: &Module,
    ty: TypeId,
    param: &ParameterAnnotation,
) -> (u32, u32) {
    let (ty, count) = strip_arrays(module, ty);
    let (rows, cols) = if let Some((rows, cols)) = matrix_shape(module, ty) {
        match param.matrix_orientation {
            MatrixOrientation::RowMajor => (rows, cols),
            _ => (cols, rows),
        }
    } else if let Type::Vector { len, .. } = module.ty(ty) {
        (1, *len)
    } else {
        (1, 1)
    };
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    (rows.saturating_mul(count), cols)
}
