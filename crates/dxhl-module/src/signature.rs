//! Input, output and patch-constant signatures, and the opaque root signature.

use crate::dxil::{ComponentType, InterpolationMode, SemanticKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Input,
    Output,
    PatchConstant,
}

impl SignatureKind {
    pub const ALL: [SignatureKind; 3] = [
        SignatureKind::Input,
        SignatureKind::Output,
        SignatureKind::PatchConstant,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureElement {
    /// Position within the owning signature; assigned on append.
    pub id: u32,
    pub semantic_name: String,
    pub semantic_indices: Vec<u32>,
    pub semantic_kind: SemanticKind,
    pub component_type: ComponentType,
    pub interpolation_mode: InterpolationMode,
    pub rows: u32,
    pub cols: u32,
    /// Packing location, `None` until allocated.
    pub start_row: Option<u32>,
    pub start_col: Option<u32>,
    pub output_stream: u32,
}

impl SignatureElement {
    pub fn new(
        semantic_name: impl Into<String>,
        semantic_kind: SemanticKind,
        component_type: ComponentType,
    ) -> Self {
        Self {
            id: 0,
            semantic_name: semantic_name.into(),
            semantic_indices: vec![0],
            semantic_kind,
            component_type,
            interpolation_mode: InterpolationMode::Undefined,
            rows: 1,
            cols: 1,
            start_row: None,
            start_col: None,
            output_stream: 0,
        }
    }

    pub fn with_shape(mut self, rows: u32, cols: u32) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation_mode = mode;
        self
    }
}

/// An ordered list of signature elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    elements: Vec<SignatureElement>,
}

impl Signature {
    /// Appends `element` and returns its id.
    pub fn append_element(&mut self, mut element: SignatureElement) -> u32 {
        let id = self.elements.len() as u32;
        element.id = id;
        self.elements.push(element);
        id
    }

    pub fn elements(&self) -> &[SignatureElement] {
        &self.elements
    }

    pub fn element(&self, id: u32) -> Option<&SignatureElement> {
        self.elements.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A serialized root signature. The module stores it without interpreting it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSignatureHandle {
    serialized: Vec<u8>,
}

impl RootSignatureHandle {
    pub fn from_serialized(serialized: Vec<u8>) -> Self {
        Self { serialized }
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    pub fn is_empty(&self) -> bool {
        self.serialized.is_empty()
    }

    pub fn clear(&mut self) {
        self.serialized.clear();
    }
}

/// The three signatures plus the root signature owned by a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    input: Signature,
    output: Signature,
    patch_constant: Signature,
    root: RootSignatureHandle,
}

impl SignatureSet {
    pub fn get(&self, kind: SignatureKind) -> &Signature {
        match kind {
            SignatureKind::Input => &self.input,
            SignatureKind::Output => &self.output,
            SignatureKind::PatchConstant => &self.patch_constant,
        }
    }

    pub fn get_mut(&mut self, kind: SignatureKind) -> &mut Signature {
        match kind {
            SignatureKind::Input => &mut self.input,
            SignatureKind::Output => &mut self.output,
            SignatureKind::PatchConstant => &mut self.patch_constant,
        }
    }

    /// Transfers the signature out, leaving an empty one in its place.
    pub fn release(&mut self, kind: SignatureKind) -> Signature {
        std::mem::take(self.get_mut(kind))
    }

    pub fn root(&self) -> &RootSignatureHandle {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RootSignatureHandle {
        &mut self.root
    }

    pub fn release_root(&mut self) -> RootSignatureHandle {
        std::mem::take(&mut self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> SignatureElement {
        SignatureElement::new("SV_Position", SemanticKind::Position, ComponentType::F32)
            .with_shape(1, 4)
    }

    #[test]
    fn appended_elements_are_numbered_in_order() {
        let mut sig = Signature::default();
        assert_eq!(sig.append_element(position()), 0);
        assert_eq!(
            sig.append_element(SignatureElement::new(
                "TEXCOORD",
                SemanticKind::Arbitrary,
                ComponentType::F32
            )),
            1
        );
        assert_eq!(sig.element(1).unwrap().semantic_name, "TEXCOORD");
        assert_eq!(sig.element(2), None);
    }

    #[test]
    fn release_leaves_an_empty_signature() {
        let mut set = SignatureSet::default();
        set.get_mut(SignatureKind::Output).append_element(position());

        let released = set.release(SignatureKind::Output);
        assert_eq!(released.len(), 1);
        assert!(set.get(SignatureKind::Output).is_empty());

        // A second release yields an empty signature rather than failing.
        assert!(set.release(SignatureKind::Output).is_empty());
    }

    #[test]
    fn root_signature_release_is_repeatable() {
        let mut set = SignatureSet::default();
        *set.root_mut() = RootSignatureHandle::from_serialized(vec![1, 2, 3]);
        assert_eq!(set.release_root().serialized(), &[1, 2, 3]);
        assert!(set.root().is_empty());
        assert!(set.release_root().is_empty());
    }
}
