//! Per-argument record of how a block or function signature changes.
//!
//! Each original argument maps to a contiguous run of converted arguments
//! (1:1, 1:N, or 1:0), or is replaced by an existing value. Extra arguments
//! without an original counterpart can be appended after the converted ones.

use smallvec::SmallVec;

use crate::refs::{TypeRef, ValueRef};

/// Where an original argument went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMapping {
    /// Converted into `len` arguments starting at position `start`.
    Converted { start: usize, len: usize },
    /// Dropped from the signature; uses are redirected to this value.
    Remapped(ValueRef),
}

/// Append-only signature conversion accumulator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureConversion {
    mappings: Vec<Option<InputMapping>>,
    converted: SmallVec<[TypeRef; 4]>,
}

impl SignatureConversion {
    /// A conversion for a signature with `num_original` arguments.
    pub fn new(num_original: usize) -> Self {
        Self {
            mappings: vec![None; num_original],
            converted: SmallVec::new(),
        }
    }

    pub fn num_original(&self) -> usize {
        self.mappings.len()
    }

    /// Map original argument `index` to `types` (empty to drop it).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or already mapped.
    pub fn add_inputs(&mut self, index: usize, types: &[TypeRef]) {
        assert!(
            self.mappings[index].is_none(),
            "add_inputs: argument {index} is already mapped"
        );
        self.mappings[index] = Some(InputMapping::Converted {
            start: self.converted.len(),
            len: types.len(),
        });
        self.converted.extend_from_slice(types);
    }

    /// Append arguments that have no original counterpart.
    pub fn append_inputs(&mut self, types: &[TypeRef]) {
        self.converted.extend_from_slice(types);
    }

    /// Drop original argument `index`, redirecting its uses to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or already mapped.
    pub fn remap_input(&mut self, index: usize, value: ValueRef) {
        assert!(
            self.mappings[index].is_none(),
            "remap_input: argument {index} is already mapped"
        );
        self.mappings[index] = Some(InputMapping::Remapped(value));
    }

    /// Mapping recorded for original argument `index`, if any.
    pub fn input_mapping(&self, index: usize) -> Option<InputMapping> {
        self.mappings.get(index).copied().flatten()
    }

    /// The full converted argument type list.
    pub fn converted_types(&self) -> &[TypeRef] {
        &self.converted
    }

    /// Whether position `position` of the converted list belongs to no original argument.
    pub(crate) fn is_appended(&self, position: usize) -> bool {
        !self.mappings.iter().flatten().any(|m| match *m {
            InputMapping::Converted { start, len } => (start..start + len).contains(&position),
            InputMapping::Remapped(_) => false,
        })
    }
}
