//! Type converter for dialect conversion.
//!
//! Holds an ordered list of conversion rules. Each rule inspects a type and
//! either claims it (converting it to zero or more target types, or declaring
//! it unconvertible) or defers to the next rule.

use smallvec::SmallVec;

use crate::context::IrContext;
use crate::dialect::core;
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::types::TypeInterner;

use super::signature_conversion::SignatureConversion;

/// Outcome of a rule that claimed a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeConversion {
    /// The type maps to these types (one for 1:1, several for 1:N, none to drop it).
    Converted(SmallVec<[TypeRef; 2]>),
    /// The type has no representation in the target.
    Illegal,
}

impl TypeConversion {
    pub fn one(ty: TypeRef) -> Self {
        TypeConversion::Converted(smallvec::smallvec![ty])
    }
}

/// Conversion rule signature: `None` defers to the next rule.
type ConversionFn = dyn Fn(&mut TypeInterner, TypeRef) -> Option<TypeConversion>;

/// Argument materializer: builds a detached op whose first result stands in
/// for one original value of type `TypeRef` that was expanded into `inputs`.
type MaterializerFn = dyn Fn(&mut IrContext, Location, &[ValueRef], TypeRef) -> OpRef;

/// Maps source types to target types during dialect conversion.
pub struct TypeConverter {
    conversions: Vec<Box<ConversionFn>>,
    materializer: Option<Box<MaterializerFn>>,
}

impl TypeConverter {
    pub fn new() -> Self {
        Self {
            conversions: Vec::new(),
            materializer: None,
        }
    }

    /// Add a conversion rule. Rules are tried in insertion order.
    pub fn add_conversion(
        &mut self,
        f: impl Fn(&mut TypeInterner, TypeRef) -> Option<TypeConversion> + 'static,
    ) {
        self.conversions.push(Box::new(f));
    }

    /// Add a rule keeping every type that satisfies `pred` unchanged.
    pub fn add_legal_type(&mut self, pred: impl Fn(&TypeInterner, TypeRef) -> bool + 'static) {
        self.add_conversion(move |types, ty| pred(types, ty).then(|| TypeConversion::one(ty)));
    }

    /// Replace the default argument materializer (`core.unrealized_conversion_cast`).
    pub fn set_argument_materializer(
        &mut self,
        f: impl Fn(&mut IrContext, Location, &[ValueRef], TypeRef) -> OpRef + 'static,
    ) {
        self.materializer = Some(Box::new(f));
    }

    /// Convert a type to its (possibly empty) list of target types.
    ///
    /// Returns `None` when the type is unconvertible or no rule claims it.
    pub fn convert_type_into(
        &self,
        types: &mut TypeInterner,
        ty: TypeRef,
    ) -> Option<SmallVec<[TypeRef; 2]>> {
        for conv in &self.conversions {
            match conv(types, ty) {
                Some(TypeConversion::Converted(converted)) => return Some(converted),
                Some(TypeConversion::Illegal) => return None,
                None => {}
            }
        }
        None
    }

    /// Convert a type that must map to exactly one target type.
    pub fn convert_type(&self, types: &mut TypeInterner, ty: TypeRef) -> Option<TypeRef> {
        match self.convert_type_into(types, ty)?.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// Convert every type of a list 1:1. Fails as a whole if any element fails.
    pub fn convert_types(
        &self,
        types: &mut TypeInterner,
        tys: &[TypeRef],
    ) -> Option<SmallVec<[TypeRef; 4]>> {
        tys.iter().map(|&ty| self.convert_type(types, ty)).collect()
    }

    /// Record the conversion of original argument `index` into `conversion`.
    pub fn convert_signature_arg(
        &self,
        types: &mut TypeInterner,
        index: usize,
        ty: TypeRef,
        conversion: &mut SignatureConversion,
    ) -> bool {
        match self.convert_type_into(types, ty) {
            Some(converted) => {
                conversion.add_inputs(index, &converted);
                true
            }
            None => false,
        }
    }

    /// Build a signature conversion for a whole argument list.
    pub fn convert_signature(
        &self,
        types: &mut TypeInterner,
        arg_types: &[TypeRef],
    ) -> Option<SignatureConversion> {
        let mut conversion = SignatureConversion::new(arg_types.len());
        for (i, &ty) in arg_types.iter().enumerate() {
            if !self.convert_signature_arg(types, i, ty, &mut conversion) {
                return None;
            }
        }
        Some(conversion)
    }

    /// Whether the converter keeps `ty` as is.
    pub fn is_legal(&self, types: &mut TypeInterner, ty: TypeRef) -> bool {
        self.convert_type(types, ty) == Some(ty)
    }

    /// Create the detached op that reassembles an expanded argument.
    pub(crate) fn materialize_argument(
        &self,
        ctx: &mut IrContext,
        location: Location,
        inputs: &[ValueRef],
        original: TypeRef,
    ) -> OpRef {
        match &self.materializer {
            Some(f) => f(ctx, location, inputs, original),
            None => core::unrealized_conversion_cast(ctx, location, inputs, original).op_ref(),
        }
    }
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new()
    }
}
