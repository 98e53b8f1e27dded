//! Attributes, type interning and path interning.

use std::collections::{BTreeMap, HashMap};

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::location::Location;
use crate::refs::{PathRef, TypeRef};
use crate::symbol::Symbol;

// ============================================================================
// Attribute
// ============================================================================

/// Compile-time constant data attached to operations, types and block arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Unit value. Also marks a dynamic dimension inside a memref shape.
    Unit,
    Bool(bool),
    /// Integer constant stored as raw bits (signless).
    IntBits(u64),
    /// Float constant stored as raw bits.
    FloatBits(u64),
    String(String),
    Type(TypeRef),
    /// Single interned symbol.
    Symbol(Symbol),
    /// List of attributes. A list of symbols is a nested symbol reference.
    List(Vec<Attribute>),
    Location(Location),
}

impl Attribute {
    /// Integer payload reinterpreted as a signed value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::IntBits(bits) => Some(*bits as i64),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Attribute::Symbol(sym) => Some(*sym),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<TypeRef> {
        match self {
            Attribute::Type(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Attribute]> {
        match self {
            Attribute::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::IntBits(value as u64)
    }
}

impl From<u64> for Attribute {
    fn from(value: u64) -> Self {
        Attribute::IntBits(value)
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<Vec<Attribute>> for Attribute {
    fn from(value: Vec<Attribute>) -> Self {
        Attribute::List(value)
    }
}

impl From<Symbol> for Attribute {
    fn from(value: Symbol) -> Self {
        Attribute::Symbol(value)
    }
}

impl From<TypeRef> for Attribute {
    fn from(value: TypeRef) -> Self {
        Attribute::Type(value)
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::String(value)
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
}

// ============================================================================
// TypeData
// ============================================================================

/// Data for a single interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeData {
    pub dialect: Symbol,
    pub name: Symbol,
    pub params: SmallVec<[TypeRef; 4]>,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

/// Builder for constructing `TypeData` with a fluent API.
pub struct TypeDataBuilder {
    dialect: Symbol,
    name: Symbol,
    params: SmallVec<[TypeRef; 4]>,
    attrs: BTreeMap<Symbol, Attribute>,
}

impl TypeDataBuilder {
    pub fn new(dialect: Symbol, name: Symbol) -> Self {
        Self {
            dialect,
            name,
            params: SmallVec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn param(mut self, ty: TypeRef) -> Self {
        self.params.push(ty);
        self
    }

    pub fn params(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.params.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attrs.insert(key.into(), val);
        self
    }

    pub fn build(self) -> TypeData {
        TypeData {
            dialect: self.dialect,
            name: self.name,
            params: self.params,
            attrs: self.attrs,
        }
    }
}

// ============================================================================
// TypeInterner
// ============================================================================

/// Deduplicating type interner. Equal `TypeData` always yields the same `TypeRef`,
/// so type equality is handle equality.
#[derive(Default)]
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a type, returning an existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    /// Intern a parameterless, attribute-less type.
    pub fn simple(&mut self, dialect: &'static str, name: &'static str) -> TypeRef {
        self.intern(TypeDataBuilder::new(Symbol::new(dialect), Symbol::new(name)).build())
    }

    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }

    /// Check if this type matches the given dialect and name.
    pub fn is_dialect(&self, r: TypeRef, dialect: Symbol, name: Symbol) -> bool {
        let data = &self.types[r];
        data.dialect == dialect && data.name == name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ============================================================================
// PathInterner
// ============================================================================

/// Deduplicating path (URI string) interner.
#[derive(Default)]
pub struct PathInterner {
    paths: PrimaryMap<PathRef, String>,
    dedup: HashMap<String, PathRef>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, path: impl Into<String>) -> PathRef {
        let path = path.into();
        if let Some(&existing) = self.dedup.get(&path) {
            return existing;
        }
        let r = self.paths.push(path.clone());
        self.dedup.insert(path, r);
        r
    }

    pub fn get(&self, r: PathRef) -> &str {
        &self.paths[r]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_type_data_interns_once() {
        let mut interner = TypeInterner::new();
        let a = interner.simple("core", "i32");
        let b = interner.simple("core", "i32");
        let c = interner.simple("core", "i64");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn attrs_take_part_in_identity() {
        let mut interner = TypeInterner::new();
        let f32_ty = interner.simple("core", "f32");
        let global = interner.intern(
            TypeDataBuilder::new(Symbol::new("llvm"), Symbol::new("ptr"))
                .param(f32_ty)
                .attr("addrspace", Attribute::from(1u64))
                .build(),
        );
        let generic = interner.intern(
            TypeDataBuilder::new(Symbol::new("llvm"), Symbol::new("ptr"))
                .param(f32_ty)
                .attr("addrspace", Attribute::from(0u64))
                .build(),
        );
        assert_ne!(global, generic);
        assert_eq!(interner.get(global).params[0], f32_ty);
    }

    #[test]
    fn negative_ints_round_trip_through_bits() {
        let attr = Attribute::from(-7i64);
        assert_eq!(attr.as_int(), Some(-7));
    }

    #[test]
    fn path_interner_dedup() {
        let mut interner = PathInterner::new();
        let a = interner.intern("file:///kernel.mlir");
        let b = interner.intern("file:///kernel.mlir".to_owned());
        assert_eq!(a, b);
        assert_eq!(interner.get(a), "file:///kernel.mlir");
    }
}
