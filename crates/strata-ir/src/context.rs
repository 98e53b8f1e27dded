//! IrContext: arena-based mutable IR storage.
//!
//! All IR entities (operations, values, blocks, regions) live in
//! `PrimaryMap`s owned by `IrContext`. Operand and result lists use
//! `EntityList + ListPool` for compact per-op storage. Entities are never
//! freed: erasing an operation detaches it and unregisters its uses, so
//! stale handles stay valid for diagnostics and rollback.

use std::collections::BTreeMap;

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use crate::location::Location;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::*;

// ============================================================================
// Use-chain
// ============================================================================

/// A single use of a value: which operation uses it, at which operand index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: OpRef,
    pub operand_index: u32,
}

// ============================================================================
// Entity data types
// ============================================================================

/// Data for a single operation in the arena.
pub struct OperationData {
    pub location: Location,
    pub dialect: Symbol,
    pub name: Symbol,
    pub operands: EntityList<ValueRef>,
    pub results: EntityList<TypeRef>,
    pub attributes: BTreeMap<Symbol, Attribute>,
    pub regions: SmallVec<[RegionRef; 4]>,
    pub successors: SmallVec<[BlockRef; 4]>,
    pub parent_block: Option<BlockRef>,
}

/// Data for a single SSA value.
pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

/// Data for a block argument (type + optional attributes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockArgData {
    pub ty: TypeRef,
    pub attrs: BTreeMap<Symbol, Attribute>,
}

impl BlockArgData {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            attrs: BTreeMap::new(),
        }
    }
}

/// Data for a basic block.
pub struct BlockData {
    pub location: Location,
    pub args: Vec<BlockArgData>,
    pub ops: SmallVec<[OpRef; 4]>,
    pub parent_region: Option<RegionRef>,
}

impl BlockData {
    /// An empty, unowned block with the given argument types.
    pub fn with_args(location: Location, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            location,
            args: tys.into_iter().map(BlockArgData::new).collect(),
            ops: SmallVec::new(),
            parent_region: None,
        }
    }
}

/// Data for a region (ordered list of blocks; the first is the entry block).
pub struct RegionData {
    pub location: Location,
    pub blocks: SmallVec<[BlockRef; 4]>,
    pub parent_op: Option<OpRef>,
}

// ============================================================================
// IrContext
// ============================================================================

/// Arena-based mutable IR context.
///
/// Owns all IR entities and provides methods for creating, querying,
/// and mutating them. Use-chains are maintained by every mutator here;
/// `op_mut` is the one escape hatch that can desync them.
pub struct IrContext {
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,

    /// Use-chain: for each value, the list of operations that use it.
    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,

    pub types: TypeInterner,
    pub paths: PathInterner,

    value_pool: ListPool<ValueRef>,
    type_pool: ListPool<TypeRef>,

    result_values: SecondaryMap<OpRef, EntityList<ValueRef>>,
    block_arg_values: SecondaryMap<BlockRef, EntityList<ValueRef>>,
}

impl IrContext {
    pub fn new() -> Self {
        Self {
            ops: PrimaryMap::new(),
            values: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            regions: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            types: TypeInterner::new(),
            paths: PathInterner::new(),
            value_pool: ListPool::new(),
            type_pool: ListPool::new(),
            result_values: SecondaryMap::new(),
            block_arg_values: SecondaryMap::new(),
        }
    }

    // ========================================================================
    // Operation
    // ========================================================================

    /// Create a new operation and allocate result values for it.
    ///
    /// The operation's operands are registered in the use-chain.
    /// The operation is created detached; use `push_op` or one of the
    /// `insert_op_*` methods to attach it to a block.
    ///
    /// # Panics
    ///
    /// Panics if `data.parent_block` is `Some`, or if any region in
    /// `data.regions` already belongs to another operation.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        assert!(
            data.parent_block.is_none(),
            "create_op: operation must not have parent_block set; \
             use push_op to attach to a block after creation",
        );

        let operand_slice: SmallVec<[ValueRef; 8]> =
            data.operands.as_slice(&self.value_pool).into();
        let result_types: SmallVec<[TypeRef; 4]> = data.results.as_slice(&self.type_pool).into();
        let regions = data.regions.clone();

        let op = self.ops.push(data);

        for &r in &regions {
            if let Some(existing) = self.regions[r].parent_op {
                panic!(
                    "create_op: region {r} already belongs to operation {existing}; \
                     cannot reassign to {op}",
                );
            }
            self.regions[r].parent_op = Some(op);
        }

        for (idx, &val) in operand_slice.iter().enumerate() {
            self.uses[val].push(Use {
                user: op,
                operand_index: idx as u32,
            });
        }

        let mut result_value_list = EntityList::new();
        for (idx, &ty) in result_types.iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::OpResult(op, idx as u32),
                ty,
            });
            result_value_list.push(v, &mut self.value_pool);
        }
        self.result_values[op] = result_value_list;

        op
    }

    /// Number of operations ever created.
    ///
    /// Handles are allocated densely, so every op created after a snapshot of
    /// this count has an index at or above it.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    /// Get mutable reference to operation data.
    ///
    /// **Warning**: Modifying operands directly will desync the use-chain.
    /// Use `set_operand` or `replace_all_uses` instead.
    pub fn op_mut(&mut self, op: OpRef) -> &mut OperationData {
        &mut self.ops[op]
    }

    /// Check whether the operation is `dialect.name`.
    pub fn is_op(&self, op: OpRef, dialect: Symbol, name: Symbol) -> bool {
        let data = &self.ops[op];
        data.dialect == dialect && data.name == name
    }

    /// Fully qualified `dialect.name` of an operation.
    pub fn op_full_name(&self, op: OpRef) -> String {
        let data = &self.ops[op];
        format!("{}.{}", data.dialect, data.name)
    }

    pub fn op_attr(&self, op: OpRef, key: Symbol) -> Option<&Attribute> {
        self.ops[op].attributes.get(&key)
    }

    /// Set (or clear, with `None`) an attribute, returning the previous value.
    pub fn set_attr(&mut self, op: OpRef, key: Symbol, value: Option<Attribute>) -> Option<Attribute> {
        let attrs = &mut self.ops[op].attributes;
        match value {
            Some(value) => attrs.insert(key, value),
            None => attrs.remove(&key),
        }
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].operands.as_slice(&self.value_pool)
    }

    pub fn op_result_types(&self, op: OpRef) -> &[TypeRef] {
        self.ops[op].results.as_slice(&self.type_pool)
    }

    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.result_values[op].as_slice(&self.value_pool)[index as usize]
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        self.result_values[op].as_slice(&self.value_pool)
    }

    /// The operation owning the region that contains `op`'s block.
    pub fn parent_op(&self, op: OpRef) -> Option<OpRef> {
        let block = self.ops[op].parent_block?;
        self.block_parent_op(block)
    }

    /// Position of `op` inside its parent block.
    pub fn op_index_in_block(&self, op: OpRef) -> Option<usize> {
        let block = self.ops[op].parent_block?;
        self.blocks[block].ops.iter().position(|&o| o == op)
    }

    /// Rewire operand `index` of `op` to `new`, keeping both use-chains in sync.
    pub fn set_operand(&mut self, op: OpRef, index: u32, new: ValueRef) {
        let slice = self.ops[op].operands.as_mut_slice(&mut self.value_pool);
        let old = slice[index as usize];
        if old == new {
            return;
        }
        slice[index as usize] = new;
        self.uses[old].retain(|u| !(u.user == op && u.operand_index == index));
        self.uses[new].push(Use {
            user: op,
            operand_index: index,
        });
    }

    /// Unregister every operand use held by `op` without touching its operand list.
    ///
    /// Used before erasing an operation whose operands may themselves be erased.
    pub fn drop_operand_uses(&mut self, op: OpRef) {
        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].retain(|u| !(u.user == op && u.operand_index == idx as u32));
        }
    }

    /// Re-register the operand uses of `op`, undoing `drop_operand_uses`.
    pub fn restore_operand_uses(&mut self, op: OpRef) {
        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (idx, &val) in operands.iter().enumerate() {
            let u = Use {
                user: op,
                operand_index: idx as u32,
            };
            if !self.uses[val].contains(&u) {
                self.uses[val].push(u);
            }
        }
    }

    /// Remove an operation, clearing its use-chain entries.
    ///
    /// # Panics
    ///
    /// Panics if the operation is still attached to a block or if any
    /// result value still has uses.
    pub fn remove_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block {
            panic!(
                "remove_op: operation {op} is still attached to block {block}; \
                 call remove_op_from_block first",
            );
        }

        let results: SmallVec<[ValueRef; 4]> =
            self.result_values[op].as_slice(&self.value_pool).into();
        for &val in &results {
            assert!(
                self.uses[val].is_empty(),
                "remove_op: result value {val} still has {} use(s); \
                 replace all uses before removing the operation",
                self.uses[val].len()
            );
        }

        self.drop_operand_uses(op);
    }

    // ========================================================================
    // Value
    // ========================================================================

    pub fn value(&self, v: ValueRef) -> &ValueData {
        &self.values[v]
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    /// Retype a value in place. Block argument metadata is kept in sync.
    pub fn set_value_type(&mut self, v: ValueRef, ty: TypeRef) {
        self.values[v].ty = ty;
        if let ValueDef::BlockArg(block, idx) = self.values[v].def {
            if let Some(arg) = self.blocks[block].args.get_mut(idx as usize) {
                arg.ty = ty;
            }
        }
    }

    // ========================================================================
    // Block
    // ========================================================================

    /// Create a new block and allocate argument values for it.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let arg_types: SmallVec<[TypeRef; 4]> = data.args.iter().map(|a| a.ty).collect();
        let block = self.blocks.push(data);

        let mut arg_value_list = EntityList::new();
        for (idx, ty) in arg_types.into_iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::BlockArg(block, idx as u32),
                ty,
            });
            arg_value_list.push(v, &mut self.value_pool);
        }
        self.block_arg_values[block] = arg_value_list;

        block
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_arg_values[b].as_slice(&self.value_pool)[index as usize]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        self.block_arg_values[b].as_slice(&self.value_pool)
    }

    /// The operation owning the region that contains `block`.
    pub fn block_parent_op(&self, block: BlockRef) -> Option<OpRef> {
        let region = self.blocks[block].parent_region?;
        self.regions[region].parent_op
    }

    /// Replace a block's argument list.
    ///
    /// Each slot either reuses an existing value (which is re-indexed and
    /// retyped) or allocates a fresh one. Values of the old list that are not
    /// reused become orphans: they keep their uses but no longer belong to
    /// the block.
    pub fn rebuild_block_args(
        &mut self,
        block: BlockRef,
        slots: Vec<(BlockArgData, Option<ValueRef>)>,
    ) -> SmallVec<[ValueRef; 4]> {
        self.block_arg_values[block].clear(&mut self.value_pool);

        let mut list = EntityList::new();
        let mut args = Vec::with_capacity(slots.len());
        let mut values = SmallVec::new();
        for (idx, (data, existing)) in slots.into_iter().enumerate() {
            let def = ValueDef::BlockArg(block, idx as u32);
            let v = match existing {
                Some(v) => {
                    let value = &mut self.values[v];
                    value.def = def;
                    value.ty = data.ty;
                    v
                }
                None => self.values.push(ValueData { def, ty: data.ty }),
            };
            list.push(v, &mut self.value_pool);
            values.push(v);
            args.push(data);
        }

        self.blocks[block].args = args;
        self.block_arg_values[block] = list;
        values
    }

    /// Append an operation to the end of a block.
    ///
    /// # Panics
    ///
    /// Panics if the operation already belongs to a block.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        let len = self.blocks[block].ops.len();
        self.insert_op_at(block, len, op);
    }

    /// Insert an operation at position `index` of a block.
    ///
    /// # Panics
    ///
    /// Panics if the operation already belongs to a block.
    pub fn insert_op_at(&mut self, block: BlockRef, index: usize, op: OpRef) {
        if let Some(existing) = self.ops[op].parent_block {
            panic!(
                "insert_op_at: operation {op} already belongs to block {existing}; \
                 remove it from the old block first",
            );
        }
        self.blocks[block].ops.insert(index, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Insert an operation before `before` in the given block.
    ///
    /// # Panics
    ///
    /// Panics if `before` is not in the block.
    pub fn insert_op_before(&mut self, block: BlockRef, before: OpRef, op: OpRef) {
        let pos = self.blocks[block]
            .ops
            .iter()
            .position(|&o| o == before)
            .unwrap_or_else(|| panic!("insert_op_before: {before} not found in {block}"));
        self.insert_op_at(block, pos, op);
    }

    /// Detach an operation from a block (does not destroy it).
    ///
    /// Returns the position the operation occupied, if it was there.
    pub fn remove_op_from_block(&mut self, block: BlockRef, op: OpRef) -> Option<usize> {
        let ops = &mut self.blocks[block].ops;
        let pos = ops.iter().position(|&o| o == op);
        if let Some(pos) = pos {
            ops.remove(pos);
        }
        if self.ops[op].parent_block == Some(block) {
            self.ops[op].parent_block = None;
        }
        pos
    }

    // ========================================================================
    // Region
    // ========================================================================

    /// Create a new region.
    ///
    /// # Panics
    ///
    /// Panics if any block in `data.blocks` already belongs to another region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let region = self.regions.push(data);

        let blocks = self.regions[region].blocks.clone();
        for &b in &blocks {
            if let Some(existing) = self.blocks[b].parent_region {
                panic!(
                    "create_region: block {b} already belongs to region {existing}; \
                     cannot reassign to {region}",
                );
            }
            self.blocks[b].parent_region = Some(region);
        }

        region
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    /// Detach a contiguous range of blocks from a region.
    ///
    /// The blocks keep their identity, arguments and operations.
    pub fn take_blocks(
        &mut self,
        region: RegionRef,
        range: std::ops::Range<usize>,
    ) -> SmallVec<[BlockRef; 4]> {
        let taken: SmallVec<[BlockRef; 4]> = self.regions[region].blocks.drain(range).collect();
        for &b in &taken {
            self.blocks[b].parent_region = None;
        }
        taken
    }

    /// Insert unowned blocks into a region at position `index`.
    ///
    /// # Panics
    ///
    /// Panics if any block still belongs to a region.
    pub fn insert_blocks(&mut self, region: RegionRef, index: usize, blocks: &[BlockRef]) {
        for (offset, &b) in blocks.iter().enumerate() {
            if let Some(existing) = self.blocks[b].parent_region {
                panic!("insert_blocks: block {b} already belongs to region {existing}");
            }
            self.blocks[b].parent_region = Some(region);
            self.regions[region].blocks.insert(index + offset, b);
        }
    }

    // ========================================================================
    // Use-chain
    // ========================================================================

    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    /// Replace all uses of `old` with `new` in all operations.
    ///
    /// Returns the uses that were moved.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) -> SmallVec<[Use; 2]> {
        if old == new {
            return SmallVec::new();
        }
        let old_uses = std::mem::take(&mut self.uses[old]);

        for u in &old_uses {
            let slice = self.ops[u.user].operands.as_mut_slice(&mut self.value_pool);
            debug_assert_eq!(slice[u.operand_index as usize], old);
            slice[u.operand_index as usize] = new;
            self.uses[new].push(*u);
        }
        old_uses
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OperationDataBuilder
// ============================================================================

/// Builder for constructing `OperationData` with pool-backed lists.
///
/// Collects operands and result types into `Vec`s, then packs them
/// into `EntityList`s on `build()`.
pub struct OperationDataBuilder {
    location: Location,
    dialect: Symbol,
    name: Symbol,
    operands: Vec<ValueRef>,
    results: Vec<TypeRef>,
    attributes: BTreeMap<Symbol, Attribute>,
    regions: SmallVec<[RegionRef; 4]>,
    successors: SmallVec<[BlockRef; 4]>,
}

impl OperationDataBuilder {
    pub fn new(location: Location, dialect: Symbol, name: Symbol) -> Self {
        Self {
            location,
            dialect,
            name,
            operands: Vec::new(),
            results: Vec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
            successors: SmallVec::new(),
        }
    }

    pub fn operand(mut self, v: ValueRef) -> Self {
        self.operands.push(v);
        self
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(mut self, ty: TypeRef) -> Self {
        self.results.push(ty);
        self
    }

    pub fn results(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.results.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attributes.insert(key.into(), val);
        self
    }

    pub fn attrs(mut self, attrs: impl IntoIterator<Item = (Symbol, Attribute)>) -> Self {
        self.attributes.extend(attrs);
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    pub fn successor(mut self, b: BlockRef) -> Self {
        self.successors.push(b);
        self
    }

    pub fn successors(mut self, bs: impl IntoIterator<Item = BlockRef>) -> Self {
        self.successors.extend(bs);
        self
    }

    /// Pack the collected lists into `EntityList`s using the context's pools.
    pub fn build(self, ctx: &mut IrContext) -> OperationData {
        let mut operands = EntityList::new();
        for v in self.operands {
            operands.push(v, &mut ctx.value_pool);
        }
        let mut results = EntityList::new();
        for ty in self.results {
            results.push(ty, &mut ctx.type_pool);
        }
        OperationData {
            location: self.location,
            dialect: self.dialect,
            name: self.name,
            operands,
            results,
            attributes: self.attributes,
            regions: self.regions,
            successors: self.successors,
            parent_block: None,
        }
    }
}
