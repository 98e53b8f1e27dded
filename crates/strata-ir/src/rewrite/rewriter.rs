//! ConversionRewriter: the mutation channel for conversion patterns.
//!
//! Every edit a pattern makes to attached IR goes through the rewriter and
//! appends an undo record to its log. When a pattern declines, the driver
//! rolls the log back to the checkpoint taken before the attempt, so a
//! declining pattern leaves the IR exactly as it found it.
//!
//! Replacements are lazy: replacing an operation maps its results to the
//! new values in a remap table and schedules the operation for erasure.
//! Users keep pointing at the old results until the driver finalises the
//! conversion; in the meantime [`ConversionRewriter::lookup`] resolves them.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use super::diagnostics::{Diagnostic, Severity};
use super::signature_conversion::{InputMapping, SignatureConversion};
use super::type_converter::TypeConverter;
use crate::context::{BlockArgData, IrContext, OperationData, Use};
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};

/// Where [`ConversionRewriter::insert`] places operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionPoint {
    Before(OpRef),
    End(BlockRef),
}

/// Reversible edit.
enum Undo {
    /// A detached op was attached by `insert`.
    Inserted(OpRef),
    /// Blocks moved from `src` (at `src_index`) into `dest`.
    MovedBlocks {
        blocks: SmallVec<[BlockRef; 4]>,
        src: RegionRef,
        src_index: usize,
        dest: RegionRef,
    },
    /// A block's argument list was rebuilt.
    BlockArgs {
        block: BlockRef,
        args: Vec<BlockArgData>,
        values: SmallVec<[ValueRef; 4]>,
    },
    /// Uses of `from` were rewritten eagerly.
    ReplacedUses { from: ValueRef, uses: SmallVec<[Use; 2]> },
    /// `value` was mapped in the remap table.
    Mapped {
        value: ValueRef,
        previous: Option<ValueRef>,
    },
    ScheduledErase(OpRef),
}

/// Snapshot of the transaction state before a pattern attempt.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Checkpoint {
    log_len: usize,
    op_count: usize,
}

/// Structural precondition failure raised by a pattern.
pub(crate) struct PreconditionFailure {
    pub(crate) op: OpRef,
    pub(crate) message: String,
}

/// Transactional rewriter handed to conversion patterns.
pub struct ConversionRewriter<'a> {
    ctx: &'a mut IrContext,
    converter: &'a TypeConverter,
    root: OpRef,
    insertion_point: Option<InsertionPoint>,
    log: Vec<Undo>,
    remap: HashMap<ValueRef, ValueRef>,
    erased: Vec<OpRef>,
    erased_set: HashSet<OpRef>,
    remarks: Vec<Diagnostic>,
    precondition: Option<PreconditionFailure>,
}

impl<'a> ConversionRewriter<'a> {
    pub(crate) fn new(ctx: &'a mut IrContext, converter: &'a TypeConverter, root: OpRef) -> Self {
        Self {
            ctx,
            converter,
            root,
            insertion_point: None,
            log: Vec::new(),
            remap: HashMap::new(),
            erased: Vec::new(),
            erased_set: HashSet::new(),
            remarks: Vec::new(),
            precondition: None,
        }
    }

    // === Context access ===

    pub fn ctx(&self) -> &IrContext {
        self.ctx
    }

    /// Mutable context access, for creating detached operations, blocks,
    /// regions and types.
    ///
    /// Attached IR must only be edited through the rewriter's own methods,
    /// which keep the edits revocable.
    pub fn ctx_mut(&mut self) -> &mut IrContext {
        self.ctx
    }

    pub fn converter(&self) -> &TypeConverter {
        self.converter
    }

    /// The operation the conversion runs on.
    pub fn root(&self) -> OpRef {
        self.root
    }

    pub fn convert_type(&mut self, ty: TypeRef) -> Option<TypeRef> {
        self.converter.convert_type(&mut self.ctx.types, ty)
    }

    pub fn convert_types(&mut self, tys: &[TypeRef]) -> Option<SmallVec<[TypeRef; 4]>> {
        self.converter.convert_types(&mut self.ctx.types, tys)
    }

    pub fn convert_signature(&mut self, arg_types: &[TypeRef]) -> Option<SignatureConversion> {
        self.converter.convert_signature(&mut self.ctx.types, arg_types)
    }

    /// Resolve a value through the remap table to its current replacement.
    pub fn lookup(&self, mut value: ValueRef) -> ValueRef {
        while let Some(&next) = self.remap.get(&value) {
            value = next;
        }
        value
    }

    /// Whether the operation is scheduled for erasure.
    pub fn is_erased(&self, op: OpRef) -> bool {
        self.erased_set.contains(&op)
    }

    // === Insertion ===

    pub fn insertion_point(&self) -> Option<InsertionPoint> {
        self.insertion_point
    }

    pub fn set_insertion_point(&mut self, point: InsertionPoint) {
        self.insertion_point = Some(point);
    }

    /// Insert subsequent operations right after `op`.
    pub fn set_insertion_point_after(&mut self, op: OpRef) {
        let Some(block) = self.ctx.op(op).parent_block else {
            return;
        };
        let ops = &self.ctx.block(block).ops;
        let next = ops
            .iter()
            .position(|&o| o == op)
            .and_then(|pos| ops.get(pos + 1).copied());
        self.insertion_point = Some(match next {
            Some(next) => InsertionPoint::Before(next),
            None => InsertionPoint::End(block),
        });
    }

    pub fn set_insertion_point_to_start(&mut self, block: BlockRef) {
        self.insertion_point = Some(match self.ctx.block(block).ops.first() {
            Some(&first) => InsertionPoint::Before(first),
            None => InsertionPoint::End(block),
        });
    }

    /// Attach a detached operation at the current insertion point.
    ///
    /// # Panics
    ///
    /// Panics if there is no insertion point or it refers to a detached op.
    pub fn insert(&mut self, op: OpRef) -> OpRef {
        match self.insertion_point {
            Some(InsertionPoint::Before(anchor)) => {
                let block = self
                    .ctx
                    .op(anchor)
                    .parent_block
                    .unwrap_or_else(|| panic!("insert: insertion anchor {anchor} is detached"));
                self.ctx.insert_op_before(block, anchor, op);
            }
            Some(InsertionPoint::End(block)) => self.ctx.push_op(block, op),
            None => panic!("insert: no insertion point set"),
        }
        self.log.push(Undo::Inserted(op));
        op
    }

    /// Create an operation from `data` and insert it at the insertion point.
    pub fn create(&mut self, data: OperationData) -> OpRef {
        let op = self.ctx.create_op(data);
        self.insert(op)
    }

    // === Replacement ===

    /// Replace `op`, mapping its results 1:1 onto `values`, and schedule it for erasure.
    pub fn replace_op(&mut self, op: OpRef, values: &[ValueRef]) {
        let results: SmallVec<[ValueRef; 4]> = self.ctx.op_results(op).into();
        debug_assert_eq!(
            results.len(),
            values.len(),
            "replace_op: result count mismatch ({} vs {})",
            results.len(),
            values.len()
        );
        for (&old, &new) in results.iter().zip(values) {
            self.map_value(old, new);
        }
        self.erase_op(op);
    }

    /// Replace `op` with `new_op`, inserting `new_op` at the insertion point
    /// if it is still detached.
    pub fn replace_op_with(&mut self, op: OpRef, new_op: OpRef) {
        if self.ctx.op(new_op).parent_block.is_none() {
            self.insert(new_op);
        }
        let values: SmallVec<[ValueRef; 4]> = self.ctx.op_results(new_op).into();
        self.replace_op(op, &values);
    }

    /// Schedule `op` (and everything nested in it) for erasure.
    pub fn erase_op(&mut self, op: OpRef) {
        if self.erased_set.insert(op) {
            self.erased.push(op);
            self.log.push(Undo::ScheduledErase(op));
        }
    }

    fn map_value(&mut self, value: ValueRef, replacement: ValueRef) {
        if value == replacement {
            return;
        }
        let previous = self.remap.insert(value, replacement);
        self.log.push(Undo::Mapped { value, previous });
    }

    fn replace_all_uses(&mut self, from: ValueRef, to: ValueRef) {
        let uses = self.ctx.replace_all_uses(from, to);
        if !uses.is_empty() {
            self.log.push(Undo::ReplacedUses { from, uses });
        }
    }

    // === Regions and blocks ===

    /// Move every block of `src` into `dest`, before `before` (or at the end).
    ///
    /// Blocks keep their identity, arguments and operations.
    pub fn inline_region_before(&mut self, src: RegionRef, dest: RegionRef, before: Option<BlockRef>) {
        let len = self.ctx.region(src).blocks.len();
        if len == 0 {
            return;
        }
        let blocks = self.ctx.take_blocks(src, 0..len);
        let index = before
            .and_then(|b| self.ctx.region(dest).blocks.iter().position(|&x| x == b))
            .unwrap_or(self.ctx.region(dest).blocks.len());
        self.ctx.insert_blocks(dest, index, &blocks);
        self.log.push(Undo::MovedBlocks {
            blocks,
            src,
            src_index: 0,
            dest,
        });
    }

    /// Rewrite a block's arguments according to `conversion`.
    ///
    /// - 1:1 keeps the argument value (retyped), so its uses are untouched.
    /// - 1:N adds fresh arguments and a materializing op at the block start
    ///   standing in for the original argument.
    /// - remapped arguments are removed and their uses redirected.
    /// - 1:0 removes the argument; this fails if it still has uses.
    /// - appended inputs become fresh arguments.
    ///
    /// Returns the new argument list, or `None` (without mutating anything)
    /// if the conversion does not fit the block.
    pub fn apply_signature_conversion(
        &mut self,
        block: BlockRef,
        conversion: &SignatureConversion,
    ) -> Option<SmallVec<[ValueRef; 4]>> {
        let old_values: SmallVec<[ValueRef; 4]> = self.ctx.block_args(block).into();
        if conversion.num_original() != old_values.len() {
            return None;
        }
        let old_args = self.ctx.block(block).args.clone();
        let new_types = conversion.converted_types();

        let mut slots: Vec<Option<(BlockArgData, Option<ValueRef>)>> = vec![None; new_types.len()];
        for (i, &old) in old_values.iter().enumerate() {
            match conversion.input_mapping(i) {
                Some(InputMapping::Converted { start, len: 1 }) => {
                    let mut data = old_args[i].clone();
                    data.ty = new_types[start];
                    slots[start] = Some((data, Some(old)));
                }
                Some(InputMapping::Converted { start, len }) => {
                    if len == 0 && self.ctx.has_uses(old) {
                        return None;
                    }
                    for pos in start..start + len {
                        slots[pos] = Some((BlockArgData::new(new_types[pos]), None));
                    }
                }
                Some(InputMapping::Remapped(_)) => {}
                None if self.ctx.has_uses(old) => return None,
                None => {}
            }
        }
        let slots: Vec<(BlockArgData, Option<ValueRef>)> = slots
            .into_iter()
            .enumerate()
            .map(|(pos, slot)| {
                debug_assert!(slot.is_some() || conversion.is_appended(pos));
                slot.unwrap_or_else(|| (BlockArgData::new(new_types[pos]), None))
            })
            .collect();

        self.log.push(Undo::BlockArgs {
            block,
            args: old_args.clone(),
            values: old_values.clone(),
        });
        let new_values = self.ctx.rebuild_block_args(block, slots);

        let location = self.ctx.block(block).location;
        let mut cast_index = 0;
        for (i, &old) in old_values.iter().enumerate() {
            match conversion.input_mapping(i) {
                Some(InputMapping::Converted { start, len }) if len > 1 => {
                    let inputs = &new_values[start..start + len];
                    let cast =
                        self.converter
                            .materialize_argument(self.ctx, location, inputs, old_args[i].ty);
                    self.ctx.insert_op_at(block, cast_index, cast);
                    self.log.push(Undo::Inserted(cast));
                    cast_index += 1;
                    let replacement = self.ctx.op_result(cast, 0);
                    self.replace_all_uses(old, replacement);
                }
                Some(InputMapping::Remapped(value)) => {
                    self.replace_all_uses(old, value);
                }
                _ => {}
            }
        }
        Some(new_values)
    }

    /// Convert the argument types of every block in `region`.
    ///
    /// The entry block uses `entry_conversion` when given; all other blocks
    /// (and the entry block otherwise) are converted with the type converter.
    pub fn convert_region_types(
        &mut self,
        region: RegionRef,
        entry_conversion: Option<&SignatureConversion>,
    ) -> bool {
        let blocks: SmallVec<[BlockRef; 4]> = self.ctx.region(region).blocks.clone();
        for (i, &block) in blocks.iter().enumerate() {
            let derived;
            let conversion = match entry_conversion {
                Some(conversion) if i == 0 => conversion,
                _ => {
                    let arg_types: SmallVec<[TypeRef; 4]> =
                        self.ctx.block(block).args.iter().map(|a| a.ty).collect();
                    let Some(conversion) =
                        self.converter.convert_signature(&mut self.ctx.types, &arg_types)
                    else {
                        return false;
                    };
                    derived = conversion;
                    &derived
                }
            };
            if self.apply_signature_conversion(block, conversion).is_none() {
                return false;
            }
        }
        true
    }

    // === Diagnostics ===

    /// Attach a remark to `op`. Remarks survive rollback.
    pub fn emit_remark(&mut self, op: OpRef, message: impl Into<String>) {
        let message = message.into();
        let op_name = self.ctx.op_full_name(op);
        tracing::warn!(op = %op, %op_name, "{message}");
        self.remarks.push(Diagnostic {
            severity: Severity::Remark,
            op,
            op_name,
            location: self.ctx.op(op).location,
            message,
        });
    }

    /// Report a broken structural precondition. The conversion aborts once
    /// the current pattern returns.
    pub fn precondition_failed(&mut self, op: OpRef, message: impl Into<String>) {
        if self.precondition.is_none() {
            self.precondition = Some(PreconditionFailure {
                op,
                message: message.into(),
            });
        }
    }

    // === Transaction control (driver) ===

    pub(crate) fn checkpoint(&mut self, op: OpRef) -> Checkpoint {
        self.insertion_point = Some(InsertionPoint::Before(op));
        Checkpoint {
            log_len: self.log.len(),
            op_count: self.ctx.op_count(),
        }
    }

    /// Undo everything recorded since `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.log.len() > checkpoint.log_len {
            let Some(undo) = self.log.pop() else {
                break;
            };
            self.revert(undo);
        }
        for op in self.created_since(checkpoint) {
            if let Some(block) = self.ctx.op(op).parent_block {
                self.ctx.remove_op_from_block(block, op);
            }
            self.ctx.drop_operand_uses(op);
        }
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Inserted(op) => {
                if let Some(block) = self.ctx.op(op).parent_block {
                    self.ctx.remove_op_from_block(block, op);
                }
            }
            Undo::MovedBlocks {
                blocks,
                src,
                src_index,
                dest,
            } => {
                let start = self
                    .ctx
                    .region(dest)
                    .blocks
                    .iter()
                    .position(|&b| b == blocks[0]);
                if let Some(start) = start {
                    let moved = self.ctx.take_blocks(dest, start..start + blocks.len());
                    self.ctx.insert_blocks(src, src_index, &moved);
                }
            }
            Undo::BlockArgs {
                block,
                args,
                values,
            } => {
                let slots = args.into_iter().zip(values).map(|(a, v)| (a, Some(v))).collect();
                self.ctx.rebuild_block_args(block, slots);
            }
            Undo::ReplacedUses { from, uses } => {
                for u in uses {
                    self.ctx.set_operand(u.user, u.operand_index, from);
                }
            }
            Undo::Mapped { value, previous } => match previous {
                Some(previous) => {
                    self.remap.insert(value, previous);
                }
                None => {
                    self.remap.remove(&value);
                }
            },
            Undo::ScheduledErase(op) => {
                self.erased_set.remove(&op);
                if let Some(pos) = self.erased.iter().rposition(|&o| o == op) {
                    self.erased.remove(pos);
                }
            }
        }
    }

    /// Operations created since `checkpoint`, in creation order.
    pub(crate) fn created_since(&self, checkpoint: Checkpoint) -> Vec<OpRef> {
        use cranelift_entity::EntityRef;
        (checkpoint.op_count..self.ctx.op_count())
            .map(OpRef::new)
            .collect()
    }

    /// Values whose uses changed meaning since `checkpoint`.
    pub(crate) fn replaced_since(&self, checkpoint: Checkpoint) -> Vec<ValueRef> {
        self.log[checkpoint.log_len..]
            .iter()
            .filter_map(|undo| match undo {
                Undo::Mapped { value, .. } => Some(*value),
                Undo::ReplacedUses { from, .. } => Some(*from),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn take_precondition_failure(&mut self) -> Option<PreconditionFailure> {
        self.precondition.take()
    }

    /// Whether `op` is still part of the IR under conversion: attached under
    /// the root with no erased ancestor.
    pub(crate) fn is_live(&self, op: OpRef) -> bool {
        let mut current = op;
        loop {
            if self.erased_set.contains(&current) {
                return false;
            }
            match self.ctx.parent_op(current) {
                Some(parent) if parent == self.root => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub(crate) fn remarks(&self) -> &[Diagnostic] {
        &self.remarks
    }

    /// Consume the transaction, returning the erase list and remap table
    /// for finalisation.
    pub(crate) fn into_parts(self) -> (Vec<OpRef>, HashMap<ValueRef, ValueRef>, Vec<Diagnostic>) {
        (self.erased, self.remap, self.remarks)
    }

    /// Drop the undo log once a pattern has committed.
    pub(crate) fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(self.log.len() >= checkpoint.log_len);
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::dialect::{arith, core, func};
    use crate::location::{Location, Span};
    use crate::ops::DialectOp;
    use crate::symbol::Symbol;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("rewriter.mlir");
        (ctx, Location::new(path, Span::new(0, 0)))
    }

    /// `module { func @f(i32, index) { %c = constant; %s = addi %arg0, %c; return } }`
    struct Fixture {
        module: OpRef,
        func: func::Func,
        entry: BlockRef,
        constant: OpRef,
        add: OpRef,
    }

    fn fixture(ctx: &mut IrContext, loc: Location) -> Fixture {
        let i32_ty = core::i32(&mut ctx.types);
        let index = core::index(&mut ctx.types);
        let module = core::module(ctx, loc, None);
        let f = func::func(ctx, loc, Symbol::new("f"), &[i32_ty, index], &[]);
        module.push(ctx, f.op_ref());
        let entry = f.entry_block(ctx).unwrap();

        let c = arith::constant(ctx, loc, i32_ty, 3);
        let cv = ctx.op_result(c.op_ref(), 0);
        let arg0 = ctx.block_arg(entry, 0);
        let add = arith::addi(ctx, loc, arg0, cv);
        let ret = func::r#return(ctx, loc, &[]);
        for op in [c.op_ref(), add.op_ref(), ret.op_ref()] {
            ctx.push_op(entry, op);
        }
        Fixture {
            module: module.op_ref(),
            func: f,
            entry,
            constant: c.op_ref(),
            add: add.op_ref(),
        }
    }

    #[test]
    fn rollback_restores_insertions_and_replacements() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let converter = TypeConverter::new();
        let ops_before = ctx.block(fx.entry).ops.clone();
        let old = ctx.op_result(fx.constant, 0);

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let cp = rw.checkpoint(fx.constant);
        let replacement = {
            let i32_ty = core::i32(&mut rw.ctx_mut().types);
            arith::constant(rw.ctx_mut(), loc, i32_ty, 4).op_ref()
        };
        rw.replace_op_with(fx.constant, replacement);

        assert!(rw.is_erased(fx.constant));
        assert_eq!(rw.lookup(old), rw.ctx().op_result(replacement, 0));
        assert_eq!(rw.ctx().block(fx.entry).ops.len(), ops_before.len() + 1);

        rw.rollback(cp);

        assert!(!rw.is_erased(fx.constant));
        assert_eq!(rw.lookup(old), old);
        assert_eq!(rw.ctx().block(fx.entry).ops, ops_before);
        assert_eq!(rw.ctx().op(replacement).parent_block, None);
    }

    #[test]
    fn insertion_point_controls_placement() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let converter = TypeConverter::new();
        let i32_ty = core::i32(&mut ctx.types);
        let first = arith::constant(&mut ctx, loc, i32_ty, 1).op_ref();
        let last = arith::constant(&mut ctx, loc, i32_ty, 2).op_ref();
        let after_add = arith::constant(&mut ctx, loc, i32_ty, 3).op_ref();

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let cp = rw.checkpoint(fx.add);
        rw.set_insertion_point_to_start(fx.entry);
        rw.insert(first);
        rw.set_insertion_point(InsertionPoint::End(fx.entry));
        rw.insert(last);
        rw.set_insertion_point_after(fx.add);
        rw.insert(after_add);

        let ops = rw.ctx().block(fx.entry).ops.clone();
        assert_eq!(ops.first(), Some(&first));
        assert_eq!(ops.last(), Some(&last));
        let add_pos = ops.iter().position(|&o| o == fx.add).unwrap();
        assert_eq!(ops[add_pos + 1], after_add);

        rw.rollback(cp);
        assert_eq!(rw.ctx().block(fx.entry).ops.len(), 3);
        assert_eq!(rw.ctx().op(first).parent_block, None);
    }

    #[test]
    fn one_to_one_signature_conversion_keeps_value_identity() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let i32_ty = core::i32(&mut ctx.types);
        let i64_ty = core::i64(&mut ctx.types);
        let arg0 = ctx.block_arg(fx.entry, 0);
        let converter = TypeConverter::new();

        let mut conv = SignatureConversion::new(2);
        conv.add_inputs(0, &[i32_ty]);
        conv.add_inputs(1, &[i64_ty]);

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let cp = rw.checkpoint(fx.add);
        let new_args = rw.apply_signature_conversion(fx.entry, &conv).unwrap();

        assert_eq!(new_args[0], arg0);
        assert_eq!(rw.ctx().value_ty(new_args[1]), i64_ty);
        assert_eq!(rw.ctx().op_operands(fx.add)[0], arg0);

        rw.rollback(cp);
        let index = core::index(&mut rw.ctx_mut().types);
        assert_eq!(rw.ctx().block(fx.entry).args[1].ty, index);
    }

    #[test]
    fn one_to_many_expansion_materializes_a_cast() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let i16_ty = core::i16(&mut ctx.types);
        let index = core::index(&mut ctx.types);
        let arg0 = ctx.block_arg(fx.entry, 0);
        let converter = TypeConverter::new();

        let mut conv = SignatureConversion::new(2);
        conv.add_inputs(0, &[i16_ty, i16_ty]);
        conv.add_inputs(1, &[index]);

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let cp = rw.checkpoint(fx.add);
        let new_args = rw.apply_signature_conversion(fx.entry, &conv).unwrap();
        assert_eq!(new_args.len(), 3);

        let cast = rw.ctx().block(fx.entry).ops[0];
        assert!(core::UnrealizedConversionCast::matches(rw.ctx(), cast));
        assert_eq!(rw.ctx().op_operands(cast), &new_args[..2]);
        assert_eq!(rw.ctx().op_operands(fx.add)[0], rw.ctx().op_result(cast, 0));

        rw.rollback(cp);
        assert_eq!(rw.ctx().op_operands(fx.add)[0], arg0);
        assert_eq!(rw.ctx().block_args(fx.entry)[0], arg0);
        assert_eq!(rw.ctx().op(cast).parent_block, None);
        assert!(!rw.ctx().has_uses(new_args[0]));
    }

    #[test]
    fn custom_materializer_replaces_the_cast() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let i16_ty = core::i16(&mut ctx.types);
        let index = core::index(&mut ctx.types);
        let mut converter = TypeConverter::new();
        converter.set_argument_materializer(|ctx, location, inputs, ty| {
            let data = OperationDataBuilder::new(location, Symbol::new("test"), Symbol::new("pack"))
                .operands(inputs.iter().copied())
                .result(ty)
                .build(ctx);
            ctx.create_op(data)
        });

        let mut conv = SignatureConversion::new(2);
        conv.add_inputs(0, &[i16_ty, i16_ty]);
        conv.add_inputs(1, &[index]);

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let _cp = rw.checkpoint(fx.add);
        rw.apply_signature_conversion(fx.entry, &conv).unwrap();

        let pack = rw.ctx().block(fx.entry).ops[0];
        assert_eq!(rw.ctx().op_full_name(pack), "test.pack");
        assert_eq!(rw.ctx().op_operands(fx.add)[0], rw.ctx().op_result(pack, 0));
    }

    #[test]
    fn dropping_a_used_argument_is_refused() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let index = core::index(&mut ctx.types);
        let args_before: Vec<_> = ctx.block_args(fx.entry).to_vec();
        let converter = TypeConverter::new();

        let mut conv = SignatureConversion::new(2);
        conv.add_inputs(0, &[]);
        conv.add_inputs(1, &[index]);

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        assert!(rw.apply_signature_conversion(fx.entry, &conv).is_none());
        assert_eq!(rw.ctx().block_args(fx.entry), args_before.as_slice());
    }

    #[test]
    fn inline_region_moves_blocks_and_rolls_back() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let body = fx.func.body(&ctx);
        let dest = crate::dialect::empty_region(&mut ctx, loc);
        let converter = TypeConverter::new();

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let cp = rw.checkpoint(fx.func.op_ref());
        rw.inline_region_before(body, dest, None);
        assert_eq!(rw.ctx().region(dest).blocks.as_slice(), &[fx.entry]);
        assert!(rw.ctx().region(body).blocks.is_empty());
        // moved ops are no longer under the root
        assert!(!rw.is_live(fx.add));

        rw.rollback(cp);
        assert_eq!(rw.ctx().region(body).blocks.as_slice(), &[fx.entry]);
        assert!(rw.is_live(fx.add));
    }

    #[test]
    fn remarks_survive_rollback() {
        let (mut ctx, loc) = test_ctx();
        let fx = fixture(&mut ctx, loc);
        let converter = TypeConverter::new();

        let mut rw = ConversionRewriter::new(&mut ctx, &converter, fx.module);
        let cp = rw.checkpoint(fx.add);
        rw.emit_remark(fx.add, "unsupported");
        rw.rollback(cp);

        assert_eq!(rw.remarks().len(), 1);
        assert_eq!(rw.remarks()[0].op_name, "arith.addi");
        assert_eq!(
            rw.remarks()[0].to_string(),
            format!("remark: `arith.addi` ({}): unsupported", fx.add)
        );
    }
}
