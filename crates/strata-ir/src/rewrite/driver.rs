//! Legalization driver.
//!
//! Worklist-based conversion of every operation nested under a root:
//!
//! 1. The worklist is seeded with all nested operations in document order.
//! 2. Each popped operation is checked against the target. Legal operations
//!    are left alone; the others are offered to their patterns in priority
//!    order, each attempt inside its own rewriter checkpoint.
//! 3. A successful pattern commits its edits; operations it created are
//!    queued, as are users of the values it replaced.
//! 4. An operation no pattern converts fails the run if the target marks it
//!    illegal (or, in full mode, if the target does not know it).
//! 5. Once the worklist drains, uses of replaced values are rewritten and
//!    erased operations are removed.

use std::collections::{HashMap, VecDeque};

use cranelift_entity::SecondaryMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::conversion_target::{ConversionMode, ConversionTarget, Legality};
use super::diagnostics::Diagnostic;
use super::error::{ConversionResult, LegalizationError};
use super::pattern::{OpAdaptor, PatternSet};
use super::rewriter::ConversionRewriter;
use super::type_converter::TypeConverter;
use crate::context::IrContext;
use crate::ops::OpKind;
use crate::refs::{OpRef, ValueRef};
use crate::walk;

/// Per-operation driver state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OpState {
    #[default]
    Unvisited,
    Matching,
    Legal,
    Converted,
    Illegal,
}

/// Statistics and remarks of a successful conversion.
#[derive(Debug, Default)]
pub struct ConversionSummary {
    /// Number of successful pattern applications.
    pub patterns_applied: usize,
    /// Number of worklist items processed.
    pub ops_visited: usize,
    /// Remarks emitted by patterns, including declined attempts.
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert every operation nested under `root` (the root itself is not visited).
///
/// On failure the IR is left half-converted and must be discarded.
pub fn apply_conversion(
    ctx: &mut IrContext,
    root: OpRef,
    target: &ConversionTarget,
    patterns: &PatternSet,
    converter: &TypeConverter,
    mode: ConversionMode,
) -> ConversionResult<ConversionSummary> {
    debug!(root = %root, patterns = patterns.len(), ?mode, "conversion: start");

    let worklist: VecDeque<OpRef> = walk::nested_ops(ctx, root).into();
    let mut driver = Driver {
        rewriter: ConversionRewriter::new(ctx, converter, root),
        target,
        patterns,
        mode,
        worklist: VecDeque::new(),
        queued: SecondaryMap::new(),
        state: SecondaryMap::new(),
        summary: ConversionSummary::default(),
    };
    for op in worklist {
        driver.enqueue(op);
    }

    driver.run()?;

    let Driver {
        rewriter,
        mut summary,
        ..
    } = driver;
    let (erased, remap, remarks) = rewriter.into_parts();
    finalize(ctx, &erased, &remap)?;

    summary.diagnostics = remarks;
    debug!(
        applied = summary.patterns_applied,
        visited = summary.ops_visited,
        "conversion: done"
    );
    Ok(summary)
}

struct Driver<'a> {
    rewriter: ConversionRewriter<'a>,
    target: &'a ConversionTarget,
    patterns: &'a PatternSet,
    mode: ConversionMode,
    worklist: VecDeque<OpRef>,
    queued: SecondaryMap<OpRef, bool>,
    state: SecondaryMap<OpRef, OpState>,
    summary: ConversionSummary,
}

impl Driver<'_> {
    fn enqueue(&mut self, op: OpRef) {
        if !self.queued[op] {
            self.queued[op] = true;
            self.worklist.push_back(op);
        }
    }

    fn run(&mut self) -> ConversionResult<()> {
        while let Some(op) = self.worklist.pop_front() {
            self.queued[op] = false;
            if self.state[op] == OpState::Converted || !self.rewriter.is_live(op) {
                continue;
            }
            self.summary.ops_visited += 1;
            self.visit(op)?;
        }
        Ok(())
    }

    fn visit(&mut self, op: OpRef) -> ConversionResult<()> {
        let ctx = self.rewriter.ctx();
        let legality = self.target.legality(ctx, op);
        if legality == Legality::Legal {
            self.state[op] = OpState::Legal;
            return Ok(());
        }

        self.state[op] = OpState::Matching;
        let kind = OpKind::of(ctx, op);
        let adaptor = OpAdaptor::new(ctx.op_operands(op).iter().map(|&v| self.rewriter.lookup(v)));

        let patterns = self.patterns;
        for pattern in patterns.patterns_for(kind) {
            let checkpoint = self.rewriter.checkpoint(op);
            let matched = pattern.match_and_rewrite(op, &adaptor, &mut self.rewriter);

            if let Some(failure) = self.rewriter.take_precondition_failure() {
                self.rewriter.rollback(checkpoint);
                let name = self.rewriter.ctx().op_full_name(failure.op);
                return Err(LegalizationError::precondition_violated(
                    failure.op,
                    name,
                    failure.message,
                ));
            }

            if !matched {
                trace!(pattern = pattern.name(), op = %op, "pattern declined; rolling back");
                self.rewriter.rollback(checkpoint);
                continue;
            }

            debug!(pattern = pattern.name(), op = %op, %kind, "pattern applied");
            self.summary.patterns_applied += 1;
            self.state[op] = if self.rewriter.is_erased(op) {
                OpState::Converted
            } else {
                OpState::Legal
            };

            let replaced = self.rewriter.replaced_since(checkpoint);
            let created = self.rewriter.created_since(checkpoint);
            self.rewriter.commit(checkpoint);
            self.requeue_users(&replaced);
            for new_op in created {
                if self.rewriter.is_live(new_op) {
                    self.enqueue(new_op);
                } else if self.rewriter.ctx().op(new_op).parent_block.is_none() {
                    // never attached: unregister its uses so it cannot pin values
                    self.rewriter.ctx_mut().drop_operand_uses(new_op);
                }
            }
            return Ok(());
        }

        let fails = match legality {
            Legality::Illegal => true,
            Legality::Unknown => self.mode == ConversionMode::Full,
            Legality::Legal => false,
        };
        if !fails {
            trace!(op = %op, %kind, "no pattern applied; leaving in place");
            self.state[op] = OpState::Legal;
            return Ok(());
        }

        self.state[op] = OpState::Illegal;
        let ctx = self.rewriter.ctx();
        let diagnostics: Vec<Diagnostic> = self
            .rewriter
            .remarks()
            .iter()
            .filter(|d| d.op == op)
            .cloned()
            .collect();
        Err(LegalizationError::illegal_operation(
            op,
            ctx.op_full_name(op),
            ctx.op(op).location,
            diagnostics,
        ))
    }

    /// Queue live users of values whose meaning changed.
    fn requeue_users(&mut self, values: &[ValueRef]) {
        let mut users: SmallVec<[OpRef; 8]> = SmallVec::new();
        let ctx = self.rewriter.ctx();
        for &v in values {
            for u in ctx.uses(v) {
                if !users.contains(&u.user) {
                    users.push(u.user);
                }
            }
            // eagerly rewritten uses now sit on the replacement
            let current = self.rewriter.lookup(v);
            for u in ctx.uses(current) {
                if !users.contains(&u.user) {
                    users.push(u.user);
                }
            }
        }
        for user in users {
            if self.state[user] != OpState::Converted && self.rewriter.is_live(user) {
                self.enqueue(user);
            }
        }
    }
}

/// Rewrite remaining uses of replaced values and remove erased operations.
fn finalize(
    ctx: &mut IrContext,
    erased: &[OpRef],
    remap: &HashMap<ValueRef, ValueRef>,
) -> ConversionResult<()> {
    let resolve = |mut v: ValueRef| {
        while let Some(&next) = remap.get(&v) {
            v = next;
        }
        v
    };

    for &op in erased {
        if let Some(block) = ctx.op(op).parent_block {
            ctx.remove_op_from_block(block, op);
        }
    }

    let mut doomed: Vec<OpRef> = Vec::new();
    for &op in erased {
        doomed.push(op);
        doomed.extend(walk::nested_ops(ctx, op));
    }
    for &op in &doomed {
        ctx.drop_operand_uses(op);
    }

    for &op in erased {
        let results: SmallVec<[ValueRef; 4]> = ctx.op_results(op).into();
        for old in results {
            let new = resolve(old);
            if new != old {
                ctx.replace_all_uses(old, new);
            }
        }
    }

    for &op in &doomed {
        if let Some(&value) = ctx.op_results(op).iter().find(|&&v| ctx.has_uses(v)) {
            return Err(LegalizationError::erased_value_in_use(
                value,
                ctx.op_full_name(op),
            ));
        }
    }

    for &op in erased {
        ctx.remove_op(op);
    }
    Ok(())
}
