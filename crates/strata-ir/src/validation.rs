//! Structural validation of lowered IR.
//!
//! 1. **Scope validation**: every operand inside a function-like op (any
//!    `*.func`) refers to a value defined in that function's region tree, and
//!    an operand defined by an earlier op of the same block really is earlier.
//! 2. **Use-chain consistency**: the use-chains stored in `IrContext` match
//!    the operands of every live operation, in both directions.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::dialect::core::ATTR_SYM_NAME;
use crate::refs::{BlockRef, OpRef, RegionRef, ValueDef, ValueRef};
use crate::types::Attribute;
use crate::walk::{self, WalkAction};

/// An operand that is not visible where it is used.
pub struct ScopeError {
    pub function_name: String,
    pub consumer_op: String,
    pub operand_index: usize,
    pub value_description: String,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in @{}: operand #{} of {} references {}",
            self.function_name, self.operand_index, self.consumer_op, self.value_description,
        )
    }
}

impl fmt::Debug for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

pub struct UseChainError {
    pub message: String,
}

impl fmt::Display for UseChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for UseChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Default)]
pub struct ValidationResult {
    pub scope_errors: Vec<ScopeError>,
    pub use_chain_errors: Vec<UseChainError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.scope_errors.is_empty() && self.use_chain_errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        if !self.scope_errors.is_empty() {
            writeln!(f, "{} scope error(s):", self.scope_errors.len())?;
            for err in &self.scope_errors {
                writeln!(f, "  - {err}")?;
            }
        }
        if !self.use_chain_errors.is_empty() {
            writeln!(f, "{} use-chain error(s):", self.use_chain_errors.len())?;
            for err in &self.use_chain_errors {
                writeln!(f, "  - {err}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Scope validation
// ============================================================================

fn collect_defined(ctx: &IrContext, region: RegionRef, defined: &mut HashSet<ValueRef>) {
    for &block in &ctx.region(region).blocks {
        defined.extend(ctx.block_args(block).iter().copied());
        for &op in &ctx.block(block).ops {
            defined.extend(ctx.op_results(op).iter().copied());
            for &nested in &ctx.op(op).regions {
                collect_defined(ctx, nested, defined);
            }
        }
    }
}

fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => format!("result #{idx} of {}", ctx.op_full_name(op)),
        ValueDef::BlockArg(block, idx) => format!("block arg #{idx} of {block}"),
    }
}

/// Whether `def` is a result of an op that sits at or after `user` in their shared block.
fn used_before_defined(ctx: &IrContext, v: ValueRef, user: OpRef, block: BlockRef) -> bool {
    let ValueDef::OpResult(def, _) = ctx.value_def(v) else {
        return false;
    };
    if ctx.op(def).parent_block != Some(block) {
        return false;
    }
    let ops = &ctx.block(block).ops;
    let def_pos = ops.iter().position(|&o| o == def);
    let use_pos = ops.iter().position(|&o| o == user);
    matches!((def_pos, use_pos), (Some(d), Some(u)) if d >= u)
}

fn check_function(ctx: &IrContext, func: OpRef, errors: &mut Vec<ScopeError>) {
    let function_name = match ctx.op_attr(func, ATTR_SYM_NAME()) {
        Some(Attribute::Symbol(s)) => s.to_string(),
        _ => "<unnamed>".to_owned(),
    };

    let mut defined = HashSet::new();
    for &region in &ctx.op(func).regions {
        collect_defined(ctx, region, &mut defined);
    }

    for op in walk::nested_ops(ctx, func) {
        let Some(block) = ctx.op(op).parent_block else {
            continue;
        };
        for (i, &operand) in ctx.op_operands(op).iter().enumerate() {
            if !defined.contains(&operand) || used_before_defined(ctx, operand, op, block) {
                errors.push(ScopeError {
                    function_name: function_name.clone(),
                    consumer_op: ctx.op_full_name(op),
                    operand_index: i,
                    value_description: describe_value(ctx, operand),
                });
            }
        }
    }
}

/// Validate operand scoping for every function-like op under `root`.
pub fn validate_scopes(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut scope_errors = Vec::new();
    for op in walk::nested_ops(ctx, root) {
        if ctx.op(op).name == "func" {
            check_function(ctx, op, &mut scope_errors);
        }
    }
    ValidationResult {
        scope_errors,
        use_chain_errors: vec![],
    }
}

// ============================================================================
// Use-chain consistency
// ============================================================================

/// Validate that the stored use-chains match the operands of the live ops under `root`.
pub fn validate_use_chains(ctx: &IrContext, root: OpRef) -> ValidationResult {
    let mut errors = Vec::new();
    let mut actual: HashSet<(ValueRef, OpRef, u32)> = HashSet::new();
    let mut values: Vec<ValueRef> = Vec::new();

    let _ = walk::walk_op::<()>(ctx, root, &mut |op| {
        for (idx, &operand) in ctx.op_operands(op).iter().enumerate() {
            actual.insert((operand, op, idx as u32));
        }
        values.extend(ctx.op_results(op).iter().copied());
        for &region in &ctx.op(op).regions {
            for &block in &ctx.region(region).blocks {
                values.extend(ctx.block_args(block).iter().copied());
            }
        }
        ControlFlow::Continue(WalkAction::Advance)
    });

    let mut missing: Vec<_> = actual
        .iter()
        .filter(|(val, op, idx)| {
            !ctx
                .uses(*val)
                .iter()
                .any(|u| u.user == *op && u.operand_index == *idx)
        })
        .collect();
    missing.sort();
    for (val, op, idx) in missing {
        errors.push(UseChainError {
            message: format!(
                "operand #{idx} of {} ({op}) uses {val} but no use-chain entry exists",
                ctx.op_full_name(*op),
            ),
        });
    }

    for &val in &values {
        for u in ctx.uses(val) {
            if !actual.contains(&(val, u.user, u.operand_index)) {
                errors.push(UseChainError {
                    message: format!(
                        "use-chain of {val} claims operand #{} of {} ({}), which is not a live use",
                        u.operand_index,
                        ctx.op_full_name(u.user),
                        u.user,
                    ),
                });
            }
        }
    }

    ValidationResult {
        scope_errors: vec![],
        use_chain_errors: errors,
    }
}

pub fn validate_all(ctx: &IrContext, root: OpRef) -> ValidationResult {
    ValidationResult {
        scope_errors: validate_scopes(ctx, root).scope_errors,
        use_chain_errors: validate_use_chains(ctx, root).use_chain_errors,
    }
}

/// Debug-only validation that panics on any error.
pub fn debug_assert_valid(ctx: &IrContext, root: OpRef, pass_name: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    let result = validate_all(ctx, root);
    if !result.is_ok() {
        panic!("IR validation failed after `{pass_name}`:\n{result}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{arith, core, func};
    use crate::location::{Location, Span};
    use crate::ops::DialectOp;
    use crate::symbol::Symbol;

    fn fixture() -> (IrContext, OpRef, func::Func, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("v.mlir");
        let loc = Location::new(path, Span::default());
        let module = core::module(&mut ctx, loc, None);
        let f = func::func(&mut ctx, loc, Symbol::new("f"), &[], &[]);
        module.push(&mut ctx, f.op_ref());
        (ctx, module.op_ref(), f, loc)
    }

    #[test]
    fn well_formed_function_passes() {
        let (mut ctx, root, f, loc) = fixture();
        let i32_ty = core::i32(&mut ctx.types);
        let entry = f.entry_block(&ctx).unwrap();
        let c = arith::constant(&mut ctx, loc, i32_ty, 1);
        let v = ctx.op_result(c.op_ref(), 0);
        let ret = func::r#return(&mut ctx, loc, &[v]);
        ctx.push_op(entry, c.op_ref());
        ctx.push_op(entry, ret.op_ref());

        let result = validate_all(&ctx, root);
        assert!(result.is_ok(), "{result}");
    }

    #[test]
    fn use_before_definition_is_reported() {
        let (mut ctx, root, f, loc) = fixture();
        let i32_ty = core::i32(&mut ctx.types);
        let entry = f.entry_block(&ctx).unwrap();
        let c = arith::constant(&mut ctx, loc, i32_ty, 1);
        let v = ctx.op_result(c.op_ref(), 0);
        let ret = func::r#return(&mut ctx, loc, &[v]);
        ctx.push_op(entry, ret.op_ref());
        ctx.push_op(entry, c.op_ref());

        let result = validate_scopes(&ctx, root);
        assert_eq!(result.scope_errors.len(), 1);
        assert_eq!(result.scope_errors[0].consumer_op, "func.return");
    }

    #[test]
    fn detached_definitions_are_out_of_scope() {
        let (mut ctx, root, f, loc) = fixture();
        let i32_ty = core::i32(&mut ctx.types);
        let entry = f.entry_block(&ctx).unwrap();
        let stray = arith::constant(&mut ctx, loc, i32_ty, 1);
        let v = ctx.op_result(stray.op_ref(), 0);
        let ret = func::r#return(&mut ctx, loc, &[v]);
        ctx.push_op(entry, ret.op_ref());

        let result = validate_all(&ctx, root);
        assert_eq!(result.scope_errors.len(), 1);
        assert!(result.scope_errors[0].value_description.contains("arith.constant"));
        // the detached constant's use is still recorded, and it is a live use
        assert!(result.use_chain_errors.is_empty());
    }
}
