//! Symbol lookup through enclosing operations.
//!
//! Any operation with regions acts as a symbol table for the operations
//! directly inside it that carry a `sym_name` attribute.

use crate::context::IrContext;
use crate::dialect::core::ATTR_SYM_NAME;
use crate::refs::OpRef;
use crate::symbol::Symbol;

/// Find the operation named `name` directly inside `table`'s regions.
pub fn lookup_symbol_in(ctx: &IrContext, table: OpRef, name: Symbol) -> Option<OpRef> {
    ctx.op(table).regions.iter().find_map(|&region| {
        ctx.region(region).blocks.iter().find_map(|&block| {
            ctx.block(block).ops.iter().copied().find(|&op| {
                ctx.op_attr(op, ATTR_SYM_NAME()).and_then(|a| a.as_symbol()) == Some(name)
            })
        })
    })
}

/// Resolve a (possibly nested) symbol reference from `table`.
pub fn lookup_path_in(ctx: &IrContext, table: OpRef, path: &[Symbol]) -> Option<OpRef> {
    let (first, rest) = path.split_first()?;
    rest.iter().try_fold(lookup_symbol_in(ctx, table, *first)?, |scope, &name| {
        lookup_symbol_in(ctx, scope, name)
    })
}

/// Resolve a symbol reference from the nearest enclosing scope of `from`
/// that can resolve it, searching outward.
pub fn lookup_nearest_symbol(ctx: &IrContext, from: OpRef, path: &[Symbol]) -> Option<OpRef> {
    let mut scope = ctx.parent_op(from);
    while let Some(table) = scope {
        if let Some(found) = lookup_path_in(ctx, table, path) {
            return Some(found);
        }
        scope = ctx.parent_op(table);
    }
    None
}
