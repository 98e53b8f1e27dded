//! Conversion target.
//!
//! Defines legality rules for dialect conversion: which operations/dialects
//! are legal, illegal, or dynamically checked.

use std::collections::HashSet;

use crate::context::IrContext;
use crate::ops::OpKind;
use crate::refs::OpRef;
use crate::symbol::Symbol;

/// Result of a legality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    /// Already in the target vocabulary.
    Legal,
    /// Must be converted.
    Illegal,
    /// Not covered by any rule.
    Unknown,
}

/// How strictly the driver treats operations no pattern could convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversionMode {
    /// Every visited operation must end up legal.
    #[default]
    Full,
    /// Only operations explicitly marked illegal must be converted.
    Partial,
}

/// Dynamic legality check function signature.
type DynamicCheckFn = dyn Fn(&IrContext, OpRef) -> Option<Legality>;

/// Conversion target: which ops and dialects the lowered IR may contain.
pub struct ConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    legal_ops: HashSet<OpKind>,
    illegal_ops: HashSet<OpKind>,
    dynamic_checks: Vec<Box<DynamicCheckFn>>,
}

impl ConversionTarget {
    /// Create a new empty conversion target (nothing is known to be legal).
    pub fn new() -> Self {
        Self {
            legal_dialects: HashSet::new(),
            illegal_dialects: HashSet::new(),
            legal_ops: HashSet::new(),
            illegal_ops: HashSet::new(),
            dynamic_checks: Vec::new(),
        }
    }

    pub fn add_legal_dialect(&mut self, dialect: &str) -> &mut Self {
        self.legal_dialects.insert(Symbol::from_dynamic(dialect));
        self
    }

    pub fn add_illegal_dialect(&mut self, dialect: &str) -> &mut Self {
        self.illegal_dialects.insert(Symbol::from_dynamic(dialect));
        self
    }

    pub fn add_legal_op(&mut self, kind: OpKind) -> &mut Self {
        self.legal_ops.insert(kind);
        self
    }

    pub fn add_illegal_op(&mut self, kind: OpKind) -> &mut Self {
        self.illegal_ops.insert(kind);
        self
    }

    /// Add a dynamic legality check.
    ///
    /// Return `Some(Legal)` or `Some(Illegal)` to decide, `None` to defer.
    pub fn add_dynamic_check(
        &mut self,
        f: impl Fn(&IrContext, OpRef) -> Option<Legality> + 'static,
    ) -> &mut Self {
        self.dynamic_checks.push(Box::new(f));
        self
    }

    /// Legality of a specific operation.
    ///
    /// Resolution order:
    /// 1. Dynamic checks (first non-None wins)
    /// 2. Specific op rules
    /// 3. Dialect rules
    /// 4. Default: Unknown
    pub fn legality(&self, ctx: &IrContext, op: OpRef) -> Legality {
        for check in &self.dynamic_checks {
            if let Some(result) = check(ctx, op) {
                return result;
            }
        }

        let kind = OpKind::of(ctx, op);
        if self.legal_ops.contains(&kind) {
            return Legality::Legal;
        }
        if self.illegal_ops.contains(&kind) {
            return Legality::Illegal;
        }

        if self.legal_dialects.contains(&kind.dialect) {
            return Legality::Legal;
        }
        if self.illegal_dialects.contains(&kind.dialect) {
            return Legality::Illegal;
        }

        Legality::Unknown
    }
}

impl Default for ConversionTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::location::{Location, Span};

    fn op(ctx: &mut IrContext, dialect: &'static str, name: &'static str) -> OpRef {
        let path = ctx.paths.intern("t.mlir");
        let loc = Location::new(path, Span::default());
        let data =
            OperationDataBuilder::new(loc, Symbol::new(dialect), Symbol::new(name)).build(ctx);
        ctx.create_op(data)
    }

    #[test]
    fn op_rules_override_dialect_rules_and_dynamic_checks_win() {
        let mut ctx = IrContext::new();
        let add = op(&mut ctx, "arith", "addi");
        let constant = op(&mut ctx, "arith", "constant");
        let ret = op(&mut ctx, "vm", "return");
        let other = op(&mut ctx, "test", "x");
        let special = op(&mut ctx, "test", "special");
        let banned = op(&mut ctx, "test", "banned");

        let mut target = ConversionTarget::new();
        target
            .add_legal_dialect("vm")
            .add_illegal_dialect("arith")
            .add_legal_op(OpKind::new("arith", "constant"))
            .add_illegal_op(OpKind::new("test", "banned"))
            .add_dynamic_check(|ctx, op| {
                (ctx.op(op).name == "special").then_some(Legality::Illegal)
            });

        assert_eq!(target.legality(&ctx, add), Legality::Illegal);
        assert_eq!(target.legality(&ctx, constant), Legality::Legal);
        assert_eq!(target.legality(&ctx, ret), Legality::Legal);
        assert_eq!(target.legality(&ctx, other), Legality::Unknown);
        assert_eq!(target.legality(&ctx, special), Legality::Illegal);
        assert_eq!(target.legality(&ctx, banned), Legality::Illegal);
    }
}
