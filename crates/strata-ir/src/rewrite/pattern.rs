//! Conversion pattern trait and pattern registry.

use std::cmp::Reverse;
use std::collections::HashMap;

use smallvec::SmallVec;

use super::rewriter::ConversionRewriter;
use crate::ops::OpKind;
use crate::refs::{OpRef, ValueRef};

/// Static priority of a pattern. Higher benefits are tried first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternBenefit(pub u16);

impl Default for PatternBenefit {
    fn default() -> Self {
        PatternBenefit(1)
    }
}

/// The operands of the operation being converted, already redirected
/// through the driver's value remap table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpAdaptor {
    operands: SmallVec<[ValueRef; 4]>,
}

impl OpAdaptor {
    pub fn new(operands: impl IntoIterator<Item = ValueRef>) -> Self {
        Self {
            operands: operands.into_iter().collect(),
        }
    }

    pub fn operands(&self) -> &[ValueRef] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> Option<ValueRef> {
        self.operands.get(index).copied()
    }
}

/// A rewrite rule converting one kind of operation.
///
/// # Return Value
///
/// Return `true` after recording the rewrite through the rewriter (normally
/// ending with `replace_op`, `replace_op_with` or `erase_op` on `op`).
/// Return `false` to decline; every mutation recorded during the attempt is
/// then rolled back by the driver.
pub trait ConversionPattern {
    /// The operation kind this pattern converts.
    fn root(&self) -> OpKind;

    fn benefit(&self) -> PatternBenefit {
        PatternBenefit::default()
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool;

    /// Optional: return a human-readable name for debugging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Registered patterns, looked up by root operation kind.
///
/// Patterns for the same kind are kept sorted by descending benefit; equal
/// benefits keep registration order.
#[derive(Default)]
pub struct PatternSet {
    patterns: Vec<Box<dyn ConversionPattern>>,
    by_root: HashMap<OpKind, Vec<usize>>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: impl ConversionPattern + 'static) -> &mut Self {
        let index = self.patterns.len();
        let root = pattern.root();
        self.patterns.push(Box::new(pattern));

        let candidates = self.by_root.entry(root).or_default();
        candidates.push(index);
        // stable: equal benefits stay in registration order
        let patterns = &self.patterns;
        candidates.sort_by_key(|&i| Reverse(patterns[i].benefit()));
        self
    }

    /// Candidates for `kind`, in the order they must be tried.
    pub fn patterns_for(&self, kind: OpKind) -> impl Iterator<Item = &dyn ConversionPattern> + '_ {
        self.by_root
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&i| self.patterns[i].as_ref())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        root: OpKind,
        benefit: u16,
        name: &'static str,
    }

    impl ConversionPattern for Named {
        fn root(&self) -> OpKind {
            self.root
        }

        fn benefit(&self) -> PatternBenefit {
            PatternBenefit(self.benefit)
        }

        fn match_and_rewrite(
            &self,
            _op: OpRef,
            _adaptor: &OpAdaptor,
            _rewriter: &mut ConversionRewriter<'_>,
        ) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[test]
    fn candidates_sorted_by_benefit_then_registration() {
        let add = OpKind::new("arith", "addi");
        let sub = OpKind::new("arith", "subi");
        let mut set = PatternSet::new();
        for (root, benefit, name) in [
            (add, 1, "generic-a"),
            (add, 5, "special"),
            (sub, 1, "sub"),
            (add, 1, "generic-b"),
            (add, 5, "special-late"),
        ] {
            set.add(Named {
                root,
                benefit,
                name,
            });
        }

        let order: Vec<_> = set.patterns_for(add).map(|p| p.name()).collect();
        assert_eq!(
            order,
            ["special", "special-late", "generic-a", "generic-b"]
        );
        assert_eq!(set.patterns_for(OpKind::new("arith", "muli")).count(), 0);
        assert_eq!(set.len(), 5);
    }
}
