//! Typed operation wrappers.
//!
//! Every dialect op gets a `Copy` newtype over `OpRef` implementing
//! [`DialectOp`]. The newtypes are declared with [`define_op!`]; constructors
//! and accessors live next to them in the dialect module.

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::OpRef;
use crate::symbol::Symbol;

/// Fully qualified operation name, used as a pattern root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display("{dialect}.{name}")]
pub struct OpKind {
    pub dialect: Symbol,
    pub name: Symbol,
}

impl OpKind {
    pub fn new(dialect: &'static str, name: &'static str) -> Self {
        Self {
            dialect: Symbol::new(dialect),
            name: Symbol::new(name),
        }
    }

    pub fn of(ctx: &IrContext, op: OpRef) -> Self {
        let data = ctx.op(op);
        Self {
            dialect: data.dialect,
            name: data.name,
        }
    }
}

/// Error when viewing an operation through the wrong typed wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConversionError {
    #[display("expected {expected}, found {actual}")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    #[display("missing attribute `{_0}`")]
    MissingAttribute(&'static str),
    #[display("attribute `{_0}` has the wrong kind")]
    WrongAttributeType(&'static str),
    #[display("expected {expected} operands, found {actual}")]
    WrongOperandCount { expected: usize, actual: usize },
}

/// Trait for typed dialect operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError>;
    fn op_ref(&self) -> OpRef;

    fn kind() -> OpKind {
        OpKind::new(Self::DIALECT_NAME, Self::OP_NAME)
    }

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        ctx.is_op(
            op,
            Symbol::new(Self::DIALECT_NAME),
            Symbol::new(Self::OP_NAME),
        )
    }
}

/// Declare a typed wrapper for a dialect operation.
///
/// ```
/// use strata_ir::{define_op, DialectOp};
///
/// define_op! {
///     /// `demo.nop`
///     Nop = "demo" . "nop"
/// }
///
/// assert_eq!(Nop::kind().to_string(), "demo.nop");
/// ```
#[macro_export]
macro_rules! define_op {
    ($(#[$meta:meta])* $name:ident = $dialect:literal . $op:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name($crate::OpRef);

        impl $crate::ops::DialectOp for $name {
            const DIALECT_NAME: &'static str = $dialect;
            const OP_NAME: &'static str = $op;

            fn from_op(
                ctx: &$crate::IrContext,
                op: $crate::OpRef,
            ) -> Result<Self, $crate::ops::ConversionError> {
                if !<Self as $crate::ops::DialectOp>::matches(ctx, op) {
                    return Err($crate::ops::ConversionError::WrongOperation {
                        expected: concat!($dialect, ".", $op),
                        actual: ctx.op_full_name(op),
                    });
                }
                Ok(Self(op))
            }

            fn op_ref(&self) -> $crate::OpRef {
                self.0
            }
        }
    };
}

/// Read an integer attribute as `i64`.
pub fn int_attr(ctx: &IrContext, op: OpRef, key: &'static str) -> Result<i64, ConversionError> {
    ctx.op_attr(op, Symbol::new(key))
        .ok_or(ConversionError::MissingAttribute(key))?
        .as_int()
        .ok_or(ConversionError::WrongAttributeType(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::location::{Location, Span};
    use crate::types::Attribute;

    define_op! {
        Probe = "test" . "probe"
    }

    #[test]
    fn from_op_checks_name() {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("file:///t");
        let loc = Location::new(path, Span::default());
        let probe_data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("probe"))
            .attr("dimension", Attribute::from(2u64))
            .build(&mut ctx);
        let probe = ctx.create_op(probe_data);
        let other_data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("other"))
            .build(&mut ctx);
        let other = ctx.create_op(other_data);

        assert_eq!(Probe::from_op(&ctx, probe).map(|p| p.op_ref()), Ok(probe));
        assert_eq!(
            Probe::from_op(&ctx, other),
            Err(ConversionError::WrongOperation {
                expected: "test.probe",
                actual: "test.other".to_owned(),
            })
        );
        assert_eq!(int_attr(&ctx, probe, "dimension"), Ok(2));
        assert_eq!(
            int_attr(&ctx, other, "dimension"),
            Err(ConversionError::MissingAttribute("dimension"))
        );
    }
}
