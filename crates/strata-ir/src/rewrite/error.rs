//! Error types for legalization.

use derive_more::{Display, From};

use super::diagnostics::Diagnostic;
use crate::location::Location;
use crate::refs::{OpRef, ValueRef};

pub type ConversionResult<T> = Result<T, LegalizationError>;

#[derive(Display, Debug, From)]
#[display("{kind}")]
pub struct LegalizationError {
    #[from]
    kind: Box<LegalizationErrorKind>,
}

impl From<LegalizationErrorKind> for LegalizationError {
    fn from(kind: LegalizationErrorKind) -> Self {
        LegalizationError {
            kind: Box::new(kind),
        }
    }
}

impl LegalizationError {
    pub(crate) fn illegal_operation(
        op: OpRef,
        name: String,
        location: Location,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        LegalizationErrorKind::IllegalOperation {
            op,
            name,
            location,
            diagnostics,
        }
        .into()
    }

    pub(crate) fn precondition_violated(op: OpRef, name: String, message: String) -> Self {
        LegalizationErrorKind::PreconditionViolated { op, name, message }.into()
    }

    pub(crate) fn erased_value_in_use(value: ValueRef, op_name: String) -> Self {
        LegalizationErrorKind::ErasedValueInUse { value, op_name }.into()
    }

    pub fn kind(&self) -> &LegalizationErrorKind {
        &self.kind
    }

    /// The operation the failure is attributed to, if any.
    pub fn op(&self) -> Option<OpRef> {
        match &*self.kind {
            LegalizationErrorKind::IllegalOperation { op, .. }
            | LegalizationErrorKind::PreconditionViolated { op, .. } => Some(*op),
            LegalizationErrorKind::ErasedValueInUse { .. } => None,
        }
    }

    /// Remarks recorded for the failing operation.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match &*self.kind {
            LegalizationErrorKind::IllegalOperation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

#[derive(Display, Debug)]
pub enum LegalizationErrorKind {
    /// No pattern converted an operation that the target does not accept.
    #[display("failed to legalize operation `{name}` ({op})")]
    IllegalOperation {
        op: OpRef,
        name: String,
        location: Location,
        diagnostics: Vec<Diagnostic>,
    },

    /// The input broke an assumption well-formed IR always satisfies.
    #[display("precondition violated at `{name}` ({op}): {message}")]
    PreconditionViolated {
        op: OpRef,
        name: String,
        message: String,
    },

    #[display("value {value} of erased operation `{op_name}` is still in use")]
    ErasedValueInUse { value: ValueRef, op_name: String },
}

impl std::error::Error for LegalizationError {}
