//! Diagnostics emitted while legalizing.

use derive_more::Display;

use crate::location::Location;
use crate::refs::OpRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Severity {
    #[display("remark")]
    Remark,
    #[display("error")]
    Error,
}

/// A message attached to an operation.
///
/// Remarks are recorded even when the pattern that emitted them is rolled back.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("{severity}: `{op_name}` ({op}): {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub op: OpRef,
    pub op_name: String,
    pub location: Location,
    pub message: String,
}
