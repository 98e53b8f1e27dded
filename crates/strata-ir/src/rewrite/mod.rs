//! Pattern-driven legalization.
//!
//! A conversion is described by three pieces:
//!
//! - a [`TypeConverter`] mapping source types to target types,
//! - a [`PatternSet`] of [`ConversionPattern`]s, each rewriting one kind of
//!   operation through a [`ConversionRewriter`],
//! - a [`ConversionTarget`] saying which operations are already legal.
//!
//! [`apply_conversion`] drives the patterns over every operation nested
//! under a root until the IR only contains legal operations.

mod conversion_target;
mod diagnostics;
mod driver;
mod error;
mod pattern;
mod rewriter;
mod signature_conversion;
mod type_converter;

pub use conversion_target::{ConversionMode, ConversionTarget, Legality};
pub use diagnostics::{Diagnostic, Severity};
pub use driver::{ConversionSummary, apply_conversion};
pub use error::{ConversionResult, LegalizationError, LegalizationErrorKind};
pub use pattern::{ConversionPattern, OpAdaptor, PatternBenefit, PatternSet};
pub use rewriter::{ConversionRewriter, InsertionPoint};
pub use signature_conversion::{InputMapping, SignatureConversion};
pub use type_converter::{TypeConversion, TypeConverter};
