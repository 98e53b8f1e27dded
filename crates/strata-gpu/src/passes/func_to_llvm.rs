//! Kernel signature flattening: `func.func` → `llvm.func`.
//!
//! A public kernel entry point takes no arguments and reaches its buffers
//! through `hal.interface.binding.subspan` references. The lowered function
//! instead receives one pointer argument per distinct binding, in the order
//! the bindings are first referenced (pre-order walk of the body). The
//! `(set, binding)` pair behind each argument is recorded in the
//! `hal.bindings` attribute so that later patterns can find it.

use std::ops::ControlFlow;

use smallvec::SmallVec;
use strata_ir::dialect::{core, func, hal, llvm, memref};
use strata_ir::rewrite::{
    ConversionPattern, ConversionRewriter, OpAdaptor, PatternBenefit, SignatureConversion,
};
use strata_ir::symbol_table::lookup_nearest_symbol;
use strata_ir::walk::WalkAction;
use strata_ir::{Attribute, DialectOp, IrContext, OpKind, OpRef, Symbol, TypeRef, symbols, walk};
use tracing::debug;

use crate::type_converter::element_pointer;

symbols! {
    /// `[[set, binding], ...]` on a flattened kernel, one entry per argument.
    ATTR_HAL_BINDINGS => "hal.bindings",
}

/// A distinct buffer binding referenced by a kernel body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct KernelBinding {
    set: i64,
    binding: i64,
    /// Result type of the first subspan referencing it.
    view: TypeRef,
}

/// Why a kernel body could not be scanned.
enum ScanError {
    MissingDeclaration(OpRef),
}

fn collect_bindings(ctx: &IrContext, kernel: OpRef) -> Result<Vec<KernelBinding>, ScanError> {
    let mut bindings: Vec<KernelBinding> = Vec::new();
    for &region in &ctx.op(kernel).regions {
        let scan = walk::walk_typed::<hal::BindingSubspan, _>(ctx, region, &mut |subspan| {
            let op = subspan.op_ref();
            let Some(decl) = subspan
                .binding_ref(ctx)
                .and_then(|path| lookup_nearest_symbol(ctx, op, &path))
                .and_then(|decl| hal::InterfaceBinding::from_op(ctx, decl).ok())
            else {
                return ControlFlow::Break(ScanError::MissingDeclaration(op));
            };
            let (Some(set), Some(binding)) = (decl.set(ctx), decl.binding(ctx)) else {
                return ControlFlow::Break(ScanError::MissingDeclaration(op));
            };
            if !bindings
                .iter()
                .any(|b| b.set == set && b.binding == binding)
            {
                bindings.push(KernelBinding {
                    set,
                    binding,
                    view: subspan.result_type(ctx),
                });
            }
            ControlFlow::Continue(WalkAction::Advance)
        });
        if let ControlFlow::Break(err) = scan {
            return Err(err);
        }
    }
    Ok(bindings)
}

/// Index of the kernel argument carrying `(set, binding)`.
pub fn binding_argument(ctx: &IrContext, kernel: OpRef, set: i64, binding: i64) -> Option<usize> {
    ctx.op_attr(kernel, ATTR_HAL_BINDINGS())?
        .as_list()?
        .iter()
        .position(|entry| {
            entry.as_list().is_some_and(|pair| {
                matches!(pair, [s, b] if s.as_int() == Some(set) && b.as_int() == Some(binding))
            })
        })
}

pub struct FlattenKernelSignature;

impl ConversionPattern for FlattenKernelSignature {
    fn root(&self) -> OpKind {
        func::Func::kind()
    }

    fn benefit(&self) -> PatternBenefit {
        PatternBenefit(100)
    }

    fn match_and_rewrite(
        &self,
        op: OpRef,
        _adaptor: &OpAdaptor,
        rewriter: &mut ConversionRewriter<'_>,
    ) -> bool {
        let ctx = rewriter.ctx();
        let Ok(kernel) = func::Func::from_op(ctx, op) else {
            return false;
        };
        let Some(signature) = kernel.signature(ctx) else {
            return false;
        };
        if !signature.inputs.is_empty() || !signature.results.is_empty() || !kernel.is_public(ctx)
        {
            return false;
        }
        let Some(name) = kernel.sym_name(ctx) else {
            return false;
        };

        let bindings = match collect_bindings(ctx, op) {
            Ok(bindings) => bindings,
            Err(ScanError::MissingDeclaration(subspan)) => {
                rewriter.precondition_failed(subspan, "binding declaration not found");
                return false;
            }
        };

        let mut arg_types: SmallVec<[TypeRef; 4]> = SmallVec::new();
        for b in &bindings {
            let ctx = rewriter.ctx_mut();
            let pointer = memref::memref_type(&ctx.types, b.view)
                .and_then(|view| element_pointer(&mut ctx.types, &view));
            match pointer {
                Some(pointer) => arg_types.push(pointer),
                None => {
                    rewriter.emit_remark(
                        op,
                        format!(
                            "binding (set {}, binding {}) has no pointer representation",
                            b.set, b.binding
                        ),
                    );
                    return false;
                }
            }
        }

        let ctx = rewriter.ctx();
        let location = ctx.op(op).location;
        let old_body = kernel.body(ctx);
        let mut attrs: Vec<(Symbol, Attribute)> = ctx
            .op(op)
            .attributes
            .iter()
            .filter(|(key, _)| **key != core::ATTR_SYM_NAME() && **key != func::ATTR_FUNCTION_TYPE())
            .map(|(key, value)| (*key, value.clone()))
            .collect();

        let ctx = rewriter.ctx_mut();
        let fn_ty = core::fn_type(&mut ctx.types, &arg_types, &[]);
        attrs.push((core::ATTR_SYM_NAME(), Attribute::Symbol(name)));
        attrs.push((func::ATTR_FUNCTION_TYPE(), Attribute::Type(fn_ty)));
        attrs.push((llvm::ATTR_LINKAGE(), Attribute::from("external")));
        attrs.push((
            ATTR_HAL_BINDINGS(),
            Attribute::List(
                bindings
                    .iter()
                    .map(|b| Attribute::List(vec![Attribute::from(b.set), Attribute::from(b.binding)]))
                    .collect(),
            ),
        ));

        let body = strata_ir::dialect::empty_region(ctx, location);
        let lowered = llvm::func(ctx, location, body, attrs);
        rewriter.insert(lowered.op_ref());
        rewriter.inline_region_before(old_body, body, None);

        let Some(&entry) = rewriter.ctx().region(body).blocks.first() else {
            return false;
        };
        let mut conversion = SignatureConversion::new(0);
        conversion.append_inputs(&arg_types);
        if rewriter.apply_signature_conversion(entry, &conversion).is_none() {
            return false;
        }

        debug!(kernel = %name, arguments = bindings.len(), "flattened kernel signature");
        rewriter.erase_op(op);
        true
    }
}
