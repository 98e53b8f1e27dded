//! End-to-end tests for the VM lowering pipeline.

mod common;

use common::{add_func, emit, finish, op_names, test_ctx};
use strata::ir::dialect::arith::{self, CmpPredicate};
use strata::ir::dialect::{core, vm};
use strata::ir::printer::print_op;
use strata::ir::rewrite::{ConversionMode, LegalizationErrorKind};
use strata::ir::symbol_table::lookup_symbol_in;
use strata::ir::{
    Attribute, DialectOp, IrContext, Location, OpRef, OperationDataBuilder, Symbol,
};
use strata::{LoweringOptions, lower_module};

/// `core.module { core.module @m { } }`
fn nested_module(ctx: &mut IrContext, loc: Location) -> (core::Module, core::Module) {
    let root = core::module(ctx, loc, None);
    let inner = core::module(ctx, loc, Some(Symbol::new("m")));
    root.push(ctx, inner.op_ref());
    (root, inner)
}

fn vm_module_of(ctx: &IrContext, root: core::Module) -> vm::Module {
    let body = root.body(ctx).unwrap();
    vm::Module::from_op(ctx, ctx.block(body).ops[0]).unwrap()
}

/// Exported `add() -> i32 { 5 + 7 }`.
fn export_scenario(ctx: &mut IrContext, loc: Location) -> core::Module {
    let (root, inner) = nested_module(ctx, loc);
    let i32_ty = core::i32(&mut ctx.types);
    let (f, entry) = add_func(ctx, loc, inner, "add", &[], &[i32_ty]);
    ctx.set_attr(f.op_ref(), strata_vm::ATTR_EXPORT(), Some(Attribute::Unit));
    let five = arith::constant(ctx, loc, i32_ty, 5).op_ref();
    let five = emit(ctx, entry, five);
    let seven = arith::constant(ctx, loc, i32_ty, 7).op_ref();
    let seven = emit(ctx, entry, seven);
    let sum = arith::addi(ctx, loc, five, seven).op_ref();
    let sum = emit(ctx, entry, sum);
    finish(ctx, loc, entry, &[sum]);
    root
}

#[test]
fn exported_addition_lowers_to_vm_instructions() {
    let (mut ctx, loc) = test_ctx("add.mlir");
    let root = export_scenario(&mut ctx, loc);

    let summary = lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap();
    assert!(summary.diagnostics.is_empty());

    let module = vm_module_of(&ctx, root);
    let func = lookup_symbol_in(&ctx, module.op_ref(), Symbol::new("add")).unwrap();
    let func = vm::Func::from_op(&ctx, func).unwrap();
    let body = strata::ir::dialect::entry_block(&ctx, func.op_ref(), 0).unwrap();
    assert_eq!(
        op_names(&ctx, body),
        ["vm.const.i32", "vm.const.i32", "vm.add.i32", "vm.return"]
    );

    let ops = ctx.block(body).ops.clone();
    assert_eq!(vm::constant_value(&ctx, ops[0]), Some(5));
    assert_eq!(vm::constant_value(&ctx, ops[1]), Some(7));
    let (five, seven) = (ctx.op_result(ops[0], 0), ctx.op_result(ops[1], 0));
    assert_eq!(ctx.op_operands(ops[2]), &[five, seven]);
    assert_eq!(ctx.op_operands(ops[3]), &[ctx.op_result(ops[2], 0)]);

    let i32_ty = core::i32(&mut ctx.types);
    let signature = func.signature(&ctx).unwrap();
    assert!(signature.inputs.is_empty());
    assert_eq!(signature.results.as_slice(), &[i32_ty]);

    let module_body = module.body(&ctx).unwrap();
    let exports: Vec<_> = ctx
        .block(module_body)
        .ops
        .iter()
        .filter_map(|&op| vm::Export::from_op(&ctx, op).ok())
        .collect();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].function_ref(&ctx), Some(Symbol::new("add")));
    assert_eq!(exports[0].export_name(&ctx).as_deref(), Some("add"));
}

#[test]
fn lowering_is_deterministic() {
    let lowered = || {
        let (mut ctx, loc) = test_ctx("add.mlir");
        let root = export_scenario(&mut ctx, loc);
        lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap();
        print_op(&ctx, root.op_ref())
    };
    let first = lowered();
    assert!(first.contains("vm.add.i32"));
    assert_eq!(first, lowered());
}

#[test]
fn narrow_integers_widen_to_registers() {
    let (mut ctx, loc) = test_ctx("widen.mlir");
    let (root, inner) = nested_module(&mut ctx, loc);
    let i1_ty = core::i1(&mut ctx.types);
    let i8_ty = core::i8(&mut ctx.types);
    let index = core::index(&mut ctx.types);
    let i32_ty = core::i32(&mut ctx.types);
    let (_, entry) = add_func(&mut ctx, loc, inner, "f", &[i1_ty, i8_ty, index], &[i1_ty]);
    let flag = ctx.block_arg(entry, 0);
    finish(&mut ctx, loc, entry, &[flag]);

    lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap();

    let module = vm_module_of(&ctx, root);
    let func = lookup_symbol_in(&ctx, module.op_ref(), Symbol::new("f")).unwrap();
    let signature = vm::Func::from_op(&ctx, func).unwrap().signature(&ctx).unwrap();
    assert_eq!(signature.inputs.as_slice(), &[i32_ty, i32_ty, i32_ty]);
    assert_eq!(signature.results.as_slice(), &[i32_ty]);
    assert_eq!(ctx.value_ty(flag), i32_ty);
}

#[test]
fn unsigned_comparisons_stay_unsigned() {
    let (mut ctx, loc) = test_ctx("cmp.mlir");
    let (root, inner) = nested_module(&mut ctx, loc);
    let i32_ty = core::i32(&mut ctx.types);
    let (_, entry) = add_func(&mut ctx, loc, inner, "le", &[i32_ty, i32_ty], &[i32_ty]);
    let (a, b) = (ctx.block_arg(entry, 0), ctx.block_arg(entry, 1));
    let unsigned = arith::cmpi(&mut ctx, loc, CmpPredicate::Ule, a, b).op_ref();
    emit(&mut ctx, entry, unsigned);
    let signed = arith::cmpi(&mut ctx, loc, CmpPredicate::Sle, a, b).op_ref();
    let signed = emit(&mut ctx, entry, signed);
    finish(&mut ctx, loc, entry, &[signed]);

    lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap();

    assert_eq!(
        op_names(&ctx, entry),
        ["vm.cmp.lte.i32.u", "vm.cmp.lte.i32.s", "vm.return"]
    );
}

#[test]
fn zero_constants_use_the_zero_instruction() {
    let (mut ctx, loc) = test_ctx("zero.mlir");
    let (root, inner) = nested_module(&mut ctx, loc);
    let i32_ty = core::i32(&mut ctx.types);
    let (_, entry) = add_func(&mut ctx, loc, inner, "zero", &[], &[i32_ty]);
    let zero = arith::constant(&mut ctx, loc, i32_ty, 0).op_ref();
    let zero = emit(&mut ctx, entry, zero);
    finish(&mut ctx, loc, entry, &[zero]);

    lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap();

    assert_eq!(op_names(&ctx, entry), ["vm.const.i32.zero", "vm.return"]);
}

#[test]
fn out_of_range_shift_fails_the_lowering() {
    let (mut ctx, loc) = test_ctx("shift.mlir");
    let (root, inner) = nested_module(&mut ctx, loc);
    let i32_ty = core::i32(&mut ctx.types);
    let (_, entry) = add_func(&mut ctx, loc, inner, "shift", &[i32_ty], &[i32_ty]);
    let x = ctx.block_arg(entry, 0);
    let amount = arith::constant(&mut ctx, loc, i32_ty, 40).op_ref();
    let amount = emit(&mut ctx, entry, amount);
    let shift = arith::shrsi(&mut ctx, loc, x, amount).op_ref();
    let shifted = emit(&mut ctx, entry, shift);
    finish(&mut ctx, loc, entry, &[shifted]);

    let err = lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap_err();
    assert_eq!(err.op(), Some(shift));
    assert!(matches!(
        err.kind(),
        LegalizationErrorKind::IllegalOperation { name, .. } if name == "arith.shrsi"
    ));
    assert_eq!(err.diagnostics().len(), 1);
}

#[test]
fn attributes_outside_the_allow_list_are_dropped() {
    let (mut ctx, loc) = test_ctx("attrs.mlir");
    let (root, inner) = nested_module(&mut ctx, loc);
    let (f, entry) = add_func(&mut ctx, loc, inner, "f", &[], &[]);
    ctx.set_attr(f.op_ref(), strata_vm::ATTR_REFLECTION(), Some(Attribute::from("meta")));
    ctx.set_attr(f.op_ref(), Symbol::new("inline"), Some(Attribute::Bool(true)));
    finish(&mut ctx, loc, entry, &[]);

    lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap();

    let module = vm_module_of(&ctx, root);
    let func = lookup_symbol_in(&ctx, module.op_ref(), Symbol::new("f")).unwrap();
    let attrs = &ctx.op(func).attributes;
    assert!(attrs.contains_key(&strata_vm::ATTR_REFLECTION()));
    assert!(!attrs.contains_key(&Symbol::new("inline")));
    assert!(!attrs.contains_key(&core::ATTR_SYM_VISIBILITY()));
}

/// `f() { custom.probe; return }` with an op no library knows.
fn unknown_op_module(ctx: &mut IrContext, loc: Location) -> (core::Module, OpRef) {
    let (root, inner) = nested_module(ctx, loc);
    let (_, entry) = add_func(ctx, loc, inner, "f", &[], &[]);
    let data = OperationDataBuilder::new(loc, Symbol::new("custom"), Symbol::new("probe")).build(ctx);
    let probe = ctx.create_op(data);
    ctx.push_op(entry, probe);
    finish(ctx, loc, entry, &[]);
    (root, probe)
}

#[test]
fn full_mode_rejects_unknown_operations() {
    let (mut ctx, loc) = test_ctx("unknown.mlir");
    let (root, probe) = unknown_op_module(&mut ctx, loc);

    let err = lower_module(&mut ctx, root.op_ref(), &LoweringOptions::vm()).unwrap_err();
    assert_eq!(err.op(), Some(probe));
}

#[test]
fn partial_mode_keeps_unknown_operations() {
    let (mut ctx, loc) = test_ctx("unknown.mlir");
    let (root, probe) = unknown_op_module(&mut ctx, loc);

    let options = LoweringOptions::vm().with_mode(ConversionMode::Partial);
    lower_module(&mut ctx, root.op_ref(), &options).unwrap();

    let parent = ctx.parent_op(probe).unwrap();
    assert!(vm::Func::matches(&ctx, parent));
}
