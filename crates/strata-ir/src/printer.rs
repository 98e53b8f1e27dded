//! Textual IR printer.
//!
//! Prints a generic, MLIR-like form used for debugging and test snapshots:
//!
//! ```text
//! vm.func @add {function_type = core.fn(core.i32) {inputs = 0}} {
//!   %0 = vm.const.i32 {value = 5} : core.i32
//!   vm.return %0
//! }
//! ```
//!
//! Values and blocks are numbered in print order. Attributes are printed
//! sorted by key text, so output does not depend on symbol interning order.

use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::context::IrContext;
use crate::dialect::core::ATTR_SYM_NAME;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::Attribute;

struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, usize>,
    block_labels: HashMap<BlockRef, usize>,
    next_value: usize,
    next_block: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value: 0,
            next_block: 0,
        }
    }

    fn name_value(&mut self, v: ValueRef) -> usize {
        let n = self.next_value;
        self.next_value += 1;
        self.value_names.insert(v, n);
        n
    }

    fn write_value(&self, f: &mut impl Write, v: ValueRef) -> fmt::Result {
        match self.value_names.get(&v) {
            Some(n) => write!(f, "%{n}"),
            None => f.write_str("%?"),
        }
    }

    fn label_block(&mut self, b: BlockRef) {
        let n = self.next_block;
        self.next_block += 1;
        self.block_labels.insert(b, n);
    }

    fn write_block(&self, f: &mut impl Write, b: BlockRef) -> fmt::Result {
        match self.block_labels.get(&b) {
            Some(n) => write!(f, "^bb{n}"),
            None => f.write_str("^bb?"),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print an operation (and everything nested in it) as IR text.
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    out
}

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

pub fn print_attribute(ctx: &IrContext, attr: &Attribute) -> String {
    let mut out = String::new();
    write_attribute(ctx, &mut out, attr).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Types and attributes
// ============================================================================

/// Attribute entries ordered by key text.
fn sorted_attrs<'m>(
    attrs: impl IntoIterator<Item = (&'m Symbol, &'m Attribute)>,
) -> Vec<(String, &'m Attribute)> {
    let mut entries: Vec<_> = attrs
        .into_iter()
        .map(|(key, val)| (key.to_string(), val))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

fn write_attr_dict(ctx: &IrContext, f: &mut impl Write, entries: &[(String, &Attribute)]) -> fmt::Result {
    f.write_str(" {")?;
    for (i, (key, val)) in entries.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key} = ")?;
        write_attribute(ctx, f, val)?;
    }
    f.write_char('}')
}

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    } else if !data.attrs.is_empty() {
        f.write_str("()")?;
    }
    if !data.attrs.is_empty() {
        write_attr_dict(ctx, f, &sorted_attrs(&data.attrs))?;
    }
    Ok(())
}

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(v) => write!(f, "{}", *v as i64),
        Attribute::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            let s = format!("{v}");
            f.write_str(&s)?;
            if v.is_finite() && !s.contains(['.', 'e', 'E']) {
                f.write_str(".0")?;
            }
            Ok(())
        }
        Attribute::String(s) => {
            f.write_char('"')?;
            write_escaped(f, s)?;
            f.write_char('"')
        }
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(items) => {
            if !items.is_empty() && items.iter().all(|a| matches!(a, Attribute::Symbol(_))) {
                // nested symbol reference
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("::")?;
                    }
                    write_attribute(ctx, f, item)?;
                }
                return Ok(());
            }
            f.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
        Attribute::Location(loc) => {
            f.write_str("loc(\"")?;
            write_escaped(f, ctx.paths.get(loc.path))?;
            write!(f, "\" {}:{})", loc.span.start, loc.span.end)
        }
    }
}

fn write_escaped(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        let bare = !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
        if bare {
            write!(f, "@{s}")
        } else {
            f.write_str("@\"")?;
            write_escaped(f, s)?;
            f.write_char('"')
        }
    })
}

// ============================================================================
// Operations, regions, blocks
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    let pad = " ".repeat(indent);
    f.write_str(&pad)?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let n = state.name_value(v);
            write!(f, "%{n}")?;
        }
        f.write_str(" = ")?;
    }

    write!(f, "{}.{}", data.dialect, data.name)?;

    let sym_name = data.attributes.get(&ATTR_SYM_NAME()).and_then(Attribute::as_symbol);
    if let Some(name) = sym_name {
        f.write_char(' ')?;
        write_symbol(f, name)?;
    }

    let operands = ctx.op_operands(op);
    for (i, &v) in operands.iter().enumerate() {
        f.write_str(if i == 0 { " " } else { ", " })?;
        state.write_value(f, v)?;
    }

    if !data.successors.is_empty() {
        f.write_str(" [")?;
        for (i, &b) in data.successors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            state.write_block(f, b)?;
        }
        f.write_char(']')?;
    }

    let attrs = sorted_attrs(
        data.attributes
            .iter()
            .filter(|(key, _)| sym_name.is_none() || **key != ATTR_SYM_NAME()),
    );
    if !attrs.is_empty() {
        write_attr_dict(ctx, f, &attrs)?;
    }

    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, ty)?;
        }
    }

    for &region in &data.regions {
        f.write_str(" {\n")?;
        print_region(state, f, region, indent + 2)?;
        write!(f, "{pad}}}")?;
    }

    f.write_char('\n')
}

fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let blocks = &ctx.region(region).blocks;
    for &block in blocks {
        state.label_block(block);
    }

    let elide_label = blocks.len() == 1 && ctx.block_args(blocks[0]).is_empty();
    for &block in blocks {
        if !elide_label {
            let pad = " ".repeat(indent.saturating_sub(2));
            f.write_str(&pad)?;
            state.write_block(f, block)?;
            let args = ctx.block_args(block);
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    let n = state.name_value(arg);
                    write!(f, "%{n}: ")?;
                    write_type(ctx, f, ctx.value_ty(arg))?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }
        for &op in &ctx.block(block).ops {
            print_operation(state, f, op, indent)?;
        }
    }
    Ok(())
}
