//! `nvvm` dialect: PTX special-register reads.
//!
//! Every op takes no operands and yields a `core.i32`.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::refs::OpRef;
use crate::symbol::Symbol;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "nvvm",
}

macro_rules! sreg_ops {
    ($($ty:ident => $name:literal;)*) => {
        $(
            define_op! {
                #[doc = concat!("`nvvm.", $name, "`")]
                $ty = "nvvm" . $name
            }
        )*
    };
}

sreg_ops! {
    CtaIdX => "read.ptx.sreg.ctaid.x";
    CtaIdY => "read.ptx.sreg.ctaid.y";
    CtaIdZ => "read.ptx.sreg.ctaid.z";
    NCtaIdX => "read.ptx.sreg.nctaid.x";
    NCtaIdY => "read.ptx.sreg.nctaid.y";
    NCtaIdZ => "read.ptx.sreg.nctaid.z";
    NTidX => "read.ptx.sreg.ntid.x";
    NTidY => "read.ptx.sreg.ntid.y";
    NTidZ => "read.ptx.sreg.ntid.z";
}

/// Block index within the grid, by axis.
pub const BLOCK_ID: [&str; 3] = [
    "read.ptx.sreg.ctaid.x",
    "read.ptx.sreg.ctaid.y",
    "read.ptx.sreg.ctaid.z",
];

/// Grid extent in blocks, by axis.
pub const GRID_DIM: [&str; 3] = [
    "read.ptx.sreg.nctaid.x",
    "read.ptx.sreg.nctaid.y",
    "read.ptx.sreg.nctaid.z",
];

/// Block extent in threads, by axis.
pub const BLOCK_DIM: [&str; 3] = [
    "read.ptx.sreg.ntid.x",
    "read.ptx.sreg.ntid.y",
    "read.ptx.sreg.ntid.z",
];

/// Create the special-register read `nvvm.<name>`.
pub fn sreg(ctx: &mut IrContext, location: Location, name: &'static str) -> OpRef {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new(name))
        .result(i32_ty)
        .build(ctx);
    ctx.create_op(data)
}
