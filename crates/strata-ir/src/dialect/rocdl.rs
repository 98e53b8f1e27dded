//! `rocdl` dialect: AMDGPU work-item queries.

use crate::context::{IrContext, OperationDataBuilder};
use crate::dialect::core;
use crate::location::Location;
use crate::refs::OpRef;
use crate::symbol::Symbol;
use crate::{define_op, symbols};

symbols! {
    DIALECT_NAME => "rocdl",
}

macro_rules! query_ops {
    ($($ty:ident => $name:literal;)*) => {
        $(
            define_op! {
                #[doc = concat!("`rocdl.", $name, "`")]
                $ty = "rocdl" . $name
            }
        )*
    };
}

query_ops! {
    WorkgroupIdX => "workgroup.id.x";
    WorkgroupIdY => "workgroup.id.y";
    WorkgroupIdZ => "workgroup.id.z";
    GridDimX => "grid.dim.x";
    GridDimY => "grid.dim.y";
    GridDimZ => "grid.dim.z";
    WorkgroupDimX => "workgroup.dim.x";
    WorkgroupDimY => "workgroup.dim.y";
    WorkgroupDimZ => "workgroup.dim.z";
}

pub const BLOCK_ID: [&str; 3] = ["workgroup.id.x", "workgroup.id.y", "workgroup.id.z"];
pub const GRID_DIM: [&str; 3] = ["grid.dim.x", "grid.dim.y", "grid.dim.z"];
pub const BLOCK_DIM: [&str; 3] = ["workgroup.dim.x", "workgroup.dim.y", "workgroup.dim.z"];

/// Create the `core.i32` query `rocdl.<name>`.
pub fn query(ctx: &mut IrContext, location: Location, name: &'static str) -> OpRef {
    let i32_ty = core::i32(&mut ctx.types);
    let data = OperationDataBuilder::new(location, DIALECT_NAME(), Symbol::new(name))
        .result(i32_ty)
        .build(ctx);
    ctx.create_op(data)
}
