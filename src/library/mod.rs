//! Standard method defines.

use crate::define::{ActionDefine, DefineCatalog};
use crate::error::DefineError;

mod context;
mod control;
mod math;
mod text;

pub use math::IntegerOperator;

/// Registers every standard define into `catalog`.
pub fn register_builtins(catalog: &mut DefineCatalog) -> Result<(), DefineError> {
    let defines: Vec<ActionDefine> = vec![
        math::integer()?,
        math::integer_operation()?,
        math::compare()?,
        text::text()?,
        text::concat()?,
        control::branch()?,
        control::delay()?,
        context::get_card()?,
        context::get_buff()?,
        context::get_event()?,
        context::log()?,
    ];
    for define in defines {
        catalog.register(define);
    }
    Ok(())
}
