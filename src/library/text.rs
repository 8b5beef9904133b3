use crate::define::ActionDefine;
use crate::error::DefineError;
use crate::value::{Value, ValueType};
use itertools::Itertools;

pub(super) fn text() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Text")
        .constant("value", ValueType::String)
        .returns(ValueType::String)
        .body(|call| {
            let value = call.str("value")?.to_string();
            call.set_return(value);
            Ok(())
        })
        .build()
}

pub(super) fn concat() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Concat")
        .variadic_input("parts", ValueType::String)
        .returns(ValueType::String)
        .body(|call| {
            let joined = call
                .array("parts")?
                .iter()
                .filter_map(Value::as_str)
                .join("");
            call.set_return(joined);
            Ok(())
        })
        .build()
}
