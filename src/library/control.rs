use crate::define::{ActionDefine, MethodBody, MethodCall};
use crate::error::{ActionError, DefineError};
use crate::value::ValueType;
use async_trait::async_trait;
use std::time::Duration;

pub(super) fn branch() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Branch")
        .input("condition", ValueType::Bool)
        .branch("true")
        .branch("false")
        .body(|call| {
            let condition = call.bool("condition")?;
            call.take_branch(if condition { "true" } else { "false" });
            Ok(())
        })
        .build()
}

/// Suspends the flow for a number of milliseconds before continuing.
struct Delay;

#[async_trait]
impl MethodBody for Delay {
    async fn invoke(&self, call: &mut MethodCall<'_>) -> Result<(), ActionError> {
        let millis = call.int("milliseconds")?.max(0) as u64;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(())
    }
}

pub(super) fn delay() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Delay")
        .input("milliseconds", ValueType::Int)
        .async_body(Delay)
        .build()
}
