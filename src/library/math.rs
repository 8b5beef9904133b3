use crate::define::ActionDefine;
use crate::error::{ActionError, DefineError};
use crate::value::{Value, ValueType};
use std::str::FromStr;

/// Operators accepted by `IntegerOperation`. Each has 0 as its identity, so the trailing
/// empty slot of the variadic group does not change the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerOperator {
    Add,
    Subtract,
    Or,
    Xor,
}

impl IntegerOperator {
    pub fn apply(self, values: &[i64]) -> i64 {
        let mut iter = values.iter().copied();
        let first = iter.next().unwrap_or(0);
        iter.fold(first, |acc, v| match self {
            IntegerOperator::Add => acc.wrapping_add(v),
            IntegerOperator::Subtract => acc.wrapping_sub(v),
            IntegerOperator::Or => acc | v,
            IntegerOperator::Xor => acc ^ v,
        })
    }
}

impl FromStr for IntegerOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "add" | "+" => Ok(IntegerOperator::Add),
            "subtract" | "-" => Ok(IntegerOperator::Subtract),
            "or" | "|" => Ok(IntegerOperator::Or),
            "xor" | "^" => Ok(IntegerOperator::Xor),
            other => Err(format!("unknown integer operator '{}'", other)),
        }
    }
}

pub(super) fn integer() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Integer")
        .constant("value", ValueType::Int)
        .returns(ValueType::Int)
        .body(|call| {
            let value = call.int("value")?;
            call.set_return(value);
            Ok(())
        })
        .build()
}

pub(super) fn integer_operation() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("IntegerOperation")
        .constant("operator", ValueType::String)
        .variadic_input("values", ValueType::Int)
        .returns(ValueType::Int)
        .obsolete_name("IntOperation")
        .obsolete_message("IntOperation was renamed to IntegerOperation")
        .body(|call| {
            let operator: IntegerOperator =
                call.str("operator")?.parse().map_err(ActionError::Failed)?;
            let values: Vec<i64> = call
                .array("values")?
                .iter()
                .map(|v| v.as_int().unwrap_or(0))
                .collect();
            call.set_return(operator.apply(&values));
            Ok(())
        })
        .build()
}

/// Compares two integers, returns the outcome and continues through `true` or `false`.
pub(super) fn compare() -> Result<ActionDefine, DefineError> {
    ActionDefine::method("Compare")
        .input("left", ValueType::Int)
        .input("right", ValueType::Int)
        .constant("operator", ValueType::String)
        .branch("true")
        .branch("false")
        .returns(ValueType::Bool)
        .body(|call| {
            let (left, right) = (call.int("left")?, call.int("right")?);
            let outcome = match call.str("operator")? {
                "<" => left < right,
                "<=" => left <= right,
                "" | "==" => left == right,
                "!=" => left != right,
                ">" => left > right,
                ">=" => left >= right,
                other => {
                    return Err(ActionError::InvalidArgument {
                        name: "operator".to_string(),
                        expected: "a comparison operator".to_string(),
                        found: other.to_string(),
                    });
                }
            };
            call.set_return(Value::Bool(outcome));
            call.take_branch(if outcome { "true" } else { "false" });
            Ok(())
        })
        .build()
}
