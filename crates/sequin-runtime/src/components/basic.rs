use serde_json::{Number, Value};

use crate::context::{ComponentExecutor, Execution, ExecutionContext};
use crate::error::ComponentError;
use crate::expression::{is_truthy, value_to_string};
use crate::logs::LogItemType;

/// Logs its `value` input, or the evaluated `value` property.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogComponent;

impl ComponentExecutor for LogComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let value = match ctx.input("value") {
      Some(value) => value,
      None => ctx.eval_property("value")?.unwrap_or(Value::Null),
    };
    ctx.log(LogItemType::Info, value_to_string(&value));
    Ok(Execution::Completed)
  }
}

/// Sums every data input and propagates the total through `result`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddComponent;

impl ComponentExecutor for AddComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let data_inputs: Vec<String> = ctx
      .component()
      .inputs
      .iter()
      .filter(|input| !input.is_sequence_input)
      .map(|input| input.name.clone())
      .collect();

    let mut int_sum: Option<i64> = Some(0);
    let mut float_sum = 0.0;
    for name in data_inputs {
      let Some(value) = ctx.input(&name) else {
        continue;
      };
      let Value::Number(number) = &value else {
        return Err(ComponentError::failed(format!(
          "input '{name}' is not a number: {value}"
        )));
      };
      int_sum = int_sum.zip(number.as_i64()).and_then(|(a, b)| a.checked_add(b));
      float_sum += number.as_f64().unwrap_or(0.0);
    }

    let result = match int_sum {
      Some(sum) => Value::Number(sum.into()),
      None => Number::from_f64(float_sum)
        .map(Value::Number)
        .ok_or_else(|| ComponentError::failed("sum is not a finite number"))?,
    };
    ctx.propagate_value("result", result);
    Ok(Execution::Completed)
  }
}

/// Evaluates the `expression` property and propagates it through `result`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateComponent;

impl ComponentExecutor for EvaluateComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let expression = ctx.property_str("expression")?.to_string();
    let value = ctx.eval_expression(&expression)?;
    ctx.propagate_value("result", value);
    Ok(Execution::Completed)
  }
}

/// Assigns the `value` input (or evaluated `value` property) to the
/// assignable expression in the `variable` property.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetVariableComponent;

impl ComponentExecutor for SetVariableComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let target = ctx.property_str("variable")?.to_string();
    let value = match ctx.input("value") {
      Some(value) => value,
      None => ctx
        .eval_property("value")?
        .ok_or_else(|| ComponentError::MissingInput("value".to_string()))?,
    };
    ctx.assign_value(&target, value)?;
    Ok(Execution::Completed)
  }
}

/// Branches on its `value` input through the `True` or `False` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsTrueComponent;

impl ComponentExecutor for IsTrueComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let value = ctx.require_input("value")?;
    let output = if is_truthy(&value) { "True" } else { "False" };
    ctx.propagate_value(output, Value::Null);
    Ok(Execution::SelfPropagated)
  }
}
