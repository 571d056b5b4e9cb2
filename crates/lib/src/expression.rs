//! Derived field properties.
//!
//! Fields declare `hideExpression` and `expressionProperties` as strings. The
//! engine does not interpret them; an [`ExpressionEvaluator`] supplied by the
//! host does. After every settled change the checker re-evaluates them for a
//! subtree and writes back the values that actually changed.
//!
//! Targets are routed by name:
//!
//! - `hide` sets the field's visibility (truthy values hide it),
//! - `className` sets the field's class name,
//! - `templateOptions.<name>` sets a template option; `templateOptions.disabled`
//!   also disables or enables the field's control,
//! - anything else lands in the field's custom `props`.

use serde_json::Value;
use thiserror::Error;

use crate::{
    Result,
    channel::{ChangeKind, FieldChange},
    constants::{CLASS_NAME, DISABLED, HIDE, TEMPLATE_OPTIONS_PREFIX},
    field::{FieldId, FieldNode, truthy},
    form::Form,
    path::get_value,
};

/// Failure reported by an [`ExpressionEvaluator`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to evaluate '{expression}': {reason}")]
pub struct EvaluationError {
    pub expression: String,
    pub reason: String,
}

impl EvaluationError {
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

/// Values an expression can see.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionContext<'a> {
    /// The value of the container the field lives in.
    pub model: &'a Value,
    pub field: &'a FieldNode,
    pub form_state: &'a Value,
    pub root_model: &'a Value,
}

/// Evaluates expression strings against a field's context.
pub trait ExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        context: &ExpressionContext<'_>,
    ) -> std::result::Result<Value, EvaluationError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &ExpressionContext<'_>) -> std::result::Result<Value, EvaluationError>,
{
    fn evaluate(
        &self,
        expression: &str,
        context: &ExpressionContext<'_>,
    ) -> std::result::Result<Value, EvaluationError> {
        self(expression, context)
    }
}

/// Evaluator used when the host supplies none. Every expression fails, so
/// declared defaults stay in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvaluator;

impl ExpressionEvaluator for NoopEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        _context: &ExpressionContext<'_>,
    ) -> std::result::Result<Value, EvaluationError> {
        Err(EvaluationError::new(expression, "no evaluator configured"))
    }
}

/// Where an expression result is written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Hide,
    ClassName,
    TemplateOption(String),
    Prop(String),
}

impl Target {
    fn parse(name: &str) -> Self {
        if name == HIDE {
            Target::Hide
        } else if name == CLASS_NAME {
            Target::ClassName
        } else if let Some(option) = name.strip_prefix(TEMPLATE_OPTIONS_PREFIX) {
            Target::TemplateOption(option.to_string())
        } else {
            Target::Prop(name.to_string())
        }
    }

    fn current(&self, node: &FieldNode) -> Value {
        match self {
            Target::Hide => Value::Bool(node.hide),
            Target::ClassName => node
                .class_name
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            Target::TemplateOption(name) => node.template_options.get(name).unwrap_or(Value::Null),
            Target::Prop(name) => node.props.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    /// Normalizes a raw result into the form stored for this target.
    fn normalize(&self, value: Value) -> Value {
        match self {
            Target::Hide => Value::Bool(truthy(&value)),
            Target::TemplateOption(name) if name == DISABLED => Value::Bool(truthy(&value)),
            Target::ClassName => match value {
                Value::Null | Value::String(_) => value,
                other => Value::String(other.to_string()),
            },
            _ => value,
        }
    }
}

impl Form {
    /// Re-evaluates the expressions of `field` and all of its descendants.
    ///
    /// Every applied change is announced on the field-change channel.
    pub fn check_field(&mut self, field: FieldId) -> Result<()> {
        self.ensure_active()?;
        self.field(field)?;
        self.check_subtree(field, true);
        Ok(())
    }

    /// Walks the subtree as it was at entry; nodes removed by an earlier
    /// change in the same walk are skipped.
    pub(crate) fn check_subtree(&mut self, field: FieldId, announce: bool) -> bool {
        let mut changed = false;
        for id in self.fields.pre_order(field) {
            if self.fields.contains(id) {
                changed |= self.check_node(id, announce);
            }
        }
        changed
    }

    /// Evaluates the expressions declared on one node.
    pub(crate) fn check_node(&mut self, field: FieldId, announce: bool) -> bool {
        let null = Value::Null;
        let results = {
            let Some(node) = self.fields.get(field) else {
                return false;
            };
            if node.hide_expression.is_none() && node.expression_properties.is_empty() {
                return false;
            }
            let context = ExpressionContext {
                model: get_value(&self.model, node.model_path.segments()).unwrap_or(&null),
                field: node,
                form_state: &self.form_state,
                root_model: &self.model,
            };

            let declared = node
                .hide_expression
                .iter()
                .map(|expr| (HIDE.to_string(), expr.clone()))
                .chain(
                    node.expression_properties
                        .iter()
                        .map(|(target, expr)| (target.clone(), expr.clone())),
                );
            let mut results = Vec::new();
            for (target, expression) in declared {
                match self.evaluator.evaluate(&expression, &context) {
                    Ok(value) => results.push((target, value)),
                    Err(err) => {
                        tracing::debug!(%field, target = %target, error = %err, "Expression failed, keeping cached value");
                    }
                }
            }
            results
        };

        let mut changed = false;
        for (name, value) in results {
            changed |= self.apply_expression(field, &name, value, announce);
        }
        changed
    }

    fn apply_expression(&mut self, field: FieldId, name: &str, value: Value, announce: bool) -> bool {
        let target = Target::parse(name);
        let Some(node) = self.fields.get_mut(field) else {
            return false;
        };
        let value = target.normalize(value);
        if target.current(node) == value {
            return false;
        }

        tracing::trace!(%field, target = name, %value, "Expression value changed");
        match &target {
            Target::Hide => node.hide = truthy(&value),
            Target::ClassName => node.class_name = value.as_str().map(str::to_string),
            Target::TemplateOption(option) => node.template_options.set(option, value.clone()),
            Target::Prop(prop) => {
                node.props.insert(prop.clone(), value.clone());
            }
        }

        match &target {
            Target::Hide => self.on_visibility_changed(field),
            Target::TemplateOption(option) if option == DISABLED => {
                self.on_disabled_changed(field, truthy(&value))
            }
            _ => {}
        }

        if announce {
            self.field_changes.emit(&FieldChange {
                value,
                field,
                kind: ChangeKind::ExpressionChanges {
                    property: name.to_string(),
                },
            });
        }
        true
    }
}
