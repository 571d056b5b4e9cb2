//! Field descriptors.
//!
//! [`FieldConfig`] is the caller-facing declaration of one field. The
//! declarative part deserializes from camelCase JSON; function-valued members
//! (parsers, validators, hooks) are attached with builder methods.
//!
//! ```
//! use formsync::field::FieldConfig;
//! use serde_json::json;
//!
//! let fields: Vec<FieldConfig> = serde_json::from_value(json!([
//!     { "key": "name", "type": "input", "templateOptions": { "label": "Name" } },
//!     { "key": "tags", "type": "array", "fieldArray": { "type": "input" } },
//! ]))?;
//! assert_eq!(fields[1].field_array.as_ref().unwrap().field_type.as_deref(), Some("input"));
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::{collections::BTreeMap, fmt, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::FieldNode;
use crate::{
    constants::DISABLED,
    control::{AsyncValidator, UpdateOn, Validator},
    path::{KeyPath, PathError},
};

/// Template options of a field. `disabled` is interpreted by the engine;
/// every other entry is passed through to the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateOptions {
    pub disabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateOptions {
    pub fn get(&self, name: &str) -> Option<Value> {
        if name == DISABLED {
            Some(Value::Bool(self.disabled))
        } else {
            self.extra.get(name).cloned()
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if name == DISABLED {
            self.disabled = truthy(&value);
        } else {
            self.extra.insert(name.to_string(), value);
        }
    }

    /// Fills entries missing from `self` with those of `defaults`.
    pub(crate) fn merge_defaults(&mut self, defaults: &TemplateOptions) {
        self.disabled |= defaults.disabled;
        for (name, value) in &defaults.extra {
            self.extra
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// JavaScript-style truthiness of a JSON value.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Debounce settings keyed by event name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Debounce {
    /// Delay in milliseconds applied to value changes.
    pub default: u64,
}

/// How and when a field commits its value to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptions {
    pub update_on: Option<UpdateOn>,
    pub debounce: Option<Debounce>,
}

impl ModelOptions {
    /// Debounce delay that applies to value changes.
    ///
    /// `blur` and `submit` already gate on a discrete event, so no delay is
    /// applied for them.
    pub fn effective_debounce(&self) -> Option<u64> {
        match self.update_on {
            None | Some(UpdateOn::Change) => self
                .debounce
                .map(|d| d.default)
                .filter(|&ms| ms > 0),
            Some(UpdateOn::Blur) | Some(UpdateOn::Submit) => None,
        }
    }

    pub(crate) fn merge_defaults(&mut self, defaults: &ModelOptions) {
        self.update_on = self.update_on.or(defaults.update_on);
        self.debounce = self.debounce.or(defaults.debounce);
    }
}

/// A pure value transform applied before a value reaches the model.
#[derive(Clone)]
pub struct Parser(Rc<dyn Fn(Value) -> Value>);

impl Parser {
    pub fn new(f: impl Fn(Value) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn parse(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Parser(..)")
    }
}

/// Lifecycle notifications forwarded to field hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleHook {
    OnInit,
    OnChanges,
    DoCheck,
    AfterContentInit,
    AfterContentChecked,
    AfterViewInit,
    AfterViewChecked,
    OnDestroy,
}

/// A lifecycle callback. Receives the field itself.
#[derive(Clone)]
pub struct Hook(Rc<dyn Fn(&mut FieldNode)>);

impl Hook {
    pub fn new(f: impl Fn(&mut FieldNode) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, field: &mut FieldNode) {
        (self.0)(field)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Hooks of a field, by lifecycle event.
#[derive(Debug, Clone, Default)]
pub struct Hooks(BTreeMap<LifecycleHook, Hook>);

impl Hooks {
    pub fn get(&self, hook: LifecycleHook) -> Option<&Hook> {
        self.0.get(&hook)
    }

    pub fn set(&mut self, hook: LifecycleHook, callback: Hook) {
        self.0.insert(hook, callback);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Declaration of one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldConfig {
    pub id: Option<String>,
    /// Model path in dot/bracket notation, e.g. `address.lines[0]`.
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub field_group: Option<Vec<FieldConfig>>,
    /// Template for the elements of an array field.
    pub field_array: Option<Box<FieldConfig>>,
    pub default_value: Option<Value>,
    pub wrappers: Option<Vec<String>>,
    pub hide: bool,
    pub hide_expression: Option<String>,
    pub expression_properties: BTreeMap<String, String>,
    pub class_name: Option<String>,
    pub template_options: TemplateOptions,
    pub model_options: ModelOptions,
    /// Delete the model key instead of writing `null` once the control is
    /// detached from the form.
    pub auto_clear: bool,
    #[serde(skip)]
    pub parsers: Vec<Parser>,
    #[serde(skip)]
    pub validators: Vec<Validator>,
    #[serde(skip)]
    pub async_validators: Vec<AsyncValidator>,
    #[serde(skip)]
    pub hooks: Hooks,
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a keyed field of the given render type.
    pub fn input(key: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self::new().with_key(key).with_type(field_type)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn with_group(mut self, fields: Vec<FieldConfig>) -> Self {
        self.field_group = Some(fields);
        self
    }

    pub fn with_array(mut self, template: FieldConfig) -> Self {
        self.field_array = Some(Box::new(template));
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_wrappers<I, S>(mut self, wrappers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wrappers = Some(wrappers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_hide(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }

    pub fn with_hide_expression(mut self, expression: impl Into<String>) -> Self {
        self.hide_expression = Some(expression.into());
        self
    }

    pub fn with_expression(mut self, target: impl Into<String>, expression: impl Into<String>) -> Self {
        self.expression_properties
            .insert(target.into(), expression.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_template_option(mut self, name: &str, value: Value) -> Self {
        self.template_options.set(name, value);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.template_options.disabled = disabled;
        self
    }

    pub fn with_update_on(mut self, update_on: UpdateOn) -> Self {
        self.model_options.update_on = Some(update_on);
        self
    }

    pub fn with_debounce(mut self, millis: u64) -> Self {
        self.model_options.debounce = Some(Debounce { default: millis });
        self
    }

    pub fn with_auto_clear(mut self, auto_clear: bool) -> Self {
        self.auto_clear = auto_clear;
        self
    }

    pub fn with_parser(mut self, parser: impl Fn(Value) -> Value + 'static) -> Self {
        self.parsers.push(Parser::new(parser));
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_async_validator(mut self, validator: AsyncValidator) -> Self {
        self.async_validators.push(validator);
        self
    }

    pub fn with_hook(mut self, hook: LifecycleHook, callback: impl Fn(&mut FieldNode) + 'static) -> Self {
        self.hooks.set(hook, Hook::new(callback));
        self
    }

    /// Parses every key of this declaration, its group and its array
    /// template.
    pub fn validate_keys(&self) -> Result<(), PathError> {
        if let Some(key) = &self.key {
            KeyPath::parse(key)?;
        }
        for child in self.field_group.iter().flatten() {
            child.validate_keys()?;
        }
        if let Some(template) = &self.field_array {
            template.validate_keys()?;
        }
        Ok(())
    }
}
