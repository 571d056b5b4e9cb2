//! Form-wide configuration.
//!
//! A [`FormConfig`] carries the type registry (default options and wrappers
//! per render type, with single inheritance through `extends`) and the
//! `extras` switches that tune engine behavior. It deserializes from
//! camelCase JSON:
//!
//! ```
//! use formsync::config::{CheckExpressionOn, FormConfig};
//!
//! let config = FormConfig::from_json(r#"{
//!     "types": [
//!         { "name": "input", "wrappers": ["form-field"] },
//!         { "name": "number", "extends": "input",
//!           "defaultOptions": { "templateOptions": { "step": 1 } } }
//!     ],
//!     "extras": { "checkExpressionOn": "changeDetectionCheck" }
//! }"#)?;
//!
//! let defaults = config.resolve_defaults("number");
//! assert_eq!(defaults.wrappers, Some(vec!["form-field".to_string()]));
//! assert_eq!(config.extras.check_expression_on, CheckExpressionOn::ChangeDetectionCheck);
//! # Ok::<(), formsync::Error>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result,
    constants::MODEL_CHANGE_DEBOUNCE_MS,
    field::{ModelOptions, TemplateOptions},
};

/// When expressions are re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckExpressionOn {
    /// After every settled model change.
    #[default]
    ModelChange,
    /// Additionally on every change-detection tick.
    ChangeDetectionCheck,
}

fn default_model_change_debounce() -> u64 {
    MODEL_CHANGE_DEBOUNCE_MS
}

/// Engine switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Extras {
    pub check_expression_on: CheckExpressionOn,
    /// Coalescing window for model changes requested while a model-change
    /// emission is running.
    #[serde(default = "default_model_change_debounce")]
    pub model_change_debounce_ms: u64,
}

impl Default for Extras {
    fn default() -> Self {
        Self {
            check_expression_on: CheckExpressionOn::default(),
            model_change_debounce_ms: MODEL_CHANGE_DEBOUNCE_MS,
        }
    }
}

/// Declarative defaults applied to every field of a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDefaults {
    pub default_value: Option<Value>,
    pub wrappers: Option<Vec<String>>,
    pub class_name: Option<String>,
    pub hide_expression: Option<String>,
    pub expression_properties: BTreeMap<String, String>,
    pub template_options: TemplateOptions,
    pub model_options: ModelOptions,
}

impl FieldDefaults {
    /// Overlays `other` on top of `self`; entries set in `other` win.
    fn overlay(&mut self, other: &FieldDefaults) {
        if other.default_value.is_some() {
            self.default_value = other.default_value.clone();
        }
        if other.wrappers.is_some() {
            self.wrappers = other.wrappers.clone();
        }
        if other.class_name.is_some() {
            self.class_name = other.class_name.clone();
        }
        if other.hide_expression.is_some() {
            self.hide_expression = other.hide_expression.clone();
        }
        self.expression_properties
            .extend(other.expression_properties.clone());
        self.template_options.disabled |= other.template_options.disabled;
        self.template_options
            .extra
            .extend(other.template_options.extra.clone());
        if other.model_options.update_on.is_some() {
            self.model_options.update_on = other.model_options.update_on;
        }
        if other.model_options.debounce.is_some() {
            self.model_options.debounce = other.model_options.debounce;
        }
    }
}

/// A registered render type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeOption {
    pub name: String,
    /// Parent type whose defaults this type inherits.
    pub extends: Option<String>,
    /// Default wrappers for fields of this type.
    pub wrappers: Vec<String>,
    pub default_options: FieldDefaults,
}

impl TypeOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn with_wrappers<I, S>(mut self, wrappers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wrappers = wrappers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_defaults(mut self, defaults: FieldDefaults) -> Self {
        self.default_options = defaults;
        self
    }
}

/// Configuration shared by every form built from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    pub types: Vec<TypeOption>,
    pub extras: Extras,
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Registers a type, replacing any previous type with the same name.
    pub fn with_type(mut self, option: TypeOption) -> Self {
        self.types.retain(|t| t.name != option.name);
        self.types.push(option);
        self
    }

    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeOption> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Defaults for `name`, with inherited types applied first.
    ///
    /// Unknown types resolve to empty defaults. An `extends` cycle stops at the
    /// first repeated type.
    pub fn resolve_defaults(&self, name: &str) -> FieldDefaults {
        let mut chain = Vec::new();
        let mut current = self.get_type(name);
        while let Some(option) = current {
            if chain.iter().any(|t: &&TypeOption| t.name == option.name) {
                tracing::warn!(type_name = %option.name, "Type inheritance cycle");
                break;
            }
            chain.push(option);
            current = option.extends.as_deref().and_then(|p| self.get_type(p));
        }

        let mut defaults = FieldDefaults::default();
        for option in chain.iter().rev() {
            if !option.wrappers.is_empty() {
                defaults.wrappers = Some(option.wrappers.clone());
            }
            defaults.overlay(&option.default_options);
        }
        defaults
    }
}
