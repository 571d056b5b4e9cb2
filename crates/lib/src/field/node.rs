//! Built field state.

use std::{collections::BTreeMap, fmt};

use serde_json::{Map, Value};

use super::{
    FieldId,
    config::{FieldConfig, Hooks, ModelOptions, Parser, TemplateOptions},
};
use crate::{
    control::{AsyncValidator, ControlId, Validator},
    path::{KeyPath, PathError},
    render::{Container, Mounted},
};

/// Per-field value subscription state.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValueSubscription {
    /// Last raw control value seen, for distinct-until-changed filtering.
    pub(crate) last_value: Option<Value>,
    pub(crate) debounce_ms: Option<u64>,
}

/// One node of the built field tree.
///
/// Nodes are owned by the form's [`FieldTree`](super::FieldTree). The parent
/// link is an id, never an owning reference.
pub struct FieldNode {
    pub(crate) id: FieldId,
    pub(crate) config_id: Option<String>,
    pub(crate) raw_key: Option<String>,
    pub(crate) key: Option<KeyPath>,
    pub(crate) field_type: Option<String>,
    pub(crate) parent: Option<FieldId>,
    pub(crate) children: Vec<FieldId>,
    pub(crate) has_group: bool,
    pub(crate) array_template: Option<Box<FieldConfig>>,
    pub(crate) model_path: KeyPath,
    pub(crate) control: Option<ControlId>,
    pub(crate) default_value: Option<Value>,
    pub(crate) wrappers: Option<Vec<String>>,
    pub(crate) hooks: Hooks,
    pub(crate) expression_properties: BTreeMap<String, String>,
    pub(crate) hide_expression: Option<String>,
    pub(crate) hide: bool,
    pub(crate) class_name: Option<String>,
    pub(crate) template_options: TemplateOptions,
    pub(crate) props: Map<String, Value>,
    pub(crate) model_options: ModelOptions,
    pub(crate) parsers: Vec<Parser>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) async_validators: Vec<AsyncValidator>,
    pub(crate) auto_clear: bool,
    pub(crate) subscription: Option<ValueSubscription>,
    pub(crate) component_refs: Vec<Box<dyn Mounted>>,
    pub(crate) host: Option<Container>,
    pub(crate) defaults_applied: bool,
}

impl FieldNode {
    /// Creates an unbuilt node from its declaration. Children are not
    /// instantiated here, but an array template's keys are checked up front.
    pub(crate) fn from_config(
        id: FieldId,
        config: FieldConfig,
        parent: Option<FieldId>,
    ) -> Result<Self, PathError> {
        let key = config.key.as_deref().map(KeyPath::parse).transpose()?;
        if let Some(template) = &config.field_array {
            template.validate_keys()?;
        }
        Ok(Self {
            id,
            config_id: config.id,
            raw_key: config.key,
            key,
            field_type: config.field_type,
            parent,
            children: Vec::new(),
            has_group: config.field_group.is_some(),
            array_template: config.field_array,
            model_path: KeyPath::new(),
            control: None,
            default_value: config.default_value,
            wrappers: config.wrappers,
            hooks: config.hooks,
            expression_properties: config.expression_properties,
            hide_expression: config.hide_expression,
            hide: config.hide,
            class_name: config.class_name,
            template_options: config.template_options,
            props: Map::new(),
            model_options: config.model_options,
            parsers: config.parsers,
            validators: config.validators,
            async_validators: config.async_validators,
            auto_clear: config.auto_clear,
            subscription: None,
            component_refs: Vec::new(),
            host: None,
            defaults_applied: false,
        })
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    /// The `id` given in the declaration, if any.
    pub fn config_id(&self) -> Option<&str> {
        self.config_id.as_deref()
    }

    /// The key as declared, e.g. `o[0].name`.
    pub fn key(&self) -> Option<&str> {
        self.raw_key.as_deref()
    }

    pub fn key_path(&self) -> Option<&KeyPath> {
        self.key.as_ref()
    }

    pub fn field_type(&self) -> Option<&str> {
        self.field_type.as_deref()
    }

    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }

    /// Built children (`fieldGroup`).
    pub fn children(&self) -> &[FieldId] {
        &self.children
    }

    /// Absolute path of the container this field's value lives in.
    pub fn model_path(&self) -> &KeyPath {
        &self.model_path
    }

    /// Absolute model path of the field's own value, if it has a key.
    pub fn value_path(&self) -> Option<KeyPath> {
        self.key.as_ref().map(|key| self.model_path.join(key))
    }

    pub fn control(&self) -> Option<ControlId> {
        self.control
    }

    pub fn wrappers(&self) -> &[String] {
        self.wrappers.as_deref().unwrap_or_default()
    }

    pub fn is_hidden(&self) -> bool {
        self.hide
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn set_class_name(&mut self, class_name: Option<String>) {
        self.class_name = class_name;
    }

    pub fn template_options(&self) -> &TemplateOptions {
        &self.template_options
    }

    pub fn template_options_mut(&mut self) -> &mut TemplateOptions {
        &mut self.template_options
    }

    /// Custom properties produced by expressions.
    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.props
    }

    pub fn model_options(&self) -> &ModelOptions {
        &self.model_options
    }

    pub fn is_array(&self) -> bool {
        self.array_template.is_some()
    }

    /// Whether the field declares children, either directly or through an
    /// array template.
    pub fn is_composite(&self) -> bool {
        self.has_group || self.is_array()
    }

    /// Number of UI instances currently mounted for this field.
    pub fn mounted_count(&self) -> usize {
        self.component_refs.len()
    }

    pub fn host(&self) -> Option<&Container> {
        self.host.as_ref()
    }

    pub(crate) fn dispose_component_refs(&mut self) {
        for mut component in self.component_refs.drain(..) {
            component.dispose();
        }
    }
}

impl fmt::Debug for FieldNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldNode")
            .field("id", &self.id)
            .field("key", &self.raw_key)
            .field("type", &self.field_type)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("control", &self.control)
            .field("hide", &self.hide)
            .field("mounted", &self.component_refs.len())
            .finish_non_exhaustive()
    }
}
