//! Array field operations.
//!
//! An array field keeps three sequences in lockstep: the model array, its
//! element nodes (instantiated from the field's template) and the child
//! controls of its array control. [`Form::add`] and [`Form::remove`] change
//! one position and leave the identity of every other element's node and
//! control intact. [`Form::reset_model`] is the opposite: it rebuilds every
//! element from scratch.

use serde_json::Value;

use crate::{
    Result,
    field::FieldId,
    form::{Form, FormError},
    path::{KeyPath, get_value, get_value_mut, set_value},
};

impl Form {
    /// Inserts an element at `index` (appends when `None`).
    ///
    /// A `null` or missing model value becomes an empty array first. The
    /// new element starts as `initial`, else as the template's default value,
    /// else `null`. Only the new element is built; its neighbours keep their
    /// nodes, controls and mounted instances. Emits one value change carrying
    /// the whole array.
    pub fn add(&mut self, field: FieldId, index: Option<usize>, initial: Option<Value>) -> Result<()> {
        self.ensure_active()?;
        let path = self.array_path(field)?;
        let node = self.field(field)?;
        let template = node
            .array_template
            .clone()
            .ok_or(FormError::NotAnArrayField { field })?;
        let array_control = node.control;
        let initial = initial
            .or_else(|| template.default_value.clone())
            .or_else(|| {
                let type_name = template.field_type.as_deref()?;
                self.config.resolve_defaults(type_name).default_value
            })
            .unwrap_or(Value::Null);

        let len = match get_value(&self.model, path.segments()) {
            None | Some(Value::Null) => 0,
            Some(Value::Array(items)) => items.len(),
            Some(_) => return Err(FormError::NotAnArrayValue { field }.into()),
        };
        let index = index.unwrap_or(len);
        if index > len {
            return Err(FormError::IndexOutOfBounds { index, len }.into());
        }

        let child = self.instantiate((*template).with_key(index.to_string()), Some(field))?;

        if !matches!(get_value(&self.model, path.segments()), Some(Value::Array(_))) {
            set_value(&mut self.model, path.segments(), Value::Array(Vec::new()));
        }
        if let Some(Value::Array(items)) = get_value_mut(&mut self.model, path.segments()) {
            items.insert(index, initial);
        }
        if let Some(node) = self.fields.get_mut(field) {
            let at = index.min(node.children.len());
            node.children.insert(at, child);
        }
        self.renumber_elements(field);
        self.refresh_model_paths(field);

        if let Some(array_control) = array_control
            && let Some(control) = self.create_control(child)
        {
            self.controls.insert_child(array_control, index, control);
            if let Some(node) = self.fields.get_mut(child) {
                node.control = Some(control);
            }
        }
        self.build(child, false)?;
        tracing::debug!(%field, index, "Array element added");

        self.finish_array_change(field)
    }

    /// Removes the element at `index`. Later elements shift down and keep
    /// their nodes, controls and mounted instances. Emits one value change
    /// carrying the whole array.
    pub fn remove(&mut self, field: FieldId, index: usize) -> Result<()> {
        self.ensure_active()?;
        let path = self.array_path(field)?;
        let children = self.field(field)?.children.clone();
        if index >= children.len() {
            return Err(FormError::IndexOutOfBounds {
                index,
                len: children.len(),
            }
            .into());
        }

        self.teardown_field(children[index])?;
        if let Some(Value::Array(items)) = get_value_mut(&mut self.model, path.segments())
            && index < items.len()
        {
            items.remove(index);
        }
        self.renumber_elements(field);
        self.refresh_model_paths(field);
        tracing::debug!(%field, index, "Array element removed");

        self.finish_array_change(field)
    }

    /// Replaces the model with `model`, or with the model the form was
    /// created with, and rebuilds the tree.
    ///
    /// Array elements are recreated, so their identity is not preserved.
    /// Leaf controls take the new model values silently and become pristine.
    /// Pending debounced values are dropped.
    pub fn reset_model(&mut self, model: Option<Value>) -> Result<()> {
        self.ensure_active()?;
        self.model = match model {
            Some(Value::Null) => Value::Object(Default::default()),
            Some(model) => model,
            None => self.initial_model.clone(),
        };
        self.scheduler.clear();

        self.build(self.root, true)?;

        let leaves: Vec<_> = self
            .fields
            .pre_order(self.root)
            .into_iter()
            .filter_map(|id| {
                let node = self.fields.get(id)?;
                let control = node.control?;
                let path = node.value_path()?;
                (!node.is_composite()).then_some((id, control, path))
            })
            .collect();
        for (field, control, path) in leaves {
            let value = get_value(&self.model, path.segments())
                .cloned()
                .unwrap_or(Value::Null);
            self.controls.reset_value(control, value.clone());
            if let Some(subscription) = self
                .fields
                .get_mut(field)
                .and_then(|node| node.subscription.as_mut())
            {
                subscription.last_value = Some(value);
            }
        }
        self.controls.mark_pristine(self.root_control);
        self.update_tree_validity(self.root_control);
        self.rerender_mounted(self.root)?;
        tracing::debug!("Model reset");
        Ok(())
    }

    /// Absolute model path of an array field's value.
    fn array_path(&self, field: FieldId) -> Result<KeyPath> {
        let node = self.field(field)?;
        if !node.is_array() {
            return Err(FormError::NotAnArrayField { field }.into());
        }
        Ok(node
            .value_path()
            .unwrap_or_else(|| node.model_path.clone()))
    }

    fn finish_array_change(&mut self, field: FieldId) -> Result<()> {
        if let Some(control) = self.fields.get(field).and_then(|n| n.control) {
            self.controls.mark_dirty(control);
        }
        let value = self.field_value(field)?.cloned().unwrap_or(Value::Null);
        self.emit_value_change(field, value);
        self.settle();
        Ok(())
    }
}
