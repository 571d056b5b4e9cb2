//! Control validity and visibility.
//!
//! A control's sync validator is either a custom one or the aggregate of the
//! fields registered on it. The aggregate is resolved at evaluation time: a
//! control with a single field uses that field's validators, a control shared
//! by several fields uses only the visible ones. Hiding every field of a
//! control detaches it from its parent, so it no longer contributes to the
//! parent's value or validity.

use serde_json::Value;

use super::{Form, FormError};
use crate::{
    Result,
    control::{
        AsyncValidatorSlot, ControlId, ControlStatus, ValidationErrors, Validator,
        ValidatorSlot,
        validators::{ValidationFuture, compose, compose_async},
    },
    field::{FieldId, FieldNode},
};

impl Form {
    /// Replaces the aggregate validator of `control` with `validator`, or
    /// restores the aggregate when `None`.
    pub fn set_control_validator(
        &mut self,
        control: ControlId,
        validator: Option<Validator>,
    ) -> Result<()> {
        self.ensure_active()?;
        let c = self
            .controls
            .get_mut(control)
            .ok_or(FormError::ControlNotFound { control })?;
        c.validator = Some(match validator {
            Some(validator) => ValidatorSlot::Custom(validator),
            None => ValidatorSlot::Aggregate,
        });
        self.update_validity(control);
        Ok(())
    }

    /// Starts async validation for the control of `field`.
    ///
    /// The control turns pending until [`apply_async_errors`](Self::apply_async_errors)
    /// delivers the result of the returned future.
    pub fn validate_async(&mut self, field: FieldId) -> Result<ValidationFuture> {
        self.ensure_active()?;
        let control = self
            .field(field)?
            .control
            .ok_or(FormError::NoControl { field })?;
        let value = self.controls.value(control);
        let validator = match self.control(control)?.async_validator.clone() {
            Some(AsyncValidatorSlot::Custom(validator)) => Some(validator),
            Some(AsyncValidatorSlot::Aggregate) | None => {
                let validators: Vec<_> = self
                    .validating_fields(control)
                    .into_iter()
                    .flat_map(|node| node.async_validators.iter().cloned())
                    .collect();
                compose_async(&validators)
            }
        };

        if let Some(c) = self.controls.get_mut(control) {
            c.async_pending = true;
        }
        self.update_validity(control);
        tracing::debug!(%field, %control, "Async validation started");

        let future: ValidationFuture = match validator {
            Some(validator) => validator.validate(value),
            None => Box::pin(async { None }),
        };
        Ok(future)
    }

    /// Stores the outcome of an async validation run and recomputes the
    /// validity of the control and its ancestors.
    pub fn apply_async_errors(
        &mut self,
        control: ControlId,
        errors: Option<ValidationErrors>,
    ) -> Result<()> {
        self.ensure_active()?;
        let c = self
            .controls
            .get_mut(control)
            .ok_or(FormError::ControlNotFound { control })?;
        c.async_pending = false;
        c.async_errors = errors;
        self.update_validity(control);
        Ok(())
    }

    /// Installs the aggregate validator slots and applies declared disabled
    /// states for the subtree of `field`. Run once per build, at its root.
    /// Returns whether validity needs to be recomputed.
    pub(crate) fn set_validators(&mut self, field: FieldId) -> bool {
        let mut updated = false;
        for id in self.fields.pre_order(field) {
            let Some(node) = self.fields.get(id) else {
                continue;
            };
            let (Some(control), true) = (node.control, node.key.is_some()) else {
                continue;
            };
            let disabled = node.template_options.disabled;
            let Some(c) = self.controls.get_mut(control) else {
                continue;
            };
            if c.validator.is_none() || c.async_validator.is_none() {
                c.validator.get_or_insert(ValidatorSlot::Aggregate);
                c.async_validator.get_or_insert(AsyncValidatorSlot::Aggregate);
                updated = true;
            }
            if disabled && c.is_enabled() {
                self.controls.set_enabled(control, false);
                updated = true;
            }
        }
        updated
    }

    /// Fields whose validators apply to `control`.
    fn validating_fields(&self, control: ControlId) -> Vec<&FieldNode> {
        let Some(c) = self.controls.get(control) else {
            return Vec::new();
        };
        let fields: Vec<&FieldNode> = c.fields.iter().filter_map(|f| self.fields.get(*f)).collect();
        if fields.len() == 1 {
            fields
        } else {
            fields.into_iter().filter(|node| !node.hide).collect()
        }
    }

    fn run_sync_validator(&self, control: ControlId, value: &Value) -> Option<ValidationErrors> {
        match &self.controls.get(control)?.validator {
            None => None,
            Some(ValidatorSlot::Custom(validator)) => validator.validate(value),
            Some(ValidatorSlot::Aggregate) => {
                let validators: Vec<Validator> = self
                    .validating_fields(control)
                    .into_iter()
                    .flat_map(|node| node.validators.iter().cloned())
                    .collect();
                compose(&validators)?.validate(value)
            }
        }
    }

    /// Recomputes errors and status of one control from its own validators
    /// and its attached children.
    fn compute_validity(&mut self, control: ControlId) {
        let Some(c) = self.controls.get(control) else {
            return;
        };
        if c.disabled {
            if let Some(c) = self.controls.get_mut(control) {
                c.errors = None;
                c.status = ControlStatus::Disabled;
            }
            return;
        }

        let child_statuses: Vec<ControlStatus> = c
            .children()
            .into_iter()
            .filter_map(|child| self.controls.get(child))
            .filter(|child| child.is_enabled())
            .map(|child| child.status)
            .collect();
        let own_pending = c.async_pending;
        let async_errors = c.async_errors.clone();

        let value = self.controls.value(control);
        let errors = self.run_sync_validator(control, &value).or(async_errors);

        let status = if errors.is_some() {
            ControlStatus::Invalid
        } else if own_pending || child_statuses.contains(&ControlStatus::Pending) {
            ControlStatus::Pending
        } else if child_statuses.contains(&ControlStatus::Invalid) {
            ControlStatus::Invalid
        } else {
            ControlStatus::Valid
        };

        if let Some(c) = self.controls.get_mut(control) {
            c.errors = errors;
            c.status = status;
        }
    }

    /// Recomputes `control` and then each of its ancestors.
    pub(crate) fn update_validity(&mut self, control: ControlId) {
        self.compute_validity(control);
        for ancestor in self.controls.ancestors(control) {
            self.compute_validity(ancestor);
        }
    }

    /// Recomputes the whole subtree of `control`, children first, then its
    /// ancestors.
    pub(crate) fn update_tree_validity(&mut self, control: ControlId) {
        for id in self.controls.post_order(control) {
            self.compute_validity(id);
        }
        for ancestor in self.controls.ancestors(control) {
            self.compute_validity(ancestor);
        }
    }

    /// Re-attaches or detaches the control of `field` after its visibility
    /// changed.
    pub(crate) fn on_visibility_changed(&mut self, field: FieldId) {
        let Some(node) = self.fields.get(field) else {
            return;
        };
        let (Some(control), true) = (node.control, node.key.is_some()) else {
            return;
        };
        let Some(c) = self.controls.get(control) else {
            return;
        };

        let all_hidden = c
            .fields
            .iter()
            .all(|f| self.fields.get(*f).is_none_or(|n| n.hide));
        let parent = c.parent;
        match (all_hidden, parent) {
            (true, Some(parent)) => {
                tracing::debug!(%field, %control, "All fields hidden, detaching control");
                self.controls.detach(control);
                self.update_validity(parent);
            }
            (false, None) => {
                tracing::debug!(%field, %control, "Field visible, attaching control");
                self.attach_control(field);
            }
            _ => {}
        }
        self.update_validity(control);
    }

    /// Applies an expression-driven `templateOptions.disabled` to the
    /// control of `field`.
    pub(crate) fn on_disabled_changed(&mut self, field: FieldId, disabled: bool) {
        let Some(node) = self.fields.get(field) else {
            return;
        };
        let (Some(control), true) = (node.control, node.key.is_some()) else {
            return;
        };
        let Some(c) = self.controls.get(control) else {
            return;
        };
        if c.disabled != disabled {
            self.controls.set_enabled(control, !disabled);
            self.update_tree_validity(control);
        }
    }
}
