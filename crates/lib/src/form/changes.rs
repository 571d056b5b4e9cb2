//! Value propagation from controls to the model.
//!
//! Every leaf field with a key holds a subscription on its control. A new
//! control value passes through the subscription (distinct filter or
//! debounce, then parsers), is written into the model and announced on the
//! field-change channel. The form itself listens to its own channel: each
//! value change marks a model-change sample as pending, and the sample is
//! taken once the current synchronous call is done ([`Form::settle`]).

use serde_json::Value;

use super::{Form, FormError};
use crate::{
    Result,
    channel::FieldChange,
    control::ControlId,
    field::{FieldId, ValueSubscription},
    path::{get_value, remove_value, set_value},
    scheduler::TimerKey,
};

impl Form {
    /// Writes `value` into a control the way a UI edit would.
    ///
    /// Composite controls are patched child by child. Every affected field
    /// emits according to its model options.
    pub fn set_control_value(&mut self, control: ControlId, value: Value) -> Result<()> {
        self.ensure_active()?;
        self.control(control)?;

        let mut touched = Vec::new();
        self.controls.set_value(control, &value, &mut touched);
        self.controls.mark_dirty(control);
        for leaf in &touched {
            if let Some(c) = self.controls.get_mut(*leaf) {
                c.async_errors = None;
            }
        }
        self.update_tree_validity(control);

        for leaf in touched {
            self.control_value_changed(leaf);
        }
        self.settle();
        Ok(())
    }

    /// Writes `value` into the control bound to `field`.
    pub fn set_field_value(&mut self, field: FieldId, value: Value) -> Result<()> {
        let control = self
            .field(field)?
            .control
            .ok_or(FormError::NoControl { field })?;
        self.set_control_value(control, value)
    }

    /// Marks the control of `field` touched and returns whether it was already.
    pub fn mark_touched(&mut self, field: FieldId) -> Result<bool> {
        let control = self
            .field(field)?
            .control
            .ok_or(FormError::NoControl { field })?;
        let was = self.control(control)?.is_touched();
        self.controls.mark_touched(control);
        Ok(was)
    }

    /// Fires every timer that is due on the form's clock. Returns how many
    /// fired.
    pub fn run_pending_timers(&mut self) -> Result<usize> {
        self.ensure_active()?;
        let now = self.clock.now_millis();
        let mut fired = 0;
        while let Some(timer) = self.scheduler.pop_due(now) {
            fired += 1;
            tracing::debug!(key = ?timer.key, due = timer.due, now, "Timer fired");
            match timer.key {
                TimerKey::FieldDebounce(field) => {
                    if let Some(value) = timer.payload
                        && self.fields.contains(field)
                    {
                        self.deliver(field, value);
                    }
                }
                TimerKey::ModelChange => self.model_change_pending = true,
            }
            self.settle();
        }
        Ok(fired)
    }

    /// Fans a leaf control's new value out to every field registered on it,
    /// in registration order.
    pub(crate) fn control_value_changed(&mut self, control: ControlId) {
        let Some(fields) = self.controls.get(control).map(|c| c.fields.clone()) else {
            return;
        };
        let value = self.controls.value(control);
        for field in fields {
            self.field_value_changed(field, value.clone());
        }
    }

    fn field_value_changed(&mut self, field: FieldId, value: Value) {
        let now = self.clock.now_millis();
        let Some(subscription) = self
            .fields
            .get_mut(field)
            .and_then(|node| node.subscription.as_mut())
        else {
            return;
        };

        if let Some(ms) = subscription.debounce_ms {
            tracing::trace!(%field, ms, "Debouncing value");
            self.scheduler
                .schedule(TimerKey::FieldDebounce(field), now + ms, Some(value));
            return;
        }
        if subscription.last_value.as_ref() == Some(&value) {
            tracing::trace!(%field, "Value unchanged, not emitting");
            return;
        }
        subscription.last_value = Some(value.clone());
        self.deliver(field, value);
    }

    /// Installs or refreshes the subscription of a leaf field.
    ///
    /// A control value that disagrees with the model at this point is
    /// delivered right away.
    pub(crate) fn subscribe_field(&mut self, field: FieldId) {
        let Some(node) = self.fields.get_mut(field) else {
            return;
        };
        let debounce_ms = node.model_options.effective_debounce();
        node.subscription
            .get_or_insert_with(ValueSubscription::default)
            .debounce_ms = debounce_ms;
        if debounce_ms.is_some() {
            return;
        }

        let (Some(control), Some(path)) = (node.control, node.value_path()) else {
            return;
        };
        let control_value = self.controls.value(control);
        let model_value = get_value(&self.model, path.segments())
            .cloned()
            .unwrap_or(Value::Null);
        if control_value != model_value {
            tracing::debug!(%field, "Control and model disagree on subscribe");
            self.deliver(field, control_value);
        }
    }

    /// Parses `raw` and emits it as the field's new value.
    pub(crate) fn deliver(&mut self, field: FieldId, raw: Value) {
        let Some(node) = self.fields.get(field) else {
            return;
        };
        let value = node
            .parsers
            .iter()
            .fold(raw, |value, parser| parser.parse(value));
        self.emit_value_change(field, value);
    }

    /// Writes `value` into the model at the field's path, announces it and
    /// schedules a model-change sample.
    pub(crate) fn emit_value_change(&mut self, field: FieldId, value: Value) {
        self.write_model(field, &value);
        tracing::trace!(%field, %value, "Value change");
        self.field_changes
            .emit(&FieldChange::value_changes(field, value));
        self.request_model_change();
    }

    /// A `null` on an auto-clearing field whose control is detached deletes
    /// the key instead of storing `null`.
    fn write_model(&mut self, field: FieldId, value: &Value) {
        let Some(node) = self.fields.get(field) else {
            return;
        };
        let Some(path) = node.value_path() else {
            return;
        };
        let detached = node
            .control
            .and_then(|c| self.controls.get(c))
            .is_none_or(|c| c.parent.is_none());

        if value.is_null() && node.auto_clear && detached {
            tracing::trace!(%field, %path, "Clearing model key");
            remove_value(&mut self.model, path.segments());
        } else {
            set_value(&mut self.model, path.segments(), value.clone());
        }
    }

    fn request_model_change(&mut self) {
        if self.in_model_change {
            let due = self.clock.now_millis() + self.config.extras.model_change_debounce_ms;
            self.scheduler.schedule(TimerKey::ModelChange, due, None);
        } else {
            self.model_change_pending = true;
        }
    }

    /// Ends a synchronous cycle: if any value changed, re-checks expressions,
    /// refreshes the UI and emits a copy of the model.
    pub(crate) fn settle(&mut self) {
        if !self.model_change_pending || self.in_model_change || self.destroyed {
            return;
        }
        self.model_change_pending = false;

        self.in_model_change = true;
        self.check_subtree(self.root, true);
        self.refresh_ui();
        let snapshot = self.model.clone();
        self.model_changes.emit(&snapshot);
        self.in_model_change = false;
        tracing::trace!("Model change emitted");
    }
}
