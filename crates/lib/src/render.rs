//! Bridge to the UI mounting layer.
//!
//! The engine never renders anything itself. A [`MountAdapter`] supplied by the
//! host realizes a field visually: wrappers first, each providing an inner
//! container, then the field type's component inside the innermost container.
//! Everything mounted for a field is recorded on the field and disposed when
//! the field is re-rendered, rebuilt, removed or destroyed.

use crate::{
    Result,
    config::CheckExpressionOn,
    constants::{ARRAY_TYPE, GROUP_TYPE},
    field::{FieldId, FieldNode, LifecycleHook},
    form::{Form, FormError},
};

/// Opaque handle to a place where the adapter can mount components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Container(pub String);

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// A mounted UI instance.
pub trait Mounted {
    /// Releases the instance. Called exactly once.
    fn dispose(&mut self);
}

/// Result of mounting a wrapper.
pub struct MountedWrapper {
    pub instance: Box<dyn Mounted>,
    /// Where the wrapped content goes. `None` while the wrapper is not ready
    /// to host content yet; rendering stops there until the next render.
    pub inner: Option<Container>,
}

/// UI mounting adapter implemented by the host.
pub trait MountAdapter {
    /// Mounts the component registered for `type_tag`. Returns `None` when the
    /// type is unknown.
    fn mount(&mut self, container: &Container, type_tag: &str, field: &FieldNode)
    -> Option<Box<dyn Mounted>>;

    /// Mounts a wrapper component.
    fn mount_wrapper(
        &mut self,
        container: &Container,
        wrapper_tag: &str,
        field: &FieldNode,
    ) -> Option<MountedWrapper>;

    /// Runs one change-detection pass over the mounted UI.
    fn detect_changes(&mut self) {}
}

/// Structural change information delivered with `onChanges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldChanges {
    /// The field reference changed.
    pub field: bool,
    pub first_change: bool,
}

impl FieldChanges {
    pub fn first() -> Self {
        Self {
            field: true,
            first_change: true,
        }
    }
}

/// Render type of a field: its declared type, or the implicit group/array
/// type for composites.
pub fn render_type(field: &FieldNode) -> Option<&str> {
    field.field_type().or_else(|| {
        if field.is_array() {
            Some(ARRAY_TYPE)
        } else if field.has_group {
            Some(GROUP_TYPE)
        } else {
            None
        }
    })
}

impl Form {
    /// Renders `field` into its host container.
    ///
    /// Previously mounted instances are disposed first, so repeated renders
    /// never accumulate instances.
    pub fn render_field(&mut self, field: FieldId) -> Result<()> {
        let node = self
            .fields
            .get_mut(field)
            .ok_or(FormError::FieldNotFound { field })?;
        node.dispose_component_refs();

        let Some(container) = node.host.clone() else {
            return Ok(());
        };
        let Some(adapter) = self.adapter.as_mut() else {
            return Ok(());
        };
        let Some(type_tag) = render_type(node).map(str::to_string) else {
            return Ok(());
        };

        let mut mounted = Vec::new();
        let mut current = container;
        let mut ready = true;
        for wrapper in node.wrappers().to_vec() {
            let Some(MountedWrapper { instance, inner }) =
                adapter.mount_wrapper(&current, &wrapper, node)
            else {
                tracing::debug!(%field, wrapper = %wrapper, "Wrapper not mounted");
                continue;
            };
            mounted.push(instance);
            match inner {
                Some(inner) => current = inner,
                None => {
                    ready = false;
                    break;
                }
            }
        }
        if ready && let Some(instance) = adapter.mount(&current, &type_tag, node) {
            mounted.push(instance);
        }

        node.component_refs.extend(mounted);
        Ok(())
    }

    /// Attaches `field` to a host container and delivers the initial
    /// `onChanges` and `onInit` notifications.
    pub fn mount_field(&mut self, field: FieldId, container: Container) -> Result<()> {
        let node = self
            .fields
            .get_mut(field)
            .ok_or(FormError::FieldNotFound { field })?;
        node.host = Some(container);
        self.trigger_hook(field, LifecycleHook::OnChanges, Some(FieldChanges::first()))?;
        self.trigger_hook(field, LifecycleHook::OnInit, None)
    }

    /// Forwards a lifecycle notification to the field's hook.
    ///
    /// `onChanges` reaches the hook only when the field reference changed, and
    /// then re-renders the field. `onDestroy` disposes mounted instances.
    pub fn trigger_hook(
        &mut self,
        field: FieldId,
        hook: LifecycleHook,
        changes: Option<FieldChanges>,
    ) -> Result<()> {
        let node = self
            .fields
            .get_mut(field)
            .ok_or(FormError::FieldNotFound { field })?;

        let structural = changes.is_none_or(|c| c.field);
        if structural && let Some(callback) = node.hooks.get(hook).cloned() {
            callback.call(node);
        }

        match hook {
            LifecycleHook::OnChanges if structural => self.render_field(field)?,
            LifecycleHook::OnDestroy => {
                if let Some(node) = self.fields.get_mut(field) {
                    node.dispose_component_refs();
                    node.host = None;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Runs one change-detection tick.
    ///
    /// Re-checks expressions when configured to do so on every tick, lets the
    /// adapter refresh the UI, then notifies mounted fields.
    pub fn detect_changes(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.config.extras.check_expression_on == CheckExpressionOn::ChangeDetectionCheck {
            self.check_field(self.root)?;
        }
        self.refresh_ui();

        let mounted: Vec<FieldId> = self
            .fields
            .iter()
            .filter(|node| node.host.is_some())
            .map(FieldNode::id)
            .collect();
        for hook in [
            LifecycleHook::DoCheck,
            LifecycleHook::AfterContentChecked,
            LifecycleHook::AfterViewChecked,
        ] {
            for field in &mounted {
                if self.fields.contains(*field) {
                    self.trigger_hook(*field, hook, None)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn refresh_ui(&mut self) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.detect_changes();
        }
    }
}
