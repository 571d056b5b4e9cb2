//! Field tree construction.
//!
//! Building walks a subtree depth-first and runs three phases per node:
//!
//! 1. **pre-populate**: merge the type's registered defaults, compute the
//!    node's model path, evaluate its expressions once (silently, so `hide`
//!    is known before its control is attached).
//! 2. **populate**: apply `defaultValue`, bring array elements in line with
//!    the model, find or create the node's control and register the node on
//!    it, subscribe leaf fields to value changes.
//! 3. **post-populate**: once the whole subtree is populated, install the
//!    aggregate validators and recompute validity in a single pass.
//!
//! [`FieldExtension`]s see each node in every phase. Building an already
//! built subtree again keeps every control whose path did not change.

use std::rc::Rc;

use serde_json::Value;

use crate::{
    Result,
    config::FieldDefaults,
    control::{Control, ControlId, ControlKind},
    field::{FieldConfig, FieldId, FieldNode, LifecycleHook},
    form::Form,
    path::{KeyPath, get_value, set_value},
    render::render_type,
    scheduler::TimerKey,
};

/// Hook into the build pipeline.
///
/// All methods default to doing nothing.
pub trait FieldExtension {
    fn pre_populate(&self, _field: &mut FieldNode) {}

    fn on_populate(&self, _field: &mut FieldNode) {}

    /// Called after the node's children are built.
    fn post_populate(&self, _field: &mut FieldNode) {}
}

/// State threaded through one build.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildContext {
    /// Where this build started. Validator aggregation runs only there.
    pub(crate) root: FieldId,
    /// Discard and recreate array elements instead of reconciling them.
    pub(crate) reset: bool,
    pub(crate) needs_validity_update: bool,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Pre,
    Populate,
    Post,
}

fn apply_defaults(node: &mut FieldNode, defaults: FieldDefaults) {
    if node.default_value.is_none() {
        node.default_value = defaults.default_value;
    }
    if node.wrappers.is_none() {
        node.wrappers = defaults.wrappers;
    }
    if node.class_name.is_none() {
        node.class_name = defaults.class_name;
    }
    if node.hide_expression.is_none() {
        node.hide_expression = defaults.hide_expression;
    }
    for (target, expression) in defaults.expression_properties {
        node.expression_properties.entry(target).or_insert(expression);
    }
    node.template_options.merge_defaults(&defaults.template_options);
    node.model_options.merge_defaults(&defaults.model_options);
}

impl Form {
    /// Creates the node for `config` and, recursively, its `fieldGroup`.
    ///
    /// On a malformed key nothing of the subtree is left behind.
    pub(crate) fn instantiate(
        &mut self,
        mut config: FieldConfig,
        parent: Option<FieldId>,
    ) -> Result<FieldId> {
        let group = config.field_group.take();
        let mut node = FieldNode::from_config(self.fields.next_id(), config, parent)?;
        node.has_group = group.is_some();
        let id = self.fields.insert(node);

        for child in group.into_iter().flatten() {
            match self.instantiate(child, Some(id)) {
                Ok(child) => {
                    if let Some(node) = self.fields.get_mut(id) {
                        node.children.push(child);
                    }
                }
                Err(err) => {
                    for discarded in self.fields.pre_order(id) {
                        self.fields.remove(discarded);
                    }
                    return Err(err);
                }
            }
        }
        Ok(id)
    }

    /// Builds the subtree rooted at `field`.
    pub(crate) fn build(&mut self, field: FieldId, reset: bool) -> Result<()> {
        tracing::debug!(%field, reset, "Building field tree");
        for id in self.fields.pre_order(field) {
            if let Some(node) = self.fields.get_mut(id) {
                node.dispose_component_refs();
            }
        }

        let mut ctx = BuildContext {
            root: field,
            reset,
            needs_validity_update: false,
        };
        self.build_node(field, &mut ctx)?;
        Ok(())
    }

    fn build_node(&mut self, field: FieldId, ctx: &mut BuildContext) -> Result<()> {
        self.pre_populate(field);
        self.populate(field, ctx)?;

        let children = self
            .fields
            .get(field)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for child in children {
            self.build_node(child, ctx)?;
        }

        self.post_populate(field, ctx);
        Ok(())
    }

    fn run_extensions(&mut self, field: FieldId, phase: Phase) {
        if self.extensions.is_empty() {
            return;
        }
        let extensions = Rc::clone(&self.extensions);
        let Some(node) = self.fields.get_mut(field) else {
            return;
        };
        for extension in extensions.iter() {
            match phase {
                Phase::Pre => extension.pre_populate(node),
                Phase::Populate => extension.on_populate(node),
                Phase::Post => extension.post_populate(node),
            }
        }
    }

    /// Model path of the container `field` lives in, derived from its parent.
    fn container_path(&self, field: FieldId) -> Option<KeyPath> {
        let parent = self.fields.get(field)?.parent?;
        let parent = self.fields.get(parent)?;
        Some(
            parent
                .value_path()
                .unwrap_or_else(|| parent.model_path.clone()),
        )
    }

    /// Recomputes the model paths below `field` after its children moved.
    pub(crate) fn refresh_model_paths(&mut self, field: FieldId) {
        for id in self.fields.pre_order(field).into_iter().skip(1) {
            let path = self.container_path(id).unwrap_or_default();
            if let Some(node) = self.fields.get_mut(id) {
                node.model_path = path;
            }
        }
    }

    fn pre_populate(&mut self, field: FieldId) {
        let parent_path = self.container_path(field);

        let Some(node) = self.fields.get_mut(field) else {
            return;
        };
        if !node.defaults_applied {
            node.defaults_applied = true;
            if let Some(type_name) = render_type(node).map(str::to_string) {
                apply_defaults(node, self.config.resolve_defaults(&type_name));
            }
        }
        node.model_path = parent_path.unwrap_or_default();

        self.check_node(field, false);
        self.run_extensions(field, Phase::Pre);
    }

    fn populate(&mut self, field: FieldId, ctx: &mut BuildContext) -> Result<()> {
        self.apply_default_value(field);

        let Some(node) = self.fields.get(field) else {
            return Ok(());
        };
        let keyed = node.key.is_some();
        let is_array = node.is_array();
        let is_leaf = !node.is_composite();
        let inherited = match (keyed, node.has_group, node.parent) {
            (false, true, Some(parent)) => self.fields.get(parent).and_then(|p| p.control),
            _ => None,
        };

        if is_array {
            ctx.needs_validity_update |= self.sync_array_children(field, ctx.reset)?;
        }
        if keyed {
            let control = match self.find_existing_control(field) {
                Some(control) => Some(control),
                None => {
                    ctx.needs_validity_update = true;
                    self.create_control(field)
                }
            };
            if let Some(control) = control {
                ctx.needs_validity_update |= self.register_control(field, control);
            }
            if is_leaf {
                self.subscribe_field(field);
            }
        } else if let Some(control) = inherited
            && let Some(node) = self.fields.get_mut(field)
        {
            node.control = Some(control);
        }

        self.run_extensions(field, Phase::Populate);
        Ok(())
    }

    fn post_populate(&mut self, field: FieldId, ctx: &mut BuildContext) {
        self.run_extensions(field, Phase::Post);
        if field != ctx.root {
            return;
        }

        ctx.needs_validity_update |= self.set_validators(field);
        if ctx.needs_validity_update
            && let Some(control) = self.fields.get(field).and_then(|n| n.control)
        {
            self.update_tree_validity(control);
        }
    }

    fn apply_default_value(&mut self, field: FieldId) {
        let Some(node) = self.fields.get(field) else {
            return;
        };
        let (Some(path), Some(default)) = (node.value_path(), node.default_value.as_ref()) else {
            return;
        };
        if get_value(&self.model, path.segments()).is_none() {
            tracing::trace!(%field, %path, "Applying default value");
            set_value(&mut self.model, path.segments(), default.clone());
        }
    }

    /// Makes the element nodes of an array field match the model array.
    /// Returns whether elements were added or removed.
    fn sync_array_children(&mut self, field: FieldId, reset: bool) -> Result<bool> {
        let len = match self.field_value(field)? {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };
        let Some(node) = self.fields.get(field) else {
            return Ok(false);
        };
        let Some(template) = node.array_template.clone() else {
            return Ok(false);
        };
        let children = node.children.clone();

        let keep = if reset { 0 } else { len.min(children.len()) };
        for child in children[keep..].iter().rev() {
            self.teardown_field(*child)?;
        }
        for index in keep..len {
            let element = (*template).clone().with_key(index.to_string());
            let child = self.instantiate(element, Some(field))?;
            if let Some(node) = self.fields.get_mut(field) {
                node.children.push(child);
            }
        }
        let changed = keep != children.len() || keep != len;
        if changed {
            tracing::debug!(%field, from = children.len(), to = len, reset, "Array elements synced");
        }
        self.renumber_elements(field);
        Ok(changed)
    }

    /// Gives every element of an array field its index as key.
    pub(crate) fn renumber_elements(&mut self, field: FieldId) {
        let children = self
            .fields
            .get(field)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        for (index, child) in children.into_iter().enumerate() {
            if let Some(node) = self.fields.get_mut(child) {
                node.raw_key = Some(index.to_string());
                node.key = Some(KeyPath::from_segments([index.to_string()]));
            }
        }
    }

    /// The field's own live control, or the control found at the field's key
    /// on its parent's control when it has the right shape.
    fn find_existing_control(&self, field: FieldId) -> Option<ControlId> {
        let node = self.fields.get(field)?;
        if let Some(control) = node.control
            && self.controls.contains(control)
        {
            return Some(control);
        }

        let key = node.key.as_ref()?;
        let parent_control = self.fields.get(node.parent?)?.control?;
        let found = self.controls.find(parent_control, key.segments())?;
        let compatible = match self.controls.get(found)?.kind {
            ControlKind::Value(_) => !node.is_composite(),
            ControlKind::Group(_) => node.has_group && !node.is_array(),
            ControlKind::Array(_) => node.is_array(),
        };
        compatible.then_some(found)
    }

    pub(crate) fn create_control(&mut self, field: FieldId) -> Option<ControlId> {
        let node = self.fields.get(field)?;
        let kind = if node.is_array() {
            ControlKind::Array(Vec::new())
        } else if node.has_group {
            ControlKind::Group(Vec::new())
        } else {
            let value = node
                .value_path()
                .and_then(|path| get_value(&self.model, path.segments()).cloned())
                .unwrap_or(Value::Null);
            ControlKind::Value(value)
        };
        let update_on = node.model_options.update_on.unwrap_or_default();
        let control = self.controls.create(kind, update_on);
        tracing::debug!(%field, %control, "Created control");
        Some(control)
    }

    /// Binds `field` to `control` and attaches the control to its parent
    /// unless every field sharing it is hidden. Returns whether the control
    /// value had to be patched from the model.
    fn register_control(&mut self, field: FieldId, control: ControlId) -> bool {
        if let Some(node) = self.fields.get_mut(field) {
            node.control = Some(control);
        }
        let Some(c) = self.controls.get_mut(control) else {
            return false;
        };
        if !c.fields.contains(&field) {
            c.fields.push(field);
        }

        let patched = self.sync_control_value(field, control);

        let all_hidden = self.controls.get(control).is_some_and(|c| {
            c.fields
                .iter()
                .all(|f| self.fields.get(*f).is_none_or(|n| n.hide))
        });
        if !all_hidden {
            self.attach_control(field);
        }
        patched
    }

    /// Aligns a leaf control with the model value of `field` without
    /// reporting a change.
    fn sync_control_value(&mut self, field: FieldId, control: ControlId) -> bool {
        let Some(path) = self.fields.get(field).and_then(FieldNode::value_path) else {
            return false;
        };
        let target = get_value(&self.model, path.segments())
            .cloned()
            .unwrap_or(Value::Null);
        let Some(Control {
            kind: ControlKind::Value(current),
            fields,
            ..
        }) = self.controls.get_mut(control)
        else {
            return false;
        };
        if *current == target {
            return false;
        }
        tracing::trace!(%field, %control, "Patching control from model");
        *current = target.clone();
        for shared in fields.clone() {
            if let Some(subscription) = self
                .fields
                .get_mut(shared)
                .and_then(|node| node.subscription.as_mut())
            {
                subscription.last_value = Some(target.clone());
            }
        }
        true
    }

    /// Places the control of `field` under its parent field's control at the
    /// field's key, creating intermediate groups for multi-segment keys.
    pub(crate) fn attach_control(&mut self, field: FieldId) {
        let Some(node) = self.fields.get(field) else {
            return;
        };
        let (Some(key), Some(control), Some(parent)) = (node.key.clone(), node.control, node.parent)
        else {
            return;
        };
        let Some(parent_control) = self.fields.get(parent).and_then(|p| p.control) else {
            return;
        };
        let Some((last, intermediate)) = key.segments().split_last() else {
            return;
        };

        let mut current = parent_control;
        for segment in intermediate {
            current = match self.controls.child(current, segment) {
                Some(existing) => existing,
                None => {
                    let group = self
                        .controls
                        .create(ControlKind::Group(Vec::new()), Default::default());
                    self.controls.set_child(current, segment, group);
                    group
                }
            };
        }
        if current == control || self.controls.child(current, last) == Some(control) {
            return;
        }
        self.controls.detach(control);
        self.controls.set_child(current, last, control);
    }

    /// Removes `field` from its control. A control no field references any
    /// more is detached and disposed.
    pub(crate) fn unregister_control(&mut self, field: FieldId) {
        let Some(node) = self.fields.get_mut(field) else {
            return;
        };
        let keyed = node.key.is_some();
        let Some(control) = node.control.take() else {
            return;
        };
        if !keyed {
            return;
        }

        let Some(c) = self.controls.get_mut(control) else {
            return;
        };
        c.fields.retain(|f| *f != field);
        if c.fields.is_empty() {
            let parent = c.parent;
            tracing::debug!(%field, %control, "Disposing control");
            self.controls.dispose(control);
            if let Some(parent) = parent {
                self.update_validity(parent);
            }
        }
    }

    /// Removes `field` and its descendants from the tree, releasing their
    /// controls, timers, subscriptions and mounted instances.
    pub(crate) fn teardown_field(&mut self, field: FieldId) -> Result<()> {
        let ids = self.fields.post_order(field);
        for id in &ids {
            let mounted = self.fields.get(*id).is_some_and(|n| n.host.is_some());
            if mounted {
                self.trigger_hook(*id, LifecycleHook::OnDestroy, None)?;
            }
            self.unregister_control(*id);
            self.scheduler.cancel(TimerKey::FieldDebounce(*id));
            if let Some(node) = self.fields.get_mut(*id) {
                node.dispose_component_refs();
                node.subscription = None;
            }
        }

        if let Some(parent) = self.fields.get(field).and_then(|n| n.parent)
            && let Some(parent) = self.fields.get_mut(parent)
        {
            parent.children.retain(|child| *child != field);
        }
        for id in ids {
            self.fields.remove(id);
        }
        tracing::trace!(%field, "Field torn down");
        Ok(())
    }

    /// Renders every mounted field of the subtree again.
    pub(crate) fn rerender_mounted(&mut self, field: FieldId) -> Result<()> {
        for id in self.fields.pre_order(field) {
            if self.fields.get(id).is_some_and(|n| n.host.is_some()) {
                self.render_field(id)?;
            }
        }
        Ok(())
    }
}
