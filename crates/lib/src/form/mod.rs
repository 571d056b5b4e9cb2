//! The form instance.
//!
//! A [`Form`] owns everything one rendered form needs: the built field tree,
//! the control registry, the model, the change channels and the timer queue.
//! All operations run synchronously on the caller's thread. A change made
//! through the public API is fully propagated (model write, field-change
//! emission, expression check, UI refresh, model-change emission) before the
//! call returns, except for debounced work, which waits in the scheduler until
//! [`Form::run_pending_timers`] fires it.
//!
//! ```
//! use formsync::{FieldConfig, Form, FormOptions};
//! use serde_json::json;
//!
//! let mut form = Form::new(
//!     vec![FieldConfig::input("name", "input")],
//!     json!({}),
//!     FormOptions::default(),
//! )?;
//! let mut changes = form.subscribe();
//!
//! let name = form.get_control("name").unwrap();
//! form.set_control_value(name, json!("Ada"))?;
//!
//! assert_eq!(form.model(), &json!({ "name": "Ada" }));
//! assert_eq!(changes.try_recv().unwrap().value, json!("Ada"));
//! # Ok::<(), formsync::Error>(())
//! ```

use std::{fmt, rc::Rc};

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    Clock, Result, SystemClock,
    builder::FieldExtension,
    channel::{Channel, FieldChange},
    config::FormConfig,
    control::{Control, ControlId, ControlKind, ControlRegistry, UpdateOn},
    expression::{ExpressionEvaluator, NoopEvaluator},
    field::{FieldConfig, FieldId, FieldNode, FieldTree, LifecycleHook},
    path::{KeyPath, get_value},
    render::MountAdapter,
    scheduler::Scheduler,
};

mod changes;
mod errors;
mod validation;

pub use errors::FormError;

/// Collaborators and settings for a [`Form`].
pub struct FormOptions {
    /// Arbitrary state exposed to expressions as `formState`.
    pub form_state: Value,
    pub config: FormConfig,
    pub evaluator: Box<dyn ExpressionEvaluator>,
    pub clock: Rc<dyn Clock>,
    pub adapter: Option<Box<dyn MountAdapter>>,
    pub extensions: Vec<Box<dyn FieldExtension>>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            form_state: Value::Object(Map::new()),
            config: FormConfig::default(),
            evaluator: Box::new(NoopEvaluator),
            clock: Rc::new(SystemClock),
            adapter: None,
            extensions: Vec::new(),
        }
    }
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form_state(mut self, form_state: Value) -> Self {
        self.form_state = form_state;
        self
    }

    pub fn with_config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_adapter(mut self, adapter: impl MountAdapter + 'static) -> Self {
        self.adapter = Some(Box::new(adapter));
        self
    }

    pub fn with_extension(mut self, extension: impl FieldExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }
}

impl fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormOptions")
            .field("form_state", &self.form_state)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("adapter", &self.adapter.is_some())
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

/// A built form bound to its model.
pub struct Form {
    pub(crate) fields: FieldTree,
    pub(crate) controls: ControlRegistry,
    pub(crate) model: Value,
    pub(crate) initial_model: Value,
    pub(crate) form_state: Value,
    pub(crate) config: FormConfig,
    pub(crate) evaluator: Box<dyn ExpressionEvaluator>,
    pub(crate) adapter: Option<Box<dyn MountAdapter>>,
    pub(crate) clock: Rc<dyn Clock>,
    pub(crate) extensions: Rc<Vec<Box<dyn FieldExtension>>>,
    pub(crate) scheduler: Scheduler,
    pub(crate) field_changes: Channel<FieldChange>,
    pub(crate) model_changes: Channel<Value>,
    pub(crate) root: FieldId,
    pub(crate) root_control: ControlId,
    /// Set while a model-change emission runs.
    pub(crate) in_model_change: bool,
    pub(crate) model_change_pending: bool,
    pub(crate) destroyed: bool,
}

impl Form {
    /// Builds a form for `fields` over `model`.
    ///
    /// The fields become the children of an implicit root group. A `null`
    /// model starts out as an empty object. Fails when a key is malformed.
    pub fn new(fields: Vec<FieldConfig>, model: Value, options: FormOptions) -> Result<Self> {
        let FormOptions {
            form_state,
            config,
            evaluator,
            clock,
            adapter,
            extensions,
        } = options;
        let model = if model.is_null() {
            Value::Object(Map::new())
        } else {
            model
        };

        let tree = FieldTree::new();
        let root = tree.next_id();
        let mut controls = ControlRegistry::new();
        let root_control = controls.create(ControlKind::Group(Vec::new()), UpdateOn::default());

        let mut form = Form {
            fields: tree,
            controls,
            initial_model: model.clone(),
            model,
            form_state,
            config,
            evaluator,
            adapter,
            clock,
            extensions: Rc::new(extensions),
            scheduler: Scheduler::default(),
            field_changes: Channel::new(),
            model_changes: Channel::new(),
            root,
            root_control,
            in_model_change: false,
            model_change_pending: false,
            destroyed: false,
        };

        form.instantiate(FieldConfig::new().with_group(fields), None)?;
        form.register_root();
        form.build(root, false)?;
        form.settle();
        tracing::debug!(fields = form.fields.len(), controls = form.controls.len(), "Form built");
        Ok(form)
    }

    fn register_root(&mut self) {
        if let Some(node) = self.fields.get_mut(self.root) {
            node.control = Some(self.root_control);
        }
        if let Some(control) = self.controls.get_mut(self.root_control) {
            control.fields.push(self.root);
        }
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.destroyed {
            return Err(FormError::Destroyed.into());
        }
        Ok(())
    }

    /// The implicit root group holding the top-level fields.
    pub fn root(&self) -> FieldId {
        self.root
    }

    /// The control of the root group.
    pub fn root_control(&self) -> ControlId {
        self.root_control
    }

    pub fn field(&self, field: FieldId) -> Result<&FieldNode> {
        Ok(self
            .fields
            .get(field)
            .ok_or(FormError::FieldNotFound { field })?)
    }

    pub fn field_mut(&mut self, field: FieldId) -> Result<&mut FieldNode> {
        Ok(self
            .fields
            .get_mut(field)
            .ok_or(FormError::FieldNotFound { field })?)
    }

    pub fn fields(&self) -> &FieldTree {
        &self.fields
    }

    /// Finds a field by its declared `id`.
    pub fn find_field(&self, config_id: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .find(|node| node.config_id() == Some(config_id))
            .map(FieldNode::id)
    }

    /// Finds the first field, in tree order, whose own value lives at `path`.
    pub fn find_field_by_path(&self, path: &str) -> Option<FieldId> {
        let path = KeyPath::parse(path).ok()?;
        self.fields
            .pre_order(self.root)
            .into_iter()
            .find(|id| {
                self.fields
                    .get(*id)
                    .and_then(FieldNode::value_path)
                    .is_some_and(|p| p == path)
            })
    }

    pub fn control(&self, control: ControlId) -> Result<&Control> {
        Ok(self
            .controls
            .get(control)
            .ok_or(FormError::ControlNotFound { control })?)
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    /// Control attached at `path` below the root control.
    pub fn get_control(&self, path: &str) -> Option<ControlId> {
        let path = KeyPath::parse(path).ok()?;
        self.controls.find(self.root_control, path.segments())
    }

    /// Current value of a control, aggregated for groups and arrays.
    pub fn control_value(&self, control: ControlId) -> Result<Value> {
        self.control(control)?;
        Ok(self.controls.value(control))
    }

    /// Value of the form, as the root control sees it.
    pub fn value(&self) -> Value {
        self.controls.value(self.root_control)
    }

    pub fn is_valid(&self) -> bool {
        self.controls
            .get(self.root_control)
            .is_some_and(Control::is_valid)
    }

    pub fn model(&self) -> &Value {
        &self.model
    }

    /// Mutable access to the model. Changes made here reach the controls on
    /// the next [`rebuild`](Self::rebuild).
    pub fn model_mut(&mut self) -> &mut Value {
        &mut self.model
    }

    /// The model value bound to `field`, or `None` when it is absent.
    pub fn field_value(&self, field: FieldId) -> Result<Option<&Value>> {
        let node = self.field(field)?;
        Ok(match node.value_path() {
            Some(path) => get_value(&self.model, path.segments()),
            None => get_value(&self.model, node.model_path().segments()),
        })
    }

    pub fn form_state(&self) -> &Value {
        &self.form_state
    }

    pub fn form_state_mut(&mut self) -> &mut Value {
        &mut self.form_state
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Subscribes to field changes.
    pub fn subscribe(&mut self) -> UnboundedReceiver<FieldChange> {
        self.field_changes.subscribe()
    }

    /// Subscribes to model snapshots emitted after each settled change.
    pub fn model_changes(&mut self) -> UnboundedReceiver<Value> {
        self.model_changes.subscribe()
    }

    /// Rebuilds the whole tree against the current model.
    pub fn rebuild(&mut self) -> Result<()> {
        self.build_field(self.root)
    }

    /// Rebuilds the subtree rooted at `field`.
    ///
    /// Mounted instances of the subtree are disposed first and mounted fields
    /// are rendered again afterwards. Controls whose path did not change are
    /// reused.
    pub fn build_field(&mut self, field: FieldId) -> Result<()> {
        self.ensure_active()?;
        self.field(field)?;
        self.build(field, false)?;
        self.rerender_mounted(field)?;
        self.settle();
        Ok(())
    }

    /// Time of the earliest pending timer, in clock milliseconds.
    pub fn next_timer_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn has_pending_timers(&self) -> bool {
        self.scheduler.len() > 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tears the form down.
    ///
    /// Mounted fields receive `onDestroy`, pending timers are dropped and both
    /// change streams end. Later calls are no-ops; every other mutating
    /// operation fails with [`FormError::Destroyed`].
    pub fn destroy(&mut self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        for field in self.fields.post_order(self.root) {
            let mounted = self.fields.get(field).is_some_and(|n| n.host.is_some());
            if mounted {
                self.trigger_hook(field, LifecycleHook::OnDestroy, None)?;
            }
            if let Some(node) = self.fields.get_mut(field) {
                node.dispose_component_refs();
                node.subscription = None;
            }
        }
        self.scheduler.clear();
        self.field_changes.close();
        self.model_changes.close();
        self.destroyed = true;
        tracing::debug!("Form destroyed");
        Ok(())
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("root", &self.root)
            .field("fields", &self.fields.len())
            .field("controls", &self.controls.len())
            .field("model", &self.model)
            .field("pending_timers", &self.scheduler.len())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}
