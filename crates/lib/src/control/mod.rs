//! Form controls and the registry that owns them.
//!
//! A [`Control`] holds either a leaf value or a set of child controls (a group
//! keyed by name, or an ordered array). Controls live in a
//! [`ControlRegistry`] arena and are addressed by [`ControlId`]; two fields
//! that share a key share the same id, which is how duplicate-key fan-out is
//! expressed. Control identity never changes for the lifetime of a tree
//! position. Disposed controls free their slot for reuse, but the id of a
//! disposed control never resolves again.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    arena::{Arena, ArenaIndex},
    field::FieldId,
    path::is_index,
};

pub mod validators;

pub use validators::{AsyncValidator, ValidationErrors, Validator};

/// Identifier of a control inside a [`ControlRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(ArenaIndex);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control#{}", self.0)
    }
}

/// The DOM event that commits a control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOn {
    #[default]
    Change,
    Blur,
    Submit,
}

/// Validation status of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    Valid,
    Invalid,
    Pending,
    Disabled,
}

/// Shape and content of a control.
#[derive(Debug, Clone)]
pub enum ControlKind {
    /// A leaf holding a single value.
    Value(Value),
    /// Named children, in insertion order.
    Group(Vec<(String, ControlId)>),
    /// Positional children.
    Array(Vec<ControlId>),
}

#[derive(Debug, Clone)]
pub(crate) enum ValidatorSlot {
    /// Validators of the fields registered on the control, selected at
    /// evaluation time.
    Aggregate,
    Custom(Validator),
}

#[derive(Debug, Clone)]
pub(crate) enum AsyncValidatorSlot {
    Aggregate,
    Custom(AsyncValidator),
}

/// A value and validity holder bound to one or more fields.
#[derive(Debug)]
pub struct Control {
    id: ControlId,
    pub(crate) kind: ControlKind,
    pub(crate) parent: Option<ControlId>,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) validator: Option<ValidatorSlot>,
    pub(crate) async_validator: Option<AsyncValidatorSlot>,
    pub(crate) errors: Option<ValidationErrors>,
    /// Last result delivered by the async validators.
    pub(crate) async_errors: Option<ValidationErrors>,
    pub(crate) async_pending: bool,
    pub(crate) status: ControlStatus,
    pub(crate) disabled: bool,
    pub(crate) dirty: bool,
    pub(crate) touched: bool,
    update_on: UpdateOn,
}

impl Control {
    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.parent
    }

    /// Fields registered on this control, in registration order.
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        self.errors.as_ref()
    }

    pub fn status(&self) -> ControlStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == ControlStatus::Valid
    }

    pub fn is_pending(&self) -> bool {
        self.status == ControlStatus::Pending
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn update_on(&self) -> UpdateOn {
        self.update_on
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ControlKind::Value(_))
    }

    /// Direct children, in order.
    pub fn children(&self) -> Vec<ControlId> {
        match &self.kind {
            ControlKind::Value(_) => Vec::new(),
            ControlKind::Group(children) => children.iter().map(|(_, id)| *id).collect(),
            ControlKind::Array(children) => children.clone(),
        }
    }
}

/// Arena of every control of a form.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    controls: Arena<Control>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ControlId) -> Option<&Control> {
        self.controls.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ControlId) -> Option<&mut Control> {
        self.controls.get_mut(id.0)
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live controls.
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// Allocated control slots, including vacant ones awaiting reuse.
    pub fn capacity(&self) -> usize {
        self.controls.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn create(&mut self, kind: ControlKind, update_on: UpdateOn) -> ControlId {
        let id = ControlId(self.controls.next_index());
        self.controls.insert(Control {
            id,
            kind,
            parent: None,
            fields: Vec::new(),
            validator: None,
            async_validator: None,
            errors: None,
            async_errors: None,
            async_pending: false,
            status: ControlStatus::Valid,
            disabled: false,
            dirty: false,
            touched: false,
            update_on,
        });
        id
    }

    /// Looks up a direct child by name (groups) or index (arrays).
    pub fn child(&self, parent: ControlId, segment: &str) -> Option<ControlId> {
        match &self.get(parent)?.kind {
            ControlKind::Value(_) => None,
            ControlKind::Group(children) => children
                .iter()
                .find(|(name, _)| name == segment)
                .map(|(_, id)| *id),
            ControlKind::Array(children) => {
                if !is_index(segment) {
                    return None;
                }
                children.get(segment.parse::<usize>().ok()?).copied()
            }
        }
    }

    /// Follows `path` from `root`.
    pub fn find(&self, root: ControlId, path: &[String]) -> Option<ControlId> {
        path.iter()
            .try_fold(root, |current, segment| self.child(current, segment))
    }

    /// Places `child` under `parent` at `segment`, replacing whatever was
    /// there.
    pub(crate) fn set_child(&mut self, parent: ControlId, segment: &str, child: ControlId) {
        let mut replaced = None;
        let Some(control) = self.get_mut(parent) else {
            return;
        };
        match &mut control.kind {
            ControlKind::Value(_) => {
                tracing::warn!(%parent, segment, "Cannot attach a child to a leaf control");
                return;
            }
            ControlKind::Group(children) => {
                if let Some(slot) = children.iter_mut().find(|(name, _)| name == segment) {
                    replaced = Some(std::mem::replace(&mut slot.1, child));
                } else {
                    children.push((segment.to_string(), child));
                }
            }
            ControlKind::Array(children) => match segment.parse::<usize>() {
                Ok(index) if index < children.len() => {
                    replaced = Some(std::mem::replace(&mut children[index], child));
                }
                _ => children.push(child),
            },
        }

        if let Some(old) = replaced.filter(|old| *old != child)
            && let Some(old) = self.get_mut(old)
        {
            old.parent = None;
        }
        if let Some(child) = self.get_mut(child) {
            child.parent = Some(parent);
        }
    }

    /// Inserts `child` into an array control at `index`, shifting later
    /// children.
    pub(crate) fn insert_child(&mut self, array: ControlId, index: usize, child: ControlId) {
        if let Some(Control {
            kind: ControlKind::Array(children),
            ..
        }) = self.get_mut(array)
        {
            let index = index.min(children.len());
            children.insert(index, child);
        } else {
            return;
        }
        if let Some(child) = self.get_mut(child) {
            child.parent = Some(array);
        }
    }

    /// Detaches `child` from its parent. Array siblings after it shift down.
    pub(crate) fn detach(&mut self, child: ControlId) {
        let Some(parent) = self.get(child).and_then(|c| c.parent) else {
            return;
        };
        if let Some(control) = self.get_mut(parent) {
            match &mut control.kind {
                ControlKind::Value(_) => {}
                ControlKind::Group(children) => children.retain(|(_, id)| *id != child),
                ControlKind::Array(children) => children.retain(|id| *id != child),
            }
        }
        if let Some(control) = self.get_mut(child) {
            control.parent = None;
        }
    }

    /// Detaches and drops `id` together with descendants that no field
    /// references any more.
    pub(crate) fn dispose(&mut self, id: ControlId) {
        self.detach(id);
        let Some(control) = self.controls.remove(id.0) else {
            return;
        };
        for child in control.children() {
            let orphan = self.get(child).is_some_and(|c| c.fields.is_empty());
            if orphan {
                self.dispose(child);
            } else if let Some(c) = self.get_mut(child) {
                c.parent = None;
            }
        }
    }

    /// Current value. Groups and arrays aggregate their enabled children, or
    /// all children when the composite itself is disabled.
    pub fn value(&self, id: ControlId) -> Value {
        let Some(control) = self.get(id) else {
            return Value::Null;
        };
        let include = |child: &ControlId| {
            control.disabled || self.get(*child).is_some_and(Control::is_enabled)
        };
        match &control.kind {
            ControlKind::Value(value) => value.clone(),
            ControlKind::Group(children) => Value::Object(
                children
                    .iter()
                    .filter(|(_, child)| include(child))
                    .map(|(name, child)| (name.clone(), self.value(*child)))
                    .collect::<Map<_, _>>(),
            ),
            ControlKind::Array(children) => Value::Array(
                children
                    .iter()
                    .filter(|child| include(child))
                    .map(|child| self.value(*child))
                    .collect(),
            ),
        }
    }

    /// Writes `value` into `id`, patching composite children by name or
    /// index. Every leaf that received a value is appended to `touched`, in
    /// depth-first order.
    pub(crate) fn set_value(&mut self, id: ControlId, value: &Value, touched: &mut Vec<ControlId>) {
        let children: Vec<(String, ControlId)> = match self.get_mut(id) {
            None => return,
            Some(Control {
                kind: ControlKind::Value(current),
                ..
            }) => {
                *current = value.clone();
                touched.push(id);
                return;
            }
            Some(Control {
                kind: ControlKind::Group(children),
                ..
            }) => children.clone(),
            Some(Control {
                kind: ControlKind::Array(children),
                ..
            }) => children
                .iter()
                .enumerate()
                .map(|(i, c)| (i.to_string(), *c))
                .collect(),
        };

        for (segment, child) in children {
            let next = match value {
                Value::Object(map) => map.get(&segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            if let Some(next) = next {
                self.set_value(child, next, touched);
            }
        }
    }

    /// Overwrites leaf values without reporting them.
    pub(crate) fn reset_value(&mut self, id: ControlId, value: Value) {
        if let Some(Control {
            kind: ControlKind::Value(current),
            dirty,
            touched,
            ..
        }) = self.get_mut(id)
        {
            *current = value;
            *dirty = false;
            *touched = false;
        }
    }

    /// Enables or disables `id` and its descendants.
    pub(crate) fn set_enabled(&mut self, id: ControlId, enabled: bool) {
        let Some(control) = self.get_mut(id) else {
            return;
        };
        control.disabled = !enabled;
        control.status = if enabled {
            ControlStatus::Valid
        } else {
            ControlStatus::Disabled
        };
        for child in control.children() {
            self.set_enabled(child, enabled);
        }
    }

    /// Marks `id` and its ancestors dirty.
    pub(crate) fn mark_dirty(&mut self, id: ControlId) {
        let mut current = Some(id);
        while let Some(id) = current {
            current = self.get_mut(id).and_then(|c| {
                c.dirty = true;
                c.parent
            });
        }
    }

    /// Marks `id` and its descendants pristine and untouched.
    pub(crate) fn mark_pristine(&mut self, id: ControlId) {
        let Some(control) = self.get_mut(id) else {
            return;
        };
        control.dirty = false;
        control.touched = false;
        for child in control.children() {
            self.mark_pristine(child);
        }
    }

    /// Marks `id` touched.
    pub(crate) fn mark_touched(&mut self, id: ControlId) {
        if let Some(control) = self.get_mut(id) {
            control.touched = true;
        }
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: ControlId) -> Vec<ControlId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|c| c.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.get(parent).and_then(|c| c.parent);
        }
        chain
    }

    /// `id` and all of its descendants, children before parents.
    pub fn post_order(&self, id: ControlId) -> Vec<ControlId> {
        let mut out = Vec::new();
        self.collect_post_order(id, &mut out);
        out
    }

    fn collect_post_order(&self, id: ControlId, out: &mut Vec<ControlId>) {
        let Some(control) = self.get(id) else {
            return;
        };
        for child in control.children() {
            self.collect_post_order(child, out);
        }
        out.push(id);
    }
}
