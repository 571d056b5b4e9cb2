//!
//! Formsync: a field-tree synchronization engine for dynamic forms.
//! This library builds form-control state from declarative field descriptions
//! and keeps controls, a plain JSON model and a mounted UI in step.
//!
//! ## Core Concepts
//!
//! * **Field configs (`field::FieldConfig`)**: Declarative descriptions of fields: key, type, nested groups and arrays, expressions, validators, model options.
//! * **Field tree (`field::FieldTree`)**: The built nodes, addressed by `FieldId`. Each keyed node is bound to exactly one control.
//! * **Controls (`control::ControlRegistry`)**: Value and validity holders (leaf, group, array). Fields sharing a key share a control and all receive its changes.
//! * **Model (`serde_json::Value`)**: The plain data the form reads from and writes to through key paths such as `address.lines[0]` (`path::KeyPath`).
//! * **Change channel (`channel::FieldChange`)**: An ordered stream of value and expression changes, plus a model-change stream carrying model snapshots.
//! * **Expressions (`expression::ExpressionEvaluator`)**: Host-provided evaluation of `hideExpression` and `expressionProperties` against the live model.
//! * **Rendering (`render::MountAdapter`)**: Host-provided mounting of wrappers and field components; the engine decides what to mount and when to dispose it.
//!
//! The engine is single-threaded. Debounced work waits in a timer queue driven
//! by an injectable [`Clock`] and is fired by [`Form::run_pending_timers`].

mod arena;
pub mod array;
pub mod builder;
pub mod channel;
pub mod clock;
pub mod config;
pub mod constants;
pub mod control;
pub mod expression;
pub mod field;
pub mod form;
pub mod path;
pub mod render;
mod scheduler;

pub use builder::FieldExtension;
pub use channel::{ChangeKind, FieldChange};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FormConfig;
pub use control::{ControlId, UpdateOn, ValidationErrors, Validator};
pub use expression::{EvaluationError, ExpressionContext, ExpressionEvaluator};
pub use field::{FieldConfig, FieldId, FieldNode, LifecycleHook};
pub use form::{Form, FormError, FormOptions};

/// Result type used throughout the Formsync library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Formsync library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured key parsing errors from the path module
    #[error(transparent)]
    Path(path::PathError),

    /// Structured errors from operations on a built form
    #[error(transparent)]
    Form(form::FormError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Path(_) => "path",
            Error::Form(_) => "form",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a field or control was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a malformed key.
    pub fn is_path_error(&self) -> bool {
        matches!(self, Error::Path(_))
    }

    /// Check if this error comes from an array operation.
    pub fn is_array_error(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_array_error(),
            _ => false,
        }
    }

    /// Check if this error was caused by using a destroyed form.
    pub fn is_destroyed(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_destroyed(),
            _ => false,
        }
    }

    /// Check if this error is serialization-related.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::Serialize(_))
    }
}
