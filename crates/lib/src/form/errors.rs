//! Error types for form operations.

use thiserror::Error;

use crate::{control::ControlId, field::FieldId};

/// Structured error types for operations on a built form.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The field id does not name a live field of this form
    #[error("Field not found: {field}")]
    FieldNotFound { field: FieldId },

    /// The control id does not name a live control of this form
    #[error("Control not found: {control}")]
    ControlNotFound { control: ControlId },

    /// The field has no control bound to it
    #[error("Field {field} has no control")]
    NoControl { field: FieldId },

    /// An array operation was requested on a field without an array template
    #[error("Field {field} is not an array field")]
    NotAnArrayField { field: FieldId },

    /// An array index is outside the current element range
    #[error("Index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The model value of an array field is neither an array nor empty
    #[error("Model value of {field} is not an array")]
    NotAnArrayValue { field: FieldId },

    /// The form has been destroyed
    #[error("Form has been destroyed")]
    Destroyed,
}

impl FormError {
    /// Check if this error names an unknown field or control
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FormError::FieldNotFound { .. } | FormError::ControlNotFound { .. }
        )
    }

    /// Check if this error comes from an array operation
    pub fn is_array_error(&self) -> bool {
        matches!(
            self,
            FormError::NotAnArrayField { .. }
                | FormError::IndexOutOfBounds { .. }
                | FormError::NotAnArrayValue { .. }
        )
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, FormError::Destroyed)
    }

    /// Get the field id if the error is about one field
    pub fn field(&self) -> Option<FieldId> {
        match self {
            FormError::FieldNotFound { field }
            | FormError::NoControl { field }
            | FormError::NotAnArrayField { field }
            | FormError::NotAnArrayValue { field } => Some(*field),
            _ => None,
        }
    }
}

impl From<FormError> for crate::Error {
    fn from(err: FormError) -> Self {
        crate::Error::Form(err)
    }
}
