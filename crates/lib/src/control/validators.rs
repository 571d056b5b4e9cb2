//! Validator types and composition.
//!
//! A [`Validator`] inspects a control value and returns `None` when the value
//! is valid, or a map of error names to error details otherwise. Several
//! validators are combined with [`compose`], which merges every error map into
//! one. [`AsyncValidator`] and [`compose_async`] are the asynchronous
//! counterparts.

use std::{fmt, future::Future, pin::Pin, rc::Rc};

use serde_json::{Map, Value, json};

/// Errors reported by validators, keyed by error name.
pub type ValidationErrors = Map<String, Value>;

/// Future returned by an [`AsyncValidator`].
pub type ValidationFuture = Pin<Box<dyn Future<Output = Option<ValidationErrors>>>>;

/// A synchronous validation predicate.
#[derive(Clone)]
pub struct Validator(Rc<dyn Fn(&Value) -> Option<ValidationErrors>>);

impl Validator {
    pub fn new(f: impl Fn(&Value) -> Option<ValidationErrors> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn validate(&self, value: &Value) -> Option<ValidationErrors> {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// An asynchronous validation predicate.
#[derive(Clone)]
pub struct AsyncValidator(Rc<dyn Fn(Value) -> ValidationFuture>);

impl AsyncValidator {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + 'static,
        Fut: Future<Output = Option<ValidationErrors>> + 'static,
    {
        Self(Rc::new(move |value| Box::pin(f(value))))
    }

    pub fn validate(&self, value: Value) -> ValidationFuture {
        (self.0)(value)
    }
}

impl fmt::Debug for AsyncValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncValidator(..)")
    }
}

fn merge_errors(into: &mut Option<ValidationErrors>, errors: Option<ValidationErrors>) {
    if let Some(errors) = errors {
        into.get_or_insert_with(Map::new).extend(errors);
    }
}

/// Combines validators into one that reports the union of their errors.
///
/// Returns `None` for an empty input, which callers treat as "always valid".
pub fn compose(validators: &[Validator]) -> Option<Validator> {
    match validators {
        [] => None,
        [single] => Some(single.clone()),
        _ => {
            let validators = validators.to_vec();
            Some(Validator::new(move |value| {
                let mut errors = None;
                for validator in &validators {
                    merge_errors(&mut errors, validator.validate(value));
                }
                errors
            }))
        }
    }
}

/// Async counterpart of [`compose`]. Validators run one after another.
pub fn compose_async(validators: &[AsyncValidator]) -> Option<AsyncValidator> {
    match validators {
        [] => None,
        [single] => Some(single.clone()),
        _ => {
            let validators = validators.to_vec();
            Some(AsyncValidator::new(move |value: Value| {
                let validators = validators.clone();
                async move {
                    let mut errors = None;
                    for validator in &validators {
                        merge_errors(&mut errors, validator.validate(value.clone()).await);
                    }
                    errors
                }
            }))
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn single_error(name: &str, detail: Value) -> Option<ValidationErrors> {
    let mut errors = Map::new();
    errors.insert(name.to_string(), detail);
    Some(errors)
}

/// Fails on `null`, empty strings and empty arrays.
pub fn required() -> Validator {
    Validator::new(|value| {
        if is_empty_value(value) {
            single_error("required", Value::Bool(true))
        } else {
            None
        }
    })
}

/// Fails when a string or array is shorter than `min`. Empty values pass.
pub fn min_length(min: usize) -> Validator {
    Validator::new(move |value| match value_len(value) {
        Some(actual) if actual > 0 && actual < min => single_error(
            "minlength",
            json!({ "requiredLength": min, "actualLength": actual }),
        ),
        _ => None,
    })
}

/// Fails when a string or array is longer than `max`.
pub fn max_length(max: usize) -> Validator {
    Validator::new(move |value| match value_len(value) {
        Some(actual) if actual > max => single_error(
            "maxlength",
            json!({ "requiredLength": max, "actualLength": actual }),
        ),
        _ => None,
    })
}

/// Fails when a number is below `min`.
pub fn min(min: f64) -> Validator {
    Validator::new(move |value| match value.as_f64() {
        Some(actual) if actual < min => single_error("min", json!({ "min": min, "actual": actual })),
        _ => None,
    })
}

/// Fails when a number is above `max`.
pub fn max(max: f64) -> Validator {
    Validator::new(move |value| match value.as_f64() {
        Some(actual) if actual > max => single_error("max", json!({ "max": max, "actual": actual })),
        _ => None,
    })
}
