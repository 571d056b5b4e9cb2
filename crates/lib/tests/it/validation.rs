//! Validity tests: aggregate validators, visibility, disabled state and
//! async validation.

use formsync::{
    FieldConfig, Form, FormOptions, Validator,
    control::{
        AsyncValidator, ControlStatus,
        validators::{max, min_length, required},
    },
};
use serde_json::{Map, Value, json};

use crate::helpers::*;

fn error(name: &str) -> Option<Map<String, Value>> {
    let mut errors = Map::new();
    errors.insert(name.to_string(), json!(true));
    Some(errors)
}

#[test]
fn test_required_field_tracks_value() {
    let mut form = form(
        vec![FieldConfig::input("name", "input").with_validator(required())],
        json!({}),
    );
    let name = form.get_control("name").unwrap();
    assert!(!form.is_valid());
    assert_eq!(form.control(name).unwrap().status(), ControlStatus::Invalid);
    assert!(form.control(name).unwrap().errors().unwrap().contains_key("required"));

    form.set_control_value(name, json!("Ada")).unwrap();
    assert!(form.is_valid());
    assert_eq!(form.control(name).unwrap().errors(), None);
}

#[test]
fn test_shared_control_validates_visible_fields_only() {
    let mut form = Form::new(
        vec![
            FieldConfig::input("code", "input").with_validator(required()),
            FieldConfig::input("code", "input")
                .with_hide_expression("formState.hideSecond")
                .with_validator(min_length(5)),
        ],
        json!({ "code": "abc" }),
        FormOptions::new()
            .with_form_state(json!({ "hideSecond": true }))
            .with_evaluator(path_evaluator),
    )
    .unwrap();
    let code = form.get_control("code").unwrap();
    assert!(form.control(code).unwrap().is_valid());

    form.form_state_mut()["hideSecond"] = json!(false);
    form.check_field(form.root()).unwrap();

    let control = form.control(code).unwrap();
    assert!(!control.is_valid());
    assert!(control.errors().unwrap().contains_key("minlength"));
    assert!(!form.is_valid());

    form.form_state_mut()["hideSecond"] = json!(true);
    form.check_field(form.root()).unwrap();
    assert!(form.is_valid());
}

#[test]
fn test_hidden_fields_do_not_block_the_form() {
    let mut form = form(
        vec![
            FieldConfig::input("wantsEmail", "checkbox"),
            FieldConfig::input("email", "input")
                .with_hide_expression("!model.wantsEmail")
                .with_validator(required()),
        ],
        json!({ "wantsEmail": false }),
    );
    assert!(form.is_valid());

    let wants = form.get_control("wantsEmail").unwrap();
    form.set_control_value(wants, json!(true)).unwrap();
    assert!(!form.is_valid());

    let email = form.get_control("email").unwrap();
    form.set_control_value(email, json!("a@b.c")).unwrap();
    assert!(form.is_valid());
}

#[test]
fn test_disabled_fields_are_excluded() {
    let form = form(
        vec![
            FieldConfig::input("locked", "input")
                .with_disabled(true)
                .with_validator(required()),
            FieldConfig::input("free", "input"),
        ],
        json!({ "free": 1 }),
    );
    let locked = form.get_control("locked").unwrap();

    assert_eq!(form.control(locked).unwrap().status(), ControlStatus::Disabled);
    assert!(form.is_valid());
    assert_eq!(form.value(), json!({ "free": 1 }));
}

#[test]
fn test_invalid_children_bubble_up() {
    let mut form = form(
        vec![
            FieldConfig::new().with_key("limits").with_group(vec![
                FieldConfig::input("max", "input").with_validator(max(10.0)),
            ]),
        ],
        json!({ "limits": { "max": 5 } }),
    );
    let group = form.get_control("limits").unwrap();
    let leaf = form.get_control("limits.max").unwrap();
    assert!(form.control(group).unwrap().is_valid());

    form.set_control_value(leaf, json!(11)).unwrap();
    assert_eq!(form.control(group).unwrap().status(), ControlStatus::Invalid);
    assert_eq!(form.control(group).unwrap().errors(), None);
    assert!(!form.is_valid());
}

#[test]
fn test_array_elements_are_validated() {
    let mut form = form(
        vec![
            FieldConfig::new()
                .with_key("tags")
                .with_array(FieldConfig::new().with_type("input").with_validator(required())),
        ],
        json!({ "tags": ["a"] }),
    );
    let tags = form.find_field_by_path("tags").unwrap();
    assert!(form.is_valid());

    form.add(tags, None, None).unwrap();
    assert!(!form.is_valid());

    form.remove(tags, 1).unwrap();
    assert!(form.is_valid());
}

#[test]
fn test_custom_validator_replaces_aggregate() {
    let mut form = form(
        vec![FieldConfig::input("n", "input").with_validator(required())],
        json!({ "n": 3 }),
    );
    let n = form.get_control("n").unwrap();
    let even = Validator::new(|value| match value.as_i64() {
        Some(v) if v % 2 != 0 => error("even"),
        _ => None,
    });

    form.set_control_validator(n, Some(even)).unwrap();
    assert!(form.control(n).unwrap().errors().unwrap().contains_key("even"));

    form.set_control_validator(n, None).unwrap();
    assert!(form.control(n).unwrap().is_valid());
}

#[tokio::test]
async fn test_async_validation_goes_through_pending() {
    let mut form = form(
        vec![FieldConfig::input("user", "input").with_async_validator(AsyncValidator::new(
            |value: Value| async move {
                if value == json!("taken") {
                    error("taken")
                } else {
                    None
                }
            },
        ))],
        json!({ "user": "taken" }),
    );
    let user = form.find_field_by_path("user").unwrap();
    let control = form.get_control("user").unwrap();
    assert!(form.is_valid());

    let pending = form.validate_async(user).unwrap();
    assert!(form.control(control).unwrap().is_pending());
    assert_eq!(
        form.control(form.root_control()).unwrap().status(),
        ControlStatus::Pending
    );

    let errors = pending.await;
    form.apply_async_errors(control, errors).unwrap();
    assert!(form.control(control).unwrap().errors().unwrap().contains_key("taken"));
    assert!(!form.is_valid());

    // A new value drops the stale async result.
    form.set_control_value(control, json!("free")).unwrap();
    assert!(form.is_valid());

    let errors = form.validate_async(user).unwrap().await;
    form.apply_async_errors(control, errors).unwrap();
    assert!(form.is_valid());
}

#[tokio::test]
async fn test_fields_without_async_validators_resolve_valid() {
    let mut form = form(vec![FieldConfig::input("a", "input")], json!({}));
    let a = form.find_field_by_path("a").unwrap();
    let control = form.get_control("a").unwrap();

    let errors = form.validate_async(a).unwrap().await;
    assert_eq!(errors, None);
    form.apply_async_errors(control, errors).unwrap();
    assert!(!form.control(control).unwrap().is_pending());
}
