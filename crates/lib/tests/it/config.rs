//! Type registry and JSON configuration tests.

use std::rc::Rc;

use formsync::{
    FieldConfig, FixedClock, Form, FormConfig, FormOptions, UpdateOn,
    config::{FieldDefaults, TypeOption},
    field::TemplateOptions,
};
use serde_json::json;

use crate::helpers::*;

fn registry() -> FormConfig {
    FormConfig::from_json(
        r#"{
            "types": [
                { "name": "input", "wrappers": ["form-field"],
                  "defaultOptions": { "templateOptions": { "placeholder": "Type here" } } },
                { "name": "number", "extends": "input",
                  "defaultOptions": { "defaultValue": 0 } }
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_type_defaults_apply_to_fields() {
    let fields: Vec<FieldConfig> = serde_json::from_value(json!([
        { "key": "name", "type": "input" },
        { "key": "age", "type": "number" },
        { "key": "nick", "type": "input", "wrappers": [],
          "templateOptions": { "placeholder": "Nickname" } },
    ]))
    .unwrap();

    let form = Form::new(
        fields,
        json!({}),
        FormOptions::new().with_config(registry()),
    )
    .unwrap();
    let field = |path: &str| form.field(form.find_field_by_path(path).unwrap()).unwrap();

    assert_eq!(field("name").wrappers(), ["form-field"]);
    assert_eq!(
        field("name").template_options().get("placeholder"),
        Some(json!("Type here"))
    );
    assert_eq!(field("age").wrappers(), ["form-field"]);
    assert!(field("nick").wrappers().is_empty());
    assert_eq!(
        field("nick").template_options().get("placeholder"),
        Some(json!("Nickname"))
    );
    assert_eq!(form.model(), &json!({ "age": 0 }));
}

#[test]
fn test_type_model_options_drive_debounce() {
    let config = FormConfig::new().with_type(TypeOption::new("search").with_defaults(
        FieldDefaults {
            model_options: serde_json::from_value(json!({ "debounce": { "default": 20 } }))
                .unwrap(),
            ..Default::default()
        },
    ));
    let clock = Rc::new(FixedClock::new(0));
    let mut form = Form::new(
        vec![
            FieldConfig::input("q", "search"),
            FieldConfig::input("instant", "search").with_update_on(UpdateOn::Submit),
        ],
        json!({}),
        FormOptions::new()
            .with_config(config)
            .with_clock(clock.clone()),
    )
    .unwrap();
    let q = form.get_control("q").unwrap();
    let instant = form.get_control("instant").unwrap();

    form.set_control_value(instant, json!("now")).unwrap();
    form.set_control_value(q, json!("later")).unwrap();
    assert_eq!(form.model(), &json!({ "instant": "now" }));
    assert_eq!(form.next_timer_due(), Some(20));

    clock.advance(20);
    form.run_pending_timers().unwrap();
    assert_eq!(form.model(), &json!({ "instant": "now", "q": "later" }));
}

#[test]
fn test_field_declarations_from_json() {
    let fields: Vec<FieldConfig> = serde_json::from_value(json!([
        {
            "id": "contact",
            "key": "contact",
            "fieldGroup": [
                { "key": "email", "type": "input",
                  "modelOptions": { "updateOn": "blur", "debounce": { "default": 5 } } },
                { "key": "phone", "type": "input", "hide": true, "autoClear": true,
                  "hideExpression": "!model.email",
                  "expressionProperties": { "className": "model.email" } }
            ]
        },
        { "key": "tags", "fieldArray": { "type": "input", "defaultValue": "new" } }
    ]))
    .unwrap();
    assert_eq!(fields[0].field_group.as_ref().unwrap().len(), 2);

    let mut form = form(fields, json!({ "tags": [null] }));
    let email = form.find_field_by_path("contact.email").unwrap();
    let phone = form.find_field_by_path("contact.phone").unwrap();
    assert_eq!(form.field(email).unwrap().model_options().update_on, Some(UpdateOn::Blur));
    assert!(form.field(phone).unwrap().is_hidden());
    assert_eq!(form.find_field("contact"), form.find_field_by_path("contact"));

    // A present `null` is a value; defaults only fill absent ones.
    assert_eq!(form.model()["tags"], json!([null]));
    let tags = form.find_field_by_path("tags").unwrap();
    form.add(tags, None, None).unwrap();
    assert_eq!(form.model()["tags"], json!([null, "new"]));

    let control = form.get_control("contact.email").unwrap();
    form.set_control_value(control, json!("a@b.c")).unwrap();
    assert!(!form.field(phone).unwrap().is_hidden());
    assert_eq!(form.field(phone).unwrap().class_name(), Some("a@b.c"));
}

#[test]
fn test_template_options_round_trip_through_json() {
    let options: TemplateOptions =
        serde_json::from_value(json!({ "disabled": true, "label": "Name" })).unwrap();
    assert!(options.disabled);
    assert_eq!(options.get("label"), Some(json!("Name")));

    let back = serde_json::to_value(&options).unwrap();
    assert_eq!(back, json!({ "disabled": true, "label": "Name" }));
}

#[test]
fn test_malformed_config_is_a_serialization_error() {
    let err = FormConfig::from_json(r#"{ "types": 3 }"#).unwrap_err();
    assert!(err.is_serialization_error());
    assert_eq!(err.module(), "serialize");
}
