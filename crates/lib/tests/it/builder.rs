//! Field tree building tests: control creation and reuse, defaults,
//! extensions and rebuilds.

use std::{cell::RefCell, rc::Rc};

use formsync::{FieldConfig, FieldExtension, FieldNode, Form, FormOptions};
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_keyed_group_nests_controls() {
    let form = form(
        vec![
            FieldConfig::new()
                .with_key("address")
                .with_group(vec![FieldConfig::input("city", "input")]),
        ],
        json!({ "address": { "city": "Paris" } }),
    );

    let city = form.get_control("address.city").unwrap();
    assert_eq!(form.control_value(city).unwrap(), json!("Paris"));
    assert_eq!(form.value(), json!({ "address": { "city": "Paris" } }));
}

#[test]
fn test_keyless_group_shares_parent_control() {
    let form = form(
        vec![FieldConfig::new().with_group(vec![
            FieldConfig::input("first", "input"),
            FieldConfig::input("last", "input"),
        ])],
        json!({ "first": "Ada", "last": "Lovelace" }),
    );

    let group = form.field(form.root()).unwrap().children()[0];
    assert_eq!(form.field(group).unwrap().control(), Some(form.root_control()));
    assert!(form.get_control("first").is_some());
    assert_eq!(form.value(), json!({ "first": "Ada", "last": "Lovelace" }));
}

#[test]
fn test_multi_segment_key_creates_intermediate_groups() {
    let form = form(vec![FieldConfig::input("address.city", "input")], json!({}));

    assert!(form.get_control("address").is_some());
    assert!(form.get_control("address.city").is_some());
    assert_eq!(form.value(), json!({ "address": { "city": null } }));
}

#[test]
fn test_default_value_fills_only_missing_values() {
    let fields = || {
        vec![
            FieldConfig::input("count", "input").with_default(json!(5)),
            FieldConfig::input("name", "input").with_default(json!("anon")),
        ]
    };

    let empty = form(fields(), json!({}));
    assert_eq!(empty.model(), &json!({ "count": 5, "name": "anon" }));
    let count = empty.get_control("count").unwrap();
    assert_eq!(empty.control_value(count).unwrap(), json!(5));

    let filled = form(fields(), json!({ "count": 1, "name": null }));
    assert_eq!(filled.model(), &json!({ "count": 1, "name": null }));
}

#[test]
fn test_null_model_starts_empty() {
    let form = form(vec![FieldConfig::input("a", "input")], json!(null));
    assert_eq!(form.model(), &json!({}));
}

#[test]
fn test_malformed_key_fails_build() {
    let err = Form::new(
        vec![
            FieldConfig::input("fine", "input"),
            FieldConfig::input("broken[x]", "input"),
        ],
        json!({}),
        FormOptions::default(),
    )
    .unwrap_err();

    assert!(err.is_path_error());
    assert_eq!(err.module(), "path");
}

#[test]
fn test_malformed_template_key_fails_build_without_elements() {
    let err = Form::new(
        vec![
            FieldConfig::new().with_key("people").with_array(
                FieldConfig::new().with_group(vec![FieldConfig::input("bad[x]", "input")]),
            ),
        ],
        json!({}),
        FormOptions::default(),
    )
    .unwrap_err();

    assert!(err.is_path_error());
}

#[test]
fn test_rebuild_keeps_control_identity() {
    let mut form = form(
        vec![
            FieldConfig::input("name", "input"),
            FieldConfig::new()
                .with_key("address")
                .with_group(vec![FieldConfig::input("city", "input")]),
        ],
        json!({ "name": "Ada", "address": { "city": "London" } }),
    );
    let name = form.get_control("name").unwrap();
    let city = form.get_control("address.city").unwrap();
    let controls_before = form.controls().len();

    form.rebuild().unwrap();
    form.rebuild().unwrap();

    assert_eq!(form.get_control("name"), Some(name));
    assert_eq!(form.get_control("address.city"), Some(city));
    assert_eq!(form.controls().len(), controls_before);
}

#[test]
fn test_rebuild_picks_up_external_model_edits_silently() {
    let mut form = form(vec![FieldConfig::input("name", "input")], json!({ "name": "Ada" }));
    let mut changes = form.subscribe();
    let name = form.get_control("name").unwrap();

    form.model_mut()["name"] = json!("Grace");
    form.rebuild().unwrap();

    assert_eq!(form.control_value(name).unwrap(), json!("Grace"));
    assert!(value_changes(&mut changes).is_empty());

    // The control now agrees with the model, so the same value is not re-emitted.
    form.set_control_value(name, json!("Grace")).unwrap();
    assert!(value_changes(&mut changes).is_empty());
}

#[test]
fn test_find_fields_by_id_and_path() {
    let form = form(
        vec![
            FieldConfig::input("name", "input").with_id("name-field"),
            FieldConfig::new()
                .with_key("address")
                .with_group(vec![FieldConfig::input("city", "input")]),
        ],
        json!({}),
    );

    let by_id = form.find_field("name-field").unwrap();
    assert_eq!(form.find_field_by_path("name"), Some(by_id));

    let city = form.find_field_by_path("address.city").unwrap();
    assert_eq!(form.field(city).unwrap().key(), Some("city"));
    assert_eq!(form.field(city).unwrap().model_path().to_string(), "address");
    assert_eq!(form.find_field("missing"), None);
}

#[derive(Clone, Default)]
struct PhaseLog(Rc<RefCell<Vec<String>>>);

impl PhaseLog {
    fn push(&self, phase: &str, field: &FieldNode) {
        let key = field.key().unwrap_or("root");
        self.0.borrow_mut().push(format!("{phase}:{key}"));
    }
}

impl FieldExtension for PhaseLog {
    fn pre_populate(&self, field: &mut FieldNode) {
        self.push("pre", field);
        if field.class_name().is_none() {
            field.set_class_name(Some("from-extension".into()));
        }
    }

    fn on_populate(&self, field: &mut FieldNode) {
        self.push("populate", field);
    }

    fn post_populate(&self, field: &mut FieldNode) {
        self.push("post", field);
    }
}

#[test]
fn test_extensions_see_every_phase_in_order() {
    let log = PhaseLog::default();
    let form = Form::new(
        vec![
            FieldConfig::input("a", "input"),
            FieldConfig::input("b", "input").with_class_name("declared"),
        ],
        json!({}),
        FormOptions::new().with_extension(log.clone()),
    )
    .unwrap();

    assert_eq!(
        *log.0.borrow(),
        [
            "pre:root",
            "populate:root",
            "pre:a",
            "populate:a",
            "post:a",
            "pre:b",
            "populate:b",
            "post:b",
            "post:root",
        ]
    );

    let a = form.find_field_by_path("a").unwrap();
    let b = form.find_field_by_path("b").unwrap();
    assert_eq!(form.field(a).unwrap().class_name(), Some("from-extension"));
    assert_eq!(form.field(b).unwrap().class_name(), Some("declared"));
}
