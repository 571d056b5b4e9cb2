use formsync::FieldConfig;
use serde_json::json;

use crate::helpers::*;

fn fields() -> Vec<FieldConfig> {
    vec![
        FieldConfig::input("name", "input"),
        FieldConfig::new()
            .with_key("tags")
            .with_array(FieldConfig::new().with_type("input")),
    ]
}

#[test]
fn test_reset_recreates_every_element() {
    let mut form = form(fields(), json!({ "name": "Ada", "tags": ["a", "b"] }));
    let tags = form.find_field_by_path("tags").unwrap();
    let elements_before = form.field(tags).unwrap().children().to_vec();
    let first_before = form.get_control("tags.0").unwrap();
    let name = form.get_control("name").unwrap();

    form.reset_model(Some(json!({ "name": "Grace", "tags": ["x", "y", "z"] })))
        .unwrap();

    let elements_after = form.field(tags).unwrap().children().to_vec();
    assert_eq!(elements_after.len(), 3);
    assert!(elements_before.iter().all(|id| !elements_after.contains(id)));
    let first_after = form.get_control("tags.0").unwrap();
    assert_ne!(first_after, first_before);
    assert!(!form.controls().contains(first_before));

    // Controls outside arrays survive a reset.
    assert_eq!(form.get_control("name"), Some(name));
    assert_eq!(form.control_value(name).unwrap(), json!("Grace"));
    assert_eq!(
        form.value(),
        json!({ "name": "Grace", "tags": ["x", "y", "z"] })
    );
}

#[test]
fn test_reset_without_model_restores_initial_state() {
    let mut form = form(fields(), json!({ "name": "Ada", "tags": ["a"] }));
    let tags = form.find_field_by_path("tags").unwrap();
    let name = form.get_control("name").unwrap();
    form.set_control_value(name, json!("changed")).unwrap();
    form.add(tags, None, Some(json!("b"))).unwrap();
    assert!(form.control(name).unwrap().is_dirty());

    form.reset_model(None).unwrap();

    assert_eq!(form.model(), &json!({ "name": "Ada", "tags": ["a"] }));
    assert_eq!(form.control_value(name).unwrap(), json!("Ada"));
    assert!(!form.control(name).unwrap().is_dirty());
    assert!(!form.control(form.root_control()).unwrap().is_dirty());
}

#[test]
fn test_reset_to_null_empties_the_form() {
    let mut form = form(fields(), json!({ "name": "Ada", "tags": ["a"] }));
    let name = form.get_control("name").unwrap();

    form.reset_model(Some(json!(null))).unwrap();

    assert_eq!(form.model(), &json!({}));
    assert_eq!(form.control_value(name).unwrap(), json!(null));
    assert_eq!(form.value(), json!({ "name": null, "tags": [] }));
}

#[test]
fn test_reset_is_silent_and_keeps_tracking() {
    let (mut form, clock) = clocked_form(
        vec![
            FieldConfig::input("q", "input").with_debounce(5),
            FieldConfig::new()
                .with_key("tags")
                .with_array(FieldConfig::new().with_type("input")),
        ],
        json!({ "q": "", "tags": ["a"] }),
    );
    let q = form.get_control("q").unwrap();
    form.set_control_value(q, json!("pending")).unwrap();
    let mut changes = form.subscribe();
    let mut models = form.model_changes();

    form.reset_model(Some(json!({ "q": "reset", "tags": ["x", "y"] })))
        .unwrap();
    assert!(drain(&mut changes).is_empty());
    assert!(drain(&mut models).is_empty());
    assert!(!form.has_pending_timers());

    clock.advance(5);
    assert_eq!(form.run_pending_timers().unwrap(), 0);
    assert_eq!(form.model()["q"], json!("reset"));

    // New elements are subscribed like the old ones were.
    let second = form.get_control("tags.1").unwrap();
    form.set_control_value(second, json!("Y")).unwrap();
    assert_eq!(form.model()["tags"], json!(["x", "Y"]));
    assert_eq!(value_changes(&mut changes).len(), 1);
}
