use formsync::{FieldConfig, FieldId, Form};
use serde_json::{Value, json};

use crate::helpers::*;

fn tags_field() -> FieldConfig {
    FieldConfig::new()
        .with_key("tags")
        .with_type("repeat")
        .with_array(FieldConfig::new().with_type("input"))
}

fn tags_form(model: Value) -> (Form, FieldId) {
    let form = form(vec![tags_field()], model);
    let tags = form.find_field_by_path("tags").unwrap();
    (form, tags)
}

#[test]
fn test_elements_follow_model_array() {
    let (form, tags) = tags_form(json!({ "tags": ["a", "b", "c"] }));

    let children = form.field(tags).unwrap().children();
    assert_eq!(children.len(), 3);
    let keys: Vec<_> = children
        .iter()
        .map(|id| form.field(*id).unwrap().key().unwrap().to_string())
        .collect();
    assert_eq!(keys, ["0", "1", "2"]);
    assert_eq!(form.value(), json!({ "tags": ["a", "b", "c"] }));
}

#[test]
fn test_remove_keeps_identity_of_later_elements() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a", "b", "c"] }));
    let fields_before = form.field(tags).unwrap().children().to_vec();
    let b = form.get_control("tags.1").unwrap();
    let c = form.get_control("tags.2").unwrap();
    let mut changes = form.subscribe();

    form.remove(tags, 0).unwrap();

    assert_eq!(form.get_control("tags.0"), Some(b));
    assert_eq!(form.get_control("tags.1"), Some(c));
    assert_eq!(form.get_control("tags.2"), None);
    assert_eq!(form.field(tags).unwrap().children(), &fields_before[1..]);
    assert_eq!(form.model(), &json!({ "tags": ["b", "c"] }));
    assert_eq!(form.control_value(b).unwrap(), json!("b"));
    assert!(!form.fields().contains(fields_before[0]));

    let items = value_changes(&mut changes);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].field, tags);
    assert_eq!(items[0].value, json!(["b", "c"]));
}

#[test]
fn test_add_inserts_without_disturbing_neighbours() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a", "b"] }));
    let a = form.get_control("tags.0").unwrap();
    let b = form.get_control("tags.1").unwrap();
    let mut changes = form.subscribe();
    let mut models = form.model_changes();

    form.add(tags, Some(1), Some(json!("x"))).unwrap();

    assert_eq!(form.get_control("tags.0"), Some(a));
    assert_eq!(form.get_control("tags.2"), Some(b));
    let x = form.get_control("tags.1").unwrap();
    assert_eq!(form.control_value(x).unwrap(), json!("x"));
    assert_eq!(form.model(), &json!({ "tags": ["a", "x", "b"] }));
    assert_eq!(form.value(), json!({ "tags": ["a", "x", "b"] }));

    let items = value_changes(&mut changes);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].value, json!(["a", "x", "b"]));
    assert_eq!(drain(&mut models).len(), 1);
}

#[test]
fn test_add_appends_by_default() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a"] }));

    form.add(tags, None, None).unwrap();
    form.add(tags, None, Some(json!("c"))).unwrap();

    assert_eq!(form.model(), &json!({ "tags": ["a", null, "c"] }));
    assert_eq!(form.field(tags).unwrap().children().len(), 3);
}

#[test]
fn test_add_uses_template_default() {
    let mut form = form(
        vec![
            FieldConfig::new()
                .with_key("scores")
                .with_array(FieldConfig::new().with_type("input").with_default(json!(0))),
        ],
        json!({}),
    );
    let scores = form.find_field_by_path("scores").unwrap();

    form.add(scores, None, None).unwrap();
    form.add(scores, None, Some(json!(7))).unwrap();

    assert_eq!(form.model(), &json!({ "scores": [0, 7] }));
}

#[test]
fn test_first_add_materializes_missing_array() {
    let (mut form, tags) = tags_form(json!({}));
    assert!(form.field(tags).unwrap().children().is_empty());
    assert_eq!(form.value(), json!({ "tags": [] }));

    form.add(tags, None, Some(json!("first"))).unwrap();

    assert_eq!(form.model(), &json!({ "tags": ["first"] }));
    assert!(form.get_control("tags.0").is_some());

    let (mut form, tags) = tags_form(json!({ "tags": null }));
    form.add(tags, None, None).unwrap();
    assert_eq!(form.model(), &json!({ "tags": [null] }));
}

#[test]
fn test_invalid_array_operations_fail() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a"] }));

    let err = form.add(tags, Some(5), None).unwrap_err();
    assert!(err.is_array_error());
    let (mut missing, missing_tags) = tags_form(json!({}));
    assert!(missing.add(missing_tags, Some(1), None).is_err());
    assert_eq!(missing.model(), &json!({}));
    let err = form.remove(tags, 1).unwrap_err();
    assert!(err.is_array_error());
    assert_eq!(form.model(), &json!({ "tags": ["a"] }));

    let element = form.field(tags).unwrap().children()[0];
    assert!(form.add(element, None, None).unwrap_err().is_array_error());

    let (mut form, tags) = tags_form(json!({ "tags": "oops" }));
    assert!(form.add(tags, None, None).unwrap_err().is_array_error());
}

#[test]
fn test_element_edits_write_into_the_array() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a", "b"] }));
    let second = form.field(tags).unwrap().children()[1];
    let mut changes = form.subscribe();

    form.set_field_value(second, json!("B")).unwrap();

    assert_eq!(form.model(), &json!({ "tags": ["a", "B"] }));
    let items = value_changes(&mut changes);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].field, second);
}

#[test]
fn test_group_elements_keep_nested_controls() {
    let mut form = form(
        vec![
            FieldConfig::new()
                .with_key("people")
                .with_array(FieldConfig::new().with_group(vec![
                    FieldConfig::input("name", "input"),
                    FieldConfig::input("age", "input"),
                ])),
        ],
        json!({ "people": [{ "name": "Ada", "age": 36 }, { "name": "Grace", "age": 85 }] }),
    );
    let people = form.find_field_by_path("people").unwrap();
    let grace = form.get_control("people.1.name").unwrap();

    form.remove(people, 0).unwrap();
    assert_eq!(form.get_control("people.0.name"), Some(grace));
    assert_eq!(form.control_value(grace).unwrap(), json!("Grace"));

    // Shifted elements write to their new position.
    form.set_control_value(grace, json!("Grace H.")).unwrap();
    assert_eq!(
        form.model(),
        &json!({ "people": [{ "name": "Grace H.", "age": 85 }] })
    );
    form.set_control_value(grace, json!("Grace")).unwrap();

    form.add(people, None, Some(json!({ "name": "Alan" }))).unwrap();
    let alan = form.get_control("people.1.name").unwrap();
    assert_eq!(form.control_value(alan).unwrap(), json!("Alan"));
    assert_eq!(
        form.value(),
        json!({ "people": [{ "name": "Grace", "age": 85 }, { "name": "Alan", "age": null }] })
    );
}

#[test]
fn test_remove_cancels_pending_debounce_of_element() {
    let (mut form, clock) = clocked_form(
        vec![
            FieldConfig::new()
                .with_key("tags")
                .with_array(FieldConfig::new().with_type("input").with_debounce(5)),
        ],
        json!({ "tags": ["a", "b"] }),
    );
    let tags = form.find_field_by_path("tags").unwrap();
    let first = form.get_control("tags.0").unwrap();
    form.set_control_value(first, json!("edited")).unwrap();
    assert!(form.has_pending_timers());

    form.remove(tags, 0).unwrap();
    assert!(!form.has_pending_timers());

    clock.advance(5);
    assert_eq!(form.run_pending_timers().unwrap(), 0);
    assert_eq!(form.model(), &json!({ "tags": ["b"] }));
}

#[test]
fn test_repeated_add_remove_reuses_slots() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a"] }));
    form.add(tags, None, None).unwrap();
    form.remove(tags, 1).unwrap();
    let fields = form.fields().capacity();
    let controls = form.controls().capacity();

    for round in 0..100 {
        form.add(tags, None, Some(json!(round))).unwrap();
        form.remove(tags, 1).unwrap();
    }

    assert_eq!(form.fields().capacity(), fields);
    assert_eq!(form.controls().capacity(), controls);
    assert_eq!(form.model(), &json!({ "tags": ["a"] }));
}

#[test]
fn test_removed_ids_stay_dead_after_slot_reuse() {
    let (mut form, tags) = tags_form(json!({ "tags": ["a", "b"] }));
    let old_field = form.field(tags).unwrap().children()[1];
    let old_control = form.get_control("tags.1").unwrap();

    form.remove(tags, 1).unwrap();
    form.add(tags, None, Some(json!("c"))).unwrap();

    let new_field = form.field(tags).unwrap().children()[1];
    let new_control = form.get_control("tags.1").unwrap();
    assert_ne!(old_field, new_field);
    assert_ne!(old_control, new_control);
    assert!(form.field(old_field).unwrap_err().is_not_found());
    assert!(form.control_value(old_control).unwrap_err().is_not_found());
    assert!(form.set_field_value(old_field, json!("x")).is_err());
    assert_eq!(form.model(), &json!({ "tags": ["a", "c"] }));
}
