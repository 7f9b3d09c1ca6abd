//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use plotmodel_core::{
    Document, ModelSchema, PropertyDescriptor, PropertyKind, SchemaError, SchemaRegistry, Theme,
    ThemeSpec, Value, ValueSource,
};
use uuid::Uuid;

fn annotation_schema() -> ModelSchema {
    ModelSchema::builder("time_annotation")
        .attribute(
            "start",
            PropertyDescriptor::new(PropertyKind::Datetime).with_help("Left edge of the span"),
        )
        .attribute("end", PropertyDescriptor::new(PropertyKind::Datetime))
        .attribute("label_date", PropertyDescriptor::new(PropertyKind::Date))
        .attribute(
            "poll_interval",
            PropertyDescriptor::new(PropertyKind::TimeDelta),
        )
        .build()
        .unwrap()
}

fn create_document() -> (Document, Uuid) {
    let mut registry = SchemaRegistry::new();
    registry.register(annotation_schema());
    let mut document = Document::new(registry);
    let id = document.create("time_annotation").unwrap();
    (document, id)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

#[test]
fn invariant_assignment_always_validates() {
    let (mut document, id) = create_document();

    // A garbage string for a date attribute must be rejected at the call site.
    let result = document.set(id, "label_date", Value::String("not-a-date".into()));
    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Expected an ISO date string"));

    // Booleans are not timestamps, despite being integer-like elsewhere.
    assert!(document.set(id, "start", Value::Bool(true)).is_err());

    // Nothing was stored.
    assert_eq!(document.get(id, "label_date").unwrap(), None);
    assert_eq!(document.get(id, "start").unwrap(), None);
}

#[test]
fn invariant_rejected_write_preserves_previous_value() {
    let (mut document, id) = create_document();

    document
        .set(id, "start", Value::Datetime(datetime(2024, 1, 15, 8, 30)))
        .unwrap();

    let result = document.set(id, "start", Value::String("garbage".into()));
    assert!(result.is_err());

    assert_eq!(
        document.get(id, "start").unwrap(),
        Some(&Value::Datetime(datetime(2024, 1, 15, 8, 30)))
    );
}

#[test]
fn invariant_bulk_apply_is_atomic() {
    let (mut document, id) = create_document();

    document
        .set(id, "label_date", Value::Date(date(2023, 12, 31)))
        .unwrap();

    // One valid entry, one invalid; neither may land.
    let payload = serde_json::json!({
        "start": "2024-01-15T08:30:00",
        "label_date": "not-a-date",
    });
    let result = document.apply(id, payload.as_object().unwrap());
    assert!(result.is_err());

    assert_eq!(document.get(id, "start").unwrap(), None);
    assert_eq!(
        document.get(id, "label_date").unwrap(),
        Some(&Value::String("2023-12-31".into()))
    );

    // An all-valid payload commits every entry.
    let payload = serde_json::json!({
        "start": "2024-01-15T08:30:00",
        "end": 1_700_000_000,
    });
    document.apply(id, payload.as_object().unwrap()).unwrap();
    assert_eq!(
        document.get(id, "start").unwrap(),
        Some(&Value::Datetime(datetime(2024, 1, 15, 8, 30)))
    );
    assert_eq!(
        document.get(id, "end").unwrap(),
        Some(&Value::Int(1_700_000_000))
    );
}

#[test]
fn invariant_date_attributes_store_iso_strings() {
    let (mut document, id) = create_document();

    document
        .set(id, "label_date", Value::Date(date(2024, 1, 15)))
        .unwrap();

    assert_eq!(
        document.get(id, "label_date").unwrap(),
        Some(&Value::String("2024-01-15".into()))
    );
}

#[test]
fn invariant_datetime_attributes_keep_datetimes_unchanged() {
    let (mut document, id) = create_document();

    let dt = datetime(2024, 1, 15, 8, 30);
    document.set(id, "start", Value::Datetime(dt)).unwrap();

    assert_eq!(document.get(id, "start").unwrap(), Some(&Value::Datetime(dt)));
}

#[test]
fn invariant_duration_attributes_reject_strings() {
    let (mut document, id) = create_document();

    let result = document.set(id, "poll_interval", Value::String("1 day".into()));
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Expected a duration value"));

    document
        .set(id, "poll_interval", Value::Duration(TimeDelta::seconds(30)))
        .unwrap();
    assert_eq!(
        document.get(id, "poll_interval").unwrap(),
        Some(&Value::Duration(TimeDelta::seconds(30)))
    );
}

#[test]
fn invariant_duration_default_is_zero() {
    let (document, id) = create_document();

    let (source, value) = document.resolved(id, "poll_interval").unwrap();
    assert_eq!(source, ValueSource::SchemaDefault);
    assert_eq!(value, Some(Value::Duration(TimeDelta::zero())));
}

#[test]
fn invariant_theme_overrides_flow_through_validation() {
    let mut registry = SchemaRegistry::new();
    registry.register(annotation_schema());

    // A theme carrying an invalid value must be rejected at load.
    let bad: ThemeSpec = serde_json::from_str(
        r#"{"overrides": {"time_annotation": {"label_date": "whenever"}}}"#,
    )
    .unwrap();
    assert!(Theme::from_spec(bad, &registry).is_err());

    let good: ThemeSpec = serde_json::from_str(
        r#"{"overrides": {"time_annotation": {"label_date": "2024-06-01"}}}"#,
    )
    .unwrap();
    let theme = Theme::from_spec(good, &registry).unwrap();

    let mut document = Document::new(registry);
    document.set_theme(theme);
    let id = document.create("time_annotation").unwrap();

    // Theme wins over the (absent) schema default.
    let (source, value) = document.resolved(id, "label_date").unwrap();
    assert_eq!(source, ValueSource::Theme);
    assert_eq!(value, Some(Value::String("2024-06-01".into())));

    // An explicit assignment wins over the theme.
    document
        .set(id, "label_date", Value::Date(date(2024, 1, 15)))
        .unwrap();
    let (source, value) = document.resolved(id, "label_date").unwrap();
    assert_eq!(source, ValueSource::User);
    assert_eq!(value, Some(Value::String("2024-01-15".into())));

    // Attributes with no value anywhere report as unset.
    let (source, value) = document.resolved(id, "start").unwrap();
    assert_eq!(source, ValueSource::Unset);
    assert_eq!(value, None);
}

#[test]
fn invariant_schema_defaults_are_gated() {
    let result = ModelSchema::builder("broken")
        .attribute(
            "when",
            PropertyDescriptor::new(PropertyKind::Date).with_default(Value::Bool(true)),
        )
        .build();
    assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
}

#[test]
fn invariant_registry_loads_specs_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("annotation.json"),
        r#"{
            "name": "time_annotation",
            "attributes": {
                "start": {"kind": "datetime"},
                "label_date": {"kind": "date", "default": "2024-01-15"}
            }
        }"#,
    )
    .unwrap();
    // A malformed spec must be skipped, not abort the load.
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let registry = SchemaRegistry::load_from_dir(dir.path()).unwrap();
    assert_eq!(registry.list().len(), 1);

    let mut document = Document::new(registry);
    let id = document.create("time_annotation").unwrap();
    let (source, value) = document.resolved(id, "label_date").unwrap();
    assert_eq!(source, ValueSource::SchemaDefault);
    assert_eq!(value, Some(Value::String("2024-01-15".into())));
}

#[test]
fn invariant_document_dump_is_canonical() {
    let (mut document, id) = create_document();

    document
        .set(id, "label_date", Value::Date(date(2024, 1, 15)))
        .unwrap();
    document
        .set(id, "start", Value::Datetime(datetime(2024, 1, 15, 8, 30)))
        .unwrap();
    document
        .set(id, "poll_interval", Value::Duration(TimeDelta::seconds(2)))
        .unwrap();

    let dump = document.to_json();
    let models = dump["models"].as_array().unwrap();
    assert_eq!(models.len(), 1);

    let attributes = &models[0]["attributes"];
    assert_eq!(attributes["label_date"], "2024-01-15");
    assert_eq!(attributes["start"], "2024-01-15T08:30:00");
    assert_eq!(attributes["poll_interval"], 2000);

    // Same state, same dump.
    assert_eq!(dump, document.to_json());
}
