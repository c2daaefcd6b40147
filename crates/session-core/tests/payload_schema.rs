//! JsonSchema validation of public session payloads.

use std::collections::BTreeSet;

use schemars::schema_for;
use serde_json::json;
use session_core::entities::*;
use session_core::enums::OperationType;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! public_view_validates {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;
            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn origin() -> BTreeSet<String> {
    BTreeSet::from(["acc_tcga".to_string()])
}

public_view_validates!(
    anonymous_virtual_study_schema,
    VirtualStudy,
    VirtualStudy::new(
        "cohort",
        "one study",
        BTreeSet::from([StudyRef {
            id: "acc_tcga".into(),
            samples: None,
        }]),
        origin(),
    )
);

public_view_validates!(
    owned_virtual_study_with_filters_schema,
    VirtualStudy,
    {
        let mut study = VirtualStudy::from_document(&json!({
            "name": "cohort",
            "description": "filtered",
            "studies": [{"id": "acc_tcga", "samples": ["S1"]}],
            "origin": ["acc_tcga"],
            "owner": "alice",
            "filters": {"patients": {"SEX": ["Female"]}}
        }))
        .unwrap();
        study.apply(OperationType::AddUser, "bob");
        study
    }
);

public_view_validates!(
    study_ref_schema,
    StudyRef,
    StudyRef {
        id: "brca_tcga".into(),
        samples: Some(BTreeSet::from(["S1".to_string(), "S2".to_string()])),
    }
);

public_view_validates!(applied_filters_schema, AppliedFilters, AppliedFilters::default());

#[test]
fn schema_does_not_expose_bookkeeping_fields() {
    let schema = serde_json::to_value(schema_for!(VirtualStudy)).unwrap();
    let properties = schema["properties"].as_object().unwrap();
    assert!(properties.contains_key("owner"));
    assert!(!properties.contains_key("users"));
    assert!(!properties.contains_key("created"));
}
