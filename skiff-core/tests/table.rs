#[cfg(test)]
mod tests {
    use serde_json::json;
    use skiff_core::{
        ErrorKind, FieldDef, Record, TableSchema, Value, WireRecord,
    };

    fn customers() -> TableSchema {
        TableSchema::declare("Customers")
            .field("code", FieldDef::text().primary_key())
            .field("name", FieldDef::text().nullable(false))
            .field("balance", FieldDef::number())
            .field("joined", FieldDef::date())
            .field("score", FieldDef::calculated())
            .build()
            .unwrap()
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let error = TableSchema::declare("T")
            .field("a", FieldDef::text())
            .field("a", FieldDef::number())
            .build()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn nullable_primary_key_is_rejected() {
        let error = TableSchema::declare("T")
            .field("k", FieldDef::text().primary_key().nullable(true))
            .build()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn primary_key_is_implicitly_read_only() {
        let schema = customers();
        let code = schema.field("code").unwrap();
        assert!(code.is_primary_key());
        assert!(code.is_read_only());
        assert!(!code.is_nullable());
    }

    #[test]
    fn undeclared_columns_are_rejected() {
        let schema = customers();
        let error = schema.column("nope").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(schema.column("balance").is_ok());
    }

    #[test]
    fn write_validation_collects_every_issue() {
        let schema = customers();
        let record = Record::new()
            .set("code", "C1") // read only primary key
            .set("ghost", "x") // not declared
            .set("balance", "not a number"); // wrong kind, and `name` missing
        let error = schema.validate_write(&record, true).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        let targets: Vec<_> = error
            .details
            .iter()
            .filter_map(|d| d.target.as_deref())
            .collect();
        assert_eq!(targets, ["code", "ghost", "balance", "name"]);
    }

    #[test]
    fn update_payloads_do_not_require_missing_fields() {
        let schema = customers();
        let record = Record::new().set("balance", 10);
        let body = schema.validate_write(&record, false).unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body["balance"], json!(10));
    }

    #[test]
    fn write_payload_applies_wire_ids_and_transforms() {
        let schema = TableSchema::declare("T")
            .field(
                "name",
                FieldDef::text().wire_id("Customer_Name").on_write(|v| {
                    Ok(match v {
                        Value::Text(Some(s)) => Value::Text(Some(s.to_uppercase())),
                        other => other,
                    })
                }),
            )
            .build()
            .unwrap();
        let body = schema
            .validate_write(&Record::new().set("name", "ada"), false)
            .unwrap();
        assert_eq!(body["Customer_Name"], json!("ADA"));
    }

    #[test]
    fn read_decode_aggregates_field_issues() {
        let schema = customers();
        let wire = WireRecord::from_json(json!({
            "code": "C1",
            "name": 7,
            "joined": "yesterday",
            "balance": 3
        }))
        .unwrap();
        let error = Record::from_wire(&schema, &[], &wire).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.details.len(), 2);
        let targets: Vec<_> = error
            .details
            .iter()
            .filter_map(|d| d.target.as_deref())
            .collect();
        assert_eq!(targets, ["name", "joined"]);
    }

    #[test]
    fn read_transforms_shape_decoded_values() {
        let schema = TableSchema::declare("T")
            .field(
                "name",
                FieldDef::text().on_read(|v| {
                    Ok(match v {
                        Value::Text(Some(s)) => Value::Text(Some(s.trim().to_owned())),
                        other => other,
                    })
                }),
            )
            .build()
            .unwrap();
        let wire = WireRecord::from_json(json!({ "name": "  ada  " })).unwrap();
        let record = Record::from_wire(&schema, &[], &wire).unwrap();
        assert_eq!(record.get("name"), Some(&Value::Text(Some("ada".into()))));
    }

    #[test]
    fn decode_keeps_protocol_metadata_out_of_the_field_map() {
        let wire = WireRecord::from_json(json!({
            "@odata.id": "Customers('C1')",
            "@odata.editLink": "Customers('C1')",
            "@odata.etag": "xyz",
            "code": "C1"
        }))
        .unwrap();
        assert_eq!(wire.id.as_deref(), Some("Customers('C1')"));
        assert_eq!(wire.edit_link.as_deref(), Some("Customers('C1')"));
        assert_eq!(wire.fields.len(), 1);
    }

    #[test]
    fn field_specs_skip_calculated_fields() {
        let schema = customers();
        let specs = schema.field_specs();
        assert!(specs.iter().all(|s| s.name != "score"));
        let code = specs.iter().find(|s| s.name == "code").unwrap();
        assert!(code.primary);
        assert!(!code.nullable);
        assert_eq!(code.kind, "string");
    }

    #[test]
    fn key_column_requires_a_primary_key() {
        let schema = TableSchema::declare("T")
            .field("a", FieldDef::text())
            .build()
            .unwrap();
        assert_eq!(
            schema.key_column().unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(customers().key_column().unwrap().name, "code");
    }
}
