#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;
    use skiff_core::{ErrorKind, FieldKind, Value};
    use std::str::FromStr;
    use time::macros::{date, datetime, time};

    #[test]
    fn native_conversions() {
        assert_eq!(Value::from(true), Value::Bool(Some(true)));
        assert_eq!(Value::from(42i32), Value::Int(Some(42)));
        assert_eq!(Value::from(1.5f64), Value::Float(Some(1.5)));
        assert_eq!(Value::from("ada"), Value::Text(Some("ada".into())));
        assert_eq!(Value::from(Option::<i64>::None), Value::Int(None));
        assert_eq!(
            Value::from(date!(2023 - 01 - 01)),
            Value::Date(Some(date!(2023 - 01 - 01)))
        );
        assert!(Value::from(Option::<&str>::None).is_null());
        assert!(!Value::from("").is_null());
    }

    #[test]
    fn kind_matching() {
        assert!(Value::from("x").matches_kind(FieldKind::Text));
        assert!(!Value::from("x").matches_kind(FieldKind::Number));
        assert!(Value::from(1).matches_kind(FieldKind::Number));
        assert!(Value::from(1.5).matches_kind(FieldKind::Number));
        // A typed null fits any kind.
        assert!(Value::Text(None).matches_kind(FieldKind::Number));
        assert!(Value::from("x").matches_kind(FieldKind::Calculated));
    }

    #[test]
    fn number_decoding_accepts_compat_strings() {
        assert_eq!(
            Value::from_json(FieldKind::Number, &json!(7)).unwrap(),
            Value::Int(Some(7))
        );
        assert_eq!(
            Value::from_json(FieldKind::Number, &json!(1.25)).unwrap(),
            Value::Float(Some(1.25))
        );
        // IEEE754 compatible mode sends wide numbers as strings.
        assert_eq!(
            Value::from_json(FieldKind::Number, &json!("123456789012345678.5")).unwrap(),
            Value::Decimal(Some(Decimal::from_str("123456789012345678.5").unwrap()))
        );
        let error = Value::from_json(FieldKind::Number, &json!("seven")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn temporal_decoding_is_strict() {
        assert_eq!(
            Value::from_json(FieldKind::Date, &json!("2023-01-02")).unwrap(),
            Value::Date(Some(date!(2023 - 01 - 02)))
        );
        assert_eq!(
            Value::from_json(FieldKind::Time, &json!("13:30:05")).unwrap(),
            Value::Time(Some(time!(13:30:05)))
        );
        assert_eq!(
            Value::from_json(FieldKind::Timestamp, &json!("2023-01-02T13:30:05Z")).unwrap(),
            Value::Timestamp(Some(datetime!(2023-01-02 13:30:05 UTC)))
        );
        // A bare date+time is taken as UTC.
        assert_eq!(
            Value::from_json(FieldKind::Timestamp, &json!("2023-01-02T13:30:05")).unwrap(),
            Value::Timestamp(Some(datetime!(2023-01-02 13:30:05 UTC)))
        );
        assert!(Value::from_json(FieldKind::Timestamp, &json!("2023-01-02")).is_err());
        assert!(Value::from_json(FieldKind::Date, &json!("02/01/2023")).is_err());
    }

    #[test]
    fn null_decodes_to_the_typed_null() {
        assert_eq!(
            Value::from_json(FieldKind::Text, &json!(null)).unwrap(),
            Value::Text(None)
        );
        assert!(Value::from_json(FieldKind::Number, &json!(null))
            .unwrap()
            .is_null());
    }

    #[test]
    fn calculated_fields_decode_by_shape() {
        assert_eq!(
            Value::from_json(FieldKind::Calculated, &json!("x")).unwrap(),
            Value::Text(Some("x".into()))
        );
        assert_eq!(
            Value::from_json(FieldKind::Calculated, &json!(3)).unwrap(),
            Value::Int(Some(3))
        );
        assert_eq!(
            Value::from_json(FieldKind::Calculated, &json!(true)).unwrap(),
            Value::Bool(Some(true))
        );
    }

    #[test]
    fn json_encoding_formats_temporals_as_iso_strings() {
        assert_eq!(
            Value::from(date!(2023 - 01 - 02)).to_json(),
            json!("2023-01-02")
        );
        assert_eq!(Value::from(time!(13:30:05)).to_json(), json!("13:30:05"));
        assert_eq!(
            Value::from(datetime!(2023-01-02 13:30:05 UTC)).to_json(),
            json!("2023-01-02T13:30:05Z")
        );
        assert_eq!(Value::Int(None).to_json(), json!(null));
        assert_eq!(Value::from(7).to_json(), json!(7));
    }
}
