use basetypes::{base, try_base, BaseTypeId, BaseValue, Dictionary, Error};

#[test]
fn test_base_macro_null() {
    assert_eq!(base!(null), BaseValue::Null);
}

#[test]
fn test_base_macro_booleans() {
    assert_eq!(base!(true), BaseValue::Bool(true));
    assert_eq!(base!(false), BaseValue::Bool(false));
}

#[test]
fn test_base_macro_numbers() {
    assert_eq!(base!(42), BaseValue::Int(42));
    assert_eq!(base!(-123), BaseValue::Int(-123));
    assert_eq!(base!(3.5), BaseValue::Float(3.5));
}

#[test]
fn test_base_macro_strings() {
    assert_eq!(base!("hello"), BaseValue::String("hello".to_string()));
    assert_eq!(base!(String::from("owned")), BaseValue::String("owned".to_string()));
}

#[test]
fn test_base_macro_nested() {
    let value = base!({
        "name": "Alice",
        "age": 30,
        "tags": ["rust", "serde"],
        "address": {"city": "Leeds", "zip": null}
    });

    let dict = value.as_dictionary().unwrap();
    assert_eq!(dict.len(), 4);
    assert_eq!(dict.get("name").and_then(BaseValue::as_str), Some("Alice"));
    assert_eq!(dict.get("age").and_then(BaseValue::as_i64), Some(30));
    assert_eq!(
        dict.get("tags").and_then(BaseValue::as_list).map(<[BaseValue]>::len),
        Some(2)
    );

    let address = dict.get("address").and_then(BaseValue::as_dictionary).unwrap();
    assert_eq!(address.get("zip"), Some(&BaseValue::Null));
}

#[test]
fn test_base_macro_trailing_commas() {
    assert_eq!(base!([1, 2,]), base!([1, 2]));
    assert_eq!(base!({"a": 1,}), base!({"a": 1}));
}

#[test]
fn test_base_macro_structures_from_expressions() {
    assert_eq!(base!(("label", 1)).id(), BaseTypeId::Pair);
    assert_eq!(base!((10u8, 20u8, 30u8)).id(), BaseTypeId::Color);
    assert_eq!(base!((1.0, 2.0, 3.0)).id(), BaseTypeId::Geolocation);
}

#[derive(serde::Serialize)]
struct Opaque;

#[test]
fn test_try_base_reports_invalid_expressions() {
    assert!(matches!(try_base!(Opaque), Err(Error::UnknownType(_))));
    assert!(matches!(try_base!([1, Opaque]), Err(Error::UnknownType(_))));
    assert!(matches!(try_base!({"a": {"b": Opaque}}), Err(Error::UnknownType(_))));
    assert_eq!(try_base!([1, null]).unwrap(), base!([1, null]));
}

#[test]
#[should_panic(expected = "invalid base! literal")]
fn test_base_macro_panics_on_invalid_expression() {
    let _ = base!([Opaque]);
}

#[test]
fn test_try_base_rejects_pair_dictionary_values() {
    assert!(matches!(try_base!({"p": ("name", 1)}), Err(Error::Type { .. })));
    assert_eq!(try_base!([("name", 1)]).unwrap().as_list().map(|l| l[0].id()), Some(BaseTypeId::Pair));
}

#[test]
fn test_base_macro_empty_collections() {
    assert_eq!(base!([]), BaseValue::List(Vec::new()));
    assert_eq!(base!({}), BaseValue::Dictionary(Dictionary::new()));
}
