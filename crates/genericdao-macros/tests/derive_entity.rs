use genericdao_core::{Entity, EntityMetadata, Error, Record, Value};
use genericdao_macros::Entity;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Hero {
    id: Option<i64>,
    name: String,
    age: Option<i32>,
    powers: Vec<String>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[entity(name = "countries")]
struct Country {
    #[entity(id, assigned)]
    code: String,
    #[entity(rename = "display_name")]
    name: String,
    #[entity(skip)]
    cached_label: String,
}

#[test]
fn derived_constants_and_fields() {
    assert_eq!(Hero::ENTITY_NAME, "hero");
    assert_eq!(Hero::ID_FIELD, "id");
    assert!(Hero::GENERATED_ID);

    let names: Vec<&str> = Hero::fields().iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["id", "name", "age", "powers"]);
    assert!(Hero::fields()[0].id);
    assert!(Hero::fields()[2].nullable);

    assert_eq!(Country::ENTITY_NAME, "countries");
    assert_eq!(Country::ID_FIELD, "code");
    assert!(!Country::GENERATED_ID);
    assert_eq!(Country::fields().len(), 2);
}

#[test]
fn record_round_trip_and_id_handling() {
    let mut hero = Hero {
        id: None,
        name: "Deadpond".to_string(),
        age: Some(48),
        powers: vec!["regeneration".to_string()],
    };
    assert!(EntityMetadata::<Hero>::is_unsaved(&hero));

    hero.set_id(&Value::BigInt(3)).unwrap();
    assert_eq!(hero.id(), Value::BigInt(3));

    let record = hero.to_record();
    assert_eq!(record.get("age"), Some(&Value::Int(48)));
    assert_eq!(Hero::from_record(&record).unwrap(), hero);
}

#[test]
fn renamed_and_skipped_fields() {
    let country = Country {
        code: "NO".to_string(),
        name: "Norway".to_string(),
        cached_label: "NO - Norway".to_string(),
    };
    let record = country.to_record();
    assert_eq!(record.get("display_name"), Some(&Value::from("Norway")));
    assert!(!record.has("cached_label"));

    let back = Country::from_record(&record).unwrap();
    assert_eq!(back.name, "Norway");
    assert_eq!(back.cached_label, "");
}

#[test]
fn conversion_errors_surface() {
    let record = Record::new().with("id", 1_i64).with("name", 5).with("powers", Value::Null);
    let err = Hero::from_record(&record).unwrap_err();
    assert!(matches!(err, Error::Conversion { expected: "String", .. }));
}
