use std::sync::Arc;

use rustliveobj::prelude::*;
use rustliveobj::{MemoryStore, RawObject, RemoteStore};

#[derive(Entity, Default, Debug, Clone, PartialEq)]
struct TestEntity {
    #[entity(id)]
    name: Option<String>,
    value: Option<String>,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[entity(field_accessor)]
struct TestClass {
    #[entity(id)]
    id: Option<String>,
    value: Option<String>,
    code: Option<String>,
}

#[derive(Entity, Default)]
struct NestedIdEntity {
    #[entity(id)]
    owner: Option<TestEntity>,
    value: Option<String>,
}

#[derive(Entity, Default)]
struct MyObject {
    #[entity(id, generator = "sequence")]
    id: Option<i64>,
    my_id: Option<i64>,
    name: Option<String>,
}

// hand-written adapter with a free-form id, the non-derive path
#[derive(Default)]
struct FreeIdObject {
    id: Option<Value>,
    value: Option<String>,
}

impl Entity for FreeIdObject {
    fn descriptor() -> rustliveobj::EntityDescriptor {
        rustliveobj::EntityDescriptor::builder("FreeIdObject")
            .id_field_with("id", DataType::Text, IdStrategy::Explicit)
            .field("value", DataType::Text)
            .build()
    }

    fn get_field(&self, field: &str) -> rustliveobj::Result<Value> {
        match field {
            "id" => Ok(self.id.clone().unwrap_or(Value::Null)),
            "value" => Ok(self.value.clone().map(Value::Text).unwrap_or(Value::Null)),
            _ => Err(LiveError::FieldNotFound(field.into(), "FreeIdObject".into())),
        }
    }

    fn set_field(&mut self, field: &str, value: Value) -> rustliveobj::Result<()> {
        match field {
            "id" => self.id = if value.is_null() { None } else { Some(value) },
            "value" => self.value = value.as_str().map(str::to_string),
            _ => return Err(LiveError::FieldNotFound(field.into(), "FreeIdObject".into())),
        }
        Ok(())
    }
}

fn setup() -> (Client, LiveObjectService) {
    let client = Client::in_memory();
    let service = client.live_object_service();
    (client, service)
}

#[test]
fn test_basics() {
    let (client, service) = setup();
    let t = TestEntity {
        name: Some("1".into()),
        value: None,
    };
    let live = service.persist(&t).unwrap();
    assert_eq!(live.name().unwrap(), Some("1".to_string()));
    assert!(
        client
            .get_map("live_object:TestEntity:name:1")
            .is_exists()
            .unwrap()
    );

    // assigning the id renames the backing map
    live.set_name(Some("3333".into())).unwrap();
    assert_eq!(live.name().unwrap(), Some("3333".to_string()));
    assert!(
        client
            .get_map("live_object:TestEntity:name:3333")
            .is_exists()
            .unwrap()
    );
    assert!(
        !client
            .get_map("live_object:TestEntity:name:1")
            .is_exists()
            .unwrap()
    );

    live.set_value(Some("111".into())).unwrap();
    assert_eq!(live.value().unwrap(), Some("111".to_string()));
    assert_eq!(
        client
            .get_map("live_object:TestEntity:name:3333")
            .get("value")
            .unwrap(),
        Some(Value::Text("111".into()))
    );
}

#[test]
fn test_rename_collision_is_rejected() {
    let (_client, service) = setup();
    service
        .persist(&TestEntity {
            name: Some("a".into()),
            value: None,
        })
        .unwrap();
    let second = service
        .persist(&TestEntity {
            name: Some("b".into()),
            value: None,
        })
        .unwrap();

    let err = second.set_name(Some("a".into())).unwrap_err();
    assert!(matches!(err, LiveError::AlreadyExists(_)));
    // the handle still answers to its original key
    assert_eq!(second.name().unwrap(), Some("b".to_string()));
}

#[test]
fn test_persist() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("100".into()),
        value: Some("VALUE".into()),
        code: None,
    };
    let persisted = service.persist(&ts).unwrap();
    assert_eq!(persisted.id().unwrap(), Some("100".to_string()));
    assert_eq!(persisted.value().unwrap(), Some("VALUE".to_string()));

    let err = service.persist(&ts).unwrap_err();
    assert!(matches!(err, LiveError::AlreadyExists(_)));
}

#[test]
fn test_persist_with_explicit_id_roundtrip() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("55555".into()),
        ..Default::default()
    };
    service.persist(&ts).unwrap();

    let fetched = service.get::<TestClass>("55555").unwrap().unwrap();
    assert_eq!(fetched.id().unwrap(), Some("55555".to_string()));

    assert!(matches!(
        service.persist(&ts).unwrap_err(),
        LiveError::AlreadyExists(_)
    ));
}

#[test]
fn test_array_id_is_rejected() {
    let (_client, service) = setup();
    let err = service
        .get::<TestClass>(Value::Bytes(vec![1, 2, 3, 4, 5]))
        .unwrap_err();
    assert!(matches!(err, LiveError::Validation(_)));
    assert!(err.to_string().contains("cannot be an array"));

    let err = service
        .delete_by_id::<TestClass>(Value::List(vec![Value::Integer(1)]))
        .unwrap_err();
    assert!(matches!(err, LiveError::Validation(_)));
}

#[test]
fn test_persist_array_id_is_rejected() {
    let (_client, service) = setup();
    let bad = FreeIdObject {
        id: Some(Value::Bytes(vec![1, 2, 3, 4, 5])),
        value: None,
    };
    let err = service.persist(&bad).unwrap_err();
    assert!(err.to_string().contains("cannot be an array"));

    let bad = FreeIdObject {
        id: Some(Value::List(vec![Value::Integer(1)])),
        value: None,
    };
    assert!(matches!(
        service.persist(&bad).unwrap_err(),
        LiveError::Validation(_)
    ));

    // a scalar id passes through the same path untouched
    let good = FreeIdObject {
        id: Some(Value::Text("free-1".into())),
        value: Some("v".into()),
    };
    assert!(service.persist(&good).is_ok());
}

#[test]
fn test_merge() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("100".into()),
        value: Some("VALUE".into()),
        code: None,
    };
    let merged = service.merge(&ts).unwrap();
    assert_eq!(merged.id().unwrap(), Some("100".to_string()));
    assert_eq!(merged.value().unwrap(), Some("VALUE".to_string()));
    assert!(matches!(
        service.persist(&ts).unwrap_err(),
        LiveError::AlreadyExists(_)
    ));

    // a second sparse instance only overwrites the fields it carries
    let ts = TestClass {
        id: Some("100".into()),
        code: Some("CODE".into()),
        value: None,
    };
    let merged = service.merge(&ts).unwrap();
    assert_eq!(ts.value, None); // the passed instance stays transient
    assert_eq!(merged.value().unwrap(), Some("VALUE".to_string()));
    assert_eq!(merged.code().unwrap(), Some("CODE".to_string()));
}

#[test]
fn test_merge_is_idempotent() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("idem".into()),
        value: Some("V".into()),
        code: Some("C".into()),
    };
    let first = service.merge(&ts).unwrap();
    let after_first = service.detach(&first).unwrap();

    let second = service.merge(&ts).unwrap();
    let after_second = service.detach(&second).unwrap();
    assert_eq!(after_first, after_second);
}

#[test]
fn test_detach() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("100".into()),
        value: Some("VALUE".into()),
        code: Some("CODE".into()),
    };
    let merged = service.merge(&ts).unwrap();
    assert_eq!(merged.value().unwrap(), Some("VALUE".to_string()));

    let detached = service.detach(&merged).unwrap();
    assert_eq!(detached, ts);
}

#[test]
fn test_is_phantom() {
    let (_client, service) = setup();
    assert!(service.get::<TestClass>("100").unwrap().is_none());

    let ts = TestClass {
        id: Some("100".into()),
        value: Some("VALUE".into()),
        code: Some("CODE".into()),
    };
    let persisted = service.persist(&ts).unwrap();
    assert!(service.is_exists(&persisted).unwrap());
    assert_eq!(persisted.state().unwrap(), ObjectState::Live);

    service.delete(&persisted).unwrap();
    assert!(!service.is_exists(&persisted).unwrap());
    assert_eq!(persisted.state().unwrap(), ObjectState::Phantom);

    // phantom reads return defaults; the key is gone
    assert_eq!(persisted.get("value").unwrap(), Value::Null);
    assert!(service.get::<TestClass>("100").unwrap().is_none());

    // writes go through and re-create the representation
    persisted.set("value", "back").unwrap();
    assert!(service.is_exists(&persisted).unwrap());
}

#[test]
fn test_is_live_object() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("100".into()),
        ..Default::default()
    };
    assert!(!service.is_live_object::<TestClass>(&ts));

    let persisted = service.persist(&ts).unwrap();
    assert!(!service.is_live_object::<TestClass>(&ts));
    assert!(service.is_live_object::<TestClass>(&persisted));
}

#[test]
fn test_as_live_object() {
    let (_client, service) = setup();
    let instance = TestClass {
        id: Some("100".into()),
        ..Default::default()
    };
    let live = service.persist(&instance).unwrap();

    let view = service.as_live_object::<TestClass>(&live).unwrap();
    assert_eq!(view.object_id(), Value::Text("100".into()));

    let err = service.as_live_object::<TestClass>(&instance).unwrap_err();
    assert!(matches!(err, LiveError::TypeMisuse(_)));
}

#[test]
fn test_class_registration() {
    let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
    let client = Client::with_store(Arc::clone(&store));
    let service = client.live_object_service();

    service.register_class::<TestClass>().unwrap();
    assert!(service.is_class_registered::<TestClass>());

    // a second façade from the same handle shares the registry
    let new_service = client.live_object_service();
    assert!(new_service.is_class_registered::<TestClass>());

    // an independent handle over the same store does not
    let new_client = Client::with_store(store);
    assert!(
        !new_client
            .live_object_service()
            .is_class_registered::<TestClass>()
    );
}

#[test]
fn test_class_unregistration() {
    let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
    let client = Client::with_store(Arc::clone(&store));
    let service = client.live_object_service();
    service.register_class::<TestClass>().unwrap();
    let new_service = client.live_object_service();

    let new_client = Client::with_store(store);
    new_client
        .live_object_service()
        .register_class::<TestClass>()
        .unwrap();

    new_service.unregister_class::<TestClass>().unwrap();
    assert!(!service.is_class_registered::<TestClass>());
    assert!(!new_service.is_class_registered::<TestClass>());
    assert!(
        new_client
            .live_object_service()
            .is_class_registered::<TestClass>()
    );
}

#[test]
fn test_registry_is_safe_under_concurrent_use() {
    let client = Arc::new(Client::in_memory());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        handles.push(std::thread::spawn(move || {
            let service = client.live_object_service();
            for _ in 0..50 {
                service.register_class::<TestClass>().unwrap();
                let _ = service.is_class_registered::<TestClass>();
                service.unregister_class::<TestClass>().unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_get() {
    let (_client, service) = setup();
    assert!(service.get::<TestClass>("100").unwrap().is_none());

    let ts = TestClass {
        id: Some("100".into()),
        ..Default::default()
    };
    let persisted = service.persist(&ts).unwrap();
    assert!(service.get::<TestClass>("100").unwrap().is_some());

    persisted.set_code(Some("CODE".into())).unwrap();
    assert!(service.get::<TestClass>("100").unwrap().is_some());
}

#[test]
fn test_remove_by_instance() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("100".into()),
        code: Some("CODE".into()),
        ..Default::default()
    };
    let persisted = service.persist(&ts).unwrap();
    assert!(service.is_exists(&persisted).unwrap());

    assert!(service.delete(&persisted).unwrap());
    assert!(!service.is_exists(&persisted).unwrap());
    // removing again is a no-op
    assert!(!service.delete(&persisted).unwrap());
}

#[test]
fn test_remove_by_id() {
    let (_client, service) = setup();
    let ts = TestClass {
        id: Some("100".into()),
        code: Some("CODE".into()),
        ..Default::default()
    };
    let persisted = service.persist(&ts).unwrap();
    assert!(service.is_exists(&persisted).unwrap());

    assert!(service.delete_by_id::<TestClass>("100").unwrap());
    assert!(!service.is_exists(&persisted).unwrap());
}

#[test]
fn test_attach_requires_id() {
    let (_client, service) = setup();
    let object = MyObject {
        my_id: Some(20),
        ..Default::default()
    };
    let err = service.attach(&object).unwrap_err();
    assert!(matches!(err, LiveError::RequiredValue(field) if field == "id"));
}

#[test]
fn test_attach_binds_without_store_access() {
    let (_client, service) = setup();
    let object = TestClass {
        id: Some("detached-key".into()),
        ..Default::default()
    };
    let live = service.attach(&object).unwrap();
    // nothing was created
    assert!(!service.is_exists(&live).unwrap());
    assert_eq!(live.key(), "live_object:TestClass:id:detached-key");
}

#[test]
fn test_nested_entity_as_id_is_rejected() {
    let (_client, service) = setup();
    let t1 = TestEntity {
        name: Some("1".into()),
        value: None,
    };
    let t1 = service.persist(&t1).unwrap();
    assert!(t1.is_exists().unwrap());

    let nested = NestedIdEntity::default();
    let err = service.persist(&nested).unwrap_err();
    assert!(err.to_string().contains("itself a registered entity"));
}

#[test]
fn test_field_accessor() {
    let (_client, service) = setup();
    let my_object = service.persist(&TestClass::default()).unwrap();

    my_object.set_field("value", "123345").unwrap();
    assert_eq!(
        my_object.field("value").unwrap(),
        Value::Text("123345".into())
    );
    my_object.set_field("value", "9999").unwrap();
    assert_eq!(my_object.field("value").unwrap(), Value::Text("9999".into()));
    assert_eq!(my_object.value().unwrap(), Some("9999".to_string()));

    assert!(matches!(
        my_object.field("555555").unwrap_err(),
        LiveError::FieldNotFound(_, _)
    ));
    assert!(matches!(
        my_object.set_field("555555", "999").unwrap_err(),
        LiveError::FieldNotFound(_, _)
    ));
}

#[test]
fn test_field_accessor_disabled_by_default() {
    let (_client, service) = setup();
    let live = service
        .persist(&TestEntity {
            name: Some("acc".into()),
            value: None,
        })
        .unwrap();

    let err = live.field("value").unwrap_err();
    assert!(matches!(err, LiveError::TypeMisuse(_)));
    // typed access is unaffected
    live.set_value(Some("x".into())).unwrap();
    assert_eq!(live.value().unwrap(), Some("x".to_string()));
}

#[test]
fn test_raw_map_view() {
    let (_client, service) = setup();
    let my_object = service.persist(&TestClass::default()).unwrap();

    my_object.set("value", "123345").unwrap();
    let raw = service.as_map(&my_object);
    assert_eq!(raw.get("value").unwrap(), Some(Value::Text("123345".into())));

    raw.put("value", "9999").unwrap();
    assert_eq!(my_object.value().unwrap(), Some("9999".to_string()));
}

#[test]
fn test_raw_operations_on_proxy_fail_loudly() {
    let (_client, service) = setup();
    let my_object = service.persist(&TestClass::default()).unwrap();

    let err = my_object.raw_exists().unwrap_err();
    assert!(err.to_string().contains("raw view"));
    assert!(my_object.raw_delete().is_err());
    assert!(
        my_object
            .raw_expire(std::time::Duration::from_secs(1))
            .is_err()
    );

    // the explicit view performs the same operations for real
    let expirable = service.as_expirable(&my_object);
    assert!(expirable.raw_exists().unwrap());
}
