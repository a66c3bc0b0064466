use std::collections::HashMap;

use rustliveobj::prelude::*;
use rustliveobj::EntityRef;

#[derive(Entity, Default, Debug, Clone, PartialEq)]
struct SimpleObject {
    #[entity(id)]
    id: Option<String>,
    value: Option<i64>,
}

#[derive(Entity, Default)]
struct ObjectWithRef {
    #[entity(id)]
    id: Option<String>,
    #[entity(reference)]
    so: Option<SimpleObject>,
    objects: Vec<Value>,
}

#[derive(Entity, Default)]
struct MapHolder {
    #[entity(id)]
    name: Option<String>,
    value: HashMap<String, String>,
}

#[derive(Entity, Default)]
struct ValueNested {
    #[entity(id)]
    name: Option<String>,
    #[entity(reference)]
    value: Option<MapHolder>,
}

fn setup() -> (Client, LiveObjectService) {
    let client = Client::in_memory();
    let service = client.live_object_service();
    (client, service)
}

#[test]
fn test_reference_stores_key_not_state() {
    let (_client, service) = setup();
    let owner = service
        .persist(&ObjectWithRef {
            id: Some("owner".into()),
            ..Default::default()
        })
        .unwrap();
    let nested = service
        .persist(&SimpleObject {
            id: Some("n1".into()),
            value: Some(10),
        })
        .unwrap();

    owner.set_so(&nested).unwrap();

    // the stored entry is a pointer, not an embedded copy
    let raw = service.as_map(&owner);
    assert!(matches!(
        raw.get("so").unwrap(),
        Some(Value::Reference(r)) if r.type_name == "SimpleObject"
    ));
}

#[test]
fn test_nested_reference_freshness() {
    let (_client, service) = setup();
    let owner = service
        .persist(&ObjectWithRef {
            id: Some("fresh".into()),
            ..Default::default()
        })
        .unwrap();
    let nested = service
        .persist(&SimpleObject {
            id: Some("n2".into()),
            value: Some(1),
        })
        .unwrap();
    owner.set_so(&nested).unwrap();

    // mutate through an unrelated handle to the same nested object
    let other_handle = service.get::<SimpleObject>("n2").unwrap().unwrap();
    other_handle.set_value(Some(42)).unwrap();

    // a fresh read through the owner sees the new value immediately
    let through_owner = owner.so().unwrap().unwrap();
    assert_eq!(through_owner.value().unwrap(), Some(42));
}

#[test]
fn test_store_inner_object() {
    let (_client, service) = setup();
    let so = service.persist(&ObjectWithRef::default()).unwrap();
    let s = service.persist(&SimpleObject::default()).unwrap();
    let s_id = s.id().unwrap();
    assert!(s_id.is_some());

    so.set_so(&s).unwrap();
    so.list_of("objects")
        .unwrap()
        .push(Value::Reference(EntityRef::new(
            "SimpleObject",
            s.object_id(),
        )))
        .unwrap();

    let detached = service.detach(&so).unwrap();
    assert_eq!(detached.so.as_ref().and_then(|n| n.id.clone()), s_id);
    assert!(matches!(
        &detached.objects[0],
        Value::Reference(r) if *r.id == s.object_id()
    ));
}

#[test]
fn test_detach_resolves_nested_state() {
    let (_client, service) = setup();
    let owner = service
        .persist(&ObjectWithRef {
            id: Some("deep".into()),
            ..Default::default()
        })
        .unwrap();
    let nested = service
        .persist(&SimpleObject {
            id: Some("n3".into()),
            value: Some(7),
        })
        .unwrap();
    owner.set_so(&nested).unwrap();

    let detached = service.detach(&owner).unwrap();
    assert_eq!(
        detached.so,
        Some(SimpleObject {
            id: Some("n3".into()),
            value: Some(7),
        })
    );
}

#[test]
fn test_unpersisted_reference_is_rejected() {
    let (_client, service) = setup();
    // the nested instance never got an id
    let instance = ObjectWithRef {
        id: Some("bad".into()),
        so: Some(SimpleObject::default()),
        ..Default::default()
    };
    let err = service.persist(&instance).unwrap_err();
    assert!(matches!(err, LiveError::RequiredValue(_)));
}

#[test]
fn test_nested_collection_through_reference_chain() {
    let (client, service) = setup();
    let t1 = service
        .persist(&MapHolder {
            name: Some("111".into()),
            ..Default::default()
        })
        .unwrap();
    let t2 = service
        .persist(&ValueNested {
            name: Some("122".into()),
            ..Default::default()
        })
        .unwrap();

    let map = client.get_map("32123");
    t2.set_value(&t1).unwrap();
    t2.value().unwrap().unwrap().set_value_live(&map).unwrap();
    map.put("field", "123").unwrap();

    assert_eq!(
        service
            .get::<MapHolder>("111")
            .unwrap()
            .unwrap()
            .value()
            .unwrap()
            .get("field")
            .unwrap(),
        Some(Value::Text("123".into()))
    );
    assert_eq!(
        service
            .get::<ValueNested>("122")
            .unwrap()
            .unwrap()
            .value()
            .unwrap()
            .unwrap()
            .value()
            .unwrap()
            .get("field")
            .unwrap(),
        Some(Value::Text("123".into()))
    );
}

#[test]
fn test_reference_persisted_from_transient_instance() {
    let (_client, service) = setup();
    service
        .persist(&SimpleObject {
            id: Some("pre".into()),
            value: Some(3),
        })
        .unwrap();

    // a transient instance can carry the reference as long as the nested
    // instance has its id
    let instance = ObjectWithRef {
        id: Some("carrier".into()),
        so: Some(SimpleObject {
            id: Some("pre".into()),
            value: None,
        }),
        ..Default::default()
    };
    let live = service.persist(&instance).unwrap();

    let through = live.so().unwrap().unwrap();
    assert_eq!(through.value().unwrap(), Some(3));
}
