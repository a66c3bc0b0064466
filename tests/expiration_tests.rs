use std::thread;
use std::time::Duration;

use rustliveobj::prelude::*;

#[derive(Entity, Default)]
struct TestClass {
    #[entity(id)]
    id: Option<String>,
    value: Option<String>,
}

#[test]
fn test_expirable() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let my_object = service.persist(&TestClass::default()).unwrap();
    my_object.set_value(Some("123345".into())).unwrap();
    assert!(service.is_exists(&my_object).unwrap());

    service
        .as_expirable(&my_object)
        .expire(Duration::from_millis(50))
        .unwrap();
    thread::sleep(Duration::from_millis(120));

    // the key disappeared without any explicit delete
    assert!(!service.is_exists(&my_object).unwrap());
    assert_eq!(my_object.get("value").unwrap(), Value::Null);
}

#[test]
fn test_expire_before_deadline_keeps_object() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let my_object = service.persist(&TestClass::default()).unwrap();
    service
        .as_expirable(&my_object)
        .expire(Duration::from_secs(60))
        .unwrap();

    assert!(service.is_exists(&my_object).unwrap());
}

#[test]
fn test_expire_missing_key_reports_false() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let my_object = service.persist(&TestClass::default()).unwrap();
    service.delete(&my_object).unwrap();

    let applied = service
        .as_expirable(&my_object)
        .expire(Duration::from_secs(1))
        .unwrap();
    assert!(!applied);
}

#[test]
fn test_get_after_expiry_returns_none() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let instance = TestClass {
        id: Some("ttl".into()),
        value: Some("short-lived".into()),
    };
    let live = service.persist(&instance).unwrap();
    service
        .as_expirable(&live)
        .expire(Duration::from_millis(40))
        .unwrap();

    assert!(service.get::<TestClass>("ttl").unwrap().is_some());
    thread::sleep(Duration::from_millis(100));
    assert!(service.get::<TestClass>("ttl").unwrap().is_none());
}
