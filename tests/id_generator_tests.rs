use std::sync::Arc;

use rustliveobj::prelude::*;
use uuid::Uuid;

#[derive(Entity, Default)]
struct TestClass {
    #[entity(id)]
    id: Option<String>,
    value: Option<String>,
}

#[derive(Entity, Default)]
struct FirstCounter {
    #[entity(id, generator = "sequence")]
    id: Option<i64>,
}

#[derive(Entity, Default)]
struct SecondCounter {
    #[entity(id, generator = "sequence")]
    id: Option<i64>,
}

#[derive(Entity, Default)]
struct ExplicitOnly {
    #[entity(id, generator = "explicit")]
    id: Option<String>,
    value: Option<String>,
}

#[test]
fn test_unset_id_gets_canonical_uuid_v4() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let live = service.persist(&TestClass::default()).unwrap();
    let id = live.id().unwrap().unwrap();

    let parsed = Uuid::parse_str(&id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
    assert_eq!(parsed.get_variant(), uuid::Variant::RFC4122);
    assert_eq!(id, parsed.hyphenated().to_string());

    // the generated id addresses the object
    assert!(service.get::<TestClass>(id.as_str()).unwrap().is_some());
}

#[test]
fn test_sequences_start_at_one_per_type() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let tc1 = service.persist(&FirstCounter::default()).unwrap();
    assert_eq!(tc1.id().unwrap(), Some(1));
    let tc1 = service.persist(&FirstCounter::default()).unwrap();
    assert_eq!(tc1.id().unwrap(), Some(2));

    // an unrelated type allocates independently
    let tc2 = service.persist(&SecondCounter::default()).unwrap();
    assert_eq!(tc2.id().unwrap(), Some(1));
}

#[test]
fn test_explicit_strategy_requires_id() {
    let client = Client::in_memory();
    let service = client.live_object_service();

    let err = service.persist(&ExplicitOnly::default()).unwrap_err();
    assert!(matches!(err, LiveError::RequiredValue(field) if field == "id"));

    let ok = ExplicitOnly {
        id: Some("given".into()),
        value: None,
    };
    assert!(service.persist(&ok).is_ok());
}

#[test]
fn test_concurrent_sequence_allocation_has_no_gaps() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 4;

    let client = Arc::new(Client::in_memory());
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let client = Arc::clone(&client);
        handles.push(std::thread::spawn(move || {
            let service = client.live_object_service();
            let mut ids = Vec::new();
            for _ in 0..PER_THREAD {
                let live = service.persist(&FirstCounter::default()).unwrap();
                ids.push(live.id().unwrap().unwrap());
            }
            ids
        }));
    }

    let mut all: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    all.sort_unstable();

    // N distinct consecutive values from 1, no duplicates, no gaps
    let expected: Vec<i64> = (1..=(THREADS * PER_THREAD) as i64).collect();
    assert_eq!(all, expected);
}
