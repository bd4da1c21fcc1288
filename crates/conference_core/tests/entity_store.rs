use chrono::{Duration, TimeZone, Timelike, Utc};
use conference_core::db::migrations::latest_version;
use conference_core::db::open_db_in_memory;
use conference_core::{
    EntityCache, EntityRepository, PageRequest, Reference, RepoError, Room, SortOrder,
    SqliteEntityRepository, Stored, Talk, Timeslot,
};
use rusqlite::Connection;
use std::num::NonZeroUsize;

fn timeslot() -> Timeslot {
    Timeslot::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 45, 0).unwrap(),
    )
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let created = repo.create(&Room::new("Hall A", Some(100))).unwrap();
    assert_eq!(created.id, 1);

    cache.clear();
    let loaded = repo.get(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.value, Room::new("Hall A", Some(100)));
}

#[test]
fn timeslot_instants_roundtrip_with_millisecond_precision() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Timeslot>::try_new(&conn, &cache).unwrap();

    let start = Utc.timestamp_millis_opt(1_714_554_000_123).unwrap();
    let end = Utc.timestamp_millis_opt(1_714_550_400_000).unwrap();
    // End before start is accepted: no ordering rule exists.
    let created = repo.create(&Timeslot::new(start, end)).unwrap();

    cache.clear();
    let loaded = repo.get(created.id).unwrap().unwrap();
    assert_eq!(loaded.value.start, start);
    assert_eq!(loaded.value.end, end);
}

#[test]
fn created_timeslot_reads_back_the_same_from_cache_and_row() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Timeslot>::try_new(&conn, &cache).unwrap();

    let start = Utc
        .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
        .unwrap()
        .with_nanosecond(123_456_789)
        .unwrap();
    let end = start + Duration::minutes(45);
    let stored_start = Utc.timestamp_millis_opt(1_714_554_000_123).unwrap();

    let created = repo.create(&Timeslot::new(start, end)).unwrap();
    assert_eq!(created.value.start, stored_start);

    let cached = repo.get(created.id).unwrap().unwrap();
    cache.clear();
    let from_row = repo.get(created.id).unwrap().unwrap();
    assert_eq!(cached.value, from_row.value);
    assert_eq!(from_row.value.start, stored_start);

    let replaced = repo
        .replace(&Stored::new(created.id, Timeslot::new(end, start)))
        .unwrap();
    cache.clear();
    assert_eq!(replaced.value, repo.get(created.id).unwrap().unwrap().value);
}

#[test]
fn bounded_cache_drops_old_rows_but_store_still_serves_them() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::with_capacity(NonZeroUsize::new(2).unwrap());
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let ids: Vec<_> = (0..5)
        .map(|index| repo.create(&Room::new(format!("room-{index}"), None)).unwrap().id)
        .collect();

    let stats = cache.stats();
    assert_eq!((stats.entries, stats.capacity), (2, 2));
    assert!(!cache.contains(ids[0]));
    assert!(cache.contains(ids[4]));

    let oldest = repo.get(ids[0]).unwrap().unwrap();
    assert_eq!(oldest.value.name, "room-0");
    assert_eq!(cache.stats().misses, 1);
    assert!(cache.contains(ids[0]));
    assert_eq!(cache.stats().entries, 2);
}

#[test]
fn ids_are_assigned_sequentially_and_never_reused() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let first = repo.create(&Room::new("A", None)).unwrap();
    let second = repo.create(&Room::new("B", None)).unwrap();
    assert_eq!((first.id, second.id), (1, 2));

    repo.delete(second.id).unwrap();
    let third = repo.create(&Room::new("C", None)).unwrap();
    assert_eq!(third.id, 3);
}

#[test]
fn get_is_served_from_cache_after_first_read() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let created = repo.create(&Room::new("Hall A", None)).unwrap();
    cache.clear();

    repo.get(created.id).unwrap().unwrap();
    repo.get(created.id).unwrap().unwrap();

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn replace_is_visible_to_the_next_read() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let created = repo.create(&Room::new("Hall A", Some(100))).unwrap();
    repo.get(created.id).unwrap();

    repo.replace(&Stored::new(created.id, Room::new("Hall B", None)))
        .unwrap();

    let cached = repo.get(created.id).unwrap().unwrap();
    assert_eq!(cached.value, Room::new("Hall B", None));

    cache.clear();
    let from_row = repo.get(created.id).unwrap().unwrap();
    assert_eq!(from_row.value, Room::new("Hall B", None));
}

#[test]
fn replace_missing_row_returns_not_found_and_leaves_cache_empty() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let err = repo
        .replace(&Stored::new(999, Room::new("ghost", None)))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "room",
            id: 999
        }
    ));
    assert!(!cache.contains(999));
}

#[test]
fn delete_removes_row_and_is_safe_to_repeat() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let created = repo.create(&Room::new("Hall A", None)).unwrap();
    repo.delete(created.id).unwrap();
    repo.delete(created.id).unwrap();

    assert!(repo.get(created.id).unwrap().is_none());
    assert!(!repo.exists(created.id).unwrap());
}

#[test]
fn exists_checks_cache_and_rows() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let created = repo.create(&Room::new("Hall A", None)).unwrap();
    assert!(repo.exists(created.id).unwrap());

    cache.clear();
    assert!(repo.exists(created.id).unwrap());
    assert!(!repo.exists(created.id + 1).unwrap());
}

#[test]
fn talk_with_dangling_reference_is_rejected_by_store() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Talk>::try_new(&conn, &cache).unwrap();

    let talk = Talk {
        title: "t".to_string(),
        speaker: "s".to_string(),
        abstract_text: "a".to_string(),
        room: Reference::Id(7),
        timeslot: Reference::Id(8),
    };
    let err = repo.create(&talk).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(cache.stats().entries, 0);
}

#[test]
fn deleting_referenced_room_is_rejected_by_store() {
    let conn = open_db_in_memory().unwrap();
    let room_cache = EntityCache::new();
    let slot_cache = EntityCache::new();
    let talk_cache = EntityCache::new();
    let rooms = SqliteEntityRepository::<Room>::try_new(&conn, &room_cache).unwrap();
    let slots = SqliteEntityRepository::<Timeslot>::try_new(&conn, &slot_cache).unwrap();
    let talks = SqliteEntityRepository::<Talk>::try_new(&conn, &talk_cache).unwrap();

    let room = rooms.create(&Room::new("Hall A", None)).unwrap();
    let slot = slots.create(&timeslot()).unwrap();
    talks
        .create(&Talk {
            title: "t".to_string(),
            speaker: "s".to_string(),
            abstract_text: "a".to_string(),
            room: Reference::Id(room.id),
            timeslot: Reference::Id(slot.id),
        })
        .unwrap();

    assert!(matches!(rooms.delete(room.id), Err(RepoError::Db(_))));
    assert!(rooms.get(room.id).unwrap().is_some());
}

#[test]
fn paging_covers_every_row_exactly_once() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    for index in 0..7 {
        repo.create(&Room::new(format!("room-{index}"), Some(index)))
            .unwrap();
    }

    let size = 3;
    let first = repo
        .list_page(&PageRequest::new(0, size).sorted_by(SortOrder::asc("id")))
        .unwrap();
    assert_eq!(first.total_elements, 7);
    assert_eq!(first.total_pages(), 3);

    let mut seen = Vec::new();
    for page in 0..first.total_pages() {
        let request = PageRequest::new(u32::try_from(page).unwrap(), size)
            .sorted_by(SortOrder::asc("id"));
        let window = repo.list_page(&request).unwrap();
        seen.extend(window.content.into_iter().map(|stored| stored.id));
    }
    assert_eq!(seen, (1..=7).collect::<Vec<_>>());
}

#[test]
fn paging_honours_sort_direction_and_multiple_keys() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    repo.create(&Room::new("B", Some(10))).unwrap();
    repo.create(&Room::new("A", Some(10))).unwrap();
    repo.create(&Room::new("C", Some(50))).unwrap();

    let request = PageRequest::new(0, 10)
        .sorted_by(SortOrder::desc("capacity"))
        .sorted_by(SortOrder::asc("name"));
    let names: Vec<String> = repo
        .list_page(&request)
        .unwrap()
        .content
        .into_iter()
        .map(|stored| stored.value.name)
        .collect();
    assert_eq!(names, vec!["C", "A", "B"]);
}

#[test]
fn paging_past_the_end_returns_empty_window_with_totals() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();
    repo.create(&Room::new("A", None)).unwrap();

    let page = repo.list_page(&PageRequest::new(4, 20)).unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, 1);
    assert_eq!(page.number, 4);
}

#[test]
fn list_rejects_unknown_sort_column() {
    let conn = open_db_in_memory().unwrap();
    let cache = EntityCache::new();
    let repo = SqliteEntityRepository::<Room>::try_new(&conn, &cache).unwrap();

    let request = PageRequest::new(0, 20).sorted_by(SortOrder::asc("name; DROP TABLE room"));
    assert!(matches!(
        repo.list_page(&request),
        Err(RepoError::InvalidQuery(_))
    ));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let cache = EntityCache::<Room>::new();

    match SqliteEntityRepository::try_new(&conn, &cache) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_entity_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();
    let cache = EntityCache::<Talk>::new();

    let result = SqliteEntityRepository::try_new(&conn, &cache);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("talk"))));
}
