use chrono::{TimeZone, Utc};
use conference_core::db::open_db_in_memory;
use conference_core::{
    EntityCache, EntityId, EntityRepository, FetchMode, PageRequest, Reference, Room,
    SortOrder, SqliteEntityRepository, Talk, TalkRelationResolver, Timeslot,
};
use rusqlite::Connection;

struct Fixture {
    conn: Connection,
    rooms: EntityCache<Room>,
    slots: EntityCache<Timeslot>,
    talks: EntityCache<Talk>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            conn: open_db_in_memory().unwrap(),
            rooms: EntityCache::new(),
            slots: EntityCache::new(),
            talks: EntityCache::new(),
        }
    }

    fn room(&self, name: &str) -> EntityId {
        SqliteEntityRepository::try_new(&self.conn, &self.rooms)
            .unwrap()
            .create(&Room::new(name, Some(50)))
            .unwrap()
            .id
    }

    fn slot(&self) -> EntityId {
        SqliteEntityRepository::try_new(&self.conn, &self.slots)
            .unwrap()
            .create(&Timeslot::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            ))
            .unwrap()
            .id
    }

    fn talk(&self, title: &str, room: EntityId, slot: EntityId) -> EntityId {
        self.talk_repo()
            .create(&Talk {
                title: title.to_string(),
                speaker: "speaker".to_string(),
                abstract_text: "abstract".to_string(),
                room: Reference::Id(room),
                timeslot: Reference::Id(slot),
            })
            .unwrap()
            .id
    }

    fn talk_repo(&self) -> SqliteEntityRepository<'_, Talk> {
        SqliteEntityRepository::try_new(&self.conn, &self.talks).unwrap()
    }
}

#[test]
fn eager_resolution_inlines_room_and_keeps_timeslot_reference() {
    let fx = Fixture::new();
    let room = fx.room("Hall A");
    let slot = fx.slot();
    let talk = fx.talk("Rust", room, slot);

    let resolved = TalkRelationResolver::new(&fx.conn)
        .resolve(&[talk], FetchMode::Eager)
        .unwrap();

    assert_eq!(resolved.len(), 1);
    let loaded = resolved[0].value.room.loaded().expect("room should be loaded");
    assert_eq!(loaded.id, room);
    assert_eq!(loaded.value, Room::new("Hall A", Some(50)));
    assert!(!resolved[0].value.timeslot.is_loaded());
    assert_eq!(resolved[0].value.timeslot.id(), slot);
}

#[test]
fn lazy_resolution_returns_foreign_keys_only() {
    let fx = Fixture::new();
    let room = fx.room("Hall A");
    let slot = fx.slot();
    let talk = fx.talk("Rust", room, slot);

    let resolved = TalkRelationResolver::new(&fx.conn)
        .resolve(&[talk], FetchMode::Lazy)
        .unwrap();

    assert!(!resolved[0].value.room.is_loaded());
    assert_eq!(resolved[0].value.room.id(), room);
}

#[test]
fn talks_sharing_a_room_are_each_returned_once() {
    let fx = Fixture::new();
    let room = fx.room("Hall A");
    let slot = fx.slot();
    let ids: Vec<EntityId> = (0..4)
        .map(|index| fx.talk(&format!("talk-{index}"), room, slot))
        .collect();

    let resolved = TalkRelationResolver::new(&fx.conn)
        .resolve(&ids, FetchMode::Eager)
        .unwrap();

    let got: Vec<EntityId> = resolved.iter().map(|stored| stored.id).collect();
    assert_eq!(got, ids);
    assert!(resolved
        .iter()
        .all(|stored| stored.value.room.loaded().map(|r| r.id) == Some(room)));
}

#[test]
fn resolution_follows_request_order_and_drops_repeats_and_missing_ids() {
    let fx = Fixture::new();
    let room_a = fx.room("A");
    let room_b = fx.room("B");
    let slot = fx.slot();
    let first = fx.talk("first", room_a, slot);
    let second = fx.talk("second", room_b, slot);

    let resolved = TalkRelationResolver::new(&fx.conn)
        .resolve(&[second, 999, first, second], FetchMode::Eager)
        .unwrap();

    let got: Vec<EntityId> = resolved.iter().map(|stored| stored.id).collect();
    assert_eq!(got, vec![second, first]);
    assert_eq!(resolved[0].value.room.id(), room_b);
    assert_eq!(resolved[1].value.room.id(), room_a);
}

#[test]
fn resolution_spans_multiple_query_chunks() {
    let fx = Fixture::new();
    let room = fx.room("Hall A");
    let slot = fx.slot();
    let ids: Vec<EntityId> = (0..1_100)
        .map(|index| fx.talk(&format!("talk-{index}"), room, slot))
        .collect();

    let resolved = TalkRelationResolver::new(&fx.conn)
        .resolve(&ids, FetchMode::Eager)
        .unwrap();
    assert_eq!(resolved.len(), ids.len());
    assert_eq!(resolved.last().map(|stored| stored.id), ids.last().copied());
}

#[test]
fn attaching_rooms_keeps_talks_as_given() {
    let fx = Fixture::new();
    let room_a = fx.room("A");
    let room_b = fx.room("B");
    let slot = fx.slot();
    let first = fx.talk("first", room_a, slot);
    let second = fx.talk("second", room_b, slot);
    let third = fx.talk("third", room_a, slot);

    let mut talks = fx
        .talk_repo()
        .list_page(&PageRequest::new(0, 10).sorted_by(SortOrder::asc("id")))
        .unwrap()
        .content;
    talks.reverse();
    talks[0].value.title = "edited in memory".to_string();

    let attached = TalkRelationResolver::new(&fx.conn)
        .attach_rooms(talks)
        .unwrap();

    let got: Vec<EntityId> = attached.iter().map(|stored| stored.id).collect();
    assert_eq!(got, vec![third, second, first]);
    assert_eq!(attached[0].value.title, "edited in memory");
    let rooms: Vec<Option<&str>> = attached
        .iter()
        .map(|stored| stored.value.room.loaded().map(|room| room.value.name.as_str()))
        .collect();
    assert_eq!(rooms, vec![Some("A"), Some("B"), Some("A")]);
    assert!(attached.iter().all(|stored| !stored.value.timeslot.is_loaded()));
}

#[test]
fn repository_list_applies_fetch_mode_to_page_content() {
    let fx = Fixture::new();
    let room = fx.room("Hall A");
    let slot = fx.slot();
    fx.talk("b", room, slot);
    fx.talk("a", room, slot);

    let repo = fx.talk_repo();
    let page = repo
        .list_page(&PageRequest::new(0, 10).sorted_by(SortOrder::asc("title")))
        .unwrap();

    let eager = repo.resolve(page.content.clone(), FetchMode::Eager).unwrap();
    let titles: Vec<&str> = eager.iter().map(|s| s.value.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b"]);
    assert!(eager.iter().all(|s| s.value.room.is_loaded()));

    let lazy = repo.resolve(eager, FetchMode::Lazy).unwrap();
    assert!(lazy.iter().all(|s| !s.value.room.is_loaded()));
}

#[test]
fn fetch_mode_maps_eager_flag() {
    assert_eq!(FetchMode::from_eager_flag(true), FetchMode::Eager);
    assert_eq!(FetchMode::from_eager_flag(false), FetchMode::Lazy);
    assert_eq!(FetchMode::default(), FetchMode::Eager);
}
