//! End-to-end scheduling flow over the public API, with a subscriber
//! watching room notifications the whole way through.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ulid::Ulid;

use roomledger::config::EngineConfig;
use roomledger::engine::Violation;
use roomledger::model::{AllocationEvent, AllocationInput, BlackoutWindow, Exam, Slot, Term};
use roomledger::notify::NotifyHub;
use roomledger::{Engine, EngineError};

fn utc(m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

async fn recv(rx: &mut tokio::sync::broadcast::Receiver<AllocationEvent>) -> AllocationEvent {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("subscriber starved")
        .expect("channel closed")
}

#[tokio::test]
async fn full_scheduling_lifecycle() {
    let config = EngineConfig {
        timezone: chrono_tz::UTC,
        ..EngineConfig::default()
    };
    let notify = Arc::new(NotifyHub::new());
    let engine = Arc::new(Engine::new(config, notify.clone()));

    let term_id = Ulid::new();
    engine
        .register_term(Term {
            id: term_id,
            name: "Spring 2024".into(),
            code: "S24".into(),
            start_date: date(3, 20),
            end_date: date(6, 20),
            published: true,
        })
        .await
        .unwrap();

    let exam_id = Ulid::new();
    engine
        .register_exam(Exam {
            id: exam_id,
            title: "Databases Final".into(),
            course_code: "CS-420".into(),
            expected_students: 90,
            duration_minutes: 120,
            term_id,
        })
        .await
        .unwrap();

    let hall = Ulid::new();
    let annex = Ulid::new();
    let mut hall_rx = notify.subscribe(hall);
    engine.create_room(hall, "Main Hall", 100).await.unwrap();
    engine.create_room(annex, "Annex", 40).await.unwrap();
    assert!(matches!(
        recv(&mut hall_rx).await,
        AllocationEvent::RoomCreated { id, capacity: 100, .. } if id == hall
    ));

    // First sitting admitted, second sitting overlaps and overflows.
    let first = Ulid::new();
    engine
        .validate_and_persist(
            first,
            AllocationInput {
                exam_id,
                room_id: hall,
                start_at: utc(4, 10, 8),
                end_at: utc(4, 10, 10),
                seats: 90,
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        recv(&mut hall_rx).await,
        AllocationEvent::AllocationCommitted { id, seats: 90, .. } if id == first
    ));

    let overflow = engine
        .validate_and_persist(
            Ulid::new(),
            AllocationInput {
                exam_id,
                room_id: hall,
                start_at: utc(4, 10, 9),
                end_at: utc(4, 10, 11),
                seats: 20,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        overflow,
        EngineError::Rejected(Violation::Capacity {
            capacity: 100,
            peak: 110
        })
    );

    // Back-to-back second sitting is fine.
    let second = Ulid::new();
    engine
        .validate_and_persist(
            second,
            AllocationInput {
                exam_id,
                room_id: hall,
                start_at: utc(4, 10, 10),
                end_at: utc(4, 10, 12),
                seats: 90,
            },
        )
        .await
        .unwrap();
    let _ = recv(&mut hall_rx).await;

    // A campus-wide blackout lands; rescheduling into it fails, and the
    // subscriber hears about the blackout.
    let blackout = Ulid::new();
    engine
        .add_blackout(BlackoutWindow {
            id: blackout,
            name: "Power maintenance".into(),
            slot: Slot::new(utc(4, 11, 6), utc(4, 11, 18)),
            room_id: None,
        })
        .await
        .unwrap();
    assert!(matches!(
        recv(&mut hall_rx).await,
        AllocationEvent::BlackoutAdded { id, room_id: None } if id == blackout
    ));
    let rejected = engine
        .replace_allocation(
            second,
            AllocationInput {
                exam_id,
                room_id: hall,
                start_at: utc(4, 11, 10),
                end_at: utc(4, 11, 12),
                seats: 90,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        rejected,
        EngineError::Rejected(Violation::Blackout { blackout_id: blackout })
    );

    // Move the second sitting to the annex instead (smaller seat count fits).
    engine
        .replace_allocation(
            second,
            AllocationInput {
                exam_id,
                room_id: annex,
                start_at: utc(4, 12, 10),
                end_at: utc(4, 12, 12),
                seats: 40,
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        recv(&mut hall_rx).await,
        AllocationEvent::AllocationCancelled { id, .. } if id == second
    ));
    assert_eq!(engine.get_allocations(hall).await.len(), 1);
    assert_eq!(engine.get_allocations(annex).await.len(), 1);

    // Heatmap over both rooms reflects the final state.
    let maps = engine
        .capacity_heatmap(&[hall, annex], term_id, date(4, 10), date(4, 12))
        .await
        .unwrap();
    assert_eq!(maps.len(), 2);
    let hall_map = maps.iter().find(|m| m.room_id == hall).unwrap();
    assert!((hall_map.days[0].utilization - 0.9).abs() < 1e-9);
    let annex_map = maps.iter().find(|m| m.room_id == annex).unwrap();
    assert_eq!(annex_map.days[2].peak_seats, 40);
    assert!((annex_map.days[2].utilization - 1.0).abs() < 1e-9);

    // Cancel everything; the room drains and can be deleted.
    engine.cancel_allocation(first).await.unwrap();
    assert!(matches!(
        recv(&mut hall_rx).await,
        AllocationEvent::AllocationCancelled { id, .. } if id == first
    ));
    engine.delete_room(hall).await.unwrap();
    assert!(engine.get_room_info(hall).await.is_none());
}

#[tokio::test]
async fn listing_queries_reflect_committed_state() {
    let config = EngineConfig {
        timezone: chrono_tz::UTC,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, Arc::new(NotifyHub::new()));

    let term_id = Ulid::new();
    engine
        .register_term(Term {
            id: term_id,
            name: "Fall 2024".into(),
            code: "F24".into(),
            start_date: date(9, 20),
            end_date: date(12, 20),
            published: false,
        })
        .await
        .unwrap();
    let exam_id = Ulid::new();
    engine
        .register_exam(Exam {
            id: exam_id,
            title: "Midterm".into(),
            course_code: "MA-200".into(),
            expected_students: 25,
            duration_minutes: 90,
            term_id,
        })
        .await
        .unwrap();

    let (a, b) = (Ulid::new(), Ulid::new());
    engine.create_room(a, "B Wing", 30).await.unwrap();
    engine.create_room(b, "A Wing", 60).await.unwrap();

    let id = Ulid::new();
    engine
        .validate_and_persist(
            id,
            AllocationInput {
                exam_id,
                room_id: a,
                start_at: utc(10, 1, 8),
                end_at: utc(10, 1, 10),
                seats: 25,
            },
        )
        .await
        .unwrap();

    let rooms = engine.list_rooms().await;
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].name, "A Wing"); // sorted by name
    assert_eq!(rooms[1].allocation_count, 1);

    let (room_id, allocation) = engine.get_allocation(id).await.unwrap();
    assert_eq!(room_id, a);
    assert_eq!(allocation.seats, 25);
    assert_eq!(allocation.exam_id, exam_id);
}
