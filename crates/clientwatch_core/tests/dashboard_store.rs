use clientwatch_core::model::daily::DAILY_SLOT_COUNT;
use clientwatch_core::model::state::Aggregate;
use clientwatch_core::repo::persistence::LocalPersistence;
use clientwatch_core::{
    ConfigError, DashboardConfig, DashboardStore, FixedClock, KvStore, LeadDraft, LeadPatch,
    LeadPriority, LeadStatus, MemoryKvStore, MoveDirection, SqliteKvStore, StoreError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const DAY_ONE: &str = "2026-10-17";
const DAY_TWO: &str = "2026-10-18";

fn open_store(kv: MemoryKvStore, clock: &FixedClock) -> DashboardStore<MemoryKvStore> {
    DashboardStore::open_with_rng(
        DashboardConfig::default(),
        kv,
        Box::new(clock.clone()),
        StdRng::seed_from_u64(11),
    )
    .unwrap()
}

fn fresh_store() -> (DashboardStore<MemoryKvStore>, FixedClock) {
    let clock = FixedClock::new(DAY_ONE, 1_000);
    (open_store(MemoryKvStore::new(), &clock), clock)
}

#[test]
fn first_open_seeds_tasks_and_draws_todays_challenges() {
    let (store, _clock) = fresh_store();

    assert_eq!(store.xp(), 0);
    assert!(!store.state().tasks.is_empty());
    assert_eq!(store.state().daily.date, DAY_ONE);
    assert_eq!(store.state().daily.items.len(), DAILY_SLOT_COUNT);
    assert_eq!(store.state().top.date, DAY_ONE);
    assert!(!store.is_top_stale());
    assert_eq!(store.rank().title(), "Bronze 5");
}

#[test]
fn xp_changes_are_clamped_to_the_ladder() {
    let (mut store, _clock) = fresh_store();
    let max = store.config().rank.max_xp();

    assert_eq!(store.add_xp(-50), 0);
    assert_eq!(store.add_xp(max + 1_000), max);
    assert_eq!(store.set_xp_exact(2_700), 2_700);
    assert_eq!(store.rank().title(), "Silver 5");

    store.reset_season();
    assert_eq!(store.xp(), 0);
}

#[test]
fn unchanged_xp_does_not_bump_revision() {
    let (mut store, _clock) = fresh_store();
    let revision = store.revision();

    store.add_xp(-10);
    store.set_xp_exact(0);
    assert_eq!(store.revision(), revision);

    store.add_xp(10);
    assert!(store.revision() > revision);
}

#[test]
fn task_add_validates_and_remove_requires_known_id() {
    let (mut store, _clock) = fresh_store();
    let seeded = store.state().tasks.len();

    let id = store.add_task("  Call Acme  ", 75, Some("calls")).unwrap();
    assert_eq!(store.state().tasks.len(), seeded + 1);
    let task = store.state().tasks.last().unwrap();
    assert_eq!(task.label, "Call Acme");
    assert_eq!(task.group.as_deref(), Some("calls"));

    assert!(matches!(
        store.add_task("   ", 10, None),
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        store.add_task("Zero", 0, None),
        Err(StoreError::Validation(_))
    ));

    store.remove_task(&id).unwrap();
    assert!(matches!(
        store.remove_task(&id),
        Err(StoreError::NotFound { kind: "task", .. })
    ));
}

#[test]
fn completing_daily_grants_xp_exactly_once() {
    let (mut store, _clock) = fresh_store();
    let item = store.state().daily.items[0].clone();

    assert!(store.complete_daily(&item.id).unwrap());
    assert_eq!(store.xp(), item.xp);

    let revision = store.revision();
    assert!(!store.complete_daily(&item.id).unwrap());
    assert_eq!(store.xp(), item.xp);
    assert_eq!(store.revision(), revision);

    assert!(store.complete_daily("dc-missing").is_err());
}

#[test]
fn reroll_replaces_item_with_one_not_already_shown() {
    let (mut store, _clock) = fresh_store();
    let before: Vec<String> = store
        .state()
        .daily
        .items
        .iter()
        .map(|item| item.id.clone())
        .collect();

    store.reroll_daily(&before[1]).unwrap();

    let after = &store.state().daily.items;
    assert_eq!(after.len(), DAILY_SLOT_COUNT);
    assert_eq!(after[0].id, before[0]);
    assert_eq!(after[2].id, before[2]);
    assert!(!before.contains(&after[1].id));
    assert!(store.reroll_daily("dc-missing").is_err());
}

#[test]
fn stale_daily_slot_is_regenerated_on_next_open() {
    let kv = MemoryKvStore::new();
    let clock = FixedClock::new(DAY_ONE, 1_000);
    let mut store = open_store(kv.clone(), &clock);
    let item_id = store.state().daily.items[0].id.clone();
    store.complete_daily(&item_id).unwrap();
    drop(store);

    let same_day = open_store(kv.clone(), &clock);
    assert!(same_day.state().daily.items[0].done);
    drop(same_day);

    clock.set_today(DAY_TWO);
    let next_day = open_store(kv, &clock);
    assert_eq!(next_day.state().daily.date, DAY_TWO);
    assert!(next_day.state().daily.items.iter().all(|item| !item.done));
}

#[test]
fn ensure_daily_fresh_is_idempotent_within_a_day() {
    let (mut store, clock) = fresh_store();
    assert!(!store.ensure_daily_fresh());

    clock.set_today(DAY_TWO);
    assert!(store.ensure_daily_fresh());
    assert!(!store.ensure_daily_fresh());
    assert_eq!(store.state().daily.date, DAY_TWO);
}

#[test]
fn completing_daily_after_midnight_acts_on_todays_slot() {
    let (mut store, clock) = fresh_store();
    let yesterday = store.state().daily.items[0].id.clone();
    store.complete_daily(&yesterday).unwrap();
    let xp_before = store.xp();

    clock.set_today(DAY_TWO);
    let outcome = store.complete_daily(&yesterday);

    let daily = &store.state().daily;
    assert_eq!(daily.date, DAY_TWO);
    assert_eq!(daily.items.len(), DAILY_SLOT_COUNT);
    let granted: i64 = daily
        .items
        .iter()
        .filter(|item| item.done)
        .map(|item| item.xp)
        .sum();
    assert_eq!(store.xp(), xp_before + granted);
    match outcome {
        Ok(newly_done) => assert!(newly_done),
        Err(err) => assert!(matches!(err, StoreError::NotFound { .. })),
    }
}

#[test]
fn reroll_after_midnight_starts_from_a_fresh_slot() {
    let (mut store, clock) = fresh_store();
    let yesterday = store.state().daily.items[0].id.clone();
    store.complete_daily(&yesterday).unwrap();

    clock.set_today(DAY_TWO);
    let _ = store.reroll_daily(&yesterday);

    let daily = &store.state().daily;
    assert_eq!(daily.date, DAY_TWO);
    assert_eq!(daily.items.len(), DAILY_SLOT_COUNT);
    assert!(daily.items.iter().all(|item| !item.done));
}

#[test]
fn open_rejects_invalid_config_without_touching_storage() {
    let kv = MemoryKvStore::new();
    let clock = FixedClock::new(DAY_ONE, 1_000);
    let config = DashboardConfig {
        namespace: String::new(),
        ..DashboardConfig::default()
    };

    let result = DashboardStore::open(config, kv.clone(), Box::new(clock));
    assert!(matches!(result, Err(ConfigError::InvalidNamespace(_))));
    assert!(kv.keys().is_empty());
}

#[test]
fn stale_top_slot_is_reported_but_kept() {
    let (mut store, clock) = fresh_store();
    store.add_top_custom("Close Acme", 200).unwrap();

    clock.set_today(DAY_TWO);
    assert!(store.is_top_stale());
    assert_eq!(store.state().top.items.len(), 1);

    store.reset_top();
    assert!(!store.is_top_stale());
    assert!(store.state().top.items.is_empty());
}

#[test]
fn toggling_top_grants_on_done_and_never_revokes() {
    let (mut store, _clock) = fresh_store();
    let id = store.add_top_custom("Close Acme", 200).unwrap();

    assert!(store.toggle_top(&id).unwrap());
    assert_eq!(store.xp(), 200);
    assert!(!store.toggle_top(&id).unwrap());
    assert_eq!(store.xp(), 200);
    assert!(store.toggle_top(&id).unwrap());
    assert_eq!(store.xp(), 400);
}

#[test]
fn top_capacity_rejection_leaves_state_untouched() {
    let (mut store, _clock) = fresh_store();
    for index in 0..store.config().top_capacity {
        store.add_top_custom(&format!("Item {index}"), 10).unwrap();
    }
    let snapshot = store.state().clone();
    let revision = store.revision();

    let err = store.add_top_custom("One more", 10).unwrap_err();
    assert!(matches!(err, StoreError::CapacityReached { capacity: 5 }));
    let task_id = store.state().tasks[0].id.clone();
    assert!(matches!(
        store.add_top_from_task(&task_id),
        Err(StoreError::CapacityReached { .. })
    ));

    assert_eq!(store.state(), &snapshot);
    assert_eq!(store.revision(), revision);
}

#[test]
fn same_task_cannot_be_copied_into_top_twice() {
    let (mut store, _clock) = fresh_store();
    let task = store.state().tasks[0].clone();

    let top_id = store.add_top_from_task(&task.id).unwrap();
    let item = &store.state().top.items[0];
    assert_eq!(item.id, top_id);
    assert_eq!(item.label, task.label);
    assert_eq!(item.xp, task.xp);
    assert_eq!(item.source_task_id.as_deref(), Some(task.id.as_str()));

    assert!(matches!(
        store.add_top_from_task(&task.id),
        Err(StoreError::DuplicateTopItem { .. })
    ));
    assert_eq!(store.state().top.items.len(), 1);
    assert!(store.add_top_from_task("no-such-task").is_err());
}

#[test]
fn custom_top_items_require_label_and_positive_xp() {
    let (mut store, _clock) = fresh_store();
    assert!(store.add_top_custom("", 10).is_err());
    assert!(store.add_top_custom("Valid", 0).is_err());
    assert!(store.state().top.items.is_empty());
}

#[test]
fn moves_at_boundaries_are_no_ops() {
    let (mut store, _clock) = fresh_store();
    let first = store.add_top_custom("First", 10).unwrap();
    let second = store.add_top_custom("Second", 10).unwrap();
    let revision = store.revision();

    assert!(!store.move_top(&first, MoveDirection::Up).unwrap());
    assert!(!store.move_top(&second, MoveDirection::Down).unwrap());
    assert_eq!(store.revision(), revision);

    assert!(store.move_top(&second, MoveDirection::Up).unwrap());
    assert_eq!(store.state().top.items[0].id, second);

    store.remove_top(&first).unwrap();
    assert_eq!(store.state().top.items.len(), 1);
}

#[test]
fn todo_lifecycle_toggle_move_and_clear() {
    let (mut store, _clock) = fresh_store();
    let a = store.add_todo("Draft proposal").unwrap();
    let b = store.add_todo("Email Bob").unwrap();
    let c = store.add_todo("Update CRM").unwrap();
    assert!(store.add_todo("  ").is_err());

    assert!(store.move_todo(&c, MoveDirection::Up).unwrap());
    let order: Vec<&str> = store
        .state()
        .todos
        .items
        .iter()
        .map(|todo| todo.id.as_str())
        .collect();
    assert_eq!(order, vec![a.as_str(), c.as_str(), b.as_str()]);
    assert!(!store.move_todo(&a, MoveDirection::Up).unwrap());

    assert!(store.toggle_todo(&a).unwrap());
    assert!(store.toggle_todo(&b).unwrap());
    assert_eq!(store.clear_completed_todos(), 2);
    assert_eq!(store.clear_completed_todos(), 0);
    assert_eq!(store.state().todos.items.len(), 1);

    store.remove_todo(&c).unwrap();
    assert!(store.remove_todo(&c).is_err());
}

#[test]
fn lead_updates_refresh_updated_at_and_keep_created_at() {
    let (mut store, clock) = fresh_store();
    let draft = LeadDraft {
        business: "Acme Ltd".to_string(),
        priority: LeadPriority::High,
        ..LeadDraft::named(" Ada ")
    };
    let id = store.add_lead(draft).unwrap();
    assert!(store.add_lead(LeadDraft::named("   ")).is_err());

    clock.advance_ms(5_000);
    store.update_lead(&id, LeadPatch::default()).unwrap();
    let lead = &store.state().leads[0];
    assert_eq!(lead.name, "Ada");
    assert_eq!(lead.created_at, 1_000);
    assert_eq!(lead.updated_at, 6_000);

    let rejected = LeadPatch {
        name: Some(" ".to_string()),
        status: Some(LeadStatus::Won),
        ..LeadPatch::default()
    };
    assert!(store.update_lead(&id, rejected).is_err());
    assert_eq!(store.state().leads[0].status, LeadStatus::New);

    let patch = LeadPatch {
        status: Some(LeadStatus::Contacted),
        ..LeadPatch::default()
    };
    store.update_lead(&id, patch).unwrap();
    assert_eq!(store.lead_counts_by_status()[&LeadStatus::Contacted], 1);
    assert_eq!(store.lead_counts_by_status()[&LeadStatus::Won], 0);

    store.remove_lead(&id).unwrap();
    assert!(store.update_lead(&id, LeadPatch::default()).is_err());
}

#[test]
fn lead_import_coerces_rows_and_rejects_non_arrays() {
    let (mut store, _clock) = fresh_store();
    let existing = store.add_lead(LeadDraft::named("Existing")).unwrap();

    let text = format!(
        r#"[
            {{"id": "{existing}", "name": "Clash", "status": "won"}},
            {{"name": "Bare"}},
            {{"id": "lead-7", "name": "Odd", "status": "Sleeping", "priority": "urgent"}},
            42,
            "text row"
        ]"#
    );
    assert_eq!(store.import_leads(&text).unwrap(), 3);

    let leads = &store.state().leads;
    assert_eq!(leads.len(), 4);
    assert_ne!(leads[1].id, existing);
    assert_eq!(leads[1].status, LeadStatus::Won);
    assert!(!leads[2].id.is_empty());
    assert_eq!(leads[3].id, "lead-7");
    assert_eq!(leads[3].status, LeadStatus::New);
    assert_eq!(leads[3].priority, LeadPriority::Medium);

    let revision = store.revision();
    assert!(matches!(
        store.import_leads("{\"name\": \"x\"}"),
        Err(StoreError::InvalidImport(_))
    ));
    assert!(store.import_leads("not json").is_err());
    assert_eq!(store.revision(), revision);

    let exported: serde_json::Value =
        serde_json::from_str(&store.export_leads_json().unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 4);
    assert_eq!(exported[3]["id"], "lead-7");
}

#[test]
fn mutations_persist_each_touched_aggregate() {
    let kv = MemoryKvStore::new();
    let clock = FixedClock::new(DAY_ONE, 1_000);
    let mut store = open_store(kv.clone(), &clock);
    store.add_xp(300);
    store.add_todo("Persist me").unwrap();

    let persistence = LocalPersistence::new("clientwatch", kv.clone());
    assert_eq!(persistence.load(Aggregate::Xp, 0_i64), 300);
    assert!(kv.get("clientwatch:todos").unwrap().is_some());
    assert!(kv.get("clientwatch:leads").unwrap().is_none());
}

#[test]
fn sqlite_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clientwatch.db");
    let clock = FixedClock::new(DAY_ONE, 1_000);

    {
        let kv = SqliteKvStore::open(&path).unwrap();
        let mut store =
            DashboardStore::open(DashboardConfig::default(), kv, Box::new(clock.clone())).unwrap();
        store.add_xp(1_250);
        store.add_top_custom("Close Acme", 150).unwrap();
        store.add_lead(LeadDraft::named("Ada")).unwrap();
    }

    let kv = SqliteKvStore::open(&path).unwrap();
    let store = DashboardStore::open(DashboardConfig::default(), kv, Box::new(clock)).unwrap();
    assert_eq!(store.xp(), 1_250);
    assert_eq!(store.state().top.items[0].label, "Close Acme");
    assert_eq!(store.state().leads[0].name, "Ada");
}

#[test]
fn malformed_local_values_fall_back_to_defaults() {
    let kv = MemoryKvStore::new();
    kv.set("clientwatch:xp", "\"lots\"").unwrap();
    kv.set("clientwatch:todos", "{broken").unwrap();
    kv.set("clientwatch:leads", "[{\"id\": \"l1\", \"status\": 7}]").unwrap();

    let clock = FixedClock::new(DAY_ONE, 1_000);
    let store = open_store(kv, &clock);
    assert_eq!(store.xp(), 0);
    assert!(store.state().todos.items.is_empty());
    assert_eq!(store.state().leads.len(), 1);
    assert_eq!(store.state().leads[0].status, LeadStatus::New);
}
