use chrono::NaiveDate;
use habit_core::HabitService;
use habit_store::JsonFileStore;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, n).unwrap()
}

#[test]
fn dashboard_round_trip_through_the_json_cache() {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let cache_path = dir.path().join("habit-data.json");

    {
        let service = HabitService::builder()
            .identity("alice")
            .with_store(Box::new(JsonFileStore::open(&cache_path)))
            .build()
            .expect("build service");

        service.add_habit("Exercise").expect("add Exercise");
        service.add_habit("Read").expect("add Read");
        service.add_habit("Meditate").expect("add Meditate");

        service.toggle(day(1), 0).expect("toggle Exercise");
        service.toggle(day(1), 2).expect("toggle Meditate");
        service.toggle(day(2), 1).expect("toggle Read");

        assert_eq!(service.completion_count(day(1)), 2);
        assert_eq!(service.progress_percentage(day(1)), 67);
    }

    // A fresh session hydrates everything back from the cache file.
    let service = HabitService::builder()
        .identity("alice")
        .with_store(Box::new(JsonFileStore::open(&cache_path)))
        .build()
        .expect("rebuild service");

    let names: Vec<String> = service
        .habits()
        .into_iter()
        .map(|habit| habit.name)
        .collect();
    assert_eq!(names, vec!["Exercise", "Read", "Meditate"]);
    assert_eq!(service.completion_count(day(1)), 2);
    assert_eq!(service.completion_count(day(2)), 1);

    // Deleting the first habit renumbers both the registry and the cache.
    service.remove_habit(0).expect("remove Exercise");
    let snapshot = service.day_snapshot(day(2));
    assert_eq!(snapshot.habits.len(), 2);
    assert_eq!(snapshot.habits[0].name, "Read");
    assert!(snapshot.habits[0].completed);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.percentage, 50);

    let service = HabitService::builder()
        .identity("alice")
        .with_store(Box::new(JsonFileStore::open(&cache_path)))
        .build()
        .expect("rebuild after removal");
    let habits = service.habits();
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0].name, "Read");
    assert_eq!(habits[0].position, 0);
    assert_eq!(habits[1].name, "Meditate");
    assert_eq!(habits[1].position, 1);
    assert!(service.completed(day(2), 0).expect("Read on day 2"));
    assert!(service.completed(day(1), 1).expect("Meditate on day 1"));
    assert!(!service.completed(day(1), 0).expect("Read on day 1"));

    let table = service.export_table(day(1), day(2)).expect("export");
    assert_eq!(table.header, vec!["Date", "Read", "Meditate"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0][1], "-");
    assert_eq!(table.rows[0][2], "DONE");
    assert_eq!(table.rows[1][1], "DONE");
    assert_eq!(table.rows[1][2], "-");
}

#[test]
fn two_identities_share_one_cache_file_without_mixing() {
    init_tracing();
    let dir = tempdir().expect("tempdir");
    let cache_path = dir.path().join("habit-data.json");

    let alice = HabitService::builder()
        .identity("alice")
        .with_store(Box::new(JsonFileStore::open(&cache_path)))
        .build()
        .expect("alice service");
    let bob = HabitService::builder()
        .identity("bob")
        .with_store(Box::new(JsonFileStore::open(&cache_path)))
        .build()
        .expect("bob service");

    alice.add_habit("Exercise").expect("alice adds");
    bob.add_habit("Journal").expect("bob adds");
    alice.toggle(day(1), 0).expect("alice toggles");

    let bob = HabitService::builder()
        .identity("bob")
        .with_store(Box::new(JsonFileStore::open(&cache_path)))
        .build()
        .expect("bob rebuild");
    let habits = bob.habits();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].name, "Journal");
    assert_eq!(bob.completion_count(day(1)), 0);
}
