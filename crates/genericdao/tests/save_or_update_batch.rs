//! Batched new-versus-existing decisions.

use asupersync::runtime::RuntimeBuilder;
use genericdao::prelude::*;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Team {
    id: i64,
    name: String,
    headquarters: String,
}

#[derive(Entity, Debug, Clone, PartialEq)]
struct Badge {
    #[entity(id, assigned)]
    code: String,
    label: String,
}

fn team(id: i64, name: &str) -> Team {
    Team {
        id,
        name: name.to_string(),
        headquarters: "Sharp Tower".to_string(),
    }
}

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Store `teams` through a throwaway session so later DAOs see them as detached rows.
async fn seed(cx: &Cx, store: &MemoryDatastore, teams: &mut [Team]) {
    let mut dao = BaseDao::new(Session::new(store.clone()));
    unwrap_outcome(dao.save_all(cx, teams).await);
}

#[test]
fn batch_resolves_existence_in_one_lookup() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();
    let mut stored = vec![team(0, "Preventers"), team(0, "Z-Force")];

    rt.block_on(async {
        seed(&cx, &store, &mut stored).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));
        let mut managed = team(0, "Avengers");
        unwrap_outcome(dao.save(&cx, &mut managed).await);

        let mut batch = vec![
            Team {
                headquarters: "Moved".to_string(),
                ..stored[0].clone()
            },
            team(0, "Brand New"),
            managed.clone(),
            team(77, "Never Stored"),
            stored[1].clone(),
        ];

        store.reset_statement_count();
        let is_new = unwrap_outcome(dao.save_or_update_is_new_all(&cx, &mut batch).await);
        assert_eq!(is_new, vec![false, true, false, true, false]);

        // One existence lookup plus two inserts
        assert_eq!(store.statement_count(), 3);
        assert_eq!(batch[1].id, 4);
        // A generated id that matches no stored row is replaced, not reused
        assert_eq!(batch[3].id, 5);

        unwrap_outcome(dao.flush(&cx).await);
        let reloaded: Option<Team> = unwrap_outcome(
            BaseDao::new(Session::new(store.clone()))
                .get(&cx, &Value::BigInt(stored[0].id))
                .await,
        );
        assert_eq!(reloaded.unwrap().headquarters, "Moved");
        assert_eq!(store.row_count("team").unwrap(), 5);
    });
}

#[test]
fn lookups_are_chunked_by_batch_size() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();
    let mut stored: Vec<Team> = (0..5).map(|i| team(0, &format!("team-{i}"))).collect();

    rt.block_on(async {
        seed(&cx, &store, &mut stored).await;
        let config = DaoConfig::default().session(SessionConfig::default().exists_batch_size(2));
        let mut dao = BaseDao::with_config(store.clone(), &config);

        store.reset_statement_count();
        let is_new = unwrap_outcome(dao.save_or_update_is_new_all(&cx, &mut stored).await);
        assert_eq!(is_new, vec![false; 5]);
        // Five identifiers in chunks of two
        assert_eq!(store.statement_count(), 3);
    });
}

#[test]
fn single_save_or_update() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();
    let mut stored = vec![team(0, "Preventers")];

    rt.block_on(async {
        seed(&cx, &store, &mut stored).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));

        let mut fresh = team(0, "Fresh");
        assert!(unwrap_outcome(dao.save_or_update_is_new(&cx, &mut fresh).await));

        // Managed: decided without touching the datastore
        store.reset_statement_count();
        assert!(!unwrap_outcome(dao.save_or_update_is_new(&cx, &mut fresh).await));
        assert_eq!(store.statement_count(), 0);

        let mut detached = stored[0].clone();
        assert!(!unwrap_outcome(dao.save_or_update_is_new(&cx, &mut detached).await));
        assert!(dao.session_contains(&detached));

        let mut reattached = team(0, "Reattached");
        unwrap_outcome(dao.save_or_update(&cx, &mut reattached).await);
        assert!(reattached.id > 0);
    });
}

#[test]
fn assigned_ids_queue_until_flush() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let store = MemoryDatastore::new();
        let mut dao = BaseDao::new(Session::new(store.clone()));
        let mut badges = vec![
            Badge {
                code: "gold".to_string(),
                label: "Gold".to_string(),
            },
            Badge {
                code: "silver".to_string(),
                label: "Silver".to_string(),
            },
        ];

        let is_new = unwrap_outcome(dao.save_or_update_is_new_all(&cx, &mut badges).await);
        assert_eq!(is_new, vec![true, true]);
        assert_eq!(store.row_count("badge").unwrap(), 0);

        unwrap_outcome(dao.flush(&cx).await);
        assert_eq!(store.row_count("badge").unwrap(), 2);

        let mut other = BaseDao::new(Session::new(store.clone()));
        badges[0].label = "Golden".to_string();
        let is_new = unwrap_outcome(other.save_or_update_is_new_all(&cx, &mut badges).await);
        assert_eq!(is_new, vec![false, false]);
    });
}

#[test]
fn exists_ids_marks_duplicates_and_skips_nulls() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();
    let mut stored = vec![team(0, "a"), team(0, "b")];

    rt.block_on(async {
        seed(&cx, &store, &mut stored).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));
        let ids = [
            Value::BigInt(1),
            Value::Null,
            Value::BigInt(1),
            Value::Int(2),
            Value::BigInt(3),
        ];
        let found = unwrap_outcome(dao.exists_ids::<Team>(&cx, &ids).await);
        assert_eq!(found, vec![true, false, true, true, false]);

        assert!(unwrap_outcome(dao.exists_id::<Team>(&cx, &Value::BigInt(2)).await));
        assert!(!unwrap_outcome(dao.exists_id::<Team>(&cx, &Value::Null).await));
        assert!(unwrap_outcome(dao.exists(&cx, &stored[0]).await));
        assert!(!unwrap_outcome(dao.exists(&cx, &team(0, "unsaved")).await));
    });
}
