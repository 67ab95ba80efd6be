use asupersync::runtime::RuntimeBuilder;
use genericdao::prelude::*;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Hero {
    id: i64,
    name: String,
    age: Option<i32>,
}

impl Hero {
    fn new(name: &str, age: Option<i32>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            age,
        }
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

fn expect_err<T>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        Outcome::Ok(_) => panic!("expected an error"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

#[test]
fn save_get_load_round_trip() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let factory = SessionFactory::new(MemoryDatastore::new());
        let mut dao = BaseDao::open(&factory);

        let mut hero = Hero::new("Deadpond", Some(48));
        let id = unwrap_outcome(dao.save(&cx, &mut hero).await);
        assert_eq!(id, Value::BigInt(1));
        assert_eq!(hero.id, 1);
        assert!(dao.session_contains(&hero));

        // A second DAO has its own session and reads from the datastore
        let mut other = BaseDao::open(&factory);
        let found: Option<Hero> = unwrap_outcome(other.get(&cx, &id).await);
        assert_eq!(found, Some(hero.clone()));

        let loaded: Hero = unwrap_outcome(other.load(&cx, &id).await);
        assert_eq!(loaded, hero);

        let missing: Option<Hero> = unwrap_outcome(other.get(&cx, &Value::BigInt(42)).await);
        assert!(missing.is_none());
        let err = expect_err(other.load::<Hero>(&cx, &Value::BigInt(42)).await);
        assert!(err.is_not_found());

        let mut target = Hero::new("", None);
        unwrap_outcome(other.load_into(&cx, &mut target, &id).await);
        assert_eq!(target, hero);
    });
}

#[test]
fn get_all_aligns_with_requested_ids() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let store = MemoryDatastore::new();
        let mut dao = BaseDao::new(Session::new(store.clone()));
        let mut heroes = vec![Hero::new("a", None), Hero::new("b", None), Hero::new("c", None)];
        unwrap_outcome(dao.save_all(&cx, &mut heroes).await);

        let mut reader = BaseDao::new(Session::new(store.clone()));
        store.reset_statement_count();
        let ids = [
            Value::BigInt(3),
            Value::BigInt(9),
            Value::Null,
            Value::Int(1),
            Value::BigInt(3),
        ];
        let found: Vec<Option<Hero>> = unwrap_outcome(reader.get_all(&cx, &ids).await);
        assert_eq!(store.statement_count(), 1);

        let names: Vec<Option<&str>> = found
            .iter()
            .map(|h| h.as_ref().map(|h| h.name.as_str()))
            .collect();
        assert_eq!(names, vec![Some("c"), None, None, Some("a"), Some("c")]);
    });
}

#[test]
fn load_all_skips_null_ids_and_fails_on_missing_rows() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let mut dao = BaseDao::new(Session::new(MemoryDatastore::new()));
        let mut hero = Hero::new("Rusty-Man", Some(48));
        unwrap_outcome(dao.save(&cx, &mut hero).await);

        let loaded: Vec<Option<Hero>> =
            unwrap_outcome(dao.load_all(&cx, &[Value::Null, Value::BigInt(hero.id)]).await);
        assert_eq!(loaded, vec![None, Some(hero)]);

        let err = expect_err(dao.load_all::<Hero>(&cx, &[Value::BigInt(77)]).await);
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    });
}

#[test]
fn update_merge_and_refresh() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let factory = SessionFactory::new(MemoryDatastore::new());
        let mut writer = BaseDao::open(&factory);
        let mut hero = Hero::new("Spider-Boy", None);
        unwrap_outcome(writer.save(&cx, &mut hero).await);

        // Detached update through another session
        let mut second = BaseDao::open(&factory);
        hero.age = Some(16);
        second.update(std::slice::from_ref(&hero)).unwrap();
        unwrap_outcome(second.flush(&cx).await);

        // Merge copies state without attaching the argument
        let mut third = BaseDao::open(&factory);
        let detached = Hero {
            name: "Spider-Man".to_string(),
            ..hero.clone()
        };
        let merged = unwrap_outcome(third.merge(&cx, &detached).await);
        assert_eq!(merged.name, "Spider-Man");
        unwrap_outcome(third.flush(&cx).await);

        // The first session still tracks its own copy until refreshed
        let mut stale = [hero.clone()];
        unwrap_outcome(writer.refresh(&cx, &mut stale).await);
        assert_eq!(stale[0].name, "Spider-Man");
        assert_eq!(stale[0].age, Some(16));
    });
}

#[test]
fn delete_operations() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let store = MemoryDatastore::new();
        let mut dao = BaseDao::new(Session::new(store.clone()));
        let mut heroes: Vec<Hero> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| Hero::new(n, None))
            .collect();
        unwrap_outcome(dao.save_all(&cx, &mut heroes).await);

        assert!(unwrap_outcome(dao.delete_by_id::<Hero>(&cx, &Value::BigInt(1)).await));
        assert!(!unwrap_outcome(dao.delete_by_id::<Hero>(&cx, &Value::BigInt(1)).await));
        assert!(!unwrap_outcome(dao.delete_by_id::<Hero>(&cx, &Value::Null).await));

        assert!(unwrap_outcome(dao.delete_entity(&cx, &heroes[1]).await));
        assert!(!unwrap_outcome(dao.delete_entity(&cx, &Hero::new("unsaved", None)).await));

        unwrap_outcome(
            dao.delete_by_ids::<Hero>(&cx, &[Value::BigInt(3), Value::BigInt(99)])
                .await,
        );
        dao.delete_entities(&heroes[3..4]);
        unwrap_outcome(dao.flush(&cx).await);

        assert_eq!(store.row_count("hero").unwrap(), 1);
        let remaining: Vec<Hero> = unwrap_outcome(dao.all(&cx).await);
        assert_eq!(remaining, vec![heroes[4].clone()]);
        assert_eq!(unwrap_outcome(dao.count::<Hero>(&cx).await), 1);
    });
}

#[test]
fn persist_rejects_detached_entities() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let mut dao = BaseDao::new(Session::new(MemoryDatastore::new()));
        let mut fresh = [Hero::new("a", None), Hero::new("b", None)];
        unwrap_outcome(dao.persist(&cx, &mut fresh).await);
        assert!(fresh.iter().all(|h| h.id > 0));

        let mut detached = [Hero {
            id: 500,
            ..Hero::new("ghost", None)
        }];
        let err = expect_err(dao.persist(&cx, &mut detached).await);
        assert!(matches!(err, Error::DetachedEntity { .. }));
    });
}

#[test]
fn flush_reports_stale_updates() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let mut dao = BaseDao::new(Session::new(MemoryDatastore::new()));
        let ghost = Hero {
            id: 12,
            ..Hero::new("ghost", None)
        };
        dao.update(&[ghost]).unwrap();
        let err = expect_err(dao.flush(&cx).await);
        assert!(matches!(err, Error::StaleState { .. }));
    });
}
