use asupersync::runtime::RuntimeBuilder;
use genericdao::prelude::*;
use genericdao::{DaoConfig, SearchConfig};

#[derive(Entity, Debug, Clone, PartialEq)]
struct Hero {
    id: i64,
    name: String,
    secret_name: String,
    age: Option<i32>,
    team: Option<String>,
}

fn hero(name: &str, secret_name: &str, age: Option<i32>, team: Option<&str>) -> Hero {
    Hero {
        id: 0,
        name: name.to_string(),
        secret_name: secret_name.to_string(),
        age,
        team: team.map(str::to_string),
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

async fn seeded(cx: &Cx, store: &MemoryDatastore) {
    let mut dao = BaseDao::new(Session::new(store.clone()));
    let mut heroes = vec![
        hero("Deadpond", "Dive Wilson", None, Some("Z-Force")),
        hero("Spider-Boy", "Pedro Parqueador", Some(16), Some("Preventers")),
        hero("Rusty-Man", "Tommy Sharp", Some(48), Some("Preventers")),
        hero("Tarantula", "Natalia Roman-on", Some(32), None),
        hero("Black Lion", "Trevor Challa", Some(35), Some("Z-Force")),
        hero("Captain North America", "Esteban Rogelios", Some(93), Some("Preventers")),
    ];
    unwrap_outcome(dao.save_all(cx, &mut heroes).await);
}

fn names(heroes: &[Hero]) -> Vec<&str> {
    heroes.iter().map(|h| h.name.as_str()).collect()
}

#[test]
fn typed_search_filters_sorts_and_pages() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();

    rt.block_on(async {
        seeded(&cx, &store).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));

        let adults = Search::new()
            .filter(Filter::greater_or_equal("age", 30))
            .sort_desc("age");
        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &adults).await);
        assert_eq!(
            names(&found),
            vec!["Captain North America", "Rusty-Man", "Black Lion", "Tarantula"]
        );
        // Results are managed by the session
        assert!(found.iter().all(|h| dao.session_contains(h)));

        let second_page = adults.clone().max_results(2).page(1);
        let page: Vec<Hero> = unwrap_outcome(dao.search(&cx, &second_page).await);
        assert_eq!(names(&page), vec!["Black Lion", "Tarantula"]);

        let either = Search::of::<Hero>()
            .filter_equal("team", "Z-Force")
            .filter_ilike("name", "spider%")
            .disjunction(true)
            .sort_asc("name");
        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &either).await);
        assert_eq!(names(&found), vec!["Black Lion", "Deadpond", "Spider-Boy"]);

        let no_team = Search::of::<Hero>().filter_null("team");
        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &no_team).await);
        assert_eq!(names(&found), vec!["Tarantula"]);
    });
}

#[test]
fn counts_ignore_paging() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();

    rt.block_on(async {
        seeded(&cx, &store).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));

        let preventers = Search::of::<Hero>()
            .filter_equal("team", "Preventers")
            .sort_asc("age")
            .max_results(2);
        assert_eq!(unwrap_outcome(dao.count_search(&cx, &preventers).await), 3);
        assert_eq!(
            unwrap_outcome(dao.count_search_of::<Hero>(&cx, &preventers).await),
            3
        );
        assert_eq!(unwrap_outcome(dao.count::<Hero>(&cx).await), 6);

        let result: SearchResult<Hero> =
            unwrap_outcome(dao.search_and_count_of(&cx, &preventers).await);
        assert_eq!(result.total_count, 3);
        assert_eq!(names(&result.results), vec!["Spider-Boy", "Rusty-Man"]);
        assert!(result.has_more(0));

        let records = unwrap_outcome(dao.search_and_count(&cx, &preventers).await);
        assert_eq!(records.total_count, 3);
        assert_eq!(records.len(), 2);
    });
}

#[test]
fn unique_results() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();

    rt.block_on(async {
        seeded(&cx, &store).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));

        let by_secret = Search::of::<Hero>().filter_equal("secret_name", "Tommy Sharp");
        let found: Option<Hero> = unwrap_outcome(dao.search_unique_of(&cx, &by_secret).await);
        assert_eq!(found.map(|h| h.name), Some("Rusty-Man".to_string()));

        let nobody = Search::of::<Hero>().filter_equal("name", "Nobody");
        assert!(unwrap_outcome(dao.search_unique(&cx, &nobody).await).is_none());

        let many = Search::of::<Hero>().filter_equal("team", "Preventers");
        let err = expect_err(dao.search_unique(&cx, &many).await);
        assert!(matches!(err, Error::NonUniqueResult { count: 3 }));
    });
}

#[test]
fn projections_and_aggregates_return_records() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();

    rt.block_on(async {
        seeded(&cx, &store).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));

        let teams = Search::of::<Hero>()
            .field(Field::property("team"))
            .filter_not_null("team")
            .distinct(true)
            .sort_asc("team");
        let rows = unwrap_outcome(dao.search_records(&cx, &teams).await);
        let teams: Vec<&Value> = rows.iter().filter_map(|r| r.get("team")).collect();
        assert_eq!(
            teams,
            vec![&Value::from("Preventers"), &Value::from("Z-Force")]
        );

        let stats = Search::of::<Hero>()
            .field(Field::count(""))
            .field(Field::max("age").alias("oldest"))
            .field(Field::sum("age"));
        let rows = unwrap_outcome(dao.search_records(&cx, &stats).await);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("count()"), Some(&Value::BigInt(6)));
        assert_eq!(rows[0].get("oldest"), Some(&Value::Int(93)));
        assert_eq!(rows[0].get("sum(age)"), Some(&Value::BigInt(224)));

        // A projected search cannot produce entities
        let err = expect_err(dao.search::<Hero>(&cx, &stats).await);
        assert!(matches!(err, Error::InvalidArgument(_)));

        let mixed = Search::of::<Hero>()
            .field(Field::property("name"))
            .field(Field::count(""));
        let err = expect_err(dao.search_records(&cx, &mixed).await);
        assert!(matches!(err, Error::InvalidArgument(_)));
    });
}

#[test]
fn search_class_is_checked() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let mut dao = BaseDao::new(Session::new(MemoryDatastore::new()));

        let err = expect_err(dao.search_records(&cx, &Search::new()).await);
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = expect_err(dao.count_search(&cx, &Search::new()).await);
        assert!(matches!(err, Error::InvalidArgument(_)));

        let wrong = Search::for_entity("villain");
        let err = expect_err(dao.search::<Hero>(&cx, &wrong).await);
        assert!(matches!(err, Error::InvalidArgument(_)));
    });
}

#[test]
fn filter_from_example_finds_matching_heroes() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();

    rt.block_on(async {
        seeded(&cx, &store).await;
        let mut dao = BaseDao::new(Session::new(store.clone()));

        // Null properties are left out and the id is never compared
        let options = ExampleOptions::default()
            .exclude_property("name")
            .exclude_property("secret_name");
        let example = Hero {
            id: 999,
            ..hero("", "", None, Some("Z-Force"))
        };
        let filter = dao.filter_from_example(&example, Some(&options));
        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &Search::new().filter(filter)).await);
        assert_eq!(names(&found), vec!["Deadpond", "Black Lion"]);

        let partial = ExampleOptions::default()
            .like_mode(LikeMode::Start)
            .ignore_case(true)
            .exclude_property("secret_name")
            .exclude_property("team");
        let example = hero("captain", "", None, None);
        let filter = dao.filter_from_example(&example, Some(&partial));
        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &Search::new().filter(filter)).await);
        assert_eq!(names(&found), vec!["Captain North America"]);
    });
}

#[test]
fn default_max_results_applies_without_explicit_paging() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let store = MemoryDatastore::new();

    rt.block_on(async {
        seeded(&cx, &store).await;
        let config = DaoConfig::default().search(SearchConfig::default().default_max_results(4));
        let mut dao = BaseDao::with_config(store.clone(), &config);

        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &Search::of::<Hero>()).await);
        assert_eq!(found.len(), 4);

        let explicit = Search::of::<Hero>().max_results(5);
        let found: Vec<Hero> = unwrap_outcome(dao.search(&cx, &explicit).await);
        assert_eq!(found.len(), 5);

        let result = unwrap_outcome(dao.search_and_count_of::<Hero>(&cx, &Search::of::<Hero>()).await);
        assert_eq!(result.total_count, 6);
        assert_eq!(result.len(), 4);
    });
}
