//! Entity lifecycle: binding, accessors, queries and the save protocol,
//! verified against the in-memory store's call journal.

use chrono::{FixedOffset, TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tbind_core::store::{MemoryStore, RawColumn, SelectOptions, StoreCall};
use tbind_core::{Connection, Entity, Errors, Model, Record, TbConfig, TbError, TbResult};

#[derive(Entity)]
#[tbind(validate = "validate_site")]
struct Site;

fn validate_site(record: &Record<Site>, errors: &mut Errors) {
    let blank = match record.get("title") {
        Ok(Some(Value::String(s))) => s.trim().is_empty(),
        _ => true,
    };
    if blank {
        errors.add("title", "can't be blank");
    }
}

fn site_columns() -> Vec<RawColumn> {
    vec![
        RawColumn::scalar("_key", "ShortText"),
        RawColumn::scalar("title", "ShortText"),
        RawColumn::scalar("rank", "Int32"),
        RawColumn::scalar("published_at", "Time"),
        RawColumn::scalar("created_at", "Time"),
        RawColumn::new("scratch", "COLUMN_SCALAR", "ShortText"),
        RawColumn::index("site_title_index", "Site"),
    ]
}

fn setup() -> TbResult<(Arc<MemoryStore>, Model<Site>)> {
    let store = Arc::new(MemoryStore::new().with_collection("Site", site_columns()));
    let conn = Connection::establish(store.clone());
    let sites = conn.bind::<Site>()?;
    store.clear_calls();
    Ok((store, sites))
}

fn new_site(sites: &Model<Site>, key: &str, title: &str) -> TbResult<Record<Site>> {
    let mut site = sites.new_record();
    site.set_key(key);
    site.set("title", title)?;
    Ok(site)
}

fn ops(store: &MemoryStore) -> Vec<&'static str> {
    store.calls().iter().map(StoreCall::op).collect()
}

#[test]
fn test_accessors_follow_schema() -> TbResult<()> {
    let (_store, sites) = setup()?;
    let names: Vec<&str> = sites.schema().accessor_names().collect();
    assert_eq!(names, vec!["title", "rank", "published_at", "created_at"]);

    let mut site = sites.new_record();
    for hidden in ["site_title_index", "scratch", "_id", "missing"] {
        assert!(matches!(
            site.set(hidden, "x"),
            Err(TbError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            site.get(hidden),
            Err(TbError::UnknownAttribute { .. })
        ));
    }
    Ok(())
}

#[test]
fn test_new_record_is_not_persisted() -> TbResult<()> {
    let (_store, sites) = setup()?;
    let site = sites.new_record();
    assert!(!site.is_persisted());
    assert_eq!(site.id(), None);
    assert_eq!(site.time("published_at", None)?, None);
    assert_eq!(site.created_at(None)?, None);
    Ok(())
}

#[test]
fn test_time_setter_rejects_strings() -> TbResult<()> {
    let (_store, sites) = setup()?;
    let mut site = sites.new_record();
    let err = site.set("published_at", "yesterday").unwrap_err();
    assert!(matches!(err, TbError::TypeMismatch { ref column, .. } if column == "published_at"));
    assert!(matches!(
        site.set_time("title", 0_i64),
        Err(TbError::TypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_time_getter_uses_explicit_offset() -> TbResult<()> {
    let (_store, sites) = setup()?;
    let mut site = sites.new_record();
    site.set_time("published_at", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())?;

    let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
    let shown = site.time("published_at", Some(tokyo))?.unwrap();
    assert_eq!(shown.offset(), &tokyo);
    assert_eq!(shown.to_rfc3339(), "2024-01-01T09:00:00+09:00");

    // storage stays timezone-naive
    assert_eq!(site.get("published_at")?, Some(&json!(1_704_067_200.0)));
    Ok(())
}

#[test]
fn test_configured_display_offset() -> TbResult<()> {
    let store = Arc::new(MemoryStore::new().with_collection("Site", site_columns()));
    let conn = Connection::with_config(store, TbConfig::new().with_display_offset("-05:00"));
    let sites = conn.bind::<Site>()?;

    let mut site = sites.new_record();
    site.set("published_at", 0)?;
    let shown = site.time("published_at", conn.display_offset()?)?.unwrap();
    assert_eq!(shown.to_rfc3339(), "1969-12-31T19:00:00-05:00");
    Ok(())
}

#[test]
fn test_save_invalid_record_touches_nothing() -> TbResult<()> {
    let (store, sites) = setup()?;
    let mut site = sites.new_record();
    site.set_key("blank");

    assert!(site.save()?.is_none());
    assert!(store.calls().is_empty());
    assert_eq!(site.errors().full_messages(), vec!["title can't be blank"]);
    Ok(())
}

#[test]
fn test_save_new_record_loads_one_row() -> TbResult<()> {
    let (store, sites) = setup()?;
    assert_eq!(sites.count()?, 0);

    let mut site = new_site(&sites, "example", "Example")?;
    assert!(site.save()?.is_some());
    assert!(site.created_at(None)?.is_some());
    assert_eq!(sites.count()?, 1);

    // the assigned _id is not read back
    assert!(!site.is_persisted());

    let calls = store.calls();
    assert_eq!(ops(&store), vec!["select", "load", "select"]);
    let StoreCall::Load { table, payload } = &calls[1] else {
        panic!("expected load, got {:?}", calls[1]);
    };
    assert_eq!(table, "Site");
    let rows: Vec<serde_json::Map<String, Value>> = serde_json::from_str(payload)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["_key"], "example");
    assert_eq!(rows[0]["published_at"], Value::Null);
    assert!(rows[0]["created_at"].is_f64());
    Ok(())
}

#[test]
fn test_count_uses_zero_limit() -> TbResult<()> {
    let (store, sites) = setup()?;
    sites.count()?;
    assert_eq!(
        store.calls(),
        vec![StoreCall::Select {
            table: "Site".to_string(),
            options: SelectOptions::new().with_limit(0),
        }]
    );
    Ok(())
}

#[test]
fn test_find_hydrates_record() -> TbResult<()> {
    let (store, sites) = setup()?;
    let mut site = new_site(&sites, "new york", "Big Apple")?;
    site.set("rank", 3)?;
    site.set_time("published_at", 1_700_000_000_i64)?;
    site.save()?;
    store.clear_calls();

    let found = sites.find("new york")?;
    assert_eq!(found.key(), Some("new york"));
    assert_eq!(found.id(), Some(1));
    assert!(found.is_persisted());
    assert_eq!(found.get("title")?, Some(&json!("Big Apple")));
    assert_eq!(found.get("rank")?, Some(&json!(3)));
    assert_eq!(
        found.time("published_at", Some(FixedOffset::east_opt(0).unwrap()))?
            .map(|t| t.timestamp()),
        Some(1_700_000_000)
    );

    assert_eq!(
        store.calls(),
        vec![StoreCall::Select {
            table: "Site".to_string(),
            options: SelectOptions::new().with_query(r"_key:new\ york"),
        }]
    );
    Ok(())
}

#[test]
fn test_find_missing_key() -> TbResult<()> {
    let (_store, sites) = setup()?;
    let err = sites.find("missing-key").unwrap_err();
    assert!(matches!(
        err,
        TbError::RecordNotFound { ref key, .. } if key == "missing-key"
    ));
    Ok(())
}

#[test]
fn test_resave_deletes_then_loads() -> TbResult<()> {
    let (store, sites) = setup()?;
    new_site(&sites, "a", "First")?.save()?;

    let mut found = sites.find("a")?;
    found.set("title", "Second")?;
    store.clear_calls();
    assert!(found.save()?.is_some());

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        StoreCall::Delete {
            table: "Site".to_string(),
            id: 1
        }
    );
    assert_eq!(calls[1].op(), "load");

    // replaced under a new _id; the record still remembers the old one
    let rows = store.rows("Site");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["_id"], 2);
    assert_eq!(rows[0]["title"], "Second");
    assert_eq!(found.id(), Some(1));
    Ok(())
}

#[test]
fn test_failed_load_after_delete_loses_row() -> TbResult<()> {
    let (store, sites) = setup()?;
    new_site(&sites, "a", "First")?.save()?;
    let mut found = sites.find("a")?;

    store.fail_next_load();
    assert!(matches!(found.save(), Err(TbError::Store(_))));
    assert_eq!(sites.count()?, 0);
    assert!(matches!(
        sites.find("a"),
        Err(TbError::RecordNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_relation_chaining() -> TbResult<()> {
    let (store, sites) = setup()?;
    for (key, title) in [("a", "x"), ("b", "x"), ("c", "y"), ("d", "x")] {
        new_site(&sites, key, title)?.save()?;
    }

    let rel = sites.filter([("title", "x")]).offset(1).limit(5);
    let keys: Vec<String> = rel
        .to_vec()?
        .iter()
        .filter_map(|r| r.key().map(str::to_string))
        .collect();
    assert_eq!(keys, vec!["b", "d"]);
    assert_eq!(rel.count()?, 3);
    assert_eq!(rel.first()?.and_then(|r| r.key().map(str::to_string)), Some("b".to_string()));
    assert!(rel.clone().limit(0).first()?.is_none());
    assert!(sites.limit(0).first()?.is_none());

    assert_eq!(sites.all().count()?, 4);
    assert_eq!(sites.limit(2).to_vec()?.len(), 2);
    assert_eq!(sites.offset(3).to_vec()?.len(), 1);

    let picked = sites.select(["_key", "title"]).filter([("_key", "c")]).first()?.unwrap();
    assert_eq!(picked.get("title")?, Some(&json!("y")));
    assert_eq!(picked.id(), None);

    store.clear_calls();
    sites.filter([("rank", 3)]).to_vec()?;
    assert_eq!(
        store.calls(),
        vec![StoreCall::Select {
            table: "Site".to_string(),
            options: SelectOptions::new().with_query("rank:3"),
        }]
    );
    Ok(())
}

#[test]
fn test_as_json_strips_id_and_index_columns() -> TbResult<()> {
    let (_store, sites) = setup()?;
    new_site(&sites, "a", "First")?.save()?;
    let found = sites.find("a")?;

    let attrs = found.attributes();
    assert_eq!(attrs["_id"], 1);
    assert_eq!(attrs["_key"], "a");

    let json = found.as_json();
    assert!(!json.contains_key("_id"));
    assert!(!json.contains_key("site_title_index"));
    assert_eq!(json["_key"], "a");
    Ok(())
}

#[test]
fn test_set_key_through_accessor() -> TbResult<()> {
    let (_store, sites) = setup()?;
    let mut site = sites.new_record();
    site.set("_key", "via-set")?;
    assert_eq!(site.key(), Some("via-set"));
    Ok(())
}
