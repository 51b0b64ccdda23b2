use anyhow::Result;
use futures::StreamExt;
use sqliter::{
    params, ColumnSpec, Condition, Error, Fields, Row, Schema, SqlQuery, Sqliter, SqliterConfig,
    TableDefinition, Value, TYPE,
};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

const TABLE: &str = "testtable";

fn columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", TYPE::INTEGER).with_options("PRIMARY KEY"),
        ColumnSpec::new("name", TYPE::TEXT),
    ]
}

// Helper function to create an in-memory database for testing
async fn create_test_db() -> Result<Sqliter> {
    let db = Sqliter::connect(":memory:").await?;
    db.create_table(TABLE, &columns()).await?;
    Ok(db)
}

async fn seed(db: &Sqliter, n: i64) -> Result<()> {
    let rows = (1..=n)
        .map(|id| Fields::new().with("id", id).with("name", format!("name{id}")))
        .collect();
    db.save_all(TABLE, rows).await?;
    Ok(())
}

async fn count(db: &Sqliter) -> Result<i64> {
    let row = db
        .get(format!("SELECT COUNT(*) AS n FROM {TABLE}"))
        .await?
        .expect("count row");
    Ok(row.get("n").and_then(Value::as_i64).expect("integer count"))
}

fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get("id").and_then(Value::as_i64).expect("id"))
        .collect()
}

#[tokio::test]
async fn test_create_table_is_idempotent() -> Result<()> {
    let db = create_test_db().await?;
    db.create_table(TABLE, &columns()).await?;

    let tables = db
        .get(
            SqlQuery::new("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?")
                .with_params(params([TABLE])),
        )
        .await?
        .expect("row");
    assert_eq!(tables.get("n"), Some(&Value::Integer(1)));
    Ok(())
}

#[tokio::test]
async fn test_save_then_find_round_trips() -> Result<()> {
    let db = create_test_db().await?;
    let rowid = db
        .save(TABLE, Fields::new().with("id", 123).with("name", "test"))
        .await?;
    assert_eq!(rowid, 123);

    let row = db.find(TABLE, &["id = 123".into()]).await?.expect("saved row");
    assert_eq!(row.get("id"), Some(&Value::Integer(123)));
    assert_eq!(row.get("name"), Some(&Value::Text("test".into())));
    assert_eq!(row.columns(), &["id".to_string(), "name".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_text_into_integer_column_converts() -> Result<()> {
    let db = create_test_db().await?;
    db.save(TABLE, Fields::new().with("id", "42").with("name", "x")).await?;
    let row = db.find(TABLE, &[Condition::eq("id", 42)]).await?.expect("row");
    assert_eq!(row.get("id"), Some(&Value::Integer(42)));
    Ok(())
}

#[tokio::test]
async fn test_quotes_in_values_are_stored_verbatim() -> Result<()> {
    let db = create_test_db().await?;
    let name = r#"it's a "quoted" value; DROP TABLE testtable"#;
    db.save(TABLE, Fields::new().with("id", 1).with("name", name)).await?;

    let row = db.find(TABLE, &[Condition::eq("name", name)]).await?.expect("row");
    assert_eq!(row.get("name").and_then(Value::as_str), Some(name));
    assert_eq!(count(&db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_find_without_match_is_none() -> Result<()> {
    let db = create_test_db().await?;
    assert!(db.find(TABLE, &["id = 1".into()]).await?.is_none());
    assert!(db.find_all(TABLE, &[]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_save_all_count() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 25).await?;
    assert_eq!(count(&db).await?, 25);
    Ok(())
}

#[tokio::test]
async fn test_save_all_mismatched_rows_insert_nothing() -> Result<()> {
    let db = create_test_db().await?;
    let rows = vec![
        Fields::new().with("id", 1).with("name", "a"),
        Fields::new().with("id", 2),
    ];
    let err = db.save_all(TABLE, rows).await.unwrap_err();
    assert!(matches!(err, Error::ColumnMismatch { row: 1, .. }));
    assert_eq!(count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_save_all_failure_rolls_back() -> Result<()> {
    let db = create_test_db().await?;
    let rows = vec![
        Fields::new().with("id", 1).with("name", "a"),
        Fields::new().with("id", 2).with("name", "b"),
        Fields::new().with("id", 1).with("name", "duplicate"),
    ];
    let err = db.save_all(TABLE, rows).await.unwrap_err();
    assert_eq!(
        err.sqlite_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    );
    assert_eq!(count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_conditions_and_or_composition() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 6).await?;

    let and = db.find_all(TABLE, &["id > 2".into(), "id < 5".into()]).await?;
    let manual = db
        .all(format!("SELECT * FROM {TABLE} WHERE id > 2 AND id < 5"))
        .await?;
    assert_eq!(and, manual);
    assert_eq!(ids(&and), vec![3, 4]);

    let or = db.find_all(TABLE, &[["id = 2", "id = 3"].into()]).await?;
    let manual = db
        .all(format!("SELECT * FROM {TABLE} WHERE (id = 2 OR id = 3)"))
        .await?;
    assert_eq!(or, manual);
    assert_eq!(ids(&or), vec![2, 3]);

    let bound = db
        .find_all(
            TABLE,
            &[
                Condition::any([Condition::lte("id", 2), Condition::gte("id", 6)]),
                Condition::ne("id", 1),
            ],
        )
        .await?;
    assert_eq!(ids(&bound), vec![2, 6]);
    Ok(())
}

#[tokio::test]
async fn test_del_with_empty_conditions_deletes_everything() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 4).await?;
    assert_eq!(db.del(TABLE, &["id = 4".into()]).await?, 1);
    assert_eq!(db.del(TABLE, &[]).await?, 3);
    assert_eq!(count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_update_only_touches_matching_rows() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 5).await?;

    let changed = db
        .update(TABLE, Fields::new().with("name", "updated"), &["id = 3".into()])
        .await?;
    assert_eq!(changed, 1);

    for row in db.find_all(TABLE, &[]).await? {
        let id = row.get("id").and_then(Value::as_i64).expect("id");
        let name = row.get("name").and_then(Value::as_str).expect("name");
        if id == 3 {
            assert_eq!(name, "updated");
        } else {
            assert_eq!(name, format!("name{id}"));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_update_without_fields_is_rejected() -> Result<()> {
    let db = create_test_db().await?;
    let err = db.update(TABLE, Fields::new(), &[]).await.unwrap_err();
    assert!(matches!(err, Error::EmptyFields { .. }));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_saves() -> Result<()> {
    let db = create_test_db().await?;
    let (a, b, c) = tokio::join!(
        db.save(TABLE, Fields::new().with("id", 1).with("name", "a")),
        db.save(TABLE, Fields::new().with("id", 2).with("name", "b")),
        db.save(TABLE, Fields::new().with("id", 3).with("name", "c")),
    );
    a?;
    b?;
    c?;

    let handles: Vec<_> = (4..=6)
        .map(|id| {
            let db = db.clone();
            tokio::spawn(async move {
                db.save(TABLE, Fields::new().with("id", id).with("name", "spawned"))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    assert_eq!(ids(&db.find_all(TABLE, &[]).await?), vec![1, 2, 3, 4, 5, 6]);
    Ok(())
}

#[tokio::test]
async fn test_each_visits_every_row() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 3).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let total = db
        .each(format!("SELECT name FROM {TABLE} ORDER BY id"), move |row| {
            if let Some(Value::Text(name)) = row.get("name") {
                sink.lock().unwrap().push(name.clone());
            }
        })
        .await?;

    assert_eq!(total, 3);
    assert_eq!(*seen.lock().unwrap(), vec!["name1", "name2", "name3"]);
    Ok(())
}

#[tokio::test]
async fn test_stream_rows() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 4).await?;

    let rows: Vec<Row> = db
        .stream(
            SqlQuery::new(format!("SELECT * FROM {TABLE} WHERE id >= ? ORDER BY id"))
                .with_params(params([3])),
        )
        .map(|row| row.expect("row"))
        .collect()
        .await;
    assert_eq!(ids(&rows), vec![3, 4]);

    let mut failing = Box::pin(db.stream("SELECT * FROM missing_table"));
    assert!(matches!(failing.next().await, Some(Err(Error::Sqlite(_)))));
    assert!(failing.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_engine_errors_pass_through() -> Result<()> {
    let db = create_test_db().await?;
    db.save(TABLE, Fields::new().with("id", 1).with("name", "a")).await?;

    let duplicate = db
        .save(TABLE, Fields::new().with("id", 1).with("name", "b"))
        .await
        .unwrap_err();
    assert_eq!(
        duplicate.sqlite_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    );

    let syntax = db.find_all(TABLE, &["id ==== 1".into()]).await.unwrap_err();
    assert!(matches!(syntax, Error::Sqlite(_)));
    Ok(())
}

#[tokio::test]
async fn test_close_ends_every_clone() -> Result<()> {
    let db = create_test_db().await?;
    let other = db.clone();
    db.close().await?;

    let err = other.find_all(TABLE, &[]).await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed));
    let mut stream = Box::pin(other.stream(format!("SELECT * FROM {TABLE}")));
    assert!(matches!(stream.next().await, Some(Err(Error::ConnectionClosed))));
    Ok(())
}

#[tokio::test]
async fn test_file_database_persists_across_connections() -> Result<()> {
    let temp_file = NamedTempFile::new()?;
    let config = SqliterConfig::new(temp_file.path()).with_schema(
        Schema::new().add_table(
            TableDefinition::new(TABLE)
                .column(ColumnSpec::new("id", TYPE::INTEGER).with_options("PRIMARY KEY"))
                .column(ColumnSpec::new("name", TYPE::TEXT)),
        ),
    );

    let db = Sqliter::connect_with(config.clone()).await?;
    db.save(TABLE, Fields::new().with("id", 7).with("name", "kept")).await?;
    db.close().await?;

    let reopened = Sqliter::connect_with(config).await?;
    let row = reopened.find(TABLE, &[Condition::eq("id", 7)]).await?.expect("row");
    assert_eq!(row.get("name").and_then(Value::as_str), Some("kept"));
    reopened.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_open_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no_such_dir").join("db.sqlite");
    let err = Sqliter::connect(missing.as_path()).await.unwrap_err();
    assert!(matches!(err, Error::Sqlite(_)));
}

// Helper function to create a temporary file-based database
async fn create_temp_db() -> Result<(Sqliter, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db = Sqliter::connect(temp_file.path()).await?;
    db.create_table(TABLE, &columns()).await?;
    Ok((db, temp_file))
}

#[tokio::test]
async fn test_rows_are_visible_to_a_plain_rusqlite_handle() -> Result<()> {
    let (db, temp_file) = create_temp_db().await?;
    db.save(TABLE, Fields::new().with("id", 123).with("name", "test")).await?;

    let conn = rusqlite::Connection::open(temp_file.path())?;
    let (id, name): (i64, String) = conn.query_row(
        &format!("SELECT id, name FROM {TABLE} WHERE id = ?"),
        [123],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    assert_eq!(id, 123);
    assert_eq!(name, "test");

    let found = db.find(TABLE, &["id = 123".into()]).await?.expect("row");
    assert_eq!(found.get("name").and_then(Value::as_str), Some(name.as_str()));
    Ok(())
}

#[tokio::test]
async fn test_exec_runs_several_statements() -> Result<()> {
    let db = create_test_db().await?;
    db.exec(format!(
        "INSERT INTO {TABLE} (id, name) VALUES (1, 'a');
         INSERT INTO {TABLE} (id, name) VALUES (2, 'b');"
    ))
    .await?;
    assert_eq!(count(&db).await?, 2);

    let renamed = db
        .run(SqlQuery::new(format!("UPDATE {TABLE} SET name = ?")).with_params(params(["z"])))
        .await?;
    assert_eq!(renamed, 2);
    Ok(())
}

#[tokio::test]
async fn test_run_discards_rows_from_pragma_and_select() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 2).await?;

    db.run("PRAGMA journal_mode = MEMORY").await?;
    assert_eq!(db.run("SELECT 1").await?, 0);
    assert_eq!(db.run(format!("SELECT * FROM {TABLE}")).await?, 0);
    assert_eq!(count(&db).await?, 2);

    let mode = db.get("PRAGMA journal_mode").await?.expect("row");
    assert_eq!(mode.get_index(0).and_then(Value::as_str), Some("memory"));
    Ok(())
}

#[tokio::test]
async fn test_each_callback_panic_leaves_connection_usable() -> Result<()> {
    let db = create_test_db().await?;
    seed(&db, 3).await?;

    let err = db
        .each(format!("SELECT * FROM {TABLE}"), |_| panic!("row callback failed"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CallbackPanicked));

    assert_eq!(db.find_all(TABLE, &[]).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_each_reports_query_errors() -> Result<()> {
    let db = create_test_db().await?;
    let err = db
        .each("SELECT * FROM missing_table", |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Sqlite(_)));
    assert_eq!(count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_connect_entry_point_and_path() -> Result<()> {
    let db = sqliter::connect(":memory:").await?;
    assert_eq!(db.executor().path(), &sqliter::DbPath::Memory);

    let temp_file = NamedTempFile::new()?;
    let file_db = sqliter::connect(temp_file.path()).await?;
    assert_eq!(
        file_db.executor().path(),
        &sqliter::DbPath::File(temp_file.path().to_path_buf())
    );
    file_db.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_blob_and_null_values_round_trip() -> Result<()> {
    let db = Sqliter::connect(":memory:").await?;
    db.create_table(
        "files",
        &[
            ColumnSpec::new("id", TYPE::INTEGER).with_options("PRIMARY KEY"),
            ColumnSpec::new("data", TYPE::BLOB),
            ColumnSpec::new("note", TYPE::TEXT),
        ],
    )
    .await?;

    let bytes = vec![0u8, 159, 146, 150];
    db.save(
        "files",
        Fields::new()
            .with("id", 1)
            .with("data", bytes.clone())
            .with("note", None::<String>),
    )
    .await?;

    let row = db.find("files", &[Condition::eq("id", 1)]).await?.expect("row");
    assert_eq!(row.get("data").and_then(Value::as_blob), Some(bytes.as_slice()));
    assert!(row.get("note").is_some_and(Value::is_null));
    Ok(())
}

#[tokio::test]
async fn test_row_copied_into_another_table() -> Result<()> {
    let db = create_test_db().await?;
    db.create_table("archive", &columns()).await?;
    db.save(TABLE, Fields::new().with("id", 9).with("name", "old")).await?;

    let row = db.find(TABLE, &[Condition::eq("id", 9)]).await?.expect("row");
    let fields = row.into_fields();
    assert_eq!(fields.len(), 2);
    assert_eq!(
        fields.iter().map(|(column, _)| column).collect::<Vec<_>>(),
        vec!["id", "name"]
    );
    db.save("archive", fields).await?;

    let copied = db.find("archive", &[]).await?.expect("copied row");
    assert_eq!(copied.get("name").and_then(Value::as_str), Some("old"));
    Ok(())
}
