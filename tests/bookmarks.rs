// Bookmark scenarios: the table shape and data the Barky command layer uses.

use anyhow::Result;
use bookmark_store::{Columns, Criteria, Record, TableOps, TableStore, Value};
use tempfile::NamedTempFile;

fn bookmark_columns() -> Columns {
    Columns::new()
        .with_column("id", "integer primary key autoincrement")
        .with_column("title", "text not null")
        .with_column("url", "text not null")
        .with_column("notes", "text")
        .with_column("date_added", "text not null")
}

fn bookmark(title: &str, url: &str, notes: &str, date_added: &str) -> Record {
    Record::new()
        .with_value("title", title)
        .with_value("url", url)
        .with_value("notes", notes)
        .with_value("date_added", date_added)
}

// Helper function to create a store on a temporary file with the bookmarks table
fn create_temp_store() -> Result<(TableStore, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let store = TableStore::open(temp_file.path())?;
    store.create_table("bookmarks", &bookmark_columns())?;
    Ok((store, temp_file))
}

fn catalog_count(store: &TableStore, name: &str) -> Result<i64> {
    let count = store.connection()?.query_row(
        "SELECT count(name) FROM sqlite_master WHERE type='table' AND name=?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[test]
fn test_create_table() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    assert_eq!(catalog_count(&store, "bookmarks")?, 1);
    assert!(store.table_exists("bookmarks")?);
    assert_eq!(
        store.columns("bookmarks")?,
        ["id", "title", "url", "notes", "date_added"]
    );

    store.drop_table("bookmarks")?;
    assert_eq!(catalog_count(&store, "bookmarks")?, 0);
    // Dropping again is not an error
    store.drop_table("bookmarks")?;
    Ok(())
}

#[test]
fn test_add_bookmark() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    let data = bookmark("test_title", "http://example.com", "test notes", "2024-03-20T10:00:00+00:00");

    let id = store.add("bookmarks", &data)?;
    assert_eq!(id, 1);

    let rows = store
        .select("bookmarks", Some(&Criteria::new().with_condition("title", "test_title")), None)?
        .fetch_all()?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row[0], Value::Integer(1));
    for (column, value) in data.iter() {
        assert_eq!(row.get(column), Some(value), "{column}");
    }
    Ok(())
}

#[test]
fn test_delete_bookmark() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    store.add(
        "bookmarks",
        &bookmark("test_title", "http://example.com", "test notes", "2024-03-20"),
    )?;
    let by_title = Criteria::new().with_condition("title", "test_title");

    assert_eq!(store.delete("bookmarks", &by_title)?, 1);
    assert!(store.select("bookmarks", Some(&by_title), None)?.fetch_one()?.is_none());

    // Deleting an already-absent match is a no-op
    assert_eq!(store.delete("bookmarks", &by_title)?, 0);
    Ok(())
}

#[test]
fn test_select() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    let data = [
        bookmark("Test 1", "http://example.com/test1", "Test notes 1", "2024-03-20"),
        bookmark("Test 2", "http://example.com/test2", "Test notes 2", "2024-03-21"),
        bookmark("Test 3", "http://example.com/test3", "Test notes 3", "2024-03-22"),
    ];
    for record in &data {
        store.add("bookmarks", record)?;
    }

    let all = store.select("bookmarks", None, None)?.fetch_all()?;
    assert_eq!(all.len(), data.len());

    let criteria = Criteria::new().with_condition("title", "Test 2");
    let mut selection = store.select("bookmarks", Some(&criteria), Some("date_added"))?;
    let mut cursor = selection.cursor()?;
    let selected = cursor.fetch_one()?.expect("one bookmark titled Test 2");
    assert_eq!(selected[1], Value::Text("Test 2".into()));
    assert!(cursor.fetch_one()?.is_none());
    Ok(())
}

#[test]
fn test_select_order_by_date_added() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    for (title, date) in [("c", "2024-03-22"), ("a", "2024-03-20"), ("d", "2024-03-23"), ("b", "2024-03-21")] {
        store.add("bookmarks", &bookmark(title, "http://example.com", "", date))?;
    }

    let dates = |order: &str| -> Result<Vec<String>> {
        let mut selection = store.select("bookmarks", None, Some(order))?;
        let mut dates = Vec::new();
        for record in selection.cursor()? {
            let record = record?;
            dates.push(record.get("date_added").and_then(Value::as_str).unwrap_or_default().to_string());
        }
        Ok(dates)
    };

    let ascending = dates("date_added")?;
    assert!(ascending.windows(2).all(|pair| pair[0] <= pair[1]), "{ascending:?}");
    assert_eq!(ascending.len(), 4);

    let descending = dates("date_added DESC")?;
    assert_eq!(descending, ascending.iter().rev().cloned().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_count_tracks_adds_and_deletes() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    for i in 0..5 {
        store.add(
            "bookmarks",
            &bookmark(&format!("t{i}"), "http://example.com", "", "2024-01-01"),
        )?;
    }
    store.delete("bookmarks", &Criteria::new().with_condition("title", "t3"))?;

    let selected = store.select("bookmarks", None, None)?.fetch_all()?.len();
    assert_eq!(selected, 4);
    assert_eq!(store.count("bookmarks", None)?, 4);
    Ok(())
}

#[test]
fn test_notes_may_be_null() -> Result<()> {
    let (store, _file) = create_temp_store()?;
    let record = Record::new()
        .with_value("title", "no notes")
        .with_value("url", "http://example.com")
        .with_value("notes", None::<&str>)
        .with_value("date_added", "2024-03-20");
    store.add("bookmarks", &record)?;

    let row = store
        .select("bookmarks", Some(&Criteria::new().with_condition("title", "no notes")), None)?
        .fetch_one()?
        .expect("inserted row");
    assert!(row.get("notes").is_some_and(Value::is_null));
    Ok(())
}

#[test]
fn test_teardown_releases_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test_bookmarks.db");
    let mut store = TableStore::open(&path)?;
    store.create_table("bookmarks", &bookmark_columns())?;

    store.close()?;
    store.close()?;
    assert!(!store.is_open());
    std::fs::remove_file(&path)?;
    assert!(!path.exists());
    Ok(())
}
