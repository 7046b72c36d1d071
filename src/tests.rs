use tempfile::TempDir;

use crate::error::StoreError;
use crate::filter::Condition;
use crate::models::{ColumnSpec, Value};
use crate::row;
use crate::store::TableStore;

fn people_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("name", "text"),
        ColumnSpec::new("age", "integer"),
    ]
}

fn setup_people() -> TableStore {
    let mut store = TableStore::open_in_memory().unwrap();
    store.create_table("people", &people_columns()).unwrap();
    store
        .insert_rows("people", &[row!["Ana", 30], row!["Bo", 25]])
        .unwrap();
    store
}

// ==================== Open ====================

#[test]
fn test_open_creates_file() {
    let temp = TempDir::new().unwrap();
    let store = TableStore::open_at(temp.path(), "people.db").unwrap();
    assert_eq!(store.path(), Some(temp.path().join("people.db").as_path()));
    assert!(store.table_names().is_empty());
    store.close().unwrap();
    assert!(temp.path().join("people.db").exists());
}

#[test]
fn test_open_rejects_missing_dir() {
    let temp = TempDir::new().unwrap();
    let result = TableStore::open_at(temp.path().join("missing"), "people.db");
    assert!(matches!(result, Err(StoreError::Configuration(_))));
}

#[test]
fn test_open_rejects_bad_name() {
    let temp = TempDir::new().unwrap();
    for name in ["people", "people.sqlite", "my-people.db", ""] {
        let result = TableStore::open_at(temp.path(), name);
        assert!(
            matches!(result, Err(StoreError::Configuration(_))),
            "expected Configuration error for {name:?}"
        );
    }
}

#[test]
fn test_reopen_loads_existing_tables() {
    let temp = TempDir::new().unwrap();
    {
        let mut store = TableStore::open_at(temp.path(), "people.db").unwrap();
        store.create_table("people", &people_columns()).unwrap();
        store
            .create_table("pets", &[ColumnSpec::new("name", "text")])
            .unwrap();
        store.insert_rows("people", &[row!["Ana", 30]]).unwrap();
    }

    let store = TableStore::open_at(temp.path(), "people.db").unwrap();
    assert_eq!(store.table_names(), ["people", "pets"]);
    assert_eq!(
        store.fetch_rows("people", None, None).unwrap(),
        vec![row!["Ana", 30]]
    );
}

#[test]
fn test_internal_tables_are_not_cached() {
    let temp = TempDir::new().unwrap();
    {
        let mut store = TableStore::open_at(temp.path(), "auto.db").unwrap();
        store
            .create_table("items", &[ColumnSpec::new("id", "integer primary key autoincrement")])
            .unwrap();
        store.insert_rows("items", &[row![Value::Null]]).unwrap();
    }

    let store = TableStore::open_at(temp.path(), "auto.db").unwrap();
    assert_eq!(store.table_names(), ["items"]);
}

// ==================== Create ====================

#[test]
fn test_create_table() {
    let mut store = TableStore::open_in_memory().unwrap();
    assert!(!store.table_exists("people"));
    store.create_table("people", &people_columns()).unwrap();
    assert!(store.table_exists("people"));
    assert_eq!(store.column_names("people").unwrap(), vec!["name", "age"]);
}

#[test]
fn test_create_duplicate_table_keeps_schema() {
    let mut store = TableStore::open_in_memory().unwrap();
    store.create_table("people", &people_columns()).unwrap();

    let result = store.create_table("people", &[ColumnSpec::new("other", "blob")]);
    assert!(matches!(result, Err(StoreError::AlreadyExists(ref t)) if t == "people"));
    assert_eq!(store.column_names("people").unwrap(), vec!["name", "age"]);
    assert_eq!(store.table_names(), ["people"]);
}

#[test]
fn test_create_table_rejects_bad_columns() {
    let mut store = TableStore::open_in_memory().unwrap();

    let cases: Vec<Vec<ColumnSpec>> = vec![
        vec![],
        vec![ColumnSpec::new("a", "text"), ColumnSpec::new("A", "integer")],
        vec![ColumnSpec::new("a", "text; DROP TABLE x")],
        vec![ColumnSpec::new("a", "")],
        vec![ColumnSpec::new("", "text")],
        vec![ColumnSpec::new("a", "text, b integer, c blob")],
        vec![ColumnSpec::new("a", "decimal(10, 2), b integer")],
        vec![ColumnSpec::new("a", "text) (")],
        vec![ColumnSpec::new("a", "decimal(10, (2))")],
    ];
    for columns in cases {
        let result = store.create_table("bad", &columns);
        assert!(
            matches!(result, Err(StoreError::Schema { .. })),
            "expected Schema error for {columns:?}"
        );
    }
    assert!(!store.table_exists("bad"));
}

#[test]
fn test_create_table_accepts_parenthesized_type() {
    let mut store = TableStore::open_in_memory().unwrap();
    store
        .create_table("prices", &[ColumnSpec::new("amount", "decimal(10, 2)")])
        .unwrap();
    assert_eq!(store.column_names("prices").unwrap(), ["amount"]);
}

#[test]
fn test_create_table_engine_rejection_is_schema_error() {
    let mut store = TableStore::open_in_memory().unwrap();
    let result = store.create_table("bad", &[ColumnSpec::new("a", "(text)")]);
    assert!(matches!(result, Err(StoreError::Schema { .. })));
    assert!(!store.table_exists("bad"));
}

#[test]
fn test_create_table_quotes_names() {
    let mut store = TableStore::open_in_memory().unwrap();
    store
        .create_table("order", &[ColumnSpec::new("select", "text")])
        .unwrap();
    store.insert_rows("order", &[row!["x"]]).unwrap();
    assert_eq!(
        store
            .fetch_rows("order", Some(&["select"]), Some(&Condition::eq("select", "x")))
            .unwrap(),
        vec![row!["x"]]
    );
}

// ==================== Insert ====================

#[test]
fn test_insert_then_fetch_preserves_order() {
    let mut store = TableStore::open_in_memory().unwrap();
    store.create_table("people", &people_columns()).unwrap();

    let rows = vec![
        row!["Ana", 30],
        row!["Bo", 25],
        row!["Cy", Value::Null],
        row!["Ana", 30],
    ];
    assert_eq!(store.insert_rows("people", &rows).unwrap(), 4);
    assert_eq!(store.fetch_rows("people", None, None).unwrap(), rows);
}

#[test]
fn test_insert_unknown_table() {
    let mut store = TableStore::open_in_memory().unwrap();
    let result = store.insert_rows("ghosts", &[row!["boo"]]);
    assert!(matches!(result, Err(StoreError::NotFound(ref t)) if t == "ghosts"));
}

#[test]
fn test_insert_shape_error_commits_nothing() {
    let mut store = TableStore::open_in_memory().unwrap();
    store.create_table("people", &people_columns()).unwrap();

    let rows = vec![row!["Ana", 30], row!["Bo"], row!["Cy", 40]];
    let result = store.insert_rows("people", &rows);
    assert!(matches!(
        result,
        Err(StoreError::Shape {
            index: 1,
            expected: 2,
            actual: 1,
            ..
        })
    ));
    assert!(store.fetch_rows("people", None, None).unwrap().is_empty());
}

#[test]
fn test_insert_engine_error_rolls_back_batch() {
    let mut store = TableStore::open_in_memory().unwrap();
    store
        .create_table(
            "users",
            &[
                ColumnSpec::new("id", "integer primary key"),
                ColumnSpec::new("name", "text not null"),
            ],
        )
        .unwrap();

    let rows = vec![row![1, "Ana"], row![2, "Bo"], row![1, "Dup"]];
    let result = store.insert_rows("users", &rows);
    assert!(matches!(result, Err(StoreError::Db(_))));
    assert!(store.fetch_rows("users", None, None).unwrap().is_empty());

    store.insert_rows("users", &rows[..2]).unwrap();
    assert_eq!(store.fetch_rows("users", None, None).unwrap().len(), 2);
}

#[test]
fn test_insert_empty_batch() {
    let mut store = TableStore::open_in_memory().unwrap();
    store.create_table("people", &people_columns()).unwrap();
    assert_eq!(store.insert_rows("people", &[]).unwrap(), 0);
}

#[test]
fn test_insert_keeps_value_types() {
    let mut store = TableStore::open_in_memory().unwrap();
    store
        .create_table(
            "mixed",
            &[
                ColumnSpec::new("i", "integer"),
                ColumnSpec::new("r", "real"),
                ColumnSpec::new("t", "text"),
                ColumnSpec::new("b", "blob"),
            ],
        )
        .unwrap();
    let row = row![7, 1.5, "it's", vec![0u8, 1, 2]];
    store.insert_rows("mixed", &[row.clone()]).unwrap();
    assert_eq!(store.fetch_rows("mixed", None, None).unwrap(), vec![row]);
}

#[test]
fn test_insert_values_are_not_interpolated() {
    let mut store = setup_people();
    store
        .insert_rows("people", &[row!["x'); DROP TABLE people; --", 1]])
        .unwrap();
    assert!(store.table_exists("people"));
    assert_eq!(store.fetch_rows("people", None, None).unwrap().len(), 3);
}

// ==================== Delete ====================

#[test]
fn test_delete_without_condition_empties_table() {
    let mut store = setup_people();
    assert_eq!(store.delete_rows("people", None).unwrap(), 2);
    assert!(store.fetch_rows("people", None, None).unwrap().is_empty());
    assert!(store.table_exists("people"));
}

#[test]
fn test_delete_with_condition() {
    let mut store = setup_people();
    let deleted = store
        .delete_rows("people", Some(&Condition::lt("age", 26)))
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(
        store.fetch_rows("people", None, None).unwrap(),
        vec![row!["Ana", 30]]
    );
}

#[test]
fn test_delete_with_empty_condition_deletes_all() {
    let mut store = setup_people();
    let deleted = store
        .delete_rows("people", Some(&Condition::And(vec![])))
        .unwrap();
    assert_eq!(deleted, 2);
}

#[test]
fn test_delete_with_negated_or_empty_disjunction_deletes_nothing() {
    let mut store = setup_people();
    let negated = Condition::And(vec![]).not();
    assert_eq!(store.delete_rows("people", Some(&negated)).unwrap(), 0);
    assert_eq!(
        store
            .delete_rows("people", Some(&Condition::Or(vec![])))
            .unwrap(),
        0
    );
    assert_eq!(store.fetch_rows("people", None, None).unwrap().len(), 2);

    assert!(matches!(
        store.update_rows("people", [("age", 0)], Some(&negated)),
        Ok(0)
    ));
    assert!(
        store
            .fetch_rows("people", None, Some(&Condition::Or(vec![])))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_delete_unknown_table_and_column() {
    let mut store = setup_people();
    assert!(matches!(
        store.delete_rows("ghosts", None),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.delete_rows("people", Some(&Condition::eq("height", 1))),
        Err(StoreError::UnknownColumn { ref column, .. }) if column == "height"
    ));
    assert_eq!(store.fetch_rows("people", None, None).unwrap().len(), 2);
}

#[test]
fn test_delete_parsed_condition() {
    let mut store = setup_people();
    let condition: Condition = "name = 'Bo' OR age > 100".parse().unwrap();
    assert_eq!(store.delete_rows("people", Some(&condition)).unwrap(), 1);
}

// ==================== Update ====================

#[test]
fn test_update_rows() {
    let mut store = setup_people();
    let updated = store
        .update_rows("people", [("age", 31)], Some(&Condition::eq("name", "Ana")))
        .unwrap();
    assert_eq!(updated, 1);
    assert_eq!(
        store.fetch_rows("people", None, None).unwrap(),
        vec![row!["Ana", 31], row!["Bo", 25]]
    );
}

#[test]
fn test_update_multiple_assignments() {
    let mut store = setup_people();
    store
        .update_rows(
            "people",
            vec![("name", Value::from("Bob")), ("age", Value::from(26))],
            Some(&Condition::eq("name", "Bo")),
        )
        .unwrap();
    assert_eq!(
        store
            .fetch_rows("people", None, Some(&Condition::eq("name", "Bob")))
            .unwrap(),
        vec![row!["Bob", 26]]
    );
}

#[test]
fn test_update_without_condition_is_refused() {
    let mut store = setup_people();

    let result = store.update_rows("people", [("age", 0)], None);
    assert!(matches!(result, Err(StoreError::MissingCondition(ref t)) if t == "people"));

    let result = store.update_rows("people", [("age", 0)], Some(&Condition::Or(vec![])));
    assert!(matches!(result, Err(StoreError::MissingCondition(_))));

    assert_eq!(
        store.fetch_rows("people", None, None).unwrap(),
        vec![row!["Ana", 30], row!["Bo", 25]]
    );
}

#[test]
fn test_update_validation() {
    let mut store = setup_people();
    let condition = Condition::eq("name", "Ana");

    let result = store.update_rows("ghosts", [("age", 0)], Some(&condition));
    assert!(matches!(result, Err(StoreError::NotFound(_))));

    let result = store.update_rows("people", Vec::<(&str, Value)>::new(), Some(&condition));
    assert!(matches!(result, Err(StoreError::NoAssignments(_))));

    let result = store.update_rows("people", [("height", 180)], Some(&condition));
    assert!(matches!(
        result,
        Err(StoreError::UnknownColumn { ref column, .. }) if column == "height"
    ));

    let result = store.update_rows("people", [("age", 1)], Some(&Condition::eq("nope", 1)));
    assert!(matches!(result, Err(StoreError::UnknownColumn { .. })));
}

// ==================== Columns / Fetch ====================

#[test]
fn test_column_names_unknown_table() {
    let store = TableStore::open_in_memory().unwrap();
    assert!(matches!(
        store.column_names("ghosts"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_fetch_four_combinations() {
    let store = setup_people();
    let older = Condition::gt("age", 26);

    assert_eq!(
        store.fetch_rows("people", None, None).unwrap(),
        vec![row!["Ana", 30], row!["Bo", 25]]
    );
    assert_eq!(
        store.fetch_rows("people", None, Some(&older)).unwrap(),
        vec![row!["Ana", 30]]
    );
    assert_eq!(
        store.fetch_rows("people", Some(&["age"]), None).unwrap(),
        vec![row![30], row![25]]
    );
    assert_eq!(
        store
            .fetch_rows("people", Some(&["age", "name"]), Some(&older))
            .unwrap(),
        vec![row![30, "Ana"]]
    );
}

#[test]
fn test_fetch_end_to_end_with_parsed_filter() {
    let store = setup_people();
    let condition: Condition = "age > 26".parse().unwrap();
    let rows = store
        .fetch_rows("people", Some(&["name"]), Some(&condition))
        .unwrap();
    assert_eq!(rows, vec![row!["Ana"]]);
}

#[test]
fn test_fetch_unknown_column() {
    let store = setup_people();
    let result = store.fetch_rows("people", Some(&["name", "z"]), None);
    assert!(matches!(
        result,
        Err(StoreError::UnknownColumn { ref table, ref column }) if table == "people" && column == "z"
    ));

    let result = store.fetch_rows("people", None, Some(&Condition::is_null("z")));
    assert!(matches!(result, Err(StoreError::UnknownColumn { .. })));
}

#[test]
fn test_fetch_column_names_are_case_insensitive() {
    let store = setup_people();
    let rows = store.fetch_rows("people", Some(&["NAME"]), None).unwrap();
    assert_eq!(rows, vec![row!["Ana"], row!["Bo"]]);
}

#[test]
fn test_fetch_empty_subset_means_all_columns() {
    let store = setup_people();
    let rows = store.fetch_rows("people", Some(&[]), None).unwrap();
    assert_eq!(rows, vec![row!["Ana", 30], row!["Bo", 25]]);
}

#[test]
fn test_fetch_unknown_table() {
    let store = TableStore::open_in_memory().unwrap();
    assert!(matches!(
        store.fetch_rows("ghosts", None, None),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_fetch_like_and_null_filters() {
    let mut store = setup_people();
    store.insert_rows("people", &[row!["Al", Value::Null]]).unwrap();

    let rows = store
        .fetch_rows("people", Some(&["name"]), Some(&Condition::like("name", "A%")))
        .unwrap();
    assert_eq!(rows, vec![row!["Ana"], row!["Al"]]);

    let rows = store
        .fetch_rows("people", Some(&["name"]), Some(&Condition::is_null("age")))
        .unwrap();
    assert_eq!(rows, vec![row!["Al"]]);

    let rows = store
        .fetch_rows(
            "people",
            Some(&["name"]),
            Some(&Condition::is_null("age").not()),
        )
        .unwrap();
    assert_eq!(rows, vec![row!["Ana"], row!["Bo"]]);
}

// ==================== Staleness ====================

#[test]
fn test_cache_does_not_see_external_tables() {
    let temp = TempDir::new().unwrap();
    let mut first = TableStore::open_at(temp.path(), "shared.db").unwrap();
    let mut second = TableStore::open_at(temp.path(), "shared.db").unwrap();

    second.create_table("late", &[ColumnSpec::new("x", "text")]).unwrap();
    assert!(second.table_exists("late"));
    assert!(!first.table_exists("late"));

    // The engine still knows the table, so a create through the stale handle fails there.
    let result = first.create_table("late", &[ColumnSpec::new("x", "text")]);
    assert!(matches!(result, Err(StoreError::Schema { .. })));
}
