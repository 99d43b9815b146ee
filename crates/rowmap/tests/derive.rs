use pretty_assertions::assert_eq;
use rowmap::memory::{MemoryProvider, ResultSet};
use rowmap::{DatabaseExt, FromRow, MapOptions, RowMapError, Shape, SqlEnum, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, SqlEnum)]
enum Status {
    #[default]
    Active = 1,
    Suspended = 2,
}

#[derive(Debug, Default, PartialEq, FromRow)]
struct Audit {
    created_by: String,
    revision: i32,
}

#[derive(Debug, Default, PartialEq, FromRow)]
#[rowmap(rename_all = "PascalCase")]
struct Person {
    person_id: i64,
    full_name: String,
    #[rowmap(rename = "years")]
    age: Option<i32>,
    status: Status,
    #[rowmap(skip)]
    cached: u32,
    #[rowmap(flatten)]
    audit: Audit,
}

#[derive(Debug, PartialEq, FromRow)]
struct Total(String, i64);

#[derive(Debug, Default, PartialEq, FromRow)]
struct Device {
    id: Uuid,
    label: String,
}

const PEOPLE: &str = "SELECT * FROM people";

fn people() -> ResultSet {
    ResultSet::new(["PERSONID", "FullName", "years", "status", "Created_By", "revision", "ignored"])
        .row(vec![
            Value::I32(7),
            Value::from("Ada"),
            Value::Null,
            Value::I32(2),
            Value::from("import"),
            Value::I16(3),
            Value::from("x"),
        ])
        .row(vec![
            Value::I64(8),
            Value::from("Grace"),
            Value::I32(85),
            Value::I32(1),
            Value::Null,
            Value::I32(1),
            Value::Null,
        ])
}

#[test]
fn test_composite_matches_columns_ignoring_case() {
    let provider = MemoryProvider::new().with_result(PEOPLE, people());

    let rows = provider.sql_query::<Person>(PEOPLE, Vec::new()).to_list().unwrap();

    assert_eq!(Person::SHAPE, Shape::Composite);
    assert_eq!(
        rows,
        vec![
            Person {
                person_id: 7,
                full_name: "Ada".to_string(),
                age: None,
                status: Status::Suspended,
                cached: 0,
                audit: Audit {
                    created_by: "import".to_string(),
                    revision: 3,
                },
            },
            Person {
                person_id: 8,
                full_name: "Grace".to_string(),
                age: Some(85),
                status: Status::Active,
                cached: 0,
                audit: Audit {
                    created_by: String::new(),
                    revision: 1,
                },
            },
        ]
    );
}

#[test]
fn test_missing_columns_keep_zero_values_unless_strict() {
    let set = ResultSet::new(["personid", "fullname"]).row(vec![Value::I64(1), Value::from("Ada")]);
    let provider = MemoryProvider::new().with_result("SELECT id", set);

    let person = provider
        .sql_query::<Person>("SELECT id", Vec::new())
        .single()
        .unwrap();
    assert_eq!(person.person_id, 1);
    assert_eq!(person.age, None);
    assert_eq!(person.status, Status::Active);
    assert_eq!(person.audit, Audit::default());

    let err = provider
        .sql_query::<Person>("SELECT id", Vec::new())
        .with_options(MapOptions::new().strict(true))
        .single()
        .unwrap_err();
    assert!(matches!(err, RowMapError::UnmappedField { ref field } if field == "age"));
}

#[test]
fn test_composite_rejects_incompatible_values() {
    let set = ResultSet::new(["FullName"]).row(vec![Value::I32(4)]);
    let provider = MemoryProvider::new().with_result("SELECT name", set);

    let err = provider
        .sql_query::<Person>("SELECT name", Vec::new())
        .first()
        .unwrap_err();
    assert!(matches!(
        err,
        RowMapError::TypeMismatch { column: Some(ref c), .. } if c == "fullname"
    ));
}

#[test]
fn test_tuple_struct_reads_by_position() {
    let set = ResultSet::new(["city", "count"])
        .row(vec![Value::from("Oslo"), Value::I32(5)])
        .row(vec![Value::Null, Value::from(" 12 ")]);
    let provider = MemoryProvider::new().with_result("SELECT city, count", set);

    let totals = provider
        .sql_query::<Total>("SELECT city, count", Vec::new())
        .to_list()
        .unwrap();

    assert_eq!(Total::SHAPE, Shape::Tuple);
    assert_eq!(totals, vec![Total("Oslo".to_string(), 5), Total(String::new(), 12)]);
}

#[test]
fn test_sql_enum_as_scalar() {
    let set = ResultSet::new(["status"])
        .row(vec![Value::I32(1)])
        .row(vec![Value::I64(2)]);
    let provider = MemoryProvider::new()
        .with_result("SELECT status", set)
        .with_result("SELECT bad", ResultSet::new(["status"]).row(vec![Value::I32(9)]));

    let statuses = provider
        .sql_query::<Status>("SELECT status", Vec::new())
        .to_list()
        .unwrap();
    assert_eq!(statuses, vec![Status::Active, Status::Suspended]);

    let err = provider
        .sql_query::<Status>("SELECT bad", Vec::new())
        .single()
        .unwrap_err();
    assert!(matches!(err, RowMapError::InvalidEnumValue { value: 9, .. }));
}

#[test]
fn test_text_identifiers_need_opt_in() {
    let id = Uuid::new_v4();
    let set = ResultSet::new(["id", "label"]).row(vec![Value::Text(id.to_string()), Value::from("probe")]);
    let provider = MemoryProvider::new().with_result("SELECT device", set);
    let query = provider.sql_query::<Device>("SELECT device", Vec::new());

    assert!(matches!(
        query.single().unwrap_err(),
        RowMapError::TypeMismatch { .. }
    ));

    let device = query
        .with_options(MapOptions::new().parse_text_identifiers(true))
        .single()
        .unwrap();
    assert_eq!(
        device,
        Device {
            id,
            label: "probe".to_string(),
        }
    );
}

#[tokio::test]
async fn test_async_composite() {
    let provider = MemoryProvider::new().with_result(PEOPLE, people());

    let first = provider
        .sql_query::<Person>(PEOPLE, Vec::new())
        .first_async()
        .await
        .unwrap();
    assert_eq!(first.full_name, "Ada");
    assert_eq!(provider.open_count(), provider.close_count());
}
