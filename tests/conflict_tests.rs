//! Tests for conflict detection

use data_unification_sdk::conflict::{detect_conflicts, detect_conflicts_on};
use data_unification_sdk::models::{AlignedItem, Nested, Table, Value};
use serde_json::json;

fn table(rows: Vec<Vec<(&str, Value)>>) -> Table {
    Table::from_records(rows)
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

mod detect_tests {
    use super::*;

    #[test]
    fn test_disagreeing_value_on_shared_key() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("a"))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("b"))]]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        assert_eq!(conflicts.len(), 1);
        let entry = conflicts.get(&[Value::from(1)]).unwrap();
        assert_eq!(entry.keys().collect::<Vec<_>>(), vec!["v"]);
        assert_eq!(entry["v"]["A"], vec![Value::from("a")]);
        assert_eq!(entry["v"]["B"], vec![Value::from("b")]);
    }

    #[test]
    fn test_agreeing_values_yield_no_entry() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![
                    vec![("id", Value::from(1)), ("v", Value::from("same"))],
                    vec![("id", Value::from(2)), ("v", Value::from("x"))],
                ]),
            ),
            AlignedItem::new(
                "B",
                table(vec![
                    vec![("id", Value::from(1)), ("v", Value::from("same"))],
                    vec![("id", Value::from(2)), ("v", Value::from("y"))],
                ]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        assert!(conflicts.get(&[Value::from(1)]).is_none());
        assert!(conflicts.get(&[Value::from(2)]).is_some());
    }

    #[test]
    fn test_nulls_do_not_count_as_disagreement() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("a"))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(1)), ("v", Value::Null)]]),
            ),
        ];
        assert!(detect_conflicts_on(&items, &keys(&["id"])).is_empty());
    }

    #[test]
    fn test_entries_are_ordered_by_key() {
        let rows = |v: &str| {
            table(vec![
                vec![("id", Value::from(3)), ("v", Value::from(v))],
                vec![("id", Value::from(1)), ("v", Value::from(v))],
                vec![("id", Value::from(2)), ("v", Value::from(v))],
            ])
        };
        let items = vec![AlignedItem::new("A", rows("a")), AlignedItem::new("B", rows("b"))];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        let order: Vec<_> = conflicts.iter().map(|(key, _)| key[0].clone()).collect();
        assert_eq!(order, vec![Value::from(1), Value::from(2), Value::from(3)]);
    }

    #[test]
    fn test_three_sources_report_only_those_with_values() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("a"))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(1)), ("v", Value::Null)]]),
            ),
            AlignedItem::new(
                "C",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("c"))]]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        let v = &conflicts.get(&[Value::from(1)]).unwrap()["v"];
        assert_eq!(v.keys().collect::<Vec<_>>(), vec!["A", "C"]);
    }

    #[test]
    fn test_composite_key() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![
                    ("region", Value::from("eu")),
                    ("id", Value::from(1)),
                    ("v", Value::from(10)),
                ]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![
                    ("region", Value::from("eu")),
                    ("id", Value::from(1)),
                    ("v", Value::from(11)),
                ]]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["region", "id"]));
        assert!(
            conflicts
                .get(&[Value::from("eu"), Value::from(1)])
                .is_some()
        );
    }
}

mod numeric_tests {
    use super::*;

    #[test]
    fn test_int_and_float_keys_form_one_group() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("a"))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(1.0)), ("v", Value::from("b"))]]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        assert_eq!(conflicts.len(), 1);
        let entry = conflicts.get(&[Value::from(1.0)]).unwrap();
        assert_eq!(entry["v"]["A"], vec![Value::from("a")]);
        assert_eq!(entry["v"]["B"], vec![Value::from("b")]);
    }

    #[test]
    fn test_equal_int_and_float_values_agree() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("n", Value::from(2))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(1)), ("n", Value::from(2.0))]]),
            ),
        ];
        assert!(detect_conflicts_on(&items, &keys(&["id"])).is_empty());
    }

    #[test]
    fn test_differing_int_and_float_values_are_reported_as_floats() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("n", Value::from(2))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(1)), ("n", Value::from(2.5))]]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        let n = &conflicts.get(&[Value::from(1)]).unwrap()["n"];
        assert_eq!(n["A"], vec![Value::from(2.0)]);
        assert_eq!(n["B"], vec![Value::from(2.5)]);
    }
}

mod key_selection_tests {
    use super::*;

    #[test]
    fn test_default_key_is_full_intersection() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![
                    ("id", Value::from(1)),
                    ("v", Value::from("a")),
                    ("only_a", Value::from(true)),
                ]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("v", Value::from("b")), ("id", Value::from(1))]]),
            ),
        ];

        let conflicts = detect_conflicts(&items);
        assert_eq!(conflicts.key_columns, vec!["id", "v"]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_default_key_with_partial_schemas() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![
                    vec![("id", Value::from(7)), ("email", Value::from("old@x"))],
                    vec![("id", Value::from(7)), ("email", Value::from("new@x"))],
                ]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("id", Value::from(7)), ("phone", Value::from("555"))]]),
            ),
        ];

        let conflicts = detect_conflicts(&items);
        assert_eq!(conflicts.key_columns, vec!["id"]);
        let entry = conflicts.get(&[Value::from(7)]).unwrap();
        assert_eq!(
            entry["email"]["A"],
            vec![Value::from("old@x"), Value::from("new@x")]
        );
        assert!(!entry.contains_key("phone"));
    }

    #[test]
    fn test_nested_items_are_skipped() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("a"))]]),
            ),
            AlignedItem::new("B", Nested::from(json!([{"id": 1, "v": "b"}]))),
            AlignedItem::new(
                "C",
                table(vec![vec![("id", Value::from(1)), ("v", Value::from("c"))]]),
            ),
        ];

        let conflicts = detect_conflicts_on(&items, &keys(&["id"]));
        let v = &conflicts.get(&[Value::from(1)]).unwrap()["v"];
        assert_eq!(v.keys().collect::<Vec<_>>(), vec!["A", "C"]);
    }

    #[test]
    fn test_reserved_columns_are_never_keys() {
        let items = vec![
            AlignedItem::new(
                "A",
                table(vec![vec![("_source", Value::from("x")), ("id", Value::from(1))]]),
            ),
            AlignedItem::new(
                "B",
                table(vec![vec![("_source", Value::from("y")), ("id", Value::from(1))]]),
            ),
        ];

        let conflicts = detect_conflicts(&items);
        assert_eq!(conflicts.key_columns, vec!["id"]);
        assert!(conflicts.is_empty());
    }
}
