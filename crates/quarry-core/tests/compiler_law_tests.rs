#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use quarry_core::predicate::CompareOp;
use quarry_core::query::compile_select;
use quarry_core::{col, IdentityMapper, Predicate, QuerySpec, Value};

fn leaf() -> impl Strategy<Value = Predicate> {
    let column = prop::sample::select(vec!["id", "name", "quantity", "items.price"]);
    let op = prop::sample::select(vec![
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Ge,
        CompareOp::Like,
    ]);
    prop_oneof![
        (column.clone(), op, any::<i64>()).prop_map(|(c, op, v)| Predicate::Compare {
            column: c.to_string(),
            op,
            value: Value::Integer(v),
        }),
        column.clone().prop_map(|c| col(c).is_null()),
        column.clone().prop_map(|c| col(c).is_not_null()),
        (
            column.clone(),
            prop::collection::vec(any::<i64>(), 1..5),
            any::<bool>()
        )
            .prop_map(|(c, values, negated)| if negated {
                col(c).not_in(values)
            } else {
                col(c).is_in(values)
            }),
        (column, any::<i64>(), any::<i64>()).prop_map(|(c, lo, hi)| col(c).between(lo, hi)),
    ]
}

fn predicate() -> impl Strategy<Value = Predicate> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Predicate::And),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Predicate::Or),
            inner.prop_map(|p| Predicate::Not(Box::new(p))),
        ]
    })
}

/// Literal values of a predicate in left-to-right tree order
fn values_in_order(p: &Predicate, out: &mut Vec<Value>) {
    match p {
        Predicate::Compare { value, .. } => out.push(value.clone()),
        Predicate::IsNull { .. } | Predicate::IsNotNull { .. } => {}
        Predicate::In { values, .. } => out.extend(values.iter().cloned()),
        Predicate::Between { low, high, .. } => {
            out.push(low.clone());
            out.push(high.clone());
        }
        Predicate::And(children) | Predicate::Or(children) => {
            for child in children {
                values_in_order(child, out);
            }
        }
        Predicate::Not(inner) => values_in_order(inner, out),
    }
}

proptest! {
    #[test]
    fn prop_placeholders_match_bindings(p in predicate()) {
        let fragment = p.compile(&IdentityMapper).unwrap();
        prop_assert_eq!(fragment.placeholder_count(), fragment.bindings.len());
    }

    #[test]
    fn prop_bindings_follow_traversal_order(p in predicate()) {
        let fragment = p.compile(&IdentityMapper).unwrap();
        let mut expected = Vec::new();
        values_in_order(&p, &mut expected);
        prop_assert_eq!(fragment.bindings, expected);
    }

    #[test]
    fn prop_compilation_is_deterministic(p in predicate()) {
        let first = p.compile(&IdentityMapper).unwrap();
        let second = p.compile(&IdentityMapper).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_select_bindings_where_then_having_then_paging(
        filter in predicate(),
        having in predicate(),
        limit in 0u64..1000,
        offset in 0u64..1000,
    ) {
        let spec = QuerySpec::matching(filter.clone())
            .group_by(["name"])
            .having(having.clone())
            .limit(limit)
            .offset(offset);
        let stmt = compile_select(&spec, "items", &IdentityMapper).unwrap();

        let mut expected = Vec::new();
        values_in_order(&filter, &mut expected);
        values_in_order(&having, &mut expected);
        expected.push(Value::Integer(limit as i64));
        expected.push(Value::Integer(offset as i64));

        prop_assert_eq!(stmt.sql.matches('?').count(), stmt.bindings.len());
        prop_assert_eq!(stmt.bindings, expected);
    }
}
