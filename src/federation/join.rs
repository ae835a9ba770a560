// SPDX-License-Identifier: Apache-2.0

//! Join engine.
//!
//! Folds an ordered list of join rules over the main payload. Each step
//! matches records of the current data (left) against records of the
//! `join_id` payload (right) by comparing the values their field paths
//! address, and nests the matched right-hand fields under the join's alias.
//!
//! Steps never mutate their input; each one builds a fresh array with exactly
//! one output record per left record.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::engine::error::EngineResult;
use crate::engine::types::{DataRequestId, JoinSpec};

use super::path::{lookup, FieldPath};
use super::types::DispatchResults;

/// Applies `joins` in order, starting from `base`.
pub fn apply_joins(
    joins: &[JoinSpec],
    results: &DispatchResults,
    base: Value,
) -> EngineResult<Value> {
    (0..joins.len()).try_fold(base, |data, index| join_step(joins, index, results, data))
}

/// Applies the join at `index` to `data`.
///
/// The step is a no-op when the join is incomplete, when either side has no
/// fetched payload, or when either side is `null`.
pub fn join_step(
    joins: &[JoinSpec],
    index: usize,
    results: &DispatchResults,
    data: Value,
) -> EngineResult<Value> {
    let Some(keys) = joins.get(index).and_then(JoinSpec::keys) else {
        debug!(index, "join is incomplete, passing data through");
        return Ok(data);
    };

    let (Some(_), Some(right_payload)) =
        (results.payload(keys.dr_id), results.payload(keys.join_id))
    else {
        debug!(
            index,
            dr_id = keys.dr_id,
            join_id = keys.join_id,
            "join side was not fetched, passing data through"
        );
        return Ok(data);
    };

    if data.is_null() || right_payload.is_null() {
        return Ok(data);
    }

    let left_path = FieldPath::parse(keys.dr_field);
    let right_path = FieldPath::parse(keys.join_field);
    let chained_alias = chained_alias(joins, index, keys.dr_id);

    let left = left_path.select_array(&data)?;
    let right = right_path.select_array(right_payload)?;

    trace!(
        index,
        left = left.len(),
        right = right.len(),
        chained = chained_alias.is_some(),
        "applying join"
    );

    let joined = left
        .iter()
        .map(|record| {
            let probe = match chained_alias {
                Some(previous) => record
                    .get(previous)
                    .and_then(|nested| lookup(nested, left_path.field())),
                None => left_path.read(record),
            };
            merge_matches(record, probe, right, &right_path, keys.alias)
        })
        .collect();

    Ok(Value::Array(joined))
}

/// Alias of the most recent earlier join that fetched `dr_id` as its right side.
///
/// When set, the current join's left values live under that alias instead
/// of at the top level of each record.
fn chained_alias(joins: &[JoinSpec], index: usize, dr_id: DataRequestId) -> Option<&str> {
    joins[..index]
        .iter()
        .rev()
        .filter_map(JoinSpec::keys)
        .find(|previous| previous.join_id == dr_id && previous.dr_id != dr_id)
        .map(|previous| previous.alias)
}

/// Builds the output record for one left record.
///
/// Every matching candidate is merged key by key, so later matches overwrite
/// earlier ones. Without a match the record is returned as-is.
fn merge_matches(
    record: &Value,
    probe: Option<&Value>,
    candidates: &[Value],
    candidate_path: &FieldPath,
    alias: &str,
) -> Value {
    let (Some(probe), Value::Object(fields)) = (probe.filter(|v| !v.is_null()), record) else {
        return record.clone();
    };

    let mut merged = Map::new();
    for candidate in candidates {
        let Value::Object(candidate_fields) = candidate else {
            continue;
        };
        if !candidate_path
            .read(candidate)
            .is_some_and(|value| values_match(probe, value))
        {
            continue;
        }
        for (key, value) in candidate_fields {
            merged.insert(key.clone(), value.clone());
        }
    }

    if merged.is_empty() {
        return record.clone();
    }

    let mut output = fields.clone();
    output.insert(alias.to_string(), Value::Object(merged));
    Value::Object(output)
}

/// Strict equality, except that numbers compare by numeric value (`5 == 5.0`).
fn values_match(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn join(dr_id: i64, join_id: i64, dr_field: &str, join_field: &str, alias: &str) -> JoinSpec {
        JoinSpec {
            dr_id: Some(dr_id),
            join_id: Some(join_id),
            dr_field: Some(dr_field.to_string()),
            join_field: Some(join_field.to_string()),
            alias: Some(alias.to_string()),
        }
    }

    fn results(payloads: &[(i64, Value)]) -> DispatchResults {
        let mut results = DispatchResults::default();
        for (id, data) in payloads {
            results.insert_fetched(*id, data.clone());
        }
        results
    }

    #[test]
    fn joins_orders_to_customers() {
        let orders = json!([{ "custId": 5, "amt": 10 }, { "custId": 6, "amt": 20 }]);
        let customers = json!([{ "id": 5, "name": "A" }, { "id": 7, "name": "B" }]);
        let joins = vec![join(1, 2, "root[].custId", "root[].id", "customer")];

        let out = apply_joins(&joins, &results(&[(1, orders.clone()), (2, customers)]), orders)
            .unwrap();

        assert_eq!(
            out,
            json!([
                { "custId": 5, "amt": 10, "customer": { "id": 5, "name": "A" } },
                { "custId": 6, "amt": 20 }
            ])
        );
    }

    #[test]
    fn later_matches_overwrite_earlier_keys() {
        let left = json!([{ "k": 1 }]);
        let right = json!([
            { "k": 1, "name": "first", "only_first": true },
            { "k": 1, "name": "second" }
        ]);
        let joins = vec![join(1, 2, "root[].k", "root[].k", "r")];

        let out = apply_joins(&joins, &results(&[(1, left.clone()), (2, right)]), left).unwrap();

        assert_eq!(
            out,
            json!([{ "k": 1, "r": { "k": 1, "name": "second", "only_first": true } }])
        );
    }

    #[test]
    fn nested_array_paths_select_sub_arrays() {
        let left = json!({ "meta": 1, "data": { "rows": [{ "uid": "a" }, { "uid": "b" }] } });
        let right = json!({ "users": [{ "id": "b", "email": "b@x" }] });
        let joins = vec![join(1, 2, "root.data.rows[].uid", "root.users[].id", "user")];

        let out = apply_joins(&joins, &results(&[(1, left.clone()), (2, right)]), left).unwrap();

        assert_eq!(
            out,
            json!([{ "uid": "a" }, { "uid": "b", "user": { "id": "b", "email": "b@x" } }])
        );
    }

    #[test]
    fn chained_join_reads_through_previous_alias() {
        let orders = json!([{ "custId": 5 }, { "custId": 6 }]);
        let customers = json!([{ "id": 5, "regionId": 9 }, { "id": 6, "regionId": 8 }]);
        let regions = json!([{ "rid": 9, "label": "north" }]);
        let joins = vec![
            join(1, 2, "root[].custId", "root[].id", "customer"),
            join(2, 3, "root[].regionId", "root[].rid", "region"),
        ];

        let out = apply_joins(
            &joins,
            &results(&[(1, orders.clone()), (2, customers), (3, regions)]),
            orders,
        )
        .unwrap();

        assert_eq!(out[0]["region"], json!({ "rid": 9, "label": "north" }));
        assert!(out[1].get("region").is_none());
        assert_eq!(out[1]["customer"]["regionId"], json!(8));
    }

    #[test]
    fn chain_uses_alias_of_the_join_that_fetched_the_request() {
        // join 2 chains off join 0, not off the join immediately before it
        let base = json!([{ "a": 1, "b": 2 }]);
        let joins = vec![
            join(1, 2, "root[].a", "root[].id", "two"),
            join(1, 3, "root[].b", "root[].id", "three"),
            join(2, 4, "root[].next", "root[].id", "four"),
        ];
        let payloads = results(&[
            (1, base.clone()),
            (2, json!([{ "id": 1, "next": 40 }])),
            (3, json!([{ "id": 2, "next": 99 }])),
            (4, json!([{ "id": 40, "tag": "ok" }, { "id": 99, "tag": "wrong" }])),
        ]);

        let out = apply_joins(&joins, &payloads, base).unwrap();
        assert_eq!(out[0]["four"], json!({ "id": 40, "tag": "ok" }));
    }

    #[test]
    fn incomplete_join_is_a_no_op() {
        let base = json!([{ "a": 1 }]);
        let mut incomplete = join(1, 2, "root[].a", "root[].a", "x");
        incomplete.dr_field = None;

        let out = apply_joins(
            &[incomplete],
            &results(&[(1, base.clone()), (2, json!([{ "a": 1 }]))]),
            base.clone(),
        )
        .unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn unfetched_side_is_a_no_op() {
        let base = json!([{ "a": 1 }]);
        let joins = vec![join(1, 2, "root[].a", "root[].a", "x")];
        let out = apply_joins(&joins, &results(&[(1, base.clone())]), base.clone()).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn null_left_values_never_match() {
        let left = json!([{ "k": null }, { "other": 1 }]);
        let right = json!([{ "k": null, "x": 1 }, { "x": 2 }]);
        let joins = vec![join(1, 2, "root[].k", "root[].k", "r")];
        let out = apply_joins(&joins, &results(&[(1, left.clone()), (2, right)]), left.clone())
            .unwrap();
        assert_eq!(out, left);
    }

    #[test]
    fn numbers_match_across_representations() {
        assert!(values_match(&json!(5), &json!(5.0)));
        assert!(!values_match(&json!(5), &json!("5")));
        assert!(values_match(&json!("a"), &json!("a")));
    }

    #[test]
    fn non_array_left_side_is_rejected() {
        let left = json!({ "not": "an array" });
        let joins = vec![join(1, 2, "root[].a", "root[].a", "x")];
        let err = apply_joins(&joins, &results(&[(1, left.clone()), (2, json!([]))]), left)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
    }
}
