use crate::collection::ScopedCollection;
use crate::errors::StoreError;
use crate::query::eval::{compare_bson, eval_filter};
use crate::query::types::{Filter, Order};
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Datelike};
use std::cmp::Ordering;

/// What a group row is keyed on.
#[derive(Debug, Clone)]
pub enum GroupKey {
    /// The value of a field.
    Field(String),
    /// Calendar month (1-12) extracted from a date field.
    Month(String),
}

#[derive(Debug, Clone)]
pub enum Accumulator {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
    Push(String),
}

/// One transformation applied server-side to the row set. Stages run
/// strictly in sequence; any failing stage aborts the pipeline with no
/// partial output.
#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    /// Replace each row by one row per element of the named array field.
    /// Rows missing the field are dropped; scalar values pass through.
    Unwind(String),
    Group { key: GroupKey, accums: Vec<(String, Accumulator)> },
    /// Copy another field's value (commonly the group id) under a new name.
    SetField { name: String, from: String },
    HideField(String),
    Sort { field: String, order: Order },
    Limit(usize),
}

/// Runs a pipeline over the documents the scoped handle admits. The standing
/// visibility predicate applies before the first stage, same as for finds.
pub fn run_pipeline(
    scope: &ScopedCollection,
    stages: &[Stage],
) -> Result<Vec<BsonDocument>, StoreError> {
    let mut rows: Vec<BsonDocument> =
        scope.visible_docs().into_iter().map(|d| d.data).collect();
    for stage in stages {
        rows = apply_stage(rows, stage)?;
    }
    Ok(rows)
}

fn apply_stage(rows: Vec<BsonDocument>, stage: &Stage) -> Result<Vec<BsonDocument>, StoreError> {
    match stage {
        Stage::Match(filter) => Ok(rows.into_iter().filter(|r| eval_filter(r, filter)).collect()),
        Stage::Unwind(field) => Ok(unwind(rows, field)),
        Stage::Group { key, accums } => group(rows, key, accums),
        Stage::SetField { name, from } => Ok(rows
            .into_iter()
            .map(|mut r| {
                let v = r.get(from).cloned().unwrap_or(Bson::Null);
                r.insert(name.clone(), v);
                r
            })
            .collect()),
        Stage::HideField(field) => Ok(rows
            .into_iter()
            .map(|mut r| {
                r.remove(field);
                r
            })
            .collect()),
        Stage::Sort { field, order } => {
            let mut rows = rows;
            rows.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => compare_bson(x, y),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                };
                if matches!(order, Order::Asc) { ord } else { ord.reverse() }
            });
            Ok(rows)
        }
        Stage::Limit(n) => {
            let mut rows = rows;
            rows.truncate(*n);
            Ok(rows)
        }
    }
}

fn unwind(rows: Vec<BsonDocument>, field: &str) -> Vec<BsonDocument> {
    let mut out = Vec::new();
    for row in rows {
        match row.get(field) {
            Some(Bson::Array(items)) => {
                for item in items.clone() {
                    let mut r = row.clone();
                    r.insert(field.to_string(), item);
                    out.push(r);
                }
            }
            Some(_) => out.push(row),
            None => {}
        }
    }
    out
}

fn group(
    rows: Vec<BsonDocument>,
    key: &GroupKey,
    accums: &[(String, Accumulator)],
) -> Result<Vec<BsonDocument>, StoreError> {
    // Groups keep first-appearance order; the caller sorts explicitly.
    let mut keys: Vec<Bson> = Vec::new();
    let mut members: Vec<Vec<BsonDocument>> = Vec::new();
    for row in rows {
        let k = group_key(&row, key)?;
        match keys.iter().position(|existing| compare_bson(existing, &k) == Ordering::Equal) {
            Some(i) => members[i].push(row),
            None => {
                keys.push(k);
                members.push(vec![row]);
            }
        }
    }

    let mut out = Vec::with_capacity(keys.len());
    for (k, rows) in keys.into_iter().zip(members) {
        let mut doc = BsonDocument::new();
        doc.insert("_id", k);
        for (name, acc) in accums {
            doc.insert(name.clone(), accumulate(&rows, acc));
        }
        out.push(doc);
    }
    Ok(out)
}

fn group_key(row: &BsonDocument, key: &GroupKey) -> Result<Bson, StoreError> {
    match key {
        GroupKey::Field(field) => Ok(row.get(field).cloned().unwrap_or(Bson::Null)),
        GroupKey::Month(field) => match row.get(field) {
            Some(Bson::DateTime(dt)) => {
                let dt = DateTime::from_timestamp_millis(dt.timestamp_millis()).ok_or_else(
                    || StoreError::Aggregation(format!("{field} is out of the datetime range")),
                )?;
                Ok(Bson::Int32(i32::try_from(dt.month()).unwrap_or(0)))
            }
            _ => Err(StoreError::Aggregation(format!(
                "month grouping requires a date value in {field}"
            ))),
        },
    }
}

fn accumulate(rows: &[BsonDocument], acc: &Accumulator) -> Bson {
    match acc {
        Accumulator::Count => Bson::Int64(rows.len() as i64),
        Accumulator::Sum(field) => {
            Bson::Double(numeric_values(rows, field).sum())
        }
        Accumulator::Avg(field) => {
            let values: Vec<f64> = numeric_values(rows, field).collect();
            if values.is_empty() {
                Bson::Null
            } else {
                #[allow(clippy::cast_precision_loss)]
                Bson::Double(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Accumulator::Min(field) => extremum(rows, field, Ordering::Less),
        Accumulator::Max(field) => extremum(rows, field, Ordering::Greater),
        Accumulator::Push(field) => Bson::Array(
            rows.iter().filter_map(|r| r.get(field).cloned()).collect(),
        ),
    }
}

fn numeric_values<'a>(
    rows: &'a [BsonDocument],
    field: &'a str,
) -> impl Iterator<Item = f64> + 'a {
    rows.iter().filter_map(move |r| match r.get(field) {
        Some(Bson::Double(f)) => Some(*f),
        Some(Bson::Int32(i)) => Some(f64::from(*i)),
        #[allow(clippy::cast_precision_loss)]
        Some(Bson::Int64(i)) => Some(*i as f64),
        _ => None,
    })
}

fn extremum(rows: &[BsonDocument], field: &str, keep: Ordering) -> Bson {
    let mut best: Option<&Bson> = None;
    for r in rows {
        if let Some(v) = r.get(field) {
            best = match best {
                Some(b) if compare_bson(v, b) != keep => Some(b),
                _ => Some(v),
            };
        }
    }
    best.cloned().unwrap_or(Bson::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::document::Document;
    use crate::query::types::CmpOp;
    use bson::doc;
    use std::sync::Arc;

    fn scope_with(docs: Vec<BsonDocument>) -> ScopedCollection {
        let col = Arc::new(Collection::new("tours"));
        for d in docs {
            col.insert_document(Document::new(d));
        }
        ScopedCollection::new(col, Filter::True)
    }

    #[test]
    fn unwind_expands_arrays_and_drops_missing() {
        let rows = vec![
            doc! {"n": "a", "d": [1, 2, 3]},
            doc! {"n": "b", "d": 9},
            doc! {"n": "c"},
            doc! {"n": "e", "d": []},
        ];
        let out = unwind(rows, "d");
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].get_i32("d").unwrap(), 1);
        assert_eq!(out[3].get_i32("d").unwrap(), 9);
    }

    #[test]
    fn group_accumulators_compute_count_sum_avg_min_max_push() {
        let scope = scope_with(vec![
            doc! {"difficulty": "easy", "price": 100.0, "name": "a"},
            doc! {"difficulty": "easy", "price": 300.0, "name": "b"},
            doc! {"difficulty": "hard", "price": 50.0, "name": "c"},
        ]);
        let rows = run_pipeline(
            &scope,
            &[Stage::Group {
                key: GroupKey::Field("difficulty".into()),
                accums: vec![
                    ("n".into(), Accumulator::Count),
                    ("sum".into(), Accumulator::Sum("price".into())),
                    ("avg".into(), Accumulator::Avg("price".into())),
                    ("min".into(), Accumulator::Min("price".into())),
                    ("max".into(), Accumulator::Max("price".into())),
                    ("names".into(), Accumulator::Push("name".into())),
                ],
            }],
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        let easy = rows.iter().find(|r| r.get_str("_id").unwrap() == "easy").unwrap();
        assert_eq!(easy.get_i64("n").unwrap(), 2);
        assert_eq!(easy.get_f64("sum").unwrap(), 400.0);
        assert_eq!(easy.get_f64("avg").unwrap(), 200.0);
        assert_eq!(easy.get_f64("min").unwrap(), 100.0);
        assert_eq!(easy.get_f64("max").unwrap(), 300.0);
        assert_eq!(easy.get_array("names").unwrap().len(), 2);
    }

    #[test]
    fn month_grouping_on_a_non_date_is_an_aggregation_error() {
        let scope = scope_with(vec![doc! {"startDates": "march"}]);
        let res = run_pipeline(
            &scope,
            &[Stage::Group {
                key: GroupKey::Month("startDates".into()),
                accums: vec![("n".into(), Accumulator::Count)],
            }],
        );
        assert!(matches!(res, Err(StoreError::Aggregation(_))));
    }

    #[test]
    fn match_sort_limit_run_in_sequence() {
        let scope = scope_with(vec![
            doc! {"p": 3.0},
            doc! {"p": 1.0},
            doc! {"p": 2.0},
            doc! {"p": 0.5},
        ]);
        let rows = run_pipeline(
            &scope,
            &[
                Stage::Match(Filter::Cmp {
                    field: "p".into(),
                    op: CmpOp::Gte,
                    value: Bson::Double(1.0),
                }),
                Stage::Sort { field: "p".into(), order: Order::Desc },
                Stage::Limit(2),
            ],
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_f64("p").unwrap(), 3.0);
        assert_eq!(rows[1].get_f64("p").unwrap(), 2.0);
    }

    #[test]
    fn set_and_hide_field_reshape_rows() {
        let scope = scope_with(vec![doc! {"x": 7}]);
        let rows = run_pipeline(
            &scope,
            &[
                Stage::SetField { name: "y".into(), from: "x".into() },
                Stage::HideField("x".into()),
            ],
        )
        .unwrap();
        assert!(rows[0].get("x").is_none());
        assert_eq!(rows[0].get_i32("y").unwrap(), 7);
    }
}
