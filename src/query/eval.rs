use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{
    CmpOp, Filter, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order, Projection, SortSpec,
};
use crate::tour::VERSION_FIELD;

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Cmp { field, op, value } => {
            if let Some(v) = doc.get(field) {
                let c = compare_bson(v, value);
                match op {
                    CmpOp::Eq => c == Ordering::Equal,
                    CmpOp::Gt => c == Ordering::Greater,
                    CmpOp::Gte => c != Ordering::Less,
                    CmpOp::Lt => c == Ordering::Less,
                    CmpOp::Lte => c != Ordering::Greater,
                }
            } else {
                false
            }
        }
    }
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = a.get(&s.field);
        let vb = b.get(&s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if matches!(s.order, Order::Asc) { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    use bson::Bson as T;
    fn is_num(x: &T) -> bool {
        matches!(x, T::Int32(_) | T::Int64(_) | T::Double(_))
    }
    #[allow(clippy::cast_precision_loss)]
    fn as_f64_num(x: &T) -> f64 {
        match x {
            T::Int32(i) => f64::from(*i),
            T::Int64(i) => *i as f64,
            T::Double(f) => *f,
            _ => f64::NAN,
        }
    }
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (T::String(x), T::String(y)) => x.cmp(y),
        (T::Boolean(x), T::Boolean(y)) => x.cmp(y),
        (T::DateTime(x), T::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::Null => 0,
        T::Boolean(_) => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) => 2,
        T::String(_) => 3,
        T::Array(_) => 4,
        T::Document(_) => 5,
        T::DateTime(_) => 6,
        _ => 7,
    }
}

/// Applies the descriptor's projection to one document body. Inclusion keeps
/// exactly the requested fields; the default keeps everything except the
/// internal revision field.
pub fn apply_projection(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    match projection {
        Projection::ExcludeInternal => {
            let mut out = doc.clone();
            out.remove(VERSION_FIELD);
            out
        }
        Projection::Include(fields) => {
            let mut out = BsonDocument::new();
            for f in fields.iter().take(MAX_PROJECTION_FIELDS) {
                if let Some(v) = doc.get(f) {
                    out.insert(f.clone(), v.clone());
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn cmp_gte_on_numbers_mixes_int_and_double() {
        let d = doc! {"price": 497i32};
        let f = Filter::Cmp { field: "price".into(), op: CmpOp::Gte, value: Bson::Double(400.0) };
        assert!(eval_filter(&d, &f));
        let f = Filter::Cmp { field: "price".into(), op: CmpOp::Lt, value: Bson::Double(400.0) };
        assert!(!eval_filter(&d, &f));
    }

    #[test]
    fn missing_field_never_matches_cmp() {
        let d = doc! {"name": "x"};
        let f = Filter::Cmp { field: "price".into(), op: CmpOp::Eq, value: Bson::Double(1.0) };
        assert!(!eval_filter(&d, &f));
        // but Not(Cmp) does match, which is what the standing predicate relies on
        assert!(eval_filter(&d, &Filter::Not(Box::new(f))));
    }

    #[test]
    fn nothing_matches_nothing() {
        assert!(!eval_filter(&doc! {"a": 1}, &Filter::nothing()));
    }

    #[test]
    fn datetime_ordering_compares_millis() {
        let early = Bson::DateTime(bson::DateTime::from_millis(1_000));
        let late = Bson::DateTime(bson::DateTime::from_millis(2_000));
        assert_eq!(compare_bson(&early, &late), Ordering::Less);
        assert_eq!(compare_bson(&late, &early), Ordering::Greater);
    }

    #[test]
    fn sort_desc_reverses_and_falls_through_equal_keys() {
        let a = doc! {"p": 1, "n": "a"};
        let b = doc! {"p": 1, "n": "b"};
        let sort = vec![
            SortSpec { field: "p".into(), order: Order::Desc },
            SortSpec { field: "n".into(), order: Order::Asc },
        ];
        assert_eq!(compare_docs(&a, &b, &sort), Ordering::Less);
    }

    #[test]
    fn projection_default_strips_only_version_field() {
        let d = doc! {"name": "x", "price": 1, VERSION_FIELD: 3};
        let out = apply_projection(&d, &Projection::ExcludeInternal);
        assert!(out.get(VERSION_FIELD).is_none());
        assert!(out.get("name").is_some());
        assert!(out.get("price").is_some());
    }

    #[test]
    fn projection_inclusion_keeps_exactly_requested_fields() {
        let d = doc! {"name": "x", "price": 1, "duration": 5, VERSION_FIELD: 0};
        let out =
            apply_projection(&d, &Projection::Include(vec!["name".into(), "price".into()]));
        assert_eq!(out.len(), 2);
        assert!(out.get("name").is_some());
        assert!(out.get("price").is_some());
    }
}
