use super::types::{
    CmpOp, DEFAULT_LIMIT, DEFAULT_PAGE, FilterSpec, Order, Pagination, Projection,
    QueryDescriptor, SortSpec,
};

/// Translates raw URL query parameters into a [`QueryDescriptor`].
///
/// Pure and total: reserved keys (`page`, `sort`, `limit`, `fields`) are
/// routed to pagination/sort/projection, everything else becomes a filter
/// triple in parameter order. Malformed input degrades to defaults rather
/// than erroring.
#[must_use]
pub fn translate(params: &[(String, String)]) -> QueryDescriptor {
    let mut filters = Vec::new();
    let mut sort = None;
    let mut projection = None;
    let mut page = None;
    let mut limit = None;

    for (key, value) in params {
        match key.as_str() {
            "sort" => sort = parse_sort(value),
            "fields" => projection = parse_fields(value),
            "page" => page = parse_positive(value),
            "limit" => limit = parse_positive(value),
            _ => {
                let (field, op) = split_comparison(key);
                filters.push(FilterSpec { field: field.to_string(), op, value: value.clone() });
            }
        }
    }

    let defaults = QueryDescriptor::default();
    QueryDescriptor {
        filters,
        sort: sort.unwrap_or(defaults.sort),
        projection: projection.unwrap_or(defaults.projection),
        pagination: Pagination {
            page: page.unwrap_or(DEFAULT_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        },
    }
}

/// Splits the `field[op]` comparison convention. Keys without a recognized
/// operator suffix are plain equality on the key as given.
fn split_comparison(key: &str) -> (&str, CmpOp) {
    if let Some(open) = key.find('[')
        && let Some(suffix) = key[open + 1..].strip_suffix(']')
    {
        let op = match suffix {
            "gt" => Some(CmpOp::Gt),
            "gte" => Some(CmpOp::Gte),
            "lt" => Some(CmpOp::Lt),
            "lte" => Some(CmpOp::Lte),
            _ => None,
        };
        if let Some(op) = op {
            return (&key[..open], op);
        }
    }
    (key, CmpOp::Eq)
}

fn parse_sort(value: &str) -> Option<Vec<SortSpec>> {
    let keys: Vec<SortSpec> = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "-")
        .map(|t| match t.strip_prefix('-') {
            Some(field) => SortSpec { field: field.to_string(), order: Order::Desc },
            None => SortSpec { field: t.to_string(), order: Order::Asc },
        })
        .collect();
    if keys.is_empty() { None } else { Some(keys) }
}

fn parse_fields(value: &str) -> Option<Projection> {
    let fields: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if fields.is_empty() { None } else { Some(Projection::Include(fields)) }
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}
