pub mod pipeline;

use crate::collection::ScopedCollection;
use crate::errors::StoreError;
use crate::query::types::{CmpOp, Filter, Order};
use bson::{Bson, Document as BsonDocument};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pipeline::{Accumulator, GroupKey, Stage, run_pipeline};

/// One group of the stats-by-difficulty report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// One month of the monthly-plan report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub month: u32,
    pub num_tour_starts: i64,
    pub tours: Vec<String>,
}

/// Key statistics per difficulty over well-rated tours
/// (ratingsAverage >= 4.5), ordered by ascending average price.
pub fn tour_stats(scope: &ScopedCollection) -> Result<Vec<DifficultyStats>, StoreError> {
    let rows = run_pipeline(
        scope,
        &[
            Stage::Match(Filter::Cmp {
                field: "ratingsAverage".to_string(),
                op: CmpOp::Gte,
                value: Bson::Double(4.5),
            }),
            Stage::Group {
                key: GroupKey::Field("difficulty".to_string()),
                accums: vec![
                    ("numTours".to_string(), Accumulator::Count),
                    ("numRatings".to_string(), Accumulator::Sum("ratingsQuantity".to_string())),
                    ("avgRating".to_string(), Accumulator::Avg("ratingsAverage".to_string())),
                    ("avgPrice".to_string(), Accumulator::Avg("price".to_string())),
                    ("minPrice".to_string(), Accumulator::Min("price".to_string())),
                    ("maxPrice".to_string(), Accumulator::Max("price".to_string())),
                ],
            },
            Stage::Sort { field: "avgPrice".to_string(), order: Order::Asc },
        ],
    )?;
    rows.iter().map(difficulty_row).collect()
}

/// How many tours start in each month of the given year, busiest month
/// first, at most one group per calendar month.
pub fn monthly_plan(scope: &ScopedCollection, year: i32) -> Result<Vec<MonthlyPlan>, StoreError> {
    if !(1000..=9999).contains(&year) {
        return Err(StoreError::Aggregation(format!("invalid year: {year}")));
    }
    let from = year_bound(year, 1, 1, false)?;
    let to = year_bound(year, 12, 31, true)?;
    let rows = run_pipeline(
        scope,
        &[
            Stage::Unwind("startDates".to_string()),
            Stage::Match(Filter::And(vec![
                Filter::Cmp { field: "startDates".to_string(), op: CmpOp::Gte, value: from },
                Filter::Cmp { field: "startDates".to_string(), op: CmpOp::Lte, value: to },
            ])),
            Stage::Group {
                key: GroupKey::Month("startDates".to_string()),
                accums: vec![
                    ("numTourStarts".to_string(), Accumulator::Count),
                    ("tours".to_string(), Accumulator::Push("name".to_string())),
                ],
            },
            Stage::SetField { name: "month".to_string(), from: "_id".to_string() },
            Stage::HideField("_id".to_string()),
            Stage::Sort { field: "numTourStarts".to_string(), order: Order::Desc },
            // one group per calendar month
            Stage::Limit(12),
        ],
    )?;
    rows.iter().map(monthly_row).collect()
}

/// Inclusive day bound as a BSON date (start or end of day, UTC).
fn year_bound(year: i32, month: u32, day: u32, end_of_day: bool) -> Result<Bson, StoreError> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| StoreError::Aggregation(format!("invalid date {year}-{month}-{day}")))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| StoreError::Aggregation(format!("invalid date {year}-{month}-{day}")))?;
    Ok(Bson::DateTime(bson::DateTime::from_millis(time.and_utc().timestamp_millis())))
}

fn difficulty_row(row: &BsonDocument) -> Result<DifficultyStats, StoreError> {
    #[allow(clippy::cast_possible_truncation)]
    let num_ratings = row.get_f64("numRatings").map_err(|_| malformed("numRatings"))? as i64;
    Ok(DifficultyStats {
        difficulty: row
            .get_str("_id")
            .map_err(|_| malformed("difficulty group id"))?
            .to_string(),
        num_tours: row.get_i64("numTours").map_err(|_| malformed("numTours"))?,
        num_ratings,
        avg_rating: row.get_f64("avgRating").map_err(|_| malformed("avgRating"))?,
        avg_price: row.get_f64("avgPrice").map_err(|_| malformed("avgPrice"))?,
        min_price: row.get_f64("minPrice").map_err(|_| malformed("minPrice"))?,
        max_price: row.get_f64("maxPrice").map_err(|_| malformed("maxPrice"))?,
    })
}

fn monthly_row(row: &BsonDocument) -> Result<MonthlyPlan, StoreError> {
    let month = row.get_i32("month").map_err(|_| malformed("month"))?;
    Ok(MonthlyPlan {
        month: u32::try_from(month).map_err(|_| malformed("month"))?,
        num_tour_starts: row
            .get_i64("numTourStarts")
            .map_err(|_| malformed("numTourStarts"))?,
        tours: row
            .get_array("tours")
            .map_err(|_| malformed("tours"))?
            .iter()
            .filter_map(|b| b.as_str().map(str::to_string))
            .collect(),
    })
}

fn malformed(what: &str) -> StoreError {
    StoreError::Aggregation(format!("malformed report row: {what}"))
}
