use crate::errors::StoreError;
use crate::query::types::{CmpOp, Filter};
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal revision counter kept on every stored tour document. Hidden by
/// the default projection; bumped on each update.
pub const VERSION_FIELD: &str = "__v";

pub const NAME_MIN_LEN: usize = 10;
pub const NAME_MAX_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Difficult => "difficult",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "difficult" => Some(Self::Difficult),
            _ => None,
        }
    }
}

/// Storage type of a tour field, used by the executor to coerce raw filter
/// values before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    Date,
    Boolean,
    Text,
}

/// Declared storage type for each known field. Unknown fields compare as
/// text, which simply fails to match typed values.
#[must_use]
pub fn field_type(field: &str) -> FieldType {
    match field {
        "duration" | "maxGroupSize" | "ratingsAverage" | "ratingsQuantity" | "price"
        | "priceDiscount" | "durationWeeks" | VERSION_FIELD => FieldType::Number,
        "createdAt" | "startDates" => FieldType::Date,
        "secretTour" => FieldType::Boolean,
        _ => FieldType::Text,
    }
}

/// The standing visibility rule for the tours collection: documents flagged
/// `secretTour = true` are invisible to every read path.
#[must_use]
pub fn standing_filter() -> Filter {
    Filter::Not(Box::new(Filter::Cmp {
        field: "secretTour".to_string(),
        op: CmpOp::Eq,
        value: Bson::Boolean(true),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub name: String,
    pub duration: f64,
    pub max_group_size: i64,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret_tour: bool,
}

impl Tour {
    /// A tour with required fields filled in and the schema defaults applied
    /// (ratings 4.5/0, created now, not secret).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        difficulty: Difficulty,
        price: f64,
        summary: impl Into<String>,
        image_cover: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            duration: 1.0,
            max_group_size: 1,
            difficulty,
            ratings_average: 4.5,
            ratings_quantity: 0,
            price,
            price_discount: None,
            summary: summary.into(),
            description: None,
            image_cover: image_cover.into(),
            images: Vec::new(),
            created_at: Utc::now(),
            start_dates: Vec::new(),
            secret_tour: false,
        }
    }

    /// Virtual field, computed on the way out and never stored.
    #[must_use]
    pub fn duration_weeks(&self) -> f64 {
        self.duration / 7.0
    }

    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Schema validation, run on create and again after partial updates.
    pub fn validate(&self) -> Result<(), StoreError> {
        let name_len = self.name.trim().chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
            return Err(StoreError::Validation(format!(
                "tour name must be {NAME_MIN_LEN} to {NAME_MAX_LEN} characters, got {name_len}"
            )));
        }
        if !(1.0..=5.0).contains(&self.ratings_average) {
            return Err(StoreError::Validation(format!(
                "ratingsAverage must be between 1.0 and 5.0, got {}",
                self.ratings_average
            )));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(StoreError::Validation(format!(
                "price must be a positive number, got {}",
                self.price
            )));
        }
        if let Some(discount) = self.price_discount
            && discount >= self.price
        {
            return Err(StoreError::Validation(format!(
                "priceDiscount ({discount}) must be below price ({})",
                self.price
            )));
        }
        if self.summary.trim().is_empty() {
            return Err(StoreError::Validation("a tour must have a summary".to_string()));
        }
        if self.image_cover.trim().is_empty() {
            return Err(StoreError::Validation("a tour must have a cover image".to_string()));
        }
        Ok(())
    }

    /// Stored form of the tour. Derived fields: `slug` is persisted,
    /// `durationWeeks` is not (virtual); the revision counter is managed by
    /// the service layer, not here.
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut doc = BsonDocument::new();
        doc.insert("name", self.name.clone());
        doc.insert("slug", self.slug());
        doc.insert("duration", self.duration);
        doc.insert("maxGroupSize", self.max_group_size);
        doc.insert("difficulty", self.difficulty.as_str());
        doc.insert("ratingsAverage", self.ratings_average);
        doc.insert("ratingsQuantity", self.ratings_quantity);
        doc.insert("price", self.price);
        if let Some(d) = self.price_discount {
            doc.insert("priceDiscount", d);
        }
        doc.insert("summary", self.summary.clone());
        if let Some(d) = &self.description {
            doc.insert("description", d.clone());
        }
        doc.insert("imageCover", self.image_cover.clone());
        doc.insert(
            "images",
            Bson::Array(self.images.iter().cloned().map(Bson::String).collect()),
        );
        doc.insert("createdAt", bson_date(self.created_at));
        doc.insert(
            "startDates",
            Bson::Array(self.start_dates.iter().map(|d| bson_date(*d)).collect()),
        );
        doc.insert("secretTour", self.secret_tour);
        doc
    }

    pub fn from_document(doc: &BsonDocument) -> Result<Self, StoreError> {
        Ok(Self {
            name: get_str(doc, "name")?,
            duration: get_f64(doc, "duration")?,
            max_group_size: get_i64(doc, "maxGroupSize")?,
            difficulty: Difficulty::parse(&get_str(doc, "difficulty")?).ok_or_else(|| {
                StoreError::MalformedDocument("unrecognized difficulty".to_string())
            })?,
            ratings_average: get_f64(doc, "ratingsAverage")?,
            ratings_quantity: get_i64(doc, "ratingsQuantity")?,
            price: get_f64(doc, "price")?,
            price_discount: match doc.get("priceDiscount") {
                Some(_) => Some(get_f64(doc, "priceDiscount")?),
                None => None,
            },
            summary: get_str(doc, "summary")?,
            description: match doc.get("description") {
                Some(_) => Some(get_str(doc, "description")?),
                None => None,
            },
            image_cover: get_str(doc, "imageCover")?,
            images: get_string_array(doc, "images")?,
            created_at: get_date(doc.get("createdAt"), "createdAt")?,
            start_dates: match doc.get("startDates") {
                Some(Bson::Array(items)) => items
                    .iter()
                    .map(|b| get_date(Some(b), "startDates"))
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => {
                    return Err(StoreError::MalformedDocument(
                        "startDates is not an array".to_string(),
                    ));
                }
                None => Vec::new(),
            },
            secret_tour: matches!(doc.get("secretTour"), Some(Bson::Boolean(true))),
        })
    }
}

fn bson_date(dt: DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis()))
}

fn get_str(doc: &BsonDocument, field: &str) -> Result<String, StoreError> {
    match doc.get(field) {
        Some(Bson::String(s)) => Ok(s.clone()),
        _ => Err(StoreError::MalformedDocument(format!("missing string field {field}"))),
    }
}

fn get_f64(doc: &BsonDocument, field: &str) -> Result<f64, StoreError> {
    match doc.get(field) {
        Some(Bson::Double(f)) => Ok(*f),
        Some(Bson::Int32(i)) => Ok(f64::from(*i)),
        #[allow(clippy::cast_precision_loss)]
        Some(Bson::Int64(i)) => Ok(*i as f64),
        _ => Err(StoreError::MalformedDocument(format!("missing numeric field {field}"))),
    }
}

fn get_i64(doc: &BsonDocument, field: &str) -> Result<i64, StoreError> {
    match doc.get(field) {
        Some(Bson::Int64(i)) => Ok(*i),
        Some(Bson::Int32(i)) => Ok(i64::from(*i)),
        #[allow(clippy::cast_possible_truncation)]
        Some(Bson::Double(f)) if f.fract() == 0.0 => Ok(*f as i64),
        _ => Err(StoreError::MalformedDocument(format!("missing integer field {field}"))),
    }
}

fn get_string_array(doc: &BsonDocument, field: &str) -> Result<Vec<String>, StoreError> {
    match doc.get(field) {
        Some(Bson::Array(items)) => items
            .iter()
            .map(|b| match b {
                Bson::String(s) => Ok(s.clone()),
                _ => Err(StoreError::MalformedDocument(format!(
                    "{field} contains a non-string element"
                ))),
            })
            .collect(),
        None => Ok(Vec::new()),
        Some(_) => Err(StoreError::MalformedDocument(format!("{field} is not an array"))),
    }
}

fn get_date(value: Option<&Bson>, field: &str) -> Result<DateTime<Utc>, StoreError> {
    match value {
        Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis())
            .ok_or_else(|| StoreError::MalformedDocument(format!("{field} out of range"))),
        _ => Err(StoreError::MalformedDocument(format!("missing date field {field}"))),
    }
}

/// URL-safe slug derived from the tour name: lowercase alphanumerics joined
/// by single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}
