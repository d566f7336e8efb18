pub mod auth;
pub mod cashier;
pub mod orders;
pub mod payments;
pub mod sales;

use std::str::FromStr;

use actix_web::HttpResponse;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// Parses `start_date` / `end_date` query values (`YYYY-MM-DD`, UTC).
///
/// The start is the first instant of its day and the end the last
/// microsecond of its day, so both dates are inclusive.
pub(crate) fn date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let from = start
        .map(|s| parse_date("start_date", s))
        .transpose()?
        .map(|d| d.and_time(NaiveTime::MIN).and_utc());
    let to = end
        .map(|s| parse_date("end_date", s))
        .transpose()?
        .map(|d| end_of_day(d).and_utc());
    Ok((from, to))
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        AppError::BadRequest(format!("{name} must be YYYY-MM-DD, got '{value}'"))
    })
}

fn end_of_day(date: NaiveDate) -> chrono::NaiveDateTime {
    // 23:59:59.999999 always exists.
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

/// Parses an optional enum-valued query parameter.
pub(crate) fn parse_param<T>(value: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = crate::domain::errors::DomainError>,
{
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().map_err(AppError::from))
        .transpose()
}
