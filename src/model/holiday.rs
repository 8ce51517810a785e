use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Victory Day")]
    pub name: String,

    #[schema(example = "2026-12-16", format = "date", value_type = String)]
    pub holiday_date: NaiveDate,
}
