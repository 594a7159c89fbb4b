use sea_orm::entity::prelude::*;

/// Fixed-window counter, one row per (`scope`, `identifier`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rate_limits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `"login"`, `"verify"` or `"reset"`.
    pub scope: String,
    pub identifier: String,
    pub window_start: chrono::DateTime<chrono::Utc>,
    pub count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
