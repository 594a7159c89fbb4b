use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RateLimits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateLimits::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RateLimits::Scope).string().not_null())
                    .col(ColumnDef::new(RateLimits::Identifier).string().not_null())
                    .col(
                        ColumnDef::new(RateLimits::WindowStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateLimits::Count)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // The upsert in the rate limiter relies on this being unique.
        manager
            .create_index(
                Index::create()
                    .table(RateLimits::Table)
                    .col(RateLimits::Scope)
                    .col(RateLimits::Identifier)
                    .name("idx_rate_limits_scope_identifier")
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RateLimits::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RateLimits {
    Table,
    Id,
    Scope,
    Identifier,
    WindowStart,
    Count,
}
