//! 天级收入汇总表 + 订阅表迁移
//!
//! - campaign_stats_daily: (campaign_id, day_bucket) 唯一，供原子 upsert 使用
//! - subscriptions: 订阅记录，收入看板只读

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CampaignStatsDaily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignStatsDaily::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CampaignStatsDaily::CampaignId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignStatsDaily::DayBucket)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignStatsDaily::Revenue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(CampaignStatsDaily::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CampaignStatsDaily::Conversions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 唯一索引：campaign_id + day_bucket（ON CONFLICT 目标）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stats_daily_campaign_bucket")
                    .table(CampaignStatsDaily::Table)
                    .col(CampaignStatsDaily::CampaignId)
                    .col(CampaignStatsDaily::DayBucket)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::Tier).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stats_daily_campaign_bucket")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignStatsDaily::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CampaignStatsDaily {
    #[sea_orm(iden = "campaign_stats_daily")]
    Table,
    Id,
    CampaignId,
    DayBucket,
    Revenue,
    Clicks,
    Conversions,
}

#[derive(DeriveIden)]
enum Subscriptions {
    #[sea_orm(iden = "subscriptions")]
    Table,
    Id,
    Tier,
    Status,
    StartedAt,
    CancelledAt,
}
