//! 投放实体与事件表迁移
//!
//! - campaigns: 广告 / 联盟链接 / 赞助内容（多态表，campaign_type 区分）
//! - campaign_events: 原始曝光 / 点击 / 转化事件

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. 创建 campaigns 表
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CampaignType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Campaigns::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Campaigns::SponsorName).string_len(255).null())
                    .col(ColumnDef::new(Campaigns::ContentType).string_len(32).null())
                    .col(ColumnDef::new(Campaigns::Placements).text().not_null())
                    .col(ColumnDef::new(Campaigns::TargetRecipeIds).text().not_null())
                    .col(
                        ColumnDef::new(Campaigns::TargetCategories)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::BidAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Impressions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Clicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Conversions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Revenue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::ConversionRevenue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Ctr)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::ConversionRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Campaigns::StartsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::LastImpressionAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::LastClickAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::LastConversionAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 索引：campaign_type + is_active（选择引擎候选集查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaigns_type_active")
                    .table(Campaigns::Table)
                    .col(Campaigns::CampaignType)
                    .col(Campaigns::IsActive)
                    .to_owned(),
            )
            .await?;

        // 索引：sponsor_name（按赞助商聚合分析）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaigns_sponsor")
                    .table(Campaigns::Table)
                    .col(Campaigns::SponsorName)
                    .to_owned(),
            )
            .await?;

        // 2. 创建 campaign_events 表
        manager
            .create_table(
                Table::create()
                    .table(CampaignEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignEvents::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::CampaignId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::CampaignType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::EventKind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::SessionId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::IpAddress)
                            .string_len(45)
                            .null(),
                    )
                    .col(ColumnDef::new(CampaignEvents::UserAgent).text().null())
                    .col(
                        ColumnDef::new(CampaignEvents::Placement)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::RecipeId)
                            .string_len(128)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::Category)
                            .string_len(128)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::Source)
                            .string_len(255)
                            .null(),
                    )
                    .col(ColumnDef::new(CampaignEvents::EngagementTime).double().null())
                    .col(ColumnDef::new(CampaignEvents::ScrollDepth).double().null())
                    .col(ColumnDef::new(CampaignEvents::ClickX).double().null())
                    .col(ColumnDef::new(CampaignEvents::ClickY).double().null())
                    .col(
                        ColumnDef::new(CampaignEvents::ConversionValue)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::Revenue)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(CampaignEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 复合索引：去重查询 (campaign_id, session_id, event_kind, created_at)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_dedup")
                    .table(CampaignEvents::Table)
                    .col(CampaignEvents::CampaignId)
                    .col(CampaignEvents::SessionId)
                    .col(CampaignEvents::EventKind)
                    .col(CampaignEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 复合索引：单实体时间范围查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_campaign_time")
                    .table(CampaignEvents::Table)
                    .col(CampaignEvents::CampaignId)
                    .col(CampaignEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 复合索引：收入看板按类型聚合
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_type_kind_time")
                    .table(CampaignEvents::Table)
                    .col(CampaignEvents::CampaignType)
                    .col(CampaignEvents::EventKind)
                    .col(CampaignEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_events_type_kind_time").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_events_campaign_time").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_events_dedup").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CampaignEvents::Table).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_campaigns_sponsor").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_campaigns_type_active").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Campaigns {
    #[sea_orm(iden = "campaigns")]
    Table,
    Id,
    CampaignType,
    Name,
    SponsorName,
    ContentType,
    Placements,
    TargetRecipeIds,
    TargetCategories,
    BidAmount,
    Impressions,
    Clicks,
    Conversions,
    Revenue,
    ConversionRevenue,
    Ctr,
    ConversionRate,
    IsActive,
    StartsAt,
    EndsAt,
    LastImpressionAt,
    LastClickAt,
    LastConversionAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CampaignEvents {
    #[sea_orm(iden = "campaign_events")]
    Table,
    Id,
    CampaignId,
    CampaignType,
    EventKind,
    SessionId,
    IpAddress,
    UserAgent,
    Placement,
    RecipeId,
    Category,
    Source,
    EngagementTime,
    ScrollDepth,
    ClickX,
    ClickY,
    ConversionValue,
    Revenue,
    CreatedAt,
}
