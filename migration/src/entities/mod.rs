pub mod campaign;
pub mod campaign_event;
pub mod campaign_stats_daily;
pub mod subscription;

pub use campaign::Entity as CampaignEntity;
pub use campaign_event::Entity as CampaignEventEntity;
pub use campaign_stats_daily::Entity as CampaignStatsDailyEntity;
pub use subscription::Entity as SubscriptionEntity;
