use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tracking::CampaignType;

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 服务器地址、端口、CPU 数量、CORS
/// - database: 数据库连接与重试配置
/// - logging: 日志配置
/// - tracking: 去重窗口、会话分桶、时钟偏差容忍
/// - selection: 选择引擎参数
/// - analytics: 分析查询参数
/// - revenue: 收入看板参数
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub revenue: RevenueConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：ADT，分隔符：__
    /// 示例：ADT__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ADT")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 允许跨域上报的站点，`["*"]` 表示任意来源
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    /// 可信反向代理（IP 或 CIDR），为空时自动识别私有地址
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 事件采集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// 广告曝光去重窗口（秒）
    #[serde(default = "default_ad_dedup_window_secs")]
    pub ad_dedup_window_secs: u64,
    /// 联盟链接曝光去重窗口（秒）
    #[serde(default = "default_ad_dedup_window_secs")]
    pub affiliate_dedup_window_secs: u64,
    /// 赞助内容曝光去重窗口（秒）
    #[serde(default = "default_sponsored_dedup_window_secs")]
    pub sponsored_dedup_window_secs: u64,
    /// 推导 session id 时的时间分桶（秒）
    #[serde(default = "default_session_bucket_secs")]
    pub session_bucket_secs: u64,
    /// 允许客户端时间戳领先服务器的最大秒数
    #[serde(default = "default_max_clock_skew_secs")]
    pub max_clock_skew_secs: u64,
}

impl TrackingConfig {
    /// 按投放类型取去重窗口
    pub fn dedup_window(&self, campaign_type: CampaignType) -> chrono::Duration {
        let secs = match campaign_type {
            CampaignType::Ad => self.ad_dedup_window_secs,
            CampaignType::AffiliateLink => self.affiliate_dedup_window_secs,
            CampaignType::SponsoredContent => self.sponsored_dedup_window_secs,
        };
        chrono::Duration::seconds(secs as i64)
    }
}

/// 选择引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// 按权重排序后参与随机挑选的候选数量
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// 分析查询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_breakdown_limit")]
    pub breakdown_limit: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_range_days")]
    pub default_range_days: i64,
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

/// 收入看板配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueConfig {
    /// 订阅档位 -> 月费
    #[serde(default = "default_tier_prices")]
    pub tier_prices: BTreeMap<String, f64>,
    /// 允许访问收入看板的角色
    #[serde(default = "default_privileged_roles")]
    pub privileged_roles: Vec<String>,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://adtrack.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_ad_dedup_window_secs() -> u64 {
    60
}

fn default_sponsored_dedup_window_secs() -> u64 {
    300
}

fn default_session_bucket_secs() -> u64 {
    1800
}

fn default_max_clock_skew_secs() -> u64 {
    300
}

fn default_top_k() -> usize {
    3
}

fn default_breakdown_limit() -> usize {
    10
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_cache_capacity() -> u64 {
    1000
}

fn default_range_days() -> i64 {
    30
}

fn default_max_range_days() -> i64 {
    366
}

fn default_tier_prices() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("FREE".to_string(), 0.0),
        ("PREMIUM".to_string(), 9.99),
        ("PRO".to_string(), 19.99),
    ])
}

fn default_privileged_roles() -> Vec<String> {
    vec!["ADMIN".to_string()]
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            cors_allowed_origins: Vec::new(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            ad_dedup_window_secs: default_ad_dedup_window_secs(),
            affiliate_dedup_window_secs: default_ad_dedup_window_secs(),
            sponsored_dedup_window_secs: default_sponsored_dedup_window_secs(),
            session_bucket_secs: default_session_bucket_secs(),
            max_clock_skew_secs: default_max_clock_skew_secs(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            breakdown_limit: default_breakdown_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            default_range_days: default_range_days(),
            max_range_days: default_max_range_days(),
        }
    }
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            tier_prices: default_tier_prices(),
            privileged_roles: default_privileged_roles(),
        }
    }
}
