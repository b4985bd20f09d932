use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure for triage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Alert convergence window
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Per-call limits of the diagnosis pipeline
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Worker pool for webhook-triggered sessions
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Interactive streaming parameters
    #[serde(default)]
    pub stream: StreamConfig,

    /// Reasoning service connection
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Shared lock store backing the convergence gate
    #[serde(default)]
    pub lock_store: LockStoreConfig,

    /// Report delivery
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Convergence gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    /// Do not re-diagnose the same condition sooner than this
    #[serde(default = "default_convergence_ttl_secs")]
    pub ttl_secs: u64,

    /// Namespace prepended to every lock key in the store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

const fn default_convergence_ttl_secs() -> u64 {
    15 * 60
}

fn default_key_prefix() -> String {
    "triage:ops:lock:".to_string()
}

impl ConvergenceConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_convergence_ttl_secs(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Pipeline call limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Upper bound for one reasoning call, tool rounds included
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Upper bound for one tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

const fn default_call_timeout_secs() -> u64 {
    120
}

const fn default_tool_timeout_secs() -> u64 {
    30
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Dispatcher worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatcherConfig {
    /// Concurrent pipeline workers
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Submissions allowed to wait for a worker before the caller runs them
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Grace period for in-flight sessions on shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get) + 2
}

const fn default_queue_depth() -> usize {
    100
}

const fn default_shutdown_timeout_secs() -> u64 {
    60
}

impl DispatcherConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            queue_depth: default_queue_depth(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Interactive stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Characters per report chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay between report chunks in milliseconds
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Idle time before a heartbeat is emitted
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Buffered events per stream
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_chunk_size() -> usize {
    10
}

const fn default_chunk_delay_ms() -> u64 {
    50
}

const fn default_heartbeat_interval_secs() -> u64 {
    15
}

const fn default_channel_capacity() -> usize {
    64
}

impl StreamConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// OpenAI-compatible reasoning endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReasoningConfig {
    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    /// API key (can also be set via TRIAGE_REASONING__API_KEY)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Tool-call rounds allowed within one reasoning call
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

fn default_reasoning_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_reasoning_model() -> String {
    "qwen-plus".to_string()
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_max_tool_rounds() -> u32 {
    8
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: default_reasoning_base_url(),
            model: default_reasoning_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

/// Lock store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    #[default]
    Memory,
    Redis,
}

/// Lock store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LockStoreConfig {
    #[serde(default)]
    pub backend: LockBackend,

    /// Required when backend is redis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
}

/// Notification webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Markdown robot webhook; delivery is skipped when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notification_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_notification_timeout_secs() -> u64 {
    5
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notification_timeout_secs(),
        }
    }
}

/// Built-in tools configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolsConfig {
    /// Prometheus base URL; the query tool is not registered when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prometheus_endpoint: Option<String>,

    #[serde(default = "default_prometheus_timeout_secs")]
    pub prometheus_timeout_secs: u64,
}

const fn default_prometheus_timeout_secs() -> u64 {
    10
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            prometheus_endpoint: None,
            prometheus_timeout_secs: default_prometheus_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Also log to the console (stderr). Forced on when `log_dir` is unset.
    #[serde(default = "default_enable_console")]
    pub enable_console: bool,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

const fn default_enable_console() -> bool {
    true
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_console: default_enable_console(),
            rotation: default_rotation(),
        }
    }
}
