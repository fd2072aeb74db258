use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::activity::cron::CronConfig;
use crate::activity::sessions::SessionsConfig;
use crate::activity::tailer::TailerConfig;
use crate::activity::usage::UsageConfig;

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// openclaw CLIのコマンド名（またはパス）
    #[serde(default = "default_cli_program")]
    pub cli_program: String,
    /// ソースごとのタイムアウト（秒）
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
    /// watchモードの更新間隔（秒）
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// ログレベル
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// ゲートウェイログ設定
    #[serde(default)]
    pub logs: TailerConfig,
    /// セッション取得設定
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// cronジョブ取得設定
    #[serde(default)]
    pub cron: CronConfig,
    /// 使用量取得設定
    #[serde(default)]
    pub usage: UsageConfig,
}

fn default_cli_program() -> String {
    "openclaw".to_string()
}

fn default_source_timeout() -> u64 {
    10
}

fn default_refresh_interval() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cli_program: default_cli_program(),
            source_timeout_secs: default_source_timeout(),
            refresh_interval_secs: default_refresh_interval(),
            log_level: default_log_level(),
            logs: TailerConfig::default(),
            sessions: SessionsConfig::default(),
            cron: CronConfig::default(),
            usage: UsageConfig::default(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み（存在しない場合はデフォルトを作成して保存）
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // 初回起動時はデフォルト設定をファイルに保存
            let config = Self::default();
            if let Err(e) = config.save() {
                tracing::warn!("Failed to save default config: {:#}", e);
            }
            Ok(config)
        }
    }

    /// 指定パスの設定ファイルを読み込み（書き戻しはしない）
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// 設定ファイルパスを取得
    pub fn config_path() -> Result<PathBuf> {
        // ~/.config/openclaw-dashboard/config.toml を使用
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/openclaw-dashboard/config.toml"))
    }

    /// 現在の設定をファイルに保存
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
