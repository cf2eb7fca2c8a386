//! Console configuration

use std::path::PathBuf;
use std::time::Duration;

use shared::LanguageCode;
use shared::intent::DEFAULT_ITEMS_PER_PAGE;

/// 控制台配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | CONSOLE_DEFAULT_LANGUAGE | en | 未指定 `lang` 时使用的语言 |
/// | CONSOLE_ITEMS_PER_PAGE | 10 | 默认每页数量 |
/// | CONSOLE_RESOLVE_TIMEOUT_MS | - | 实体解析超时 (毫秒)，超时视为不存在 |
/// | CONSOLE_LOG_LEVEL | info | 日志级别 |
/// | CONSOLE_LOG_JSON | false | JSON 格式日志 |
/// | CONSOLE_LOG_DIR | - | 日志文件目录 (按天滚动) |
/// | CONSOLE_DEBUG_INSPECTOR | false | 启用调试检查接口 |
/// | CONSOLE_CATALOG_DIR | - | 界面文案目录 (`<lang>.json`) |
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub default_language: LanguageCode,
    pub items_per_page: u32,
    pub resolve_timeout: Option<Duration>,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<PathBuf>,
    pub debug_inspector: bool,
    pub catalog_dir: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            default_language: LanguageCode::from("en"),
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            resolve_timeout: None,
            log_level: "info".to_string(),
            log_json: false,
            log_dir: None,
            debug_inspector: false,
            catalog_dir: None,
        }
    }
}

impl ConsoleConfig {
    /// 从环境变量加载配置 (先读取 `.env`)
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载 (测试时可注入)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            default_language: lookup("CONSOLE_DEFAULT_LANGUAGE")
                .filter(|s| !s.trim().is_empty())
                .map(LanguageCode::from)
                .unwrap_or(defaults.default_language),
            items_per_page: lookup("CONSOLE_ITEMS_PER_PAGE")
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n >= 1)
                .unwrap_or(defaults.items_per_page),
            resolve_timeout: lookup("CONSOLE_RESOLVE_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
            log_level: lookup("CONSOLE_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: lookup("CONSOLE_LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_json),
            log_dir: lookup("CONSOLE_LOG_DIR").map(PathBuf::from),
            debug_inspector: lookup("CONSOLE_DEBUG_INSPECTOR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.debug_inspector),
            catalog_dir: lookup("CONSOLE_CATALOG_DIR").map(PathBuf::from),
        }
    }

    pub fn with_default_language(mut self, code: impl Into<LanguageCode>) -> Self {
        self.default_language = code.into();
        self
    }

    pub fn with_items_per_page(mut self, items_per_page: u32) -> Self {
        self.items_per_page = items_per_page.max(1);
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }

    pub fn with_debug_inspector(mut self, enabled: bool) -> Self {
        self.debug_inspector = enabled;
        self
    }

    pub fn with_catalog_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.catalog_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::from_lookup(|_| None);
        assert_eq!(config.default_language, "en");
        assert_eq!(config.items_per_page, 10);
        assert!(config.resolve_timeout.is_none());
        assert!(!config.debug_inspector);
    }

    #[test]
    fn test_lookup_overrides() {
        let env: HashMap<&str, &str> = [
            ("CONSOLE_DEFAULT_LANGUAGE", "de"),
            ("CONSOLE_ITEMS_PER_PAGE", "25"),
            ("CONSOLE_RESOLVE_TIMEOUT_MS", "1500"),
            ("CONSOLE_LOG_JSON", "true"),
            ("CONSOLE_DEBUG_INSPECTOR", "true"),
        ]
        .into_iter()
        .collect();

        let config = ConsoleConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.default_language, "de");
        assert_eq!(config.items_per_page, 25);
        assert_eq!(config.resolve_timeout, Some(Duration::from_millis(1500)));
        assert!(config.log_json);
        assert!(config.debug_inspector);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ConsoleConfig::from_lookup(|k| match k {
            "CONSOLE_ITEMS_PER_PAGE" => Some("0".to_string()),
            "CONSOLE_LOG_JSON" => Some("yes".to_string()),
            _ => None,
        });
        assert_eq!(config.items_per_page, 10);
        assert!(!config.log_json);
    }
}
