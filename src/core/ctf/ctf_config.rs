// CTF configuration - loaded once at startup and injected into the service.

use super::tally::DEFAULT_PAGE_SIZE;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Guild-specific ids and limits the lifecycle controller needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtfConfig {
    /// Roles allowed to create CTF events.
    pub admin_role_ids: Vec<u64>,
    /// Where announcements go when the admin does not pick a channel.
    pub announcement_channel_id: Option<u64>,
    /// Category new forums are created under.
    pub active_category_id: Option<u64>,
    /// Category forums move to once the CTF completes.
    pub archive_category_id: Option<u64>,
    /// Max characters per tally block.
    pub tally_page_size: usize,
}

impl Default for CtfConfig {
    fn default() -> Self {
        Self {
            admin_role_ids: Vec::new(),
            announcement_channel_id: None,
            active_category_id: None,
            archive_category_id: None,
            tally_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CtfConfig {
    /// Read the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup (env, fixture map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let admin_raw = get("ADMIN_ROLE_IDS").ok_or(ConfigError::Missing("ADMIN_ROLE_IDS"))?;
        let admin_role_ids = admin_raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| parse_id("ADMIN_ROLE_IDS", id))
            .collect::<Result<Vec<_>, _>>()?;
        if admin_role_ids.is_empty() {
            return Err(ConfigError::Missing("ADMIN_ROLE_IDS"));
        }

        let optional_id = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            get(key).map(|v| parse_id(key, &v)).transpose()
        };

        let tally_page_size = match get("TALLY_PAGE_SIZE") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::Invalid {
                    key: "TALLY_PAGE_SIZE",
                    value: raw.clone(),
                })?
                .min(DEFAULT_PAGE_SIZE),
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            admin_role_ids,
            announcement_channel_id: optional_id("BOT_CHAT_CHANNEL_ID")?,
            active_category_id: optional_id("ACTIVE_CTF_CATEGORY_ID")?,
            archive_category_id: optional_id("ARCHIVE_CATEGORY_ID")?,
            tally_page_size,
        })
    }

    /// True if any of the caller's roles is on the admin allow-list.
    pub fn is_admin(&self, caller_role_ids: &[u64]) -> bool {
        caller_role_ids
            .iter()
            .any(|role| self.admin_role_ids.contains(role))
    }
}

fn parse_id(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_full_config() {
        let config = CtfConfig::from_lookup(lookup(&[
            ("ADMIN_ROLE_IDS", "1402615202112995418, 1405007847162642452"),
            ("BOT_CHAT_CHANNEL_ID", "1458725882410565815"),
            ("ACTIVE_CTF_CATEGORY_ID", "10"),
            ("ARCHIVE_CATEGORY_ID", "20"),
            ("TALLY_PAGE_SIZE", "512"),
        ]))
        .unwrap();

        assert_eq!(
            config.admin_role_ids,
            vec![1402615202112995418, 1405007847162642452]
        );
        assert_eq!(config.announcement_channel_id, Some(1458725882410565815));
        assert_eq!(config.active_category_id, Some(10));
        assert_eq!(config.archive_category_id, Some(20));
        assert_eq!(config.tally_page_size, 512);
    }

    #[test]
    fn test_optional_settings_default() {
        let config = CtfConfig::from_lookup(lookup(&[("ADMIN_ROLE_IDS", "1")])).unwrap();
        assert_eq!(config.announcement_channel_id, None);
        assert_eq!(config.archive_category_id, None);
        assert_eq!(config.tally_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = CtfConfig::from_lookup(lookup(&[
            ("ADMIN_ROLE_IDS", "1"),
            ("ARCHIVE_CATEGORY_ID", "  "),
        ]))
        .unwrap();
        assert_eq!(config.archive_category_id, None);
    }

    #[test]
    fn test_admin_roles_required() {
        assert_eq!(
            CtfConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("ADMIN_ROLE_IDS"))
        );
        assert_eq!(
            CtfConfig::from_lookup(lookup(&[("ADMIN_ROLE_IDS", " , ")])),
            Err(ConfigError::Missing("ADMIN_ROLE_IDS"))
        );
    }

    #[test]
    fn test_rejects_bad_ids() {
        let err = CtfConfig::from_lookup(lookup(&[
            ("ADMIN_ROLE_IDS", "1"),
            ("BOT_CHAT_CHANNEL_ID", "general"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "BOT_CHAT_CHANNEL_ID",
                value: "general".to_string()
            }
        );
    }

    #[test]
    fn test_page_size_clamped_to_field_limit() {
        let config = CtfConfig::from_lookup(lookup(&[
            ("ADMIN_ROLE_IDS", "1"),
            ("TALLY_PAGE_SIZE", "4096"),
        ]))
        .unwrap();
        assert_eq!(config.tally_page_size, DEFAULT_PAGE_SIZE);

        assert!(CtfConfig::from_lookup(lookup(&[
            ("ADMIN_ROLE_IDS", "1"),
            ("TALLY_PAGE_SIZE", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn test_is_admin() {
        let config = CtfConfig {
            admin_role_ids: vec![5, 6],
            ..Default::default()
        };
        assert!(config.is_admin(&[1, 6]));
        assert!(!config.is_admin(&[1, 2]));
        assert!(!config.is_admin(&[]));
    }
}
