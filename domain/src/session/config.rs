//! Session configuration (Value Object)
//!
//! All identity and application fields live in one struct that is built once
//! and passed by reference to whatever needs it.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Names a [`SessionConfig`] field, for prompts and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    UserId,
    WorkspaceId,
    HashedUserId,
    AppId,
}

impl ConfigField {
    pub const IDENTITY: [ConfigField; 3] = [
        ConfigField::UserId,
        ConfigField::WorkspaceId,
        ConfigField::HashedUserId,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ConfigField::UserId => "User Id",
            ConfigField::WorkspaceId => "Workspace Id",
            ConfigField::HashedUserId => "Hashed User Id",
            ConfigField::AppId => "App Id",
        }
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity and application settings for one chat session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub user_id: String,
    pub workspace_id: String,
    pub hashed_user_id: String,
    pub app_id: String,
}

impl SessionConfig {
    pub fn new(
        user_id: impl Into<String>,
        workspace_id: impl Into<String>,
        hashed_user_id: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            hashed_user_id: hashed_user_id.into(),
            app_id: app_id.into(),
        }
    }

    pub fn get(&self, field: ConfigField) -> &str {
        match field {
            ConfigField::UserId => &self.user_id,
            ConfigField::WorkspaceId => &self.workspace_id,
            ConfigField::HashedUserId => &self.hashed_user_id,
            ConfigField::AppId => &self.app_id,
        }
    }

    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        let slot = match field {
            ConfigField::UserId => &mut self.user_id,
            ConfigField::WorkspaceId => &mut self.workspace_id,
            ConfigField::HashedUserId => &mut self.hashed_user_id,
            ConfigField::AppId => &mut self.app_id,
        };
        *slot = value.into();
    }

    /// Fields that are still blank, in prompt order
    pub fn missing_fields(&self) -> Vec<ConfigField> {
        ConfigField::IDENTITY
            .into_iter()
            .chain(std::iter::once(ConfigField::AppId))
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }

    /// Identity fields must all be present before `identify`
    pub fn validate_identity(&self) -> Result<(), DomainError> {
        for field in ConfigField::IDENTITY {
            if self.get(field).trim().is_empty() {
                return Err(DomainError::MissingField(field));
            }
        }
        Ok(())
    }

    /// The application must be chosen before the first chat turn
    pub fn validate_app(&self) -> Result<(), DomainError> {
        if self.app_id.trim().is_empty() {
            return Err(DomainError::MissingField(ConfigField::AppId));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_missing_everything() {
        let config = SessionConfig::default();
        assert_eq!(
            config.missing_fields(),
            vec![
                ConfigField::UserId,
                ConfigField::WorkspaceId,
                ConfigField::HashedUserId,
                ConfigField::AppId,
            ]
        );
    }

    #[test]
    fn test_validate_identity_reports_first_blank_field() {
        let config = SessionConfig::new("u-1", "  ", "", "app");
        assert_eq!(
            config.validate_identity(),
            Err(DomainError::MissingField(ConfigField::WorkspaceId))
        );
    }

    #[test]
    fn test_identity_valid_without_app() {
        let config = SessionConfig::new("u-1", "ws-1", "hash", "");
        assert!(config.validate_identity().is_ok());
        assert_eq!(
            config.validate_app(),
            Err(DomainError::MissingField(ConfigField::AppId))
        );
        assert_eq!(config.missing_fields(), vec![ConfigField::AppId]);
    }

    #[test]
    fn test_set_and_get_round_through_field_names() {
        let mut config = SessionConfig::default();
        config.set(ConfigField::HashedUserId, "abc");
        config.set(ConfigField::AppId, "support-bot");
        assert_eq!(config.hashed_user_id, "abc");
        assert_eq!(config.get(ConfigField::AppId), "support-bot");
    }
}
