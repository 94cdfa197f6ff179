use std::env;
use tracing::warn;

use shared_models::auth::{DerivedRole, Role};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DASHBOARD_ROLES: [Role; 2] = [Role::Admin, Role::EvmStaff];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Roles allowed past the session middleware.
    pub dashboard_roles: Vec<Role>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            dashboard_roles: DEFAULT_DASHBOARD_ROLES.to_vec(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            host: env::var("API_HOST")
                .unwrap_or_else(|_| {
                    warn!("API_HOST not set, using default");
                    DEFAULT_HOST.to_string()
                }),
            port: match env::var("API_PORT") {
                Ok(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!("API_PORT '{}' is not a valid port, using default", raw);
                    DEFAULT_PORT
                }),
                Err(_) => {
                    warn!("API_PORT not set, using default");
                    DEFAULT_PORT
                }
            },
            dashboard_roles: env::var("DASHBOARD_ROLES")
                .map(|raw| Self::parse_roles(&raw))
                .unwrap_or_else(|_| {
                    warn!("DASHBOARD_ROLES not set, using default");
                    DEFAULT_DASHBOARD_ROLES.to_vec()
                }),
        };

        if !config.is_configured() {
            warn!("No dashboard roles configured - every session will be rejected");
        }

        config
    }

    /// Parses a comma separated list of role tags, skipping unknown ones.
    pub fn parse_roles(raw: &str) -> Vec<Role> {
        let mut roles = Vec::new();
        for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match tag.parse::<Role>() {
                Ok(role) if !roles.contains(&role) => roles.push(role),
                Ok(_) => {}
                Err(e) => {
                    let known: Vec<&str> = Role::all().map(Role::tag).collect();
                    warn!("{}, expected one of {:?}", e, known);
                }
            }
        }
        roles
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_configured(&self) -> bool {
        !self.dashboard_roles.is_empty()
    }

    pub fn allows(&self, role: &DerivedRole) -> bool {
        role.known_role()
            .is_some_and(|known| self.dashboard_roles.contains(&known))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived(tag: &str) -> DerivedRole {
        DerivedRole {
            role_id: Role::from_tag(tag).map(Role::legacy_id),
            role_name: Some(tag.to_string()),
            role: Some(tag.to_string()),
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.is_configured());
        assert!(config.allows(&derived("ROLE_ADMIN")));
        assert!(config.allows(&derived("ROLE_EVMSTAFF")));
        assert!(!config.allows(&derived("ROLE_USER")));
        assert!(!config.allows(&DerivedRole::default()));
    }

    #[test]
    fn test_parse_roles_skips_unknown_and_duplicates() {
        let roles = AppConfig::parse_roles(" ROLE_USER, ROLE_DEALER,,ROLE_USER,ROLE_ADMIN ");

        assert_eq!(roles, vec![Role::User, Role::Admin]);
    }

    #[test]
    fn test_unknown_role_never_allowed() {
        let config = AppConfig {
            dashboard_roles: Role::all().collect(),
            ..AppConfig::default()
        };

        assert!(!config.allows(&derived("ROLE_UNKNOWN")));
    }
}
