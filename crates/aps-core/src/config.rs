use std::collections::HashMap;
use std::env;

/// Immutable capture of process environment variables.
///
/// Configuration reads from a snapshot rather than the live environment so
/// construction is deterministic and testable without mutating global
/// state.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn flag_disabled(&self, key: &str) -> bool {
        match self.var(key) {
            Some(value) => {
                let lowered = value.trim().to_ascii_lowercase();
                matches!(lowered.as_str(), "0" | "false" | "no" | "off")
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Credentials for the member API's event feed.
#[derive(Debug, Clone)]
pub struct PharosConfig {
    pub base_url: String,
    pub api_user: String,
    pub api_key: String,
}

/// Connection and packaging settings for one replica store.
///
/// Built once, injected at construction; nothing here is looked up from
/// process-wide state after startup.
#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// Staging bucket the preservation service watches.
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Institution identifier the service files deposits under.
    pub institution: String,
    /// Value of the bag's Source-Organization tag.
    pub source_organization: String,
    /// Access tier recorded in the service tag file.
    pub access: String,
    /// Storage tier recorded in the service tag file.
    pub storage_option: String,
    /// When false, payloads are uploaded raw instead of bagged.
    pub bagging: bool,
    pub pharos: PharosConfig,
}

impl ReplicaConfig {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error when a required `APS_*` variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self, ConfigError> {
        let institution = required(snapshot, "APS_INSTITUTION")?;
        let source_organization = snapshot
            .var("APS_SOURCE_ORGANIZATION")
            .unwrap_or(&institution)
            .to_string();
        Ok(Self {
            bucket: required(snapshot, "APS_AWS_BUCKET")?,
            access_key: required(snapshot, "APS_AWS_ACCESS_KEY")?,
            secret_key: required(snapshot, "APS_AWS_SECRET_ACCESS_KEY")?,
            institution,
            source_organization,
            access: snapshot
                .var("APS_ACCESS")
                .unwrap_or("Institution")
                .to_string(),
            storage_option: snapshot
                .var("APS_STORAGE_OPTION")
                .unwrap_or("Standard")
                .to_string(),
            bagging: !snapshot.flag_disabled("APS_BAGGING"),
            pharos: PharosConfig {
                base_url: required(snapshot, "APS_PHAROS_URL")?,
                api_user: required(snapshot, "APS_PHAROS_USER")?,
                api_key: required(snapshot, "APS_PHAROS_KEY")?,
            },
        })
    }
}

fn required(snapshot: &EnvSnapshot, key: &'static str) -> Result<String, ConfigError> {
    snapshot
        .var(key)
        .map(ToString::to_string)
        .ok_or(ConfigError::MissingVar(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn full_snapshot() -> EnvSnapshot {
        EnvSnapshot::testing(&[
            ("APS_AWS_BUCKET", "aptrust.receiving.test.edu"),
            ("APS_AWS_ACCESS_KEY", "AKIAEXAMPLE"),
            ("APS_AWS_SECRET_ACCESS_KEY", "secret"),
            ("APS_INSTITUTION", "test.edu"),
            ("APS_PHAROS_URL", "https://repo.aptrust.org/member-api/v2/"),
            ("APS_PHAROS_USER", "ops@test.edu"),
            ("APS_PHAROS_KEY", "api-key"),
        ])
    }

    #[test]
    fn defaults_fill_in_optional_settings() {
        let config = ReplicaConfig::from_snapshot(&full_snapshot()).unwrap();
        assert_eq!(config.source_organization, "test.edu");
        assert_eq!(config.access, "Institution");
        assert_eq!(config.storage_option, "Standard");
        assert!(config.bagging);
    }

    #[test]
    fn bagging_can_be_disabled() {
        let mut pairs = vec![("APS_BAGGING", "0")];
        pairs.extend([
            ("APS_AWS_BUCKET", "b"),
            ("APS_AWS_ACCESS_KEY", "a"),
            ("APS_AWS_SECRET_ACCESS_KEY", "s"),
            ("APS_INSTITUTION", "test.edu"),
            ("APS_PHAROS_URL", "https://example.org/"),
            ("APS_PHAROS_USER", "u"),
            ("APS_PHAROS_KEY", "k"),
        ]);
        let config = ReplicaConfig::from_snapshot(&EnvSnapshot::testing(&pairs)).unwrap();
        assert!(!config.bagging);
    }

    #[test]
    fn missing_required_variable_is_reported_by_name() {
        let snapshot = EnvSnapshot::testing(&[("APS_AWS_BUCKET", "b")]);
        let err = ReplicaConfig::from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("APS_INSTITUTION"));
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = env::var(key).ok();
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn from_env_reads_the_live_environment() {
        let _bucket = EnvGuard::set("APS_AWS_BUCKET", Some("aptrust.receiving.live.edu"));
        let _access = EnvGuard::set("APS_AWS_ACCESS_KEY", Some("AKIALIVE"));
        let _secret = EnvGuard::set("APS_AWS_SECRET_ACCESS_KEY", Some("live-secret"));
        let _inst = EnvGuard::set("APS_INSTITUTION", Some("live.edu"));
        let _url = EnvGuard::set("APS_PHAROS_URL", Some("https://example.org/api/"));
        let _user = EnvGuard::set("APS_PHAROS_USER", Some("ops@live.edu"));
        let _key = EnvGuard::set("APS_PHAROS_KEY", Some("live-key"));
        let _org = EnvGuard::set("APS_SOURCE_ORGANIZATION", None);
        let _bagging = EnvGuard::set("APS_BAGGING", None);

        let config = ReplicaConfig::from_env().unwrap();
        assert_eq!(config.bucket, "aptrust.receiving.live.edu");
        assert_eq!(config.institution, "live.edu");
        assert_eq!(config.source_organization, "live.edu");
    }
}
