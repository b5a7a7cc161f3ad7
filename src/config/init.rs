// ABOUTME: Config scaffolding for new applications.
// ABOUTME: Creates releasekit.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::AppName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(
    dir: &Path,
    app: Option<&str>,
    app_path: Option<&Path>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(name) = app {
        config.app_name = AppName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.app_path = Path::new("/opt").join(name);
        config.service_name = Some(name.to_string());
    }

    if let Some(path) = app_path {
        config.app_path = path.to_path_buf();
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"app_name: {}
app_path: {}

# Version and artifact can also be given on the command line:
#   releasekit deploy --version 1.2.3 --artifact https://releases.example.com/app-1.2.3.tar.gz
# version: "1.2.3"
# artifact_source: https://releases.example.com/app-1.2.3.tar.gz

# Remove to disable health checking
health_check_url: {}
health_check_timeout: {}
poll_interval: {}

rollback_on_failure: true
keep_versions: {}

# systemd unit restarted after each switch; remove to skip restarts
service_name: {}
"#,
        config.app_name,
        config.app_path.display(),
        config.healthcheck.url.as_deref().unwrap_or(""),
        config.healthcheck.timeout.as_secs(),
        config.healthcheck.poll_interval.as_secs(),
        config.keep_versions,
        config
            .service_name
            .as_deref()
            .unwrap_or(config.app_name.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_template_parses() {
        let yaml = generate_template_yaml(&Config::template());
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.app_name.as_str(), "my-app");
        assert_eq!(config.keep_versions.get(), 5);
        assert_eq!(
            config.healthcheck.url.as_deref(),
            Some("http://localhost:8080/health")
        );
    }
}
