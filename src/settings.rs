use crate::errors::{AppError, AppResult};
use crate::models::DashboardSettings;
use crate::ordering::SortKey;
use std::fs;
use std::path::Path;

pub fn load_settings(path: &Path) -> AppResult<DashboardSettings> {
    let raw = fs::read_to_string(path)?;
    let settings: DashboardSettings = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)?,
        Some("json") => serde_json::from_str(&raw).map_err(|err| AppError::Config(err.to_string()))?,
        other => {
            return Err(AppError::Config(format!(
                "unsupported settings format: {}",
                other.unwrap_or("<none>")
            )))
        }
    };
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn validate_settings(settings: &DashboardSettings) -> AppResult<()> {
    if settings.max_label_len == 0 {
        return Err(AppError::Config("maxLabelLen must be positive".to_string()));
    }
    if settings.channel_capacity == 0 {
        return Err(AppError::Config("channelCapacity must be positive".to_string()));
    }
    if settings.success_measure.trim().is_empty() || settings.failure_measure.trim().is_empty() {
        return Err(AppError::Config("measure names cannot be empty".to_string()));
    }
    if settings.success_measure == settings.failure_measure {
        return Err(AppError::Config("success and failure measures must differ".to_string()));
    }
    settings
        .default_sort_key
        .parse::<SortKey>()
        .map_err(|err| AppError::Config(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_settings, validate_settings};
    use crate::models::DashboardSettings;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let file = write_temp(".yaml", "maxLabelLen: 30\ndefaultSortKey: failures\n");
        let settings = load_settings(file.path()).expect("settings");
        assert_eq!(settings.max_label_len, 30);
        assert_eq!(settings.default_sort_key, "failures");
        assert_eq!(settings.success_measure, "CERT_VALIDATION_SUCCESS_BY_CA");
        assert_eq!(settings.channel_capacity, 256);
    }

    #[test]
    fn json_is_accepted() {
        let file = write_temp(".json", r#"{ "logFilter": "debug", "channelCapacity": 8 }"#);
        let settings = load_settings(file.path()).expect("settings");
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.channel_capacity, 8);
    }

    #[test]
    fn rejects_unknown_extension_and_bad_values() {
        let file = write_temp(".toml", "maxLabelLen = 3");
        assert!(load_settings(file.path()).is_err());

        let file = write_temp(".yaml", "maxLabelLen: 0\n");
        let err = load_settings(file.path()).expect_err("zero length");
        assert!(err.to_string().starts_with("CONFIG_INVALID"));

        let same = DashboardSettings {
            failure_measure: "CERT_VALIDATION_SUCCESS_BY_CA".to_string(),
            ..DashboardSettings::default()
        };
        assert!(validate_settings(&same).is_err());

        let bad_key = DashboardSettings {
            default_sort_key: "fingerprint".to_string(),
            ..DashboardSettings::default()
        };
        assert!(validate_settings(&bad_key).is_err());
    }
}
