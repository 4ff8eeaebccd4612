use crate::api::models::{TranscriptionProvider, TranscriptionSettings, TranscriptionSettingsUpdate};
use crate::api::ApiClient;
use crate::error::AppError;

/// Fields an operator asked to change; everything else keeps its saved value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsChange {
    pub provider: Option<TranscriptionProvider>,
    pub external_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub clear_api_key: bool,
}

impl SettingsChange {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Full update payload built on top of the saved settings.
    pub fn apply_to(&self, current: &TranscriptionSettings) -> TranscriptionSettingsUpdate {
        TranscriptionSettingsUpdate {
            provider: self.provider.unwrap_or(current.provider),
            external_url: self
                .external_url
                .clone()
                .unwrap_or_else(|| current.external_url.clone()),
            model: self.model.clone().unwrap_or_else(|| current.model.clone()),
            external_api_key: self
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            clear_external_api_key: self.clear_api_key,
        }
    }
}

/// `provider=… url=… model=… key=… clear-key`
pub fn parse_change(args: &[&str]) -> Result<SettingsChange, String> {
    let mut change = SettingsChange::default();
    for arg in args {
        if *arg == "clear-key" {
            change.clear_api_key = true;
            continue;
        }
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got {:?}", arg))?;
        match key {
            "provider" => change.provider = Some(value.parse()?),
            "url" => change.external_url = Some(value.to_string()),
            "model" => {
                if value.trim().is_empty() {
                    return Err("model must not be empty".to_string());
                }
                change.model = Some(value.to_string());
            }
            "key" => change.api_key = Some(value.to_string()),
            other => return Err(format!("Unknown setting {:?}", other)),
        }
    }
    if change.is_empty() {
        return Err("usage: settings set provider=local|external url=URL model=NAME key=KEY clear-key".to_string());
    }
    Ok(change)
}

pub async fn show_settings(client: &ApiClient) -> Result<String, AppError> {
    let settings = client.get_transcription_settings().await?;
    Ok(render_settings(&settings))
}

pub async fn update_settings(client: &ApiClient, change: &SettingsChange) -> Result<String, AppError> {
    let current = client.get_transcription_settings().await?;
    let payload = change.apply_to(&current);
    log::info!(
        "Updating transcription settings: provider={} model={}",
        payload.provider,
        payload.model
    );
    let saved = client.update_transcription_settings(&payload).await?;
    Ok(format!("Saved\n{}", render_settings(&saved)))
}

pub fn render_settings(settings: &TranscriptionSettings) -> String {
    let provider = match settings.provider {
        TranscriptionProvider::Local => "Local Whisper Service",
        TranscriptionProvider::External => "External API Service",
    };
    let key = if settings.has_external_api_key {
        "saved"
    } else {
        "not set"
    };
    format!(
        "Provider      {}\nExternal URL  {}\nModel         {}\nAPI key       {}",
        provider, settings.external_url, settings.model, key
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved() -> TranscriptionSettings {
        TranscriptionSettings {
            provider: TranscriptionProvider::Local,
            external_url: "https://api.example/v1/audio/transcriptions".to_string(),
            model: "Systran/faster-whisper-small".to_string(),
            has_external_api_key: true,
        }
    }

    #[test]
    fn test_change_overlays_saved_values() {
        let change = parse_change(&["provider=external", "model=whisper-1"]).unwrap();
        let payload = change.apply_to(&saved());
        assert_eq!(payload.provider, TranscriptionProvider::External);
        assert_eq!(payload.model, "whisper-1");
        assert_eq!(payload.external_url, saved().external_url);
        assert_eq!(payload.external_api_key, None);
        assert!(!payload.clear_external_api_key);
    }

    #[test]
    fn test_key_fields_are_omitted_unless_set() {
        let change = parse_change(&["model=m"]).unwrap();
        let json = serde_json::to_value(change.apply_to(&saved())).unwrap();
        assert!(json.get("external_api_key").is_none());
        assert!(json.get("clear_external_api_key").is_none());

        let change = parse_change(&["key=  sk-123 ", "clear-key"]).unwrap();
        let json = serde_json::to_value(change.apply_to(&saved())).unwrap();
        assert_eq!(json["external_api_key"], "sk-123");
        assert_eq!(json["clear_external_api_key"], true);
    }

    #[test]
    fn test_parse_change_errors() {
        assert!(parse_change(&[]).is_err());
        assert!(parse_change(&["provider=cloud"]).is_err());
        assert!(parse_change(&["model="]).is_err());
        assert!(parse_change(&["colour=blue"]).is_err());
        assert!(parse_change(&["model"]).is_err());
    }

    #[test]
    fn test_render_settings() {
        let text = render_settings(&saved());
        assert!(text.contains("Local Whisper Service"));
        assert!(text.ends_with("API key       saved"));
    }
}
