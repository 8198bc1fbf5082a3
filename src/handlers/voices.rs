use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::core::voices::VOICE_PRESETS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoicesResponse {
    pub voices: Vec<String>,
}

/// List the supported voice presets
pub async fn list_voices() -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: VOICE_PRESETS.iter().map(|v| v.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_voices_is_static() {
        let Json(response) = list_voices().await;
        assert_eq!(response.voices.len(), 10);
        assert_eq!(response.voices[0], "v2/en_speaker_0");
        assert_eq!(response.voices[9], "v2/en_speaker_9");
    }
}
