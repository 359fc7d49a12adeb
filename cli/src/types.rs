use serde::{Deserialize, Serialize};

/// One page of a story.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    pub text: String,
    pub image_ref: Option<String>,
    pub audio_ref: Option<String>,
}

impl Scene {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), image_ref: None, audio_ref: None }
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Ready,
}

/// Which path produced the installed scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorySource {
    Backend,
    Fallback,
}

/// Body of the outbound generation request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub desired_scenes: u32,
    pub tts_mode: String,
}

/// Raw backend envelope. Every field is optional so that shape problems surface as
/// validation failures instead of decode errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<StoryPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryPayload {
    #[serde(default)]
    pub short_texts: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub images_dataurls: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub audio_dataurls: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub zip_dataurl: Option<String>,
}

/// A validated story ready to be installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryData {
    pub scenes: Vec<Scene>,
    pub download_ref: Option<String>,
}
