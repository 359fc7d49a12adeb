use crate::types::Scene;

const MIN_SCENES: u32 = 2;
const PROMPT_PREVIEW_CHARS: usize = 80;
const ELLIPSIS: char = '…';

/// Builds a placeholder story locally when the backend cannot be used.
#[derive(Debug, Clone, Default)]
pub struct FallbackSynthesizer;

impl FallbackSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, prompt: &str, desired_scenes: u32) -> Vec<Scene> {
        let (preview, truncated) = prompt_preview(prompt);
        let marker = if truncated { ELLIPSIS.to_string() } else { String::new() };
        (1..=desired_scenes.max(MIN_SCENES))
            .map(|position| {
                Scene::text_only(format!(
                    "Scene {position}: A short scene based on your prompt — \"{preview}\"{marker}"
                ))
            })
            .collect()
    }
}

// Cuts on char boundaries, not bytes.
fn prompt_preview(prompt: &str) -> (String, bool) {
    let mut chars = prompt.chars();
    let preview: String = chars.by_ref().take(PROMPT_PREVIEW_CHARS).collect();
    (preview, chars.next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_at_least_two_scenes() {
        let synth = FallbackSynthesizer::new();
        assert_eq!(synth.synthesize("x", 0).len(), 2);
        assert_eq!(synth.synthesize("x", 1).len(), 2);
        assert_eq!(synth.synthesize("x", 2).len(), 2);
        assert_eq!(synth.synthesize("x", 7).len(), 7);
    }

    #[test]
    fn numbers_scenes_from_one_without_media() {
        let scenes = FallbackSynthesizer::new().synthesize("A dragon learns to bake", 3);
        for (idx, scene) in scenes.iter().enumerate() {
            assert!(scene.text.starts_with(&format!("Scene {}: ", idx + 1)));
            assert!(scene.text.contains("\"A dragon learns to bake\""));
            assert!(scene.image_ref.is_none());
            assert!(scene.audio_ref.is_none());
        }
    }

    #[test]
    fn truncates_long_prompts_with_ellipsis() {
        let prompt = "a".repeat(81);
        let scenes = FallbackSynthesizer::new().synthesize(&prompt, 2);
        let expected = format!("\"{}\"…", "a".repeat(80));
        assert!(scenes[0].text.ends_with(&expected));
    }

    #[test]
    fn keeps_prompt_of_exactly_eighty_chars_intact() {
        let prompt = "b".repeat(80);
        let scenes = FallbackSynthesizer::new().synthesize(&prompt, 2);
        assert!(scenes[0].text.ends_with(&format!("\"{prompt}\"")));
        assert!(!scenes[0].text.contains('…'));
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let prompt = "é".repeat(100);
        let (preview, truncated) = prompt_preview(&prompt);
        assert_eq!(preview.chars().count(), 80);
        assert!(truncated);
    }

    #[test]
    fn empty_prompt_still_yields_text() {
        let scenes = FallbackSynthesizer::new().synthesize("", 1);
        assert!(scenes.iter().all(Scene::has_text));
    }
}
