use crate::types::{GenerationResponse, Scene, StoryData};
use serde_json::Value;

/// Result of checking a backend body against the story contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCheck {
    Valid(StoryData),
    Invalid(String),
}

pub fn check_response(body: &Value) -> ResponseCheck {
    let response: GenerationResponse = match serde_json::from_value(body.clone()) {
        Ok(response) => response,
        Err(err) => return ResponseCheck::Invalid(format!("unexpected response shape: {err}")),
    };

    if response.success != Some(true) {
        return ResponseCheck::Invalid("success flag missing or false".into());
    }
    let Some(data) = response.data else {
        return ResponseCheck::Invalid("data missing".into());
    };
    let Some(short_texts) = data.short_texts else {
        return ResponseCheck::Invalid("data.short_texts missing".into());
    };
    let Some(images) = data.images_dataurls else {
        return ResponseCheck::Invalid("data.images_dataurls missing".into());
    };
    let audios = data.audio_dataurls.unwrap_or_default();

    // Audio never extends the story; trailing audio entries are dropped.
    let scene_count = short_texts.len().max(images.len());
    let scenes = (0..scene_count)
        .map(|idx| Scene {
            text: entry(&short_texts, idx).unwrap_or_default(),
            image_ref: entry(&images, idx),
            audio_ref: entry(&audios, idx),
        })
        .collect();

    let download_ref = data.zip_dataurl.filter(|zip| !zip.is_empty());
    ResponseCheck::Valid(StoryData { scenes, download_ref })
}

fn entry(values: &[Option<String>], idx: usize) -> Option<String> {
    values.get(idx).cloned().flatten().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid(body: Value) -> StoryData {
        match check_response(&body) {
            ResponseCheck::Valid(data) => data,
            ResponseCheck::Invalid(reason) => panic!("expected valid response, got {reason}"),
        }
    }

    fn invalid(body: Value) -> String {
        match check_response(&body) {
            ResponseCheck::Invalid(reason) => reason,
            ResponseCheck::Valid(data) => panic!("expected invalid response, got {data:?}"),
        }
    }

    #[test]
    fn zips_texts_with_sparse_images() {
        let data = valid(json!({
            "success": true,
            "data": {
                "short_texts": ["a", "b", "c"],
                "images_dataurls": [null, "img2", null]
            }
        }));
        assert_eq!(
            data.scenes,
            vec![
                Scene::text_only("a"),
                Scene { text: "b".into(), image_ref: Some("img2".into()), audio_ref: None },
                Scene::text_only("c"),
            ]
        );
        assert!(data.download_ref.is_none());
    }

    #[test]
    fn scene_count_follows_longest_of_texts_and_images() {
        let data = valid(json!({
            "success": true,
            "data": {
                "short_texts": ["only"],
                "images_dataurls": ["i1", "i2", "i3"],
                "audio_dataurls": ["a1"]
            }
        }));
        assert_eq!(data.scenes.len(), 3);
        assert_eq!(data.scenes[0].text, "only");
        assert_eq!(data.scenes[0].audio_ref.as_deref(), Some("a1"));
        assert_eq!(data.scenes[2].text, "");
        assert_eq!(data.scenes[2].image_ref.as_deref(), Some("i3"));
        assert!(data.scenes[2].audio_ref.is_none());
    }

    #[test]
    fn drops_trailing_audio_beyond_scene_count() {
        let data = valid(json!({
            "success": true,
            "data": {
                "short_texts": ["a"],
                "images_dataurls": [],
                "audio_dataurls": ["a1", "a2", "a3"]
            }
        }));
        assert_eq!(data.scenes.len(), 1);
        assert_eq!(data.scenes[0].audio_ref.as_deref(), Some("a1"));
    }

    #[test]
    fn captures_zip_reference() {
        let data = valid(json!({
            "success": true,
            "data": {
                "short_texts": ["a"],
                "images_dataurls": ["i"],
                "zip_dataurl": "data:application/zip;base64,UEsFBg=="
            }
        }));
        assert_eq!(data.download_ref.as_deref(), Some("data:application/zip;base64,UEsFBg=="));
    }

    #[test]
    fn rejects_missing_or_false_success() {
        assert!(invalid(json!({ "data": {} })).contains("success"));
        assert!(invalid(json!({ "success": false, "data": {} })).contains("success"));
    }

    #[test]
    fn rejects_missing_data_and_required_arrays() {
        assert!(invalid(json!({ "success": true })).contains("data missing"));
        assert!(invalid(json!({ "success": true, "data": { "images_dataurls": [] } }))
            .contains("short_texts"));
        assert!(invalid(json!({ "success": true, "data": { "short_texts": [] } }))
            .contains("images_dataurls"));
    }

    #[test]
    fn rejects_wrong_types() {
        let reason = invalid(json!({ "success": "yes", "data": {} }));
        assert!(reason.starts_with("unexpected response shape"));
        invalid(json!(["not", "an", "object"]));
    }
}
