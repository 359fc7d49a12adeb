use crate::{config::AppConfig, types::Scene};
use chrono::{DateTime, Local};

const MAX_STATUS_LINES: usize = 8;

/// Notifications from the controller to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Loading { active: bool, status: String },
    SceneChanged { scene: Scene, position: usize, total: usize },
    Error(String),
    Success(String),
    /// The story was reset; the view returns to the prompt form.
    Cleared,
}

/// Intents from the view to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Generate { prompt: String, desired_scenes: String, tts_mode: String },
    PrevScene,
    NextScene,
    Play,
    Download,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Prompt,
    Scenes,
    TtsMode,
}

impl InputField {
    pub fn next(self) -> Self {
        match self {
            Self::Prompt => Self::Scenes,
            Self::Scenes => Self::TtsMode,
            Self::TtsMode => Self::Prompt,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Prompt => "Prompt",
            Self::Scenes => "Scenes",
            Self::TtsMode => "TTS mode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneView {
    pub scene: Scene,
    pub position: usize,
    pub total: usize,
}

impl SceneView {
    pub fn counter(&self) -> String {
        format!("Scene {} / {}", self.position, self.total)
    }

    pub fn info_line(&self) -> String {
        format!("Scenes: {} — use Prev/Next to navigate.", self.total)
    }
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub at: DateTime<Local>,
    pub text: String,
}

/// Everything the terminal view renders.
#[derive(Debug)]
pub struct AppState {
    pub prompt: String,
    pub scenes_input: String,
    pub tts_mode: String,
    pub focus: InputField,
    pub loading: Option<String>,
    pub viewer: Option<SceneView>,
    pub message: Option<Message>,
    pub status_lines: Vec<StatusLine>,
    pub should_quit: bool,
    default_scenes: String,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let default_scenes = config.default_desired_scenes().to_string();
        Self {
            prompt: String::new(),
            scenes_input: default_scenes.clone(),
            tts_mode: config.tts_mode().to_string(),
            focus: InputField::Prompt,
            loading: None,
            viewer: None,
            message: None,
            status_lines: Vec::new(),
            should_quit: false,
            default_scenes,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Loading { active, status } => {
                if active {
                    self.push_status_line(status.clone());
                    self.loading = Some(status);
                } else {
                    self.loading = None;
                }
            }
            AppEvent::SceneChanged { scene, position, total } => {
                self.viewer = Some(SceneView { scene, position, total });
            }
            AppEvent::Error(text) => {
                self.push_status_line(format!("Error: {text}"));
                self.message = Some(Message { kind: MessageKind::Error, text });
            }
            AppEvent::Success(text) => {
                self.push_status_line(text.clone());
                self.message = Some(Message { kind: MessageKind::Success, text });
            }
            AppEvent::Cleared => {
                self.viewer = None;
                self.loading = None;
                self.message = None;
                self.prompt.clear();
                self.scenes_input = self.default_scenes.clone();
                self.focus = InputField::Prompt;
                self.push_status_line("Story cleared".into());
            }
        }
    }

    pub fn in_viewer(&self) -> bool {
        self.viewer.is_some()
    }

    pub fn generate_command(&self) -> AppCommand {
        AppCommand::Generate {
            prompt: self.prompt.clone(),
            desired_scenes: self.scenes_input.clone(),
            tts_mode: self.tts_mode.clone(),
        }
    }

    pub fn focused_input_mut(&mut self) -> &mut String {
        match self.focus {
            InputField::Prompt => &mut self.prompt,
            InputField::Scenes => &mut self.scenes_input,
            InputField::TtsMode => &mut self.tts_mode,
        }
    }

    pub fn push_status_line(&mut self, text: String) {
        self.status_lines.push(StatusLine { at: Local::now(), text });
        if self.status_lines.len() > MAX_STATUS_LINES {
            let overflow = self.status_lines.len() - MAX_STATUS_LINES;
            self.status_lines.drain(0..overflow);
        }
    }
}
