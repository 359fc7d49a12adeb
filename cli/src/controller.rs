use crate::{
    api::StoryBackend,
    app::{AppCommand, AppEvent},
    config::DEFAULT_DESIRED_SCENES,
    download::ArtifactSink,
    error::{StoryError, StoryResult},
    fallback::FallbackSynthesizer,
    payload::{check_response, ResponseCheck},
    playback::{AudioOutput, SpeechEngine},
    types::{GenerationRequest, Phase, Scene, StoryData, StorySource},
};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{error, info, warn};

pub const LOADING_STATUS: &str = "Generating story...";
pub const BACKEND_SUCCESS: &str = "Story generated successfully!";
pub const FALLBACK_SUCCESS: &str =
    "Demo story generated (backend unavailable or returned unexpected data).";
pub const BACKEND_AUDIO_SUCCESS: &str = "Playing scene audio.";
pub const SPEECH_SUCCESS: &str = "Playing scene with on-device TTS.";
pub const DOWNLOAD_SUCCESS: &str = "Download started!";

/// Session state owned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryState {
    pub scenes: Vec<Scene>,
    pub current_index: usize,
    pub download_ref: Option<String>,
    pub phase: Phase,
    epoch: u64,
}

impl StoryState {
    pub fn current_scene(&self) -> Option<&Scene> {
        self.scenes.get(self.current_index)
    }

    fn install(&mut self, story: StoryData) {
        self.scenes = story.scenes;
        self.download_ref = story.download_ref;
        self.current_index = 0;
        self.phase = Phase::Ready;
    }

    fn clear(&mut self) {
        self.scenes.clear();
        self.download_ref = None;
        self.current_index = 0;
        self.phase = Phase::Idle;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    Installed(StorySource),
    /// Another generation was already running; nothing was sent.
    Rejected,
    /// The story was reset while the request was in flight; the result was dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    PlayedBackend,
    PlayedSynthesized,
    Failed(String),
}

/// Capabilities the controller drives. Injected so that tests and alternative front ends
/// can swap any of them.
pub struct Collaborators {
    pub backend: Arc<dyn StoryBackend>,
    pub audio: Arc<dyn AudioOutput>,
    pub speech: Arc<dyn SpeechEngine>,
    pub artifacts: Arc<dyn ArtifactSink>,
}

#[derive(Clone)]
pub struct StoryController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    collaborators: Collaborators,
    fallback: FallbackSynthesizer,
    event_tx: UnboundedSender<AppEvent>,
    state: Mutex<StoryState>,
}

impl StoryController {
    pub fn new(collaborators: Collaborators, event_tx: UnboundedSender<AppEvent>) -> Self {
        let inner = ControllerInner {
            collaborators,
            fallback: FallbackSynthesizer::new(),
            event_tx,
            state: Mutex::new(StoryState::default()),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Consumes intents until the sender side is dropped.
    ///
    /// Generation runs on its own task so navigation and reset stay responsive while a
    /// request is in flight.
    pub fn spawn(&self, mut command_rx: UnboundedReceiver<AppCommand>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                if let AppCommand::Generate { prompt, desired_scenes, tts_mode } = command {
                    let worker = controller.clone();
                    tokio::spawn(async move {
                        let result = worker.generate(&prompt, &desired_scenes, &tts_mode).await;
                        worker.report(result.map(|_| ()));
                    });
                    continue;
                }
                let result = controller.handle_command(command).await;
                controller.report(result);
            }
        })
    }

    pub async fn handle_command(&self, command: AppCommand) -> StoryResult<()> {
        match command {
            AppCommand::Generate { prompt, desired_scenes, tts_mode } => {
                self.generate(&prompt, &desired_scenes, &tts_mode).await?;
            }
            AppCommand::PrevScene => {
                self.navigate_prev();
            }
            AppCommand::NextScene => {
                self.navigate_next();
            }
            AppCommand::Play => {
                self.play().await?;
            }
            AppCommand::Download => {
                self.request_download().await?;
            }
            AppCommand::Reset => self.reset(),
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> StoryState {
        self.state().clone()
    }

    pub async fn generate(
        &self,
        prompt: &str,
        desired_scenes: &str,
        tts_mode: &str,
    ) -> StoryResult<GenerateOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StoryError::EmptyPrompt);
        }
        let desired_scenes = parse_desired_scenes(desired_scenes);

        let epoch = {
            let mut state = self.state();
            if state.phase == Phase::Generating {
                warn!("generation already in progress; ignoring new request");
                return Ok(GenerateOutcome::Rejected);
            }
            state.phase = Phase::Generating;
            state.epoch = state.epoch.wrapping_add(1);
            state.epoch
        };

        self.emit(AppEvent::Loading { active: true, status: LOADING_STATUS.into() });
        let mut loading = LoadingGuard::new(self.inner.event_tx.clone());

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            desired_scenes,
            tts_mode: tts_mode.to_string(),
        };
        let (story, source) = match self.inner.collaborators.backend.generate(&request).await {
            Err(err) => {
                warn!("backend request failed, using demo story: {err:#}");
                (self.fallback_story(prompt, desired_scenes), StorySource::Fallback)
            }
            Ok(body) => match check_response(&body) {
                ResponseCheck::Valid(story) => (story, StorySource::Backend),
                ResponseCheck::Invalid(reason) => {
                    warn!("backend returned unexpected data ({reason}), using demo story");
                    (self.fallback_story(prompt, desired_scenes), StorySource::Fallback)
                }
            },
        };

        // Notifications go out under the lock so a concurrent reset is ordered after them.
        let installed = {
            let mut state = self.state();
            if state.epoch != epoch || state.phase != Phase::Generating {
                None
            } else {
                state.install(story);
                let total = state.scenes.len();
                if let Some(scene) = state.current_scene().cloned() {
                    self.emit(AppEvent::SceneChanged { scene, position: 1, total });
                }
                self.emit(AppEvent::Success(
                    match source {
                        StorySource::Backend => BACKEND_SUCCESS,
                        StorySource::Fallback => FALLBACK_SUCCESS,
                    }
                    .into(),
                ));
                Some(total)
            }
        };

        let Some(total) = installed else {
            info!("story was reset during generation; dropping result");
            loading.disarm();
            return Ok(GenerateOutcome::Discarded);
        };

        info!(scenes = total, ?source, "story installed");
        Ok(GenerateOutcome::Installed(source))
    }

    pub fn navigate_prev(&self) -> bool {
        self.step(|index, _| index.checked_sub(1))
    }

    pub fn navigate_next(&self) -> bool {
        self.step(|index, len| (index + 1 < len).then_some(index + 1))
    }

    fn step<F>(&self, next: F) -> bool
    where
        F: FnOnce(usize, usize) -> Option<usize>,
    {
        let mut state = self.state();
        if state.scenes.is_empty() {
            return false;
        }
        let Some(index) = next(state.current_index, state.scenes.len()) else {
            return false;
        };
        state.current_index = index;
        let scene = state.scenes[index].clone();
        self.emit(AppEvent::SceneChanged { scene, position: index + 1, total: state.scenes.len() });
        true
    }

    /// Backend audio first, on-device speech second.
    pub async fn play(&self) -> StoryResult<PlaybackOutcome> {
        let scene = self.state().current_scene().cloned();
        let Some(scene) = scene.filter(Scene::has_text) else {
            return Err(StoryError::NoContent);
        };

        let speech = &self.inner.collaborators.speech;
        speech.cancel().await;

        if let Some(audio_ref) = scene.audio_ref.as_deref() {
            match self.inner.collaborators.audio.play(audio_ref).await {
                Ok(()) => {
                    self.emit(AppEvent::Success(BACKEND_AUDIO_SUCCESS.into()));
                    return Ok(PlaybackOutcome::PlayedBackend);
                }
                Err(err) => warn!("backend audio failed, falling back to speech: {err:#}"),
            }
        }

        if !speech.is_available() {
            return Err(StoryError::UnsupportedCapability);
        }
        self.inner.collaborators.audio.stop().await;
        match speech.speak(&scene.text).await {
            Ok(()) => {
                self.emit(AppEvent::Success(SPEECH_SUCCESS.into()));
                Ok(PlaybackOutcome::PlayedSynthesized)
            }
            Err(err) => {
                let reason = format!("Speech synthesis failed: {err}");
                self.emit(AppEvent::Error(reason.clone()));
                Ok(PlaybackOutcome::Failed(reason))
            }
        }
    }

    pub async fn request_download(&self) -> StoryResult<PathBuf> {
        let reference = self.state().download_ref.clone().ok_or(StoryError::NoArtifact)?;
        let path = self
            .inner
            .collaborators
            .artifacts
            .save(&reference)
            .await
            .map_err(|err| StoryError::Download(format!("{err:#}")))?;
        self.emit(AppEvent::Success(format!("{DOWNLOAD_SUCCESS} Saved to {}", path.display())));
        Ok(path)
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.clear();
        self.emit(AppEvent::Cleared);
    }

    fn fallback_story(&self, prompt: &str, desired_scenes: u32) -> StoryData {
        StoryData {
            scenes: self.inner.fallback.synthesize(prompt, desired_scenes),
            download_ref: None,
        }
    }

    fn report(&self, result: StoryResult<()>) {
        if let Err(err) = result {
            error!("command failed: {err}");
            self.emit(AppEvent::Error(err.to_string()));
        }
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    fn state(&self) -> MutexGuard<'_, StoryState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the loading indicator when generation ends, however it ends.
struct LoadingGuard {
    event_tx: UnboundedSender<AppEvent>,
    armed: bool,
}

impl LoadingGuard {
    fn new(event_tx: UnboundedSender<AppEvent>) -> Self {
        Self { event_tx, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.event_tx.send(AppEvent::Loading { active: false, status: String::new() });
        }
    }
}

/// Lenient integer parse: leading digits win, anything unusable falls back to the default.
pub fn parse_desired_scenes(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let digits_end = trimmed
        .char_indices()
        .find(|(idx, ch)| !(ch.is_ascii_digit() || (*idx == 0 && (*ch == '+' || *ch == '-'))))
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    trimmed[..digits_end]
        .parse::<i64>()
        .ok()
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(DEFAULT_DESIRED_SCENES)
}
