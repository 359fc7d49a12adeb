use crate::media;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::{
    env,
    io::Cursor,
    path::{Path, PathBuf},
    process::Stdio,
    sync::mpsc,
    thread,
};
use tokio::{process::Command, sync::oneshot, sync::Mutex};
use tracing::{debug, info, warn};

#[cfg(target_os = "macos")]
const SPEECH_COMMANDS: &[&str] = &["say"];
#[cfg(not(target_os = "macos"))]
const SPEECH_COMMANDS: &[&str] = &["espeak-ng", "espeak", "spd-say"];

/// Plays backend-rendered audio.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, reference: &str) -> Result<()>;
    async fn stop(&self);
}

/// On-device text-to-speech. At most one utterance is active at a time.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn is_available(&self) -> bool;
    async fn speak(&self, text: &str) -> Result<()>;
    async fn cancel(&self);
}

enum AudioCommand {
    Play { bytes: Vec<u8>, reply: oneshot::Sender<Result<()>> },
    Stop,
}

/// Drives a rodio output stream on a dedicated thread; the stream handle is not `Send`.
pub struct RodioOutput {
    http: reqwest::Client,
    command_tx: mpsc::Sender<AudioCommand>,
}

impl RodioOutput {
    pub fn spawn(http: reqwest::Client) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || audio_thread(command_rx, ready_tx))
            .context("failed to spawn audio thread")?;
        ready_rx
            .recv()
            .context("audio thread exited during startup")?
            .map_err(|err| anyhow!("failed to open audio output: {err}"))?;
        Ok(Self { http, command_tx })
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, reference: &str) -> Result<()> {
        let bytes = media::load_bytes(&self.http, reference).await?;
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(AudioCommand::Play { bytes, reply })
            .map_err(|_| anyhow!("audio thread is not running"))?;
        reply_rx.await.context("audio thread dropped the playback request")?
    }

    async fn stop(&self) {
        let _ = self.command_tx.send(AudioCommand::Stop);
    }
}

fn audio_thread(
    command_rx: mpsc::Receiver<AudioCommand>,
    ready_tx: mpsc::Sender<Result<(), String>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => {
            let _ = ready_tx.send(Ok(()));
            pair
        }
        Err(err) => {
            let _ = ready_tx.send(Err(err.to_string()));
            return;
        }
    };

    let mut sink: Option<Sink> = None;
    while let Ok(command) = command_rx.recv() {
        if let Some(previous) = sink.take() {
            previous.stop();
        }
        match command {
            AudioCommand::Play { bytes, reply } => {
                let result = start_sink(&handle, bytes).map(|started| {
                    sink = Some(started);
                });
                let _ = reply.send(result);
            }
            AudioCommand::Stop => debug!("audio playback stopped"),
        }
    }
}

fn start_sink(handle: &OutputStreamHandle, bytes: Vec<u8>) -> Result<Sink> {
    let decoder = Decoder::new(Cursor::new(bytes)).context("failed to decode audio")?;
    let sink = Sink::try_new(handle).context("failed to create audio sink")?;
    sink.append(decoder);
    sink.play();
    Ok(sink)
}

/// Stands in when no audio device could be opened; every attempt fails so callers fall
/// through to speech synthesis.
pub struct UnavailableOutput {
    reason: String,
}

impl UnavailableOutput {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl AudioOutput for UnavailableOutput {
    async fn play(&self, _reference: &str) -> Result<()> {
        Err(anyhow!("audio output unavailable: {}", self.reason))
    }

    async fn stop(&self) {}
}

/// Speaks through a system TTS binary (`say`, `espeak-ng`, `espeak`, `spd-say`).
pub struct CommandSpeech {
    program: Option<PathBuf>,
    current: Mutex<Option<tokio::process::Child>>,
}

impl CommandSpeech {
    pub fn detect(override_command: Option<&str>) -> Self {
        let candidates: Vec<&str> = match override_command {
            Some(command) => vec![command],
            None => SPEECH_COMMANDS.to_vec(),
        };
        let program = candidates.into_iter().find_map(find_program);
        match &program {
            Some(path) => info!("speech synthesis via {}", path.display()),
            None => warn!("no speech synthesis command found"),
        }
        Self::with_program(program)
    }

    pub fn with_program(program: Option<PathBuf>) -> Self {
        Self { program, current: Mutex::new(None) }
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeech {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    async fn speak(&self, text: &str) -> Result<()> {
        let Some(program) = &self.program else {
            bail!("no speech synthesis command available");
        };
        let mut current = self.current.lock().await;
        if let Some(mut previous) = current.take() {
            let _ = previous.start_kill();
        }
        // "--" keeps scene text that starts with '-' from being read as an option.
        let child = Command::new(program)
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", program.display()))?;
        *current = Some(child);
        Ok(())
    }

    async fn cancel(&self) {
        if let Some(mut child) = self.current.lock().await.take() {
            if let Err(err) = child.start_kill() {
                debug!("speech process already finished: {err}");
            }
        }
    }
}

fn find_program(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).map(|dir| dir.join(name)).find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let speech = CommandSpeech::detect(Some("/definitely/not/a/tts-binary"));
        assert!(!speech.is_available());
        assert!(speech.speak("hello").await.is_err());
        speech.cancel().await;
    }

    #[test]
    fn finds_program_by_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-tts");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        assert_eq!(find_program(path.to_str().unwrap()), Some(path.clone()));
        assert!(CommandSpeech::detect(path.to_str()).is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dash_leading_text_is_passed_after_option_terminator() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args");
        let script = dir.path().join("fake-tts");
        let target = args_file.display();
        let body =
            format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > {target}.tmp\nmv {target}.tmp {target}\n");
        fs::write(&script, body).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let speech = CommandSpeech::with_program(Some(script));
        speech.speak("-v loud").await.unwrap();

        let mut recorded = None;
        for _ in 0..100 {
            if let Ok(contents) = fs::read_to_string(&args_file) {
                recorded = Some(contents);
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(recorded.as_deref(), Some("--\n-v loud\n"));
    }

    #[test]
    fn bare_name_that_is_not_on_path_is_not_found() {
        assert!(find_program("storyreel-no-such-speech-binary").is_none());
    }

    #[tokio::test]
    async fn unavailable_output_always_fails() {
        let output = UnavailableOutput::new("no device");
        let err = output.play("data:audio/mpeg;base64,AA==").await.unwrap_err();
        assert!(err.to_string().contains("no device"));
    }
}
