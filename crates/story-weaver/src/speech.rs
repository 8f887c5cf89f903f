//! Narration through the platform speech command.

use std::process::Stdio;
use std::sync::Mutex;

use story_weaver_core::narrator::Narrator;
use tokio::process::{Child, Command};

/// Speaks story text by spawning the platform speech command, `say` on
/// macOS and `espeak` elsewhere.
///
/// Holds at most one child process; starting a new utterance kills the
/// previous one first. On hosts without a speech command every call
/// silently does nothing.
pub struct SpeechNarrator {
    current: Mutex<Option<Child>>,
}

impl Default for SpeechNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechNarrator {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn kill_current(&self, current: &mut Option<Child>) {
        if let Some(mut child) = current.take() {
            child.start_kill().ok();
        }
    }
}

impl Narrator for SpeechNarrator {
    fn speak(&self, text: &str) {
        let mut current = self.current.lock().unwrap();
        self.kill_current(&mut current);

        let mut command = if cfg!(target_os = "macos") {
            Command::new("say")
        } else {
            let mut command = Command::new("espeak");
            command.args(["-v", "en-us"]);
            command
        };
        let spawned = command
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        match spawned {
            Ok(child) => *current = Some(child),
            Err(err) => trace!("speech is unavailable: {err}"),
        }
    }

    fn cancel(&self) {
        let mut current = self.current.lock().unwrap();
        self.kill_current(&mut current);
    }
}
