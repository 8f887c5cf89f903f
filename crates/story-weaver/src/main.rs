//! A terminal client for collaborative interactive fiction.

#[macro_use]
extern crate tracing;

mod speech;

use std::env;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use story_weaver_core::session::UserInput;
use story_weaver_core::store::SessionStore;
use story_weaver_core::{SessionSnapshot, Status, StoryControllerBuilder};
use story_weaver_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use story_weaver_model::{Author, ImageData};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::{sleep, timeout};

const BAR_CHAR: &str = "▎";

enum Command {
    Text(String),
    Image(PathBuf),
    Choice(usize),
    Retry,
    New,
    Quit,
    Help,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("GEMINI_API_KEY") else {
        eprintln!("GEMINI_API_KEY environment variable is not set");
        return;
    };
    let mut config = GeminiConfigBuilder::with_api_key(api_key);
    if let Ok(model) = env::var("GEMINI_MODEL") {
        config = config.with_model(model);
    }
    if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    let provider = GeminiProvider::new(config.build());

    let session_path = env::var("STORY_WEAVER_SESSION")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".story-weaver/session.json"));
    let store = SessionStore::new(session_path);

    let controller = StoryControllerBuilder::new(provider, store)
        .with_narrator(speech::SpeechNarrator::new())
        .build();
    let mut snapshots = controller.subscribe();

    // The controller publishes once after restoring the persisted
    // session; wait for that before rendering anything.
    timeout(Duration::from_secs(1), snapshots.changed()).await.ok();

    println!("{}", "Story Weaver".bold());
    println!(
        "Type your next move, or: /image <path>, /choice 1|2, /retry, /new, \
         /quit"
    );

    let mut rendered_turns = 0;
    {
        let snapshot = snapshots.borrow_and_update().clone();
        if !snapshot.history.is_empty() {
            println!("(continuing your saved story)");
        }
        rendered_turns = render_new_turns(&snapshot, rendered_turns);
        render_prompt_state(&snapshot);
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Command::Quit => break,
            Command::Help => {
                println!(
                    "Commands: /image <path>, /choice 1|2, /retry, /new, \
                     /quit. Anything else continues the story."
                );
                continue;
            }
            Command::New => controller.reset(),
            Command::Retry => controller.retry(),
            Command::Choice(idx) => {
                let choice = snapshots
                    .borrow()
                    .choices
                    .as_ref()
                    .map(|choices| choices[idx].clone());
                let Some(choice) = choice else {
                    println!("There are no choices to pick right now.");
                    continue;
                };
                controller.submit(UserInput::text(choice));
            }
            Command::Image(path) => match load_image(&path) {
                Ok(image) => controller.submit(UserInput::with_image(
                    "I added a new scene from an image.",
                    image,
                )),
                Err(err) => {
                    // A bad file never reaches the session.
                    eprintln!("{}", err.red());
                    continue;
                }
            },
            Command::Text(text) => {
                controller.submit(UserInput::text(text));
            }
        }

        let mut progress_bar: Option<ProgressBar> = None;
        loop {
            let Some(snapshot) = next_snapshot(&mut snapshots).await else {
                break 'outer;
            };
            let busy = matches!(
                snapshot.status,
                Status::Submitting | Status::Retrying
            );
            if !busy {
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
                rendered_turns = render_new_turns(&snapshot, rendered_turns);
                render_prompt_state(&snapshot);
                break;
            }

            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("✍️  Weaving the story...");
                    progress_bar
                })
                .inc(1);
        }
    }
}

/// Waits for the next session change, or ticks after 100ms so the
/// spinner keeps animating.
///
/// The wait always precedes the read: the controller runs on the same
/// current-thread runtime, so a just-dispatched command has not been
/// applied yet and the watch channel still holds the pre-command
/// snapshot. The tick also bounds the wait, since an ignored command
/// (such as a retry while nothing failed) publishes nothing at all.
///
/// Returns `None` when the controller task is gone.
async fn next_snapshot(
    snapshots: &mut tokio::sync::watch::Receiver<SessionSnapshot>,
) -> Option<SessionSnapshot> {
    select! {
        changed = snapshots.changed() => {
            changed.ok()?;
        }
        _ = sleep(Duration::from_millis(100)) => {}
    }
    Some(snapshots.borrow_and_update().clone())
}

fn parse_command(line: &str) -> Command {
    // The command word ends at the first whitespace, so a run-on typo
    // like `/choice1` is help, not a choice.
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    match name {
        "/image" if !rest.is_empty() => Command::Image(PathBuf::from(rest)),
        "/choice" => match rest {
            "1" => Command::Choice(0),
            "2" => Command::Choice(1),
            _ => Command::Help,
        },
        "/retry" if rest.is_empty() => Command::Retry,
        "/new" if rest.is_empty() => Command::New,
        "/quit" | "/exit" if rest.is_empty() => Command::Quit,
        _ if line.starts_with('/') => Command::Help,
        _ => Command::Text(line.to_owned()),
    }
}

fn load_image(path: &Path) -> Result<ImageData, String> {
    let mime_type = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => {
            return Err(
                "unsupported image type (expected png, jpg, gif or webp)"
                    .to_owned(),
            );
        }
    };
    let bytes = std::fs::read(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    Ok(ImageData {
        mime_type: mime_type.to_owned(),
        data: BASE64.encode(bytes),
    })
}

fn render_new_turns(snapshot: &SessionSnapshot, rendered: usize) -> usize {
    let mut rendered = rendered;
    if snapshot.history.len() < rendered {
        // The story was reset.
        println!("{}", "A blank page awaits your next story.".dimmed());
        rendered = 0;
    }
    for turn in &snapshot.history[rendered..] {
        match turn.author {
            Author::User => {
                let text = turn.text.as_deref().unwrap_or("[image]");
                println!("{}🧑 {}", BAR_CHAR.bright_green(), text);
            }
            Author::Ai => {
                let text = turn.text.as_deref().unwrap_or_default();
                println!(
                    "{}🤖 {}",
                    BAR_CHAR.bright_cyan(),
                    text.bright_white()
                );
            }
        }
    }
    snapshot.history.len()
}

fn render_prompt_state(snapshot: &SessionSnapshot) {
    if let Some(error) = &snapshot.error {
        println!("{}", error.red());
        if snapshot.can_retry {
            println!("{}", "Type /retry to try again.".dimmed());
        }
        return;
    }
    if let Some([first, second]) = &snapshot.choices {
        println!("  1) {first}");
        println!("  2) {second}");
        println!(
            "{}",
            "Pick with /choice 1 or /choice 2, or write your own.".dimmed()
        );
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use story_weaver_test_model::{PresetBeat, TestStoryProvider};

    use super::*;

    #[test]
    fn test_parse_command() {
        assert!(matches!(parse_command("/choice 1"), Command::Choice(0)));
        assert!(matches!(parse_command("/choice 2"), Command::Choice(1)));
        assert!(matches!(parse_command("/choice 3"), Command::Help));
        assert!(matches!(parse_command("/retry"), Command::Retry));
        assert!(matches!(parse_command("/new"), Command::New));
        assert!(matches!(parse_command("/unknown"), Command::Help));
        assert!(matches!(parse_command("run away"), Command::Text(_)));
        assert!(matches!(
            parse_command("/image scene.png"),
            Command::Image(_)
        ));
    }

    #[test]
    fn test_parse_command_rejects_run_on_words() {
        assert!(matches!(parse_command("/choice1"), Command::Help));
        assert!(matches!(parse_command("/imagescene.png"), Command::Help));
        assert!(matches!(parse_command("/image"), Command::Help));
        assert!(matches!(parse_command("/retrying"), Command::Help));
        assert!(matches!(parse_command("/retry now"), Command::Help));
        assert!(matches!(parse_command("/newest"), Command::Help));
    }

    #[test]
    fn test_load_image_rejects_unknown_extension() {
        assert!(load_image(Path::new("notes.txt")).is_err());
    }

    #[test]
    fn test_load_image_reports_unreadable_file() {
        let err = load_image(Path::new("missing.png")).unwrap_err();
        assert!(err.contains("missing.png"));
    }

    fn scripted_controller(
        dir: &tempfile::TempDir,
        provider: TestStoryProvider,
    ) -> story_weaver_core::StoryController {
        StoryControllerBuilder::new(
            provider,
            SessionStore::new(dir.path().join("session.json")),
        )
        .build()
    }

    // The controller shares the current-thread runtime with the render
    // loop, so reading the watch channel without awaiting first would
    // observe the pre-command snapshot and skip straight back to the
    // prompt.
    #[tokio::test]
    async fn test_next_snapshot_observes_dispatched_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = TestStoryProvider::default();
        provider.add_beat(PresetBeat::new("S1", "C1", "C2"));
        provider.set_delay(Duration::from_millis(50));

        let controller = scripted_controller(&dir, provider);
        let mut snapshots = controller.subscribe();
        // Consume the startup publish.
        next_snapshot(&mut snapshots).await.unwrap();

        controller.submit(UserInput::text("Hello"));
        timeout(Duration::from_millis(500), async {
            loop {
                let snapshot = next_snapshot(&mut snapshots).await.unwrap();
                if snapshot.status == Status::Submitting {
                    break;
                }
                assert_eq!(snapshot.status, Status::Idle);
            }
        })
        .await
        .expect("the in-flight state was never observed");

        let settled = timeout(Duration::from_secs(1), async {
            loop {
                let snapshot = next_snapshot(&mut snapshots).await.unwrap();
                if snapshot.status == Status::Idle {
                    break snapshot;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(settled.history.len(), 2);
        assert_eq!(settled.history[1].text.as_deref(), Some("S1"));
    }

    #[tokio::test]
    async fn test_next_snapshot_ticks_when_a_command_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let controller =
            scripted_controller(&dir, TestStoryProvider::default());
        let mut snapshots = controller.subscribe();
        next_snapshot(&mut snapshots).await.unwrap();

        // A retry with nothing to retry publishes no snapshot; the
        // tick must still hand back the unchanged state.
        controller.retry();
        let snapshot = timeout(
            Duration::from_millis(500),
            next_snapshot(&mut snapshots),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(snapshot.status, Status::Idle);
        assert!(snapshot.history.is_empty());
    }
}
