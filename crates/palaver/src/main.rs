//! A terminal chat client built on `palaver`.

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use palaver::config::Config;
use palaver::input::{HELP, Input, LineReader};
use palaver_core::timestamp;
use palaver_core::{
    Credential, Error, Message, Role, Session, SessionBuilder, TranscriptEvent,
};
use palaver_openai_model::OpenAIProvider;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let model_provider = OpenAIProvider::new(config.openai_config());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut builder = SessionBuilder::with_model_provider(model_provider)
        .with_max_tokens(config.max_tokens)
        .on_transcript_changed(move |event| {
            event_tx.send(event.clone()).ok();
        });
    match &config.api_key {
        Some(api_key) => builder = builder.with_credential(api_key.clone()),
        None => print_notice(
            "OPENAI_API_KEY is not set. Use /key <key> before chatting.",
        ),
    }
    let session = builder.build();

    // Let the worker come up so the greeting is shown before the prompt.
    session.snapshot().await.ok();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut reader = LineReader::stdin();
    loop {
        render_events(&session, &mut event_rx).await;

        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = reader.next_line().await else {
            break;
        };
        match Input::parse(&line) {
            Input::Empty => {}
            Input::Message(text) => {
                let result = run_turn(&session, text, &progress_style).await;
                render_events(&session, &mut event_rx).await;
                if let Err(err) = result {
                    print_error(&err);
                }
            }
            Input::Reset => {
                if let Err(err) = session.reset().await {
                    print_error(&err);
                }
            }
            Input::Save(dir) => {
                let dir = dir.unwrap_or_else(|| config.save_dir.clone());
                match session.save(dir).await {
                    Ok(path) => print_notice(&format!(
                        "Saved the conversation to {}",
                        path.display()
                    )),
                    Err(err) => print_error(&err),
                }
            }
            Input::Export => match session.export().await {
                Ok(export) => {
                    print_notice(&export.filename);
                    println!("{}", String::from_utf8_lossy(&export.bytes));
                }
                Err(err) => print_error(&err),
            },
            Input::Load(path) => {
                if let Err(err) = session.load(path).await {
                    print_error(&err);
                }
            }
            Input::Key(key) => {
                let credential = key.map(Credential::new);
                let notice = match &credential {
                    Some(_) => "API key updated.",
                    None => "API key cleared.",
                };
                match session.set_credential(credential) {
                    Ok(()) => print_notice(notice),
                    Err(err) => print_error(&err),
                }
            }
            Input::Topic => match session.topic().await {
                Ok(topic) => print_notice(&format!("Topic: {topic}")),
                Err(err) => print_error(&err),
            },
            Input::Help => println!("{}", HELP.dimmed()),
            Input::Quit => break,
            Input::Invalid(command) => print_notice(&format!(
                "Unknown command or missing argument: {command}. Try /help."
            )),
        }
    }

    session.shutdown();
}

/// Runs a turn with a spinner until the reply (or an error) arrives.
async fn run_turn(
    session: &Session,
    text: String,
    progress_style: &ProgressStyle,
) -> Result<Message, Error> {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style.clone());
    progress_bar.set_message("🤔 Thinking...");

    let mut turn = pin!(session.send_message(text));
    let result = loop {
        select! {
            result = &mut turn => break result,
            _ = sleep(Duration::from_millis(100)) => progress_bar.inc(1),
        }
    };

    // Finish the progress bar before printing anything else.
    progress_bar.finish_and_clear();
    result
}

/// Prints the transcript changes reported since the last call.
async fn render_events(
    session: &Session,
    event_rx: &mut mpsc::UnboundedReceiver<TranscriptEvent>,
) {
    while let Ok(event) = event_rx.try_recv() {
        match event {
            TranscriptEvent::Appended(msg) => render_message(&msg),
            TranscriptEvent::Reset(greeting) => {
                print_notice("Started a new conversation.");
                render_message(&greeting);
            }
            TranscriptEvent::Restored { len } => {
                print_notice(&format!("Loaded {len} messages."));
                match session.snapshot().await {
                    Ok(transcript) => {
                        transcript.messages().iter().for_each(render_message)
                    }
                    Err(err) => print_error(&err),
                }
            }
        }
    }
}

fn render_message(msg: &Message) {
    let time = timestamp::to_display(&msg.timestamp());
    match msg.role() {
        Role::Assistant => println!(
            "{}🤖 {} {}",
            BAR_CHAR.bright_cyan(),
            time.dimmed(),
            msg.content().bright_white()
        ),
        Role::User => println!(
            "{}🧑 {} {}",
            BAR_CHAR.bright_magenta(),
            time.dimmed(),
            msg.content()
        ),
    }
}

fn print_notice(notice: &str) {
    println!("{}{}", BAR_CHAR.bright_black(), notice.dimmed());
}

fn print_error(err: &Error) {
    println!("{}⚠️  {}", BAR_CHAR.bright_red(), err.bright_red());
}
