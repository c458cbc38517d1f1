//! Reading and parsing of what the user types at the prompt.

use std::path::PathBuf;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Reads prompt input line by line.
///
/// Keep one reader for the whole session: lines that arrive together, as
/// when pasting or piping, wait in its buffer until they are asked for.
pub struct LineReader<R> {
    inner: R,
}

impl LineReader<BufReader<Stdin>> {
    /// Creates a reader over the standard input.
    #[inline]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Creates a reader over `inner`.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the next line, including its line break, or `None` at the end
    /// of input or on a read error.
    pub async fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.inner.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(err) => {
                error!("error reading input: {}", err);
                None
            }
        }
    }
}

/// One line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Nothing but whitespace.
    Empty,
    /// Free text to send to the assistant.
    Message(String),
    /// `/reset`
    Reset,
    /// `/save [dir]`
    Save(Option<PathBuf>),
    /// `/export`
    Export,
    /// `/load <path>`
    Load(PathBuf),
    /// `/key <credential>`, or `/key` alone to clear it.
    Key(Option<String>),
    /// `/topic`
    Topic,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// A command that is unknown or misses its argument.
    Invalid(String),
}

/// Summary of the commands, shown by `/help`.
pub const HELP: &str = "\
/reset          start a new conversation
/save [dir]     save the conversation as a chat log
/export         print the chat log without saving it
/load <path>    replace the conversation with a saved chat log
/key <key>      set the API key (without a key: clear it)
/topic          show the topic of the conversation
/quit           leave";

impl Input {
    /// Parses a line as typed, including its line break.
    ///
    /// Only lines starting with `/` are commands. Message text is kept
    /// as typed apart from the line break.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Input::Empty;
        }
        let Some(command) = line.trim_start().strip_prefix('/') else {
            return Input::Message(line.to_owned());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (command, None),
        };
        match (name, arg) {
            ("reset", None) => Input::Reset,
            ("save", dir) => Input::Save(dir.map(PathBuf::from)),
            ("export", None) => Input::Export,
            ("load", Some(path)) => Input::Load(PathBuf::from(path)),
            ("key", key) => Input::Key(key.map(str::to_owned)),
            ("topic", None) => Input::Topic,
            ("help", None) => Input::Help,
            ("quit" | "exit", None) => Input::Quit,
            _ => Input::Invalid(line.trim().to_owned()),
        }
    }
}
