//! Control tags embedded in assistant output.
//!
//! The assistant can ask for side effects by writing directives into its
//! reply:
//!
//! ```text
//! [CMD:cd <path>]     change the working directory
//! [CMD:model <name>]  switch model
//! [CMD:new]           start a fresh session next time
//! [FILE:<path>]       send a local file to the user
//! ```
//!
//! [`tokenize`] turns the reply into a stream of text and tag tokens so
//! that prose merely mentioning brackets is left alone. A tag body ends at
//! the first `]` and may not span lines; an unterminated opener is plain
//! text. Recognised-but-meaningless tags (`[CMD:fly away]`, `[FILE:]`) are
//! still removed from the visible text but carry no action.

use std::path::PathBuf;

const CMD_OPEN: &str = "[CMD:";
const FILE_OPEN: &str = "[FILE:";

/// A side effect requested by the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlTag {
    /// `[CMD:cd <path>]`
    ChangeDirectory(String),
    /// `[CMD:model <name>]`
    ChangeModel(String),
    /// `[CMD:new]`
    StartNewSession,
    /// `[FILE:<path>]`
    SendFile(PathBuf),
}

impl ControlTag {
    /// True for the `[CMD:...]` family.
    pub fn is_command(&self) -> bool {
        !matches!(self, ControlTag::SendFile(_))
    }
}

/// One lexed piece of assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Visible text.
    Text(&'a str),
    /// A well-formed directive.
    Tag(ControlTag),
    /// A bracketed directive with no meaning; removed, never acted on.
    Ignored(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Command,
    File,
}

impl TagKind {
    fn opener(self) -> &'static str {
        match self {
            TagKind::Command => CMD_OPEN,
            TagKind::File => FILE_OPEN,
        }
    }

    fn token(self, body: &str) -> Token<'_> {
        match self {
            TagKind::Command => command_token(body),
            TagKind::File => {
                let path = body.trim();
                if path.is_empty() {
                    Token::Ignored(body)
                } else {
                    Token::Tag(ControlTag::SendFile(PathBuf::from(path)))
                }
            }
        }
    }
}

fn command_token(body: &str) -> Token<'_> {
    let body_trimmed = body.trim();
    let (action, arg) = match body_trimmed.split_once(char::is_whitespace) {
        Some((action, arg)) => (action, arg.trim()),
        None => (body_trimmed, ""),
    };

    match (action, arg) {
        ("cd", path) if !path.is_empty() => Token::Tag(ControlTag::ChangeDirectory(path.to_string())),
        ("model", name) if !name.is_empty() => Token::Tag(ControlTag::ChangeModel(name.to_string())),
        ("new", _) => Token::Tag(ControlTag::StartNewSession),
        _ => Token::Ignored(body),
    }
}

fn next_opener(input: &str, from: usize) -> Option<(usize, TagKind)> {
    let hay = &input[from..];
    let cmd = hay.find(CMD_OPEN).map(|i| (from + i, TagKind::Command));
    let file = hay.find(FILE_OPEN).map(|i| (from + i, TagKind::File));
    match (cmd, file) {
        (Some(c), Some(f)) => Some(if c.0 <= f.0 { c } else { f }),
        (c, f) => c.or(f),
    }
}

/// Lex assistant output into text and tag tokens.
///
/// A `[FILE:...]` tag also consumes the whitespace directly after it.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut scan = 0;

    while let Some((start, kind)) = next_opener(input, scan) {
        let body_start = start + kind.opener().len();
        let end = input[body_start..]
            .find([']', '\n'])
            .map(|i| body_start + i);

        let Some(end) = end.filter(|&e| input.as_bytes()[e] == b']') else {
            // Unterminated or spans a line: plain text
            scan = body_start;
            continue;
        };

        if start > text_start {
            tokens.push(Token::Text(&input[text_start..start]));
        }
        tokens.push(kind.token(&input[body_start..end]));

        let mut after = end + 1;
        if kind == TagKind::File {
            let rest = &input[after..];
            after += rest.len() - rest.trim_start().len();
        }
        text_start = after;
        scan = after;
    }

    if text_start < input.len() {
        tokens.push(Token::Text(&input[text_start..]));
    }
    tokens
}

/// Assistant output with its directives separated out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Text to show the user, tags removed, trimmed.
    pub visible: String,
    /// The first command tag, if any. Later ones are dropped.
    pub command: Option<ControlTag>,
    /// Files to send, in order of appearance.
    pub files: Vec<PathBuf>,
}

/// Split assistant output into visible text, one command and file sends.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();
    let mut visible = String::with_capacity(raw.len());

    for token in tokenize(raw) {
        match token {
            Token::Text(text) => visible.push_str(text),
            Token::Tag(ControlTag::SendFile(path)) => parsed.files.push(path),
            Token::Tag(tag) => {
                if parsed.command.is_none() {
                    parsed.command = Some(tag);
                }
            }
            Token::Ignored(_) => {}
        }
    }

    parsed.visible = visible.trim().to_string();
    parsed
}
