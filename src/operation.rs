use crate::{KvsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The command word of an [`Operation`], matched case-insensitively.
///
/// Unrecognized words are kept as `Other` so that parsing never fails on the
/// command name alone; the engine answers them with `"invalid command"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Command {
    /// Read the value of a key.
    Get,
    /// Insert or overwrite a key.
    Set,
    /// Remove a key.
    Delete,
    /// Dump the whole key space.
    Show,
    /// Any other word, as received.
    Other(String),
}

impl Command {
    /// The name written to the log and to the canonical form.
    pub fn as_str(&self) -> &str {
        match self {
            Command::Get => "get",
            Command::Set => "set",
            Command::Delete => "delete",
            Command::Show => "show",
            Command::Other(name) => name,
        }
    }

    /// Whether executing this command can change the key space.
    pub fn is_mutating(&self) -> bool {
        match self {
            Command::Set | Command::Delete => true,
            Command::Get | Command::Show | Command::Other(_) => false,
        }
    }
}

impl From<String> for Command {
    fn from(name: String) -> Command {
        match name.to_lowercase().as_str() {
            "get" => Command::Get,
            "set" => Command::Set,
            "delete" => Command::Delete,
            "show" => Command::Show,
            _ => Command::Other(name),
        }
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Command {
        Command::from(name.to_owned())
    }
}

impl From<Command> for String {
    fn from(command: Command) -> String {
        match command {
            Command::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed client command: a command word with an optional key and value.
///
/// Serialized as one JSON object per log line:
///
/// ```text
/// {"command":"set","key":"foo","value":"bar"}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// The command word.
    pub command: Command,
    /// Key the command acts on, if any.
    pub key: Option<String>,
    /// Value for `set`, if any.
    pub value: Option<String>,
}

impl Operation {
    /// Builds an operation from its parts.
    pub fn new(command: impl Into<Command>, key: Option<String>, value: Option<String>) -> Self {
        Operation {
            command: command.into(),
            key,
            value,
        }
    }

    /// Parses request text of the form `<command> [<key>] [<value>]`.
    ///
    /// Tokens are separated by single spaces, so consecutive spaces produce
    /// empty tokens.
    ///
    /// # Errors
    ///
    /// Returns `KvsError::MalformedOperation` for more than three tokens.
    pub fn parse(text: &str) -> Result<Operation> {
        let tokens: Vec<&str> = text.split(' ').collect();
        let (command, key, value) = match tokens.as_slice() {
            [command] => (*command, None, None),
            [command, key] => (*command, Some(*key), None),
            [command, key, value] => (*command, Some(*key), Some(*value)),
            _ => return Err(KvsError::MalformedOperation(text.to_owned())),
        };
        Ok(Operation::new(
            command,
            key.map(str::to_owned),
            value.map(str::to_owned),
        ))
    }

    /// Renders the request text a client sends for this operation.
    ///
    /// # Errors
    ///
    /// Returns `KvsError::MalformedOperation` when the text would not parse
    /// back into the same operation: a token containing a space, or a value
    /// without a key.
    pub fn to_request(&self) -> Result<String> {
        let mut request = self.command.to_string();
        let tokens = [Some(&request), self.key.as_ref(), self.value.as_ref()];
        if tokens.iter().flatten().any(|token| token.contains(' '))
            || (self.key.is_none() && self.value.is_some())
        {
            return Err(KvsError::MalformedOperation(self.to_string()));
        }
        for token in self.key.iter().chain(self.value.iter()) {
            request.push(' ');
            request.push_str(token);
        }
        Ok(request)
    }
}

impl FromStr for Operation {
    type Err = KvsError;

    fn from_str(s: &str) -> Result<Operation> {
        Operation::parse(s)
    }
}

// Canonical form used in diagnostics: `command:key=value`.
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key, &self.value) {
            (Some(key), Some(value)) => write!(f, "{}:{}={}", self.command, key, value),
            (Some(key), None) => write!(f, "{}:{}", self.command, key),
            _ => write!(f, "{}", self.command),
        }
    }
}

/// Conversion of raw requests into an [`Operation`].
pub trait IntoOperation {
    /// Parses or passes through `self`.
    fn into_operation(self) -> Result<Operation>;
}

impl IntoOperation for Operation {
    fn into_operation(self) -> Result<Operation> {
        Ok(self)
    }
}

impl IntoOperation for &str {
    fn into_operation(self) -> Result<Operation> {
        Operation::parse(self)
    }
}

impl IntoOperation for String {
    fn into_operation(self) -> Result<Operation> {
        Operation::parse(&self)
    }
}

impl IntoOperation for &[u8] {
    fn into_operation(self) -> Result<Operation> {
        String::from_utf8(self.to_vec())?.into_operation()
    }
}

impl IntoOperation for Vec<u8> {
    fn into_operation(self) -> Result<Operation> {
        String::from_utf8(self)?.into_operation()
    }
}
