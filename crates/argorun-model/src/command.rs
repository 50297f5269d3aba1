use serde::{Deserialize, Serialize};

/// Container command, given either as a single program or a full argv.
///
/// The manifest always carries a list, so a scalar is normalized on the way
/// in via [`CommandSpec::to_argv`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            CommandSpec::Line(program) => vec![program.clone()],
            CommandSpec::Argv(argv) => argv.clone(),
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(program: &str) -> Self {
        CommandSpec::Line(program.to_string())
    }
}

impl From<Vec<String>> for CommandSpec {
    fn from(argv: Vec<String>) -> Self {
        CommandSpec::Argv(argv)
    }
}
