use serde::{Deserialize, Serialize};

/// Top-level menu entries. A menu command always wins over whatever flow
/// the session was in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuCommand {
    PunchIn,
    PunchOut,
    List,
    Edit,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 4] =
        [MenuCommand::PunchIn, MenuCommand::PunchOut, MenuCommand::List, MenuCommand::Edit];

    pub fn label(&self) -> &'static str {
        match self {
            Self::PunchIn => "Punch in",
            Self::PunchOut => "Punch out",
            Self::List => "List",
            Self::Edit => "Edit",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL.into_iter().find(|command| command.label().eq_ignore_ascii_case(&normalized))
    }
}
