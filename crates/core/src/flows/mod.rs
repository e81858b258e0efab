pub mod menu;
pub mod states;

pub use menu::MenuCommand;
pub use states::{ConversationState, EditStep, ListStep};
