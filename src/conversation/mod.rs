// Conversation store
//
// Holds, per chat session, the active context and a bounded history of turns.

mod history;
mod store;

pub use history::{ConversationHistory, Role, Turn};
pub use store::{SessionHandle, SessionSnapshot, SessionStore};
