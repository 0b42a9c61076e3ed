mod handler;
mod model;

pub use handler::{delete_message, get_message, list_messages, post_message};
pub use model::{ListMessagesQuery, PostMessageRequest};
