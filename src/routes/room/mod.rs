mod handler;
mod model;

pub use handler::{create_room, join_room, leave_room, list_rooms};
pub use model::CreateRoomRequest;
