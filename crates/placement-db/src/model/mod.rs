pub mod message;
pub mod party;
pub mod read_status;
pub mod request;
pub mod room;
pub mod room_file;
