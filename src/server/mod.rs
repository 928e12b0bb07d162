pub mod handlers;
pub mod protocol;
pub mod router;
