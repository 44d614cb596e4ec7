pub mod booking;
pub mod event;
pub mod user;

pub use booking::Booking;
pub use event::Event;
pub use user::{PublicUser, Role, User};
