mod health_check;
mod waitlist;

pub use health_check::health_check;
pub use waitlist::{handle_join_waitlist, json_error_handler, WaitlistError};
