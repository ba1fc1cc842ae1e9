pub mod new_signup;
pub mod waitlist_email;
pub mod waitlist_entry;
