pub mod events;
pub mod invitations;
pub mod lottery;
pub mod notifications;
pub mod users;
pub mod waitlist;
