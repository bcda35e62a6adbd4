pub mod link;
pub mod notification;
