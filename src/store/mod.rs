pub mod link;

pub use link::{AnswerOutcome, LinkStore, RedisLinkStore};
