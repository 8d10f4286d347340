mod cache;
mod entity;
mod queue;
mod review;
mod token;

pub use cache::CacheCommands;
pub use entity::EntityCommands;
pub use queue::QueueCommands;
pub use review::ReviewCommands;
pub use token::TokenCommands;
