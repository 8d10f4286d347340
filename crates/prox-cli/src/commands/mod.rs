pub mod cache;
pub mod discover;
pub mod dispatch;
pub mod entity;
pub mod geocode;
pub mod isochrone;
pub mod nearby;
pub mod process;
pub mod queue;
pub mod review;
pub mod serve;
pub mod shared;
pub mod token;
