pub mod service;

pub use service::PostLikeService;
