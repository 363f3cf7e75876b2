// Social domain - users, content and relationships

pub mod service;

pub use service::SocialGraphService;
