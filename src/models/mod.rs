pub mod dates;
pub mod ids;
pub mod meeting;
pub mod message;
pub mod notification;
pub mod roadmap;
pub mod user;
