pub mod moderation_service;
pub mod notification_service;
