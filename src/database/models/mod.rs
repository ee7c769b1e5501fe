pub mod ban;
pub mod follow;
pub mod like;
pub mod media;
pub mod mention;
pub mod message;
pub mod post;
pub mod report;
pub mod tag;
pub mod user;

pub use ban::Ban;
pub use follow::{Follow, FollowRequestView};
pub use like::Like;
pub use media::Media;
pub use mention::Mention;
pub use message::{ConversationView, Message};
pub use post::{Post, PostView};
pub use report::{Report, ReportView};
pub use tag::{Tag, TagCount};
pub use user::{NewUser, User, UserSummary, ROLE_ADMIN, ROLE_USER};
