//! Service layer
//!
//! Business logic on top of the local store and the backend client.
//! Services hold `Arc` handles and are cheap to build per operation.

mod account;
mod compose;
mod feed;
mod social;
mod sync;

pub use account::AccountService;
pub use compose::{ComposeOutcome, ComposeRequest, PostComposer};
pub use feed::{Feed, FeedLoader, FeedSource};
pub use social::SocialService;
pub use sync::{FailedUpload, SyncCoordinator, SyncReport, SyncStatus};
