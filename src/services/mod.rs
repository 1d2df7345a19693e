pub mod board;
pub mod cache;
pub mod lifecycle;
pub mod matcher;
pub mod reconcile;
pub mod subscription;

pub use board::{AiringDay, Dashboard, TaskBoard};
pub use cache::MetadataCache;
pub use lifecycle::LifecycleService;
pub use reconcile::{Reconciler, SyncReport};
pub use subscription::SubscriptionManager;
