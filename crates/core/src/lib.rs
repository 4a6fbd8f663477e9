//! Domain layer of the tutorial client: wire types, the catalog query
//! engine, the step walkthrough state machine and admin editing helpers.
//! Nothing here performs I/O.

pub mod catalog;
pub mod error;
pub mod learning;
pub mod media;
pub mod model;
pub mod steps;
pub mod time;
pub mod user_query;
pub mod walkthrough;

pub use catalog::{CatalogQuery, SortKey, TutorialFilter};
pub use error::Error;
pub use learning::{LearningItem, LearningOverview};
pub use media::{MediaHost, MediaKind};
pub use steps::{StepDraft, StepList};
pub use time::Clock;
pub use user_query::UserQuery;
pub use walkthrough::{PendingSave, Walkthrough, WalkthroughPhase};
