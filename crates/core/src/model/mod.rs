mod ids;
mod progress;
pub mod registration;
mod session;
mod tutorial;
mod user;
mod validation;
mod wire;

pub use ids::{ParseIdError, TutorialId, UserId};
pub use progress::{Progress, ProgressError, ProgressIndex, ProgressStatus, TutorialRef};
pub use registration::{Credentials, Registration, RegistrationForm};
pub use session::{AuthToken, Session};
pub use tutorial::{
    Category, Difficulty, Material, NewTutorial, Step, Tutorial, TutorialDraft, TutorialError,
    TutorialPatch,
};
pub use user::{Address, Role, SkillLevel, User, UserError, UserPatch, UserProfile};
pub use validation::ValidationErrors;
