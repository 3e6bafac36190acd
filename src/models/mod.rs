mod photo;
mod session;
mod study_log;
mod user;

pub use photo::Photo;
pub use session::Session;
pub use study_log::{LogAuthor, NewStudyLog, RecentLog, StudyLog, DATE_FORMAT};
pub use user::{default_name, normalize_email, ChallengeUser};
