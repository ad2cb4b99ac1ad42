mod note;
mod session;
mod user;

pub use note::{Note, NoteDraft, NoteId, MAX_SLUG_LENGTH, MAX_TITLE_LENGTH};
pub use session::Session;
pub use user::{hash_password, verify_password, User, UserId};
