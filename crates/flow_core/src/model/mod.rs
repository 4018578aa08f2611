mod note;
mod session;
mod task;

pub use note::Note;
pub use session::PomodoroSession;
pub use task::{Priority, Task};
