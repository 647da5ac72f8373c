mod progress;
mod report_task;
mod task_status;
mod traits;

pub use progress::{TaskProgress, TaskProgressBar, TaskProgressState};
pub use report_task::ReportTask;
pub use task_status::TaskStatus;
pub use traits::Task;
