use crate::lib::proto::{Operation, TaskStatus};

/// Status reported for a task command before the platform has answered.
/// Heartbeats carry no task.
pub fn optimistic_status(operation: Operation) -> Option<TaskStatus> {
    match operation {
        Operation::Heartbeat => None,
        Operation::TaskCreate => Some(TaskStatus::Running),
        Operation::TaskUpdate => Some(TaskStatus::UpdateSuccess),
        Operation::TaskCancel => Some(TaskStatus::Cancelled),
    }
}

/// Failure value an optimistic status is corrected to when the platform call fails.
pub fn failure_of(status: TaskStatus) -> TaskStatus {
    match status {
        TaskStatus::Running => TaskStatus::StartFailed,
        TaskStatus::UpdateSuccess => TaskStatus::UpdateFailed,
        TaskStatus::Cancelled => TaskStatus::CancelFailed,
        failed => failed,
    }
}
