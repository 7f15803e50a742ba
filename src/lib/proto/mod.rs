//! Hub wire contract (`dcmgr.v1`).

#[allow(clippy::all)]
mod generated {
    include!("generated/dcmgr.v1.rs");
}

pub use generated::dc_streamer_client::DcStreamerClient;
pub use generated::event::OpMessage;
pub use generated::{DataCenter, Event, Operation, Task, TaskFeedback, TaskStatus};

impl Event {
    /// Registration / keep-alive frame carrying the data center identity.
    pub fn heartbeat(name: impl Into<String>, report: impl Into<String>) -> Self {
        Event {
            event_type: Operation::Heartbeat as i32,
            op_message: Some(OpMessage::DataCenter(DataCenter {
                name: name.into(),
                report: report.into(),
            })),
        }
    }

    pub fn task(operation: Operation, task: Task) -> Self {
        Event {
            event_type: operation as i32,
            op_message: Some(OpMessage::Task(task)),
        }
    }

    /// Feedback frame echoing the ids of `task`.
    pub fn feedback(operation: Operation, task: &Task, report: impl Into<String>) -> Self {
        Event {
            event_type: operation as i32,
            op_message: Some(OpMessage::TaskFeedback(TaskFeedback {
                task_id: task.id.clone(),
                url: task.url.clone(),
                data_center_id: task.data_center_id.clone(),
                report: report.into(),
            })),
        }
    }

    /// The operation, or `None` for values this agent does not know.
    pub fn operation(&self) -> Option<Operation> {
        Operation::try_from(self.event_type).ok()
    }

    pub fn task_payload(&self) -> Option<&Task> {
        match &self.op_message {
            Some(OpMessage::Task(task)) => Some(task),
            _ => None,
        }
    }
}
