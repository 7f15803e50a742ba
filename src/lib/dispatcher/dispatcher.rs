use std::sync::Arc;

use tracing::{debug, info, warn};

use super::types::Dispatcher;
use crate::lib::hub::handoff::HandoffReceiver;
use crate::lib::hub::types::{Inbound, Registration};
use crate::lib::orchestrator::types::{Orchestrator, OrchestratorError};
use crate::lib::proto::{Event, Operation, Task};
use crate::lib::tasks::manifest::split_images;
use crate::lib::tasks::state::{failure_of, optimistic_status};
use crate::lib::tasks::types::UpdateParams;

impl Dispatcher {
    pub fn new(orchestrator: Arc<Orchestrator>, dc_name: &str, update_params: UpdateParams) -> Self {
        Dispatcher {
            registration: Registration::new(dc_name, orchestrator.clone()),
            orchestrator,
            update_params,
        }
    }

    /// Handles one event and returns the frame to send back, if any.
    /// Task failures end up in the feedback report and never escape.
    pub async fn process(&self, event: Event) -> Option<Event> {
        let Some(operation) = event.operation() else {
            warn!("skip event with unknown type {}", event.event_type);
            return None;
        };
        let Some(optimistic) = optimistic_status(operation) else {
            debug!("heartbeat from hub, re-registering");
            return Some(self.registration.frame().await);
        };

        let Some(task) = event.task_payload() else {
            warn!("{} event without task payload", operation.as_str_name());
            let report = format!("{} event carries no task", operation.as_str_name());
            return Some(Event::feedback(operation, &Task::default(), report));
        };
        let mut task = task.clone();
        task.set_status(optimistic);

        let report = match self.execute(operation, &task).await {
            Ok(()) => String::new(),
            Err(err) => {
                task.set_status(failure_of(optimistic));
                err.to_string()
            }
        };
        debug!(
            "task {} ({}) {}",
            task.name,
            task.id,
            task.status().as_str_name()
        );

        Some(Event::feedback(operation, &task, report))
    }

    async fn execute(&self, operation: Operation, task: &Task) -> Result<(), OrchestratorError> {
        match operation {
            Operation::TaskCreate => {
                self.orchestrator
                    .apply(&task.name, &split_images(&task.image))
                    .await
            }
            Operation::TaskUpdate => {
                self.orchestrator
                    .update(&task.name, &task.image, self.update_params)
                    .await
            }
            Operation::TaskCancel => self.orchestrator.cancel(&task.name).await,
            Operation::Heartbeat => Ok(()),
        }
    }

    /// Pulls events off the hand-off until the stream client goes away.
    pub async fn run(self, mut handoff: HandoffReceiver<Inbound>) {
        info!("task dispatcher started");
        while let Some(Inbound { event, sink }) = handoff.recv().await {
            if let Some(reply) = self.process(event).await {
                // a dead connection only loses this frame
                let _ = sink.send(reply).await;
            }
        }
        info!("task dispatcher stopped");
    }
}
