use std::sync::Arc;

use crate::lib::hub::types::Registration;
use crate::lib::orchestrator::types::Orchestrator;
use crate::lib::tasks::types::UpdateParams;

/// Applies hub commands one at a time and answers each with feedback.
pub struct Dispatcher {
    pub(super) orchestrator: Arc<Orchestrator>,
    pub(super) registration: Registration,
    pub(super) update_params: UpdateParams,
}
