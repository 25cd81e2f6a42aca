use crate::access::Identity;
use crate::config::ReportConfig;
use crate::store::SubmissionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ReportConfig>,
    pub store: Arc<dyn SubmissionStore>,
    pub identity: Arc<dyn Identity>,
}

impl AppState {
    pub fn new(
        config: ReportConfig,
        store: Arc<dyn SubmissionStore>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            identity,
        }
    }
}
