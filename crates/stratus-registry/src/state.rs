use std::sync::Arc;

use stratus_resolver::VersionResolver;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<VersionResolver>,
}
