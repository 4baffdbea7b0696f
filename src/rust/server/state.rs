use std::sync::Arc;

use crate::chat::ChatService;
use crate::model::ModelCache;

/// Shared by every handler. The model cache is the only mutable piece and
/// fills itself on the first request that needs it.
#[derive(Clone, Debug)]
pub struct AppState {
    pub models: Arc<ModelCache>,
    pub chat: Arc<ChatService>,
    pub max_upload_mb: usize,
}

impl AppState {
    pub fn new(models: ModelCache, chat: ChatService, max_upload_mb: usize) -> Self {
        Self {
            models: Arc::new(models),
            chat: Arc::new(chat),
            max_upload_mb,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
