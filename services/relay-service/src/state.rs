use std::sync::Arc;

use crate::sink::DataSink;

#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn DataSink>,
}

impl AppState {
    pub fn new(sink: Arc<dyn DataSink>) -> Self {
        Self { sink }
    }
}
