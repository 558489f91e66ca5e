//! Application state for HTTP handlers.

use std::sync::Arc;

use rolegraph_domain::{
    CommandDispatcher, DispatcherConfig, GraphService, IntentResolver, KeywordResolver,
};
use rolegraph_storage::GraphStore;

/// State shared by every HTTP handler.
///
/// The graph service is shared with the dispatcher so that direct CRUD calls
/// and natural-language commands serialize on the same write gate.
pub struct AppState<S: GraphStore> {
    pub graph: Arc<GraphService<S>>,
    pub dispatcher: Arc<CommandDispatcher<S>>,
}

impl<S: GraphStore> AppState<S> {
    /// Creates state over `store` with the offline keyword resolver.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_resolver(
            store,
            Arc::new(KeywordResolver::new()),
            DispatcherConfig::default(),
        )
    }

    /// Creates state over `store` with a custom resolver and dispatcher settings.
    pub fn with_resolver(
        store: Arc<S>,
        resolver: Arc<dyn IntentResolver>,
        config: DispatcherConfig,
    ) -> Self {
        let graph = Arc::new(GraphService::new(store));
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&graph), resolver, config));
        Self { graph, dispatcher }
    }
}

impl<S: GraphStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}
