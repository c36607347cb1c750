use crate::events::ChannelPublisher;
use crate::search::SimilaritySearch;
use crate::vectordb::EmbeddingStore;

/// Shared state for every route.
pub struct HandlerState<V> {
    /// Read path over stored embeddings.
    pub search: SimilaritySearch<V>,

    /// Feeds pushed events into the consumer's subscription.
    pub publisher: ChannelPublisher,
}

impl<V> Clone for HandlerState<V> {
    fn clone(&self) -> Self {
        Self {
            search: self.search.clone(),
            publisher: self.publisher.clone(),
        }
    }
}

impl<V: EmbeddingStore + 'static> HandlerState<V> {
    pub fn new(search: SimilaritySearch<V>, publisher: ChannelPublisher) -> Self {
        Self { search, publisher }
    }
}
