pub mod extractor;
pub mod flusher;
pub mod http_dispatcher;
pub mod pipeline;
pub mod request_builder;
pub mod resolver;
pub mod spec_loader;
pub mod summary;
pub mod synthesizer;
