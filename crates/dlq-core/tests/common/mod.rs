#![allow(dead_code)]

use std::collections::HashMap;

use dlq::{MockQueueBackend, QueueAttributes};

pub const ACCOUNT_URL: &str = "https://sqs.us-east-1.amazonaws.com/000000000000";

/// A backend that enumerates `queues` in the given order and answers
/// attribute requests from the same table.
pub fn scripted_backend(queues: Vec<(String, QueueAttributes)>) -> MockQueueBackend {
    let urls: Vec<String> = queues.iter().map(|(url, _)| url.clone()).collect();
    let attributes: HashMap<String, QueueAttributes> = queues.into_iter().collect();

    let mut backend = MockQueueBackend::new();
    backend
        .expect_list_queues()
        .times(1)
        .returning(move || Ok(urls.clone()));
    backend
        .expect_get_queue_attributes()
        .returning(move |queue_url| Ok(attributes.get(queue_url).cloned().unwrap_or_default()));
    backend
}

pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(future)
}
