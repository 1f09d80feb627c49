use std::collections::VecDeque;

use async_trait::async_trait;
use courier_core::{BoxError, HttpRequest, HttpResponse, NetworkError, Transport};
use parking_lot::Mutex;
use thiserror::Error;

use crate::stub::Stub;

#[derive(Debug, Error)]
#[error("no stub left in queue for request: {url}")]
pub struct QueueExhausted {
    pub url: String,
}

#[derive(Default)]
struct Queue {
    stubs: VecDeque<Stub>,
    calls: Vec<usize>,
}

/// Transport that answers from a FIFO queue of stubs.
///
/// Each call consumes the head of the queue; an empty queue fails with
/// `NetworkError::Transport(QueueExhausted)`. Calls are numbered from 1 in
/// arrival order, whether or not a stub was left.
#[derive(Default)]
pub struct SequencedMockTransport {
    queue: Mutex<Queue>,
}

impl SequencedMockTransport {
    pub fn new(stubs: impl IntoIterator<Item = Stub>) -> Self {
        Self {
            queue: Mutex::new(Queue {
                stubs: stubs.into_iter().collect(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn enqueue(&self, stub: Stub) {
        self.queue.lock().stubs.push_back(stub);
    }

    /// 1-based attempt numbers recorded so far.
    pub fn calls(&self) -> Vec<usize> {
        self.queue.lock().calls.clone()
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().stubs.len()
    }
}

#[async_trait]
impl Transport for SequencedMockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let stub = {
            let mut queue = self.queue.lock();
            let attempt = queue.calls.len() + 1;
            queue.calls.push(attempt);
            queue.stubs.pop_front()
        };
        match stub {
            Some(stub) => Ok(stub.to_response()),
            None => Err(Box::new(NetworkError::transport(QueueExhausted {
                url: request.url.to_string(),
            }))),
        }
    }
}
