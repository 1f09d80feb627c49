use async_trait::async_trait;
use courier_core::{BoxError, ErrorKind, HttpRequest, Plugin, ReceiveResult};
use parking_lot::Mutex;

/// One hook invocation seen by `RecordingPlugin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Prepared { url: String },
    Succeeded { url: String, status: u16 },
    Failed { url: String, kind: ErrorKind },
}

/// Plugin that records every `prepare` and `did_receive` call.
#[derive(Debug, Default)]
pub struct RecordingPlugin {
    events: Mutex<Vec<Event>>,
}

impl RecordingPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Only the `did_receive` events.
    pub fn outcomes(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| !matches!(e, Event::Prepared { .. }))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    async fn prepare(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        self.events.lock().push(Event::Prepared {
            url: request.url.to_string(),
        });
        Ok(())
    }

    async fn did_receive(
        &self,
        result: ReceiveResult<'_>,
        request: &HttpRequest,
    ) -> Result<(), BoxError> {
        let url = request.url.to_string();
        let event = match result {
            Ok(response) => Event::Succeeded {
                url,
                status: response.status,
            },
            Err(err) => Event::Failed {
                url,
                kind: err.kind(),
            },
        };
        self.events.lock().push(event);
        Ok(())
    }
}
