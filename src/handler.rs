//! The asynchronous suggestion worker.
//!
//! Suggestion queries run on a dedicated named thread so a slow dictionary
//! never stalls the keystroke path. Requests carry generation and sequence
//! tags; staleness is judged at delivery time by the caller draining
//! [`InputLogicHandler::poll`], never by the worker.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::dictionary::SuggestionSettings;
use crate::ngram::NgramContext;
use crate::suggest::Suggest;
use crate::suggested_words::{InputStyle, SuggestedWords};
use crate::word_composer::ComposedData;

/// One suggestion query, self-contained so the worker needs no shared
/// editor state.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub composed: ComposedData,
    pub ngram_context: NgramContext,
    pub settings: SuggestionSettings,
    pub is_correction_enabled: bool,
    pub input_style: InputStyle,
    /// Batch staleness tag, `NOT_A_SEQUENCE_NUMBER` for typing requests.
    pub sequence_number: i32,
    /// Typing single-flight tag, stamped by the handler on post.
    pub typing_generation: u64,
}

/// A computed suggestion list, tagged for staleness checks on delivery.
#[derive(Debug)]
pub struct SuggestionResponse {
    pub words: SuggestedWords,
    pub typing_generation: u64,
}

enum WorkerTask {
    Suggest(SuggestionRequest),
    Shutdown,
}

/// Owns the worker thread and the channels to and from it.
pub struct InputLogicHandler {
    task_tx: Sender<WorkerTask>,
    response_rx: Receiver<SuggestionResponse>,
    worker: Option<JoinHandle<()>>,
    typing_generation: u64,
}

impl InputLogicHandler {
    pub fn new(suggest: Arc<Suggest>) -> Self {
        let (task_tx, task_rx) = mpsc::channel::<WorkerTask>();
        let (response_tx, response_rx) = mpsc::channel::<SuggestionResponse>();
        let worker = thread::Builder::new()
            .name("suggestion-worker".to_string())
            .spawn(move || worker_loop(suggest, task_rx, response_tx))
            .ok();
        if worker.is_none() {
            warn!("could not spawn suggestion worker, suggestions disabled");
        }
        Self {
            task_tx,
            response_rx,
            worker,
            typing_generation: 0,
        }
    }

    /// The generation the next delivered typing response must match.
    pub fn typing_generation(&self) -> u64 {
        self.typing_generation
    }

    /// Invalidate every typing request still in flight without posting a
    /// new one, for commits and resets that make their results meaningless.
    pub fn invalidate_typing(&mut self) {
        self.typing_generation += 1;
    }

    /// Post a typing-style query. Each post supersedes the ones before it;
    /// their responses will be dropped at delivery.
    pub fn post_update_suggestions(&mut self, mut request: SuggestionRequest) {
        self.typing_generation += 1;
        request.typing_generation = self.typing_generation;
        self.post(request);
    }

    /// Post a batch-gesture query. Batch responses are matched by sequence
    /// number, not generation, so no generation bump here.
    pub fn post_batch_suggestions(&mut self, mut request: SuggestionRequest) {
        request.typing_generation = self.typing_generation;
        self.post(request);
    }

    fn post(&self, request: SuggestionRequest) {
        if self.worker.is_none() {
            return;
        }
        if self.task_tx.send(WorkerTask::Suggest(request)).is_err() {
            warn!("suggestion worker is gone, dropping request");
        }
    }

    /// Drain every response computed so far, oldest first. Callers apply
    /// the staleness protocol to the drained list.
    pub fn poll(&self) -> Vec<SuggestionResponse> {
        let mut responses = Vec::new();
        loop {
            match self.response_rx.try_recv() {
                Ok(response) => responses.push(response),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        responses
    }

    /// Block until the worker has answered every posted request, then
    /// drain. For callers that must have fresh results before committing.
    pub fn poll_blocking(&self, pending: usize) -> Vec<SuggestionResponse> {
        let mut responses = Vec::new();
        for _ in 0..pending {
            match self.response_rx.recv() {
                Ok(response) => responses.push(response),
                Err(_) => break,
            }
        }
        responses
    }
}

impl Drop for InputLogicHandler {
    fn drop(&mut self) {
        let _ = self.task_tx.send(WorkerTask::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    suggest: Arc<Suggest>,
    task_rx: Receiver<WorkerTask>,
    response_tx: Sender<SuggestionResponse>,
) {
    while let Ok(task) = task_rx.recv() {
        match task {
            WorkerTask::Suggest(request) => {
                let words = suggest.suggested_words(
                    &request.composed,
                    &request.ngram_context,
                    &request.settings,
                    request.is_correction_enabled,
                    request.input_style,
                    request.sequence_number,
                );
                let response = SuggestionResponse {
                    words,
                    typing_generation: request.typing_generation,
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
            WorkerTask::Shutdown => break,
        }
    }
}
