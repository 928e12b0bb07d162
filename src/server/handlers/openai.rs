use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Response, Sse};
use axum::Json;
use chrono::Utc;
use futures_util::stream::{self, Stream};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChunkReceiver};
use crate::server::protocol::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Choice, ModelList, Usage,
};
use crate::state::AppState;

pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ModelList {
        object: "list",
        data: state.llm.models(),
    })
}

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let model = payload.model().to_string();
    let augmented = state.rag.augment_messages(payload.messages.clone()).await;
    let request = payload.to_chat_request(augmented);

    if payload.stream {
        let rx = state
            .llm
            .generate_stream(request, &model)
            .await
            .map_err(completion_error)?;
        let stream = completion_chunks(rx, model);
        return Ok(Sse::new(stream)
            .keep_alive(KeepAlive::default())
            .into_response());
    }

    let answer = state
        .llm
        .generate(request, &model)
        .await
        .map_err(completion_error)?;

    let usage = Usage::from_words(&payload.messages, &answer);
    Ok(Json(ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion",
        created: Utc::now().timestamp(),
        model,
        choices: vec![Choice {
            index: 0,
            message: ChatMessage::new("assistant", answer),
            finish_reason: "stop",
        }],
        usage,
    })
    .into_response())
}

fn completion_error(err: ApiError) -> ApiError {
    tracing::error!("Chat completion failed: {}", err);
    ApiError::Internal(format!("API Fehler: {}", err.message()))
}

fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4())
}

enum Phase {
    Content,
    Done,
    Finished,
}

struct ChunkStream {
    rx: ChunkReceiver,
    id: String,
    created: i64,
    model: String,
    phase: Phase,
}

impl ChunkStream {
    fn event(&self, chunk: &ChatCompletionChunk<'_>) -> Event {
        Event::default().data(serde_json::to_string(chunk).unwrap_or_default())
    }

    async fn next_event(&mut self) -> Option<Event> {
        match self.phase {
            Phase::Content => {
                let content = match self.rx.recv().await {
                    Some(Ok(content)) => Some(content),
                    Some(Err(err)) => {
                        tracing::error!("Completion stream aborted: {}", err);
                        None
                    }
                    None => None,
                };
                let chunk = match content {
                    Some(content) => {
                        ChatCompletionChunk::content(&self.id, self.created, &self.model, content)
                    }
                    None => {
                        self.phase = Phase::Done;
                        ChatCompletionChunk::stop(&self.id, self.created, &self.model)
                    }
                };
                Some(self.event(&chunk))
            }
            Phase::Done => {
                self.phase = Phase::Finished;
                Some(Event::default().data("[DONE]"))
            }
            Phase::Finished => None,
        }
    }
}

/// Content chunks, one `finish_reason: "stop"` chunk, then `[DONE]`.
/// Every chunk of one completion shares the same id.
fn completion_chunks(
    rx: ChunkReceiver,
    model: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let state = ChunkStream {
        rx,
        id: completion_id(),
        created: Utc::now().timestamp(),
        model,
        phase: Phase::Content,
    };

    stream::unfold(state, |mut state| async move {
        let event = state.next_event().await?;
        Some((Ok(event), state))
    })
}
