use std::thread;

use crossbeam_channel::{unbounded, Receiver};

use crate::error::ReplError;
use crate::providers::{ChatClient, ChatMessage};

use super::text::sanitize_reply;

#[derive(Debug)]
pub(crate) enum WorkerEvent {
    Done { reply: String, title: Option<String> },
    Failed(ReplError),
}

pub(crate) struct CompletionJob {
    pub(crate) system_prompt: String,
    pub(crate) messages: Vec<ChatMessage>,
    /// Ask for a chat title once the reply is in.
    pub(crate) want_title: bool,
}

/// Run one completion on a background thread. Dropping the receiver abandons
/// the request; the thread finishes on its own and its send fails quietly.
pub(crate) fn spawn_completion(client: ChatClient, job: CompletionJob) -> Receiver<WorkerEvent> {
    let (tx, rx) = unbounded();
    let spawned = thread::Builder::new()
        .name("completion".to_string())
        .spawn(move || {
            let event = run_job(&client, &job);
            if tx.send(event).is_err() {
                tracing::debug!("completion finished after it was abandoned");
            }
        });
    if let Err(err) = spawned {
        tracing::warn!(%err, "could not spawn completion thread");
    }
    rx
}

fn run_job(client: &ChatClient, job: &CompletionJob) -> WorkerEvent {
    let reply = match client.complete(&job.system_prompt, &job.messages) {
        Ok(reply) => sanitize_reply(&reply),
        Err(err) => return WorkerEvent::Failed(err),
    };
    let title = if job.want_title {
        let user = job
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        match client.title_for(user, &reply) {
            Ok(title) if !title.is_empty() => Some(sanitize_reply(&title)),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%err, "chat title request failed; using model name");
                None
            }
        }
    } else {
        None
    };
    WorkerEvent::Done { reply, title }
}
