use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::action::Command;
use crate::automation::Automation;
use crate::error::ApiError;
use crate::models::Envelope;

type Reply = oneshot::Sender<Result<Envelope, ApiError>>;

/// How commands reach the capabilities.
#[derive(Clone)]
pub enum Dispatcher {
    /// Each request runs its command on its own task, concurrently with others.
    Concurrent(Arc<Automation>),
    /// All commands go through one worker, one at a time.
    Serialized(CommandQueue),
}

impl Dispatcher {
    pub fn new(automation: Arc<Automation>, serialized: bool) -> Self {
        if serialized {
            Dispatcher::Serialized(CommandQueue::spawn(automation))
        } else {
            Dispatcher::Concurrent(automation)
        }
    }

    pub fn is_serialized(&self) -> bool {
        matches!(self, Dispatcher::Serialized(_))
    }

    pub async fn dispatch(&self, command: Command) -> Result<Envelope, ApiError> {
        match self {
            Dispatcher::Concurrent(automation) => run_isolated(automation.clone(), command).await,
            Dispatcher::Serialized(queue) => queue.submit(command).await,
        }
    }
}

/// Run a command on its own task so that a panicking capability surfaces as an
/// internal error instead of tearing down the connection.
async fn run_isolated(automation: Arc<Automation>, command: Command) -> Result<Envelope, ApiError> {
    let name = command.name();
    tokio::spawn(async move { automation.execute(command).await })
        .await
        .map_err(|e| ApiError::Internal(anyhow!("{} command aborted: {}", name, e)))?
}

#[derive(Clone)]
pub struct CommandQueue {
    sender: mpsc::Sender<(Command, Reply)>,
}

impl CommandQueue {
    pub fn spawn(automation: Arc<Automation>) -> Self {
        let (tx, mut rx) = mpsc::channel::<(Command, Reply)>(100);

        // single worker
        tokio::spawn(async move {
            log::info!("serialized command worker started");
            while let Some((command, reply)) = rx.recv().await {
                let res = run_isolated(automation.clone(), command).await;
                if reply.send(res).is_err() {
                    log::debug!("requester went away before the command finished");
                }
            }
            log::info!("serialized command worker stopped");
        });

        Self { sender: tx }
    }

    pub async fn submit(&self, command: Command) -> Result<Envelope, ApiError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send((command, tx))
            .await
            .map_err(|_| ApiError::Internal(anyhow!("command queue is closed")))?;
        rx.await
            .map_err(|_| ApiError::Internal(anyhow!("command worker dropped the request")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Capabilities;
    use crate::testing::RecordingDesktop;

    fn automation(desktop: &Arc<RecordingDesktop>) -> Arc<Automation> {
        Arc::new(Automation::new(Capabilities::from_desktop(desktop.clone())))
    }

    #[tokio::test]
    async fn queued_commands_reach_the_pointer_in_order() {
        let desktop = Arc::new(RecordingDesktop::new());
        let dispatcher = Dispatcher::new(automation(&desktop), true);
        assert!(dispatcher.is_serialized());

        for i in 0..10 {
            let env = dispatcher.dispatch(Command::MouseMove { x: i, y: i }).await.unwrap();
            assert!(env.success);
        }
        let expected: Vec<(i32, i32)> = (0..10).map(|i| (i, i)).collect();
        assert_eq!(desktop.moves(), expected);
    }

    #[tokio::test]
    async fn panicking_capability_is_an_internal_error() {
        let desktop = Arc::new(RecordingDesktop::new());
        desktop.panic_on("type_text");

        for serialized in [false, true] {
            let dispatcher = Dispatcher::new(automation(&desktop), serialized);
            let err = dispatcher
                .dispatch(Command::TypeText { text: "boom".into() })
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Internal(_)));
            assert!(err.message().starts_with("Internal server error: type command aborted"));

            // the worker survives a panic
            let ok = dispatcher.dispatch(Command::ListWindows).await.unwrap();
            assert!(ok.success);
        }
    }
}
