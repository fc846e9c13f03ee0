use crate::{
    Result,
    calls::{
        Call,
        CallReceipt,
    },
};
use anyhow::anyhow;
use tokio::sync::{
    mpsc,
    oneshot,
};

/// A call waiting to be applied, with an optional channel for its receipt.
#[derive(Debug)]
pub struct PendingCall {
    pub call: Call,
    pub responder: Option<oneshot::Sender<CallReceipt>>,
}

impl PendingCall {
    pub fn new(call: Call) -> Self {
        Self {
            call,
            responder: None,
        }
    }

    pub fn with_responder(call: Call) -> (Self, oneshot::Receiver<CallReceipt>) {
        let (sender, receiver) = oneshot::channel();
        let pending = Self {
            call,
            responder: Some(sender),
        };
        (pending, receiver)
    }
}

pub trait CallSource {
    fn next_call(&mut self) -> impl Future<Output = Result<PendingCall>>;
}

pub struct ChannelCallSource {
    recv: mpsc::Receiver<PendingCall>,
}

impl ChannelCallSource {
    pub fn new_with_sender() -> (Self, mpsc::Sender<PendingCall>) {
        let (send, recv) = mpsc::channel(64);
        (Self { recv }, send)
    }
}

impl CallSource for ChannelCallSource {
    async fn next_call(&mut self) -> Result<PendingCall> {
        self.recv
            .recv()
            .await
            .ok_or_else(|| anyhow!("call channel closed"))
    }
}
