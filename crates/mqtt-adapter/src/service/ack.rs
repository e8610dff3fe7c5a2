//! Acknowledgement handle returned by `next`.

use router_core::{AckNacker, AdapterError};
use tokio::sync::oneshot;

use crate::domain::MsgRes;

/// Answers one inbound packet request.
///
/// Owns the request's response channel, so the answer is written at most once.
#[derive(Debug)]
pub struct MqttAckNacker {
    chresp: oneshot::Sender<MsgRes>,
}

impl MqttAckNacker {
    pub fn new(chresp: oneshot::Sender<MsgRes>) -> Self {
        Self { chresp }
    }

    fn answer(self, res: MsgRes) -> Result<(), AdapterError> {
        self.chresp
            .send(res)
            .map_err(|_| AdapterError::WrongBehavior("No response was expected".to_string()))
    }
}

impl AckNacker for MqttAckNacker {
    fn accept(self: Box<Self>, response: Vec<u8>) -> Result<(), AdapterError> {
        self.answer(MsgRes::Accepted(response))
    }

    fn reject(self: Box<Self>, reason: String) -> Result<(), AdapterError> {
        self.answer(MsgRes::Rejected(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_delivers_response() {
        let (tx, rx) = oneshot::channel();
        let an: Box<dyn AckNacker> = Box::new(MqttAckNacker::new(tx));

        an.accept(b"pong".to_vec()).unwrap();

        assert_eq!(rx.await.unwrap(), MsgRes::Accepted(b"pong".to_vec()));
    }

    #[tokio::test]
    async fn test_reject_delivers_reason() {
        let (tx, rx) = oneshot::channel();
        let an: Box<dyn AckNacker> = Box::new(MqttAckNacker::new(tx));

        an.reject("unknown device".to_string()).unwrap();

        assert_eq!(rx.await.unwrap(), MsgRes::Rejected("unknown device".to_string()));
    }

    #[test]
    fn test_answer_without_waiter_is_wrong_behavior() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let an: Box<dyn AckNacker> = Box::new(MqttAckNacker::new(tx));

        assert!(matches!(
            an.accept(b"late".to_vec()),
            Err(AdapterError::WrongBehavior(_))
        ));
    }
}
