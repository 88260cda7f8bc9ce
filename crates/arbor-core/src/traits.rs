//! Core traits for Arbor
//!
//! A switch never sees its driver. Everything it sends goes through an
//! [`Outbox`], which the synchronous simulation backs with a FIFO queue
//! and the actor network backs with per-switch channels.

use std::collections::VecDeque;

use crate::message::ConfigMessage;

/// Sink for outgoing configuration messages
///
/// Implementations must preserve the order in which messages are handed
/// over, at least per destination.
pub trait Outbox {
    /// Hand a message to the link layer for delivery to `message.destination`
    fn send_message(&mut self, message: ConfigMessage);
}

impl Outbox for VecDeque<ConfigMessage> {
    fn send_message(&mut self, message: ConfigMessage) {
        self.push_back(message);
    }
}

impl Outbox for Vec<ConfigMessage> {
    fn send_message(&mut self, message: ConfigMessage) {
        self.push(message);
    }
}

impl<O: Outbox + ?Sized> Outbox for &mut O {
    fn send_message(&mut self, message: ConfigMessage) {
        (**self).send_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SwitchId;

    fn make_msg(to: u32) -> ConfigMessage {
        ConfigMessage::new(SwitchId(1), 0, SwitchId(1), SwitchId(to), false, 1)
    }

    #[test]
    fn test_queue_outbox_is_fifo() {
        let mut queue = VecDeque::new();
        queue.send_message(make_msg(2));
        queue.send_message(make_msg(3));
        assert_eq!(queue.pop_front().unwrap().destination, SwitchId(2));
        assert_eq!(queue.pop_front().unwrap().destination, SwitchId(3));
    }

    #[test]
    fn test_forwarding_through_reference() {
        fn send_two(outbox: &mut impl Outbox) {
            outbox.send_message(make_msg(2));
            outbox.send_message(make_msg(3));
        }

        let mut sent = Vec::new();
        send_two(&mut &mut sent);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].destination, SwitchId(3));
    }
}
