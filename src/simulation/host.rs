//! What the core needs from whoever presents frames and delivers input.

use std::collections::BTreeMap;

/// Token for one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequest(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerDown,
    PointerMove,
    PointerUp,
    Wheel,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 4] = [
        ListenerKind::PointerDown,
        ListenerKind::PointerMove,
        ListenerKind::PointerUp,
        ListenerKind::Wheel,
    ];
}

/// Frame presentation and input registration.
///
/// `request_frame` asks for exactly one callback on the next presented
/// frame; the host hands the returned token back when it fires.
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameRequest;
    /// Cancelling an unknown or already-fired request is a no-op.
    fn cancel_frame(&mut self, request: FrameRequest);
    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;
    /// Removing an unknown listener is a no-op.
    fn remove_listener(&mut self, id: ListenerId);
}

/// Host driven by hand: frames fire when [`ManualHost::next_frame`] is
/// called. Backs the headless runner.
#[derive(Debug, Default)]
pub struct ManualHost {
    next_id: u64,
    pending: Vec<FrameRequest>,
    listeners: BTreeMap<ListenerId, ListenerKind>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the oldest pending frame request, if any.
    pub fn next_frame(&mut self) -> Option<FrameRequest> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }

    fn bump(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl FrameHost for ManualHost {
    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.bump());
        self.pending.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.retain(|r| *r != request);
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.bump());
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_fire_in_order_once() {
        let mut host = ManualHost::new();
        let a = host.request_frame();
        let b = host.request_frame();
        assert_eq!(host.next_frame(), Some(a));
        assert_eq!(host.next_frame(), Some(b));
        assert_eq!(host.next_frame(), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut host = ManualHost::new();
        let a = host.request_frame();
        host.cancel_frame(a);
        host.cancel_frame(a);
        assert_eq!(host.pending_frames(), 0);
    }

    #[test]
    fn test_listener_registry() {
        let mut host = ManualHost::new();
        let ids: Vec<ListenerId> = ListenerKind::ALL
            .iter()
            .map(|k| host.add_listener(*k))
            .collect();
        assert_eq!(host.listener_count(), 4);
        assert!(host.is_listening(ListenerKind::Wheel));
        for id in &ids {
            host.remove_listener(*id);
            host.remove_listener(*id);
        }
        assert_eq!(host.listener_count(), 0);
    }
}
