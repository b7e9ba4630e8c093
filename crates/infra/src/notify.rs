//! Notice sinks for hosts without a UI toolkit

use steward_core::{Notice, Notifier};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::RequestFailed { category, .. } => {
                warn!(category = ?category, message = %notice.message(), "notice");
            }
            Notice::ImpersonationExpired { .. } | Notice::SessionExpired => {
                info!(message = %notice.message(), "notice");
            }
        }
    }
}

/// Forwards notices to a channel the host drains (e.g. a toast queue)
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if self.sender.send(notice).is_err() {
            warn!("notice receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Notice::SessionExpired);
        notifier.notify(Notice::ImpersonationExpired { target_tenant_id: "acme".into() });

        assert_eq!(rx.recv().await, Some(Notice::SessionExpired));
        assert!(matches!(rx.recv().await, Some(Notice::ImpersonationExpired { .. })));
    }
}
