use serde::Serialize;
use tokio::sync::mpsc;

use crate::catalog::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Home,
    Meditate(SessionId),
    AdjustDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavRequest {
    Back,
    GoTo(Route),
}

/// Routing owned by the host. Screens only ask for moves; the host decides
/// what gets mounted and unmounted.
pub trait Navigator: Send + Sync {
    fn go_back(&self);

    fn go_to(&self, route: Route);
}

/// Queues requests for the host loop to apply after the current command.
#[derive(Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<NavRequest>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, request: NavRequest) {
        if self.tx.send(request).is_err() {
            log::warn!("navigation request {:?} dropped, host is gone", request);
        }
    }
}

impl Navigator for ChannelNavigator {
    fn go_back(&self) {
        self.send(NavRequest::Back);
    }

    fn go_to(&self, route: Route) {
        self.send(NavRequest::GoTo(route));
    }
}
