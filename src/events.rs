use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Domain events emitted by the storefront services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Pricing events
    SaleActivated { product_id: i32 },
    SaleExpired { product_id: i32 },
    SaleRemoved { product_id: i32 },

    // Cart events
    CartLineAdded { product_id: i32, count: i32 },
    CartLineRemoved { product_id: i32, count: i32 },

    // Order events
    OrderCreated(i32),
    OrderUpdated(i32),
    OrderPaid(i32),

    // Profile events
    ProfileUpdated(i32),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is
    /// gone. Events are advisory; business operations never fail on them.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Dropping event: {}", e);
        }
    }
}

/// Consume and log events. Runs as a background task for the lifetime of
/// the process; external consumers (notifications, analytics) would hang
/// off this loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SaleActivated { product_id } => {
                info!(product_id, "sale activated");
            }
            Event::SaleExpired { product_id } => {
                info!(product_id, "sale expired, price restored");
            }
            Event::SaleRemoved { product_id } => {
                info!(product_id, "stale sale removed");
            }
            Event::OrderPaid(order_id) => {
                info!(order_id, "order paid");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
