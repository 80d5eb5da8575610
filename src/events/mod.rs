use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::entities::cash_flow::CashFlowType;

/// Domain events published by the services after a successful mutation.
/// Consumed in-process; receipt printing, dashboards and sync workers hang
/// off this channel without sitting inside the write path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SaleCompleted {
        transaction_id: i64,
        branch_id: i64,
        invoice_number: String,
        total: Decimal,
    },
    InventoryAdjusted {
        branch_id: i64,
        product_id: i64,
        old_stock: i32,
        new_stock: i32,
        reason: String,
    },
    DailyStockImported {
        branch_id: i64,
        item_count: usize,
    },
    CashFlowRecorded {
        entry_id: i64,
        r#type: CashFlowType,
        category: String,
        amount: Decimal,
        transaction_date: NaiveDate,
    },
    CashFlowDeleted {
        entry_id: i64,
        category: String,
    },
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

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Used after a commit has already succeeded: the mutation must not be
    /// reported as failed just because a subscriber went away.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Background consumer for domain events. Currently logs every event;
/// downstream integrations subscribe by extending this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::SaleCompleted {
                invoice_number,
                branch_id,
                total,
                ..
            } => {
                info!(invoice = %invoice_number, branch_id, %total, "Sale completed");
            }
            Event::InventoryAdjusted {
                branch_id,
                product_id,
                old_stock,
                new_stock,
                reason,
            } => {
                info!(
                    branch_id,
                    product_id, old_stock, new_stock, reason = %reason, "Inventory adjusted"
                );
            }
            Event::DailyStockImported {
                branch_id,
                item_count,
            } => {
                info!(branch_id, item_count, "Daily stock imported");
            }
            Event::CashFlowRecorded {
                entry_id,
                category,
                amount,
                ..
            } => {
                info!(entry_id, category = %category, %amount, "Cash flow recorded");
            }
            Event::CashFlowDeleted { entry_id, category } => {
                info!(entry_id, category = %category, "Cash flow entry deleted");
            }
        }
    }
}

/// Creates a bounded event channel pair.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
