//! Sales order entity (Pedido), created by converting a quote

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;
use crate::entities::quote::{Quote, QuoteItem};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Open,
    InProduction,
    Delivered,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::InProduction => write!(f, "in_production"),
            OrderStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// Errors from moving an order through its workflow
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("{reference} is {from}; cannot move to {to}")]
    Backwards {
        reference: String,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Sales order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: EntityId,

    /// Sequential number (e.g., "PED-0031")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub title: String,

    pub quote_id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_number: Option<String>,

    pub customer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<QuoteItem>,

    pub order_date: NaiveDate,

    /// Order date plus the quoted lead time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promised_date: Option<NaiveDate>,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_date: Option<NaiveDate>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

impl Entity for SalesOrder {
    const PREFIX: EntityPrefix = EntityPrefix::Ord;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        SequenceFamily::Order
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn state(&self) -> String {
        self.status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl SalesOrder {
    pub(crate) fn from_quote(
        quote: &Quote,
        number: Option<String>,
        order_date: NaiveDate,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Ord),
            number,
            title: quote.title.clone(),
            quote_id: quote.id.clone(),
            quote_number: quote.number.clone(),
            customer: quote.customer.clone(),
            contact: quote.contact.clone(),
            items: quote.items.clone(),
            order_date,
            promised_date: order_date
                .checked_add_days(Days::new(u64::from(quote.lead_time_days()))),
            status: OrderStatus::default(),
            delivered_date: None,
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(QuoteItem::subtotal).sum()
    }

    pub fn is_late(&self, today: NaiveDate) -> bool {
        self.status != OrderStatus::Delivered && self.promised_date.is_some_and(|d| today > d)
    }

    /// Advance the order; it never moves backwards
    pub fn advance(&mut self, status: OrderStatus, date: NaiveDate) -> Result<(), OrderError> {
        let rank = |s: OrderStatus| match s {
            OrderStatus::Open => 0,
            OrderStatus::InProduction => 1,
            OrderStatus::Delivered => 2,
        };
        if rank(status) <= rank(self.status) {
            return Err(OrderError::Backwards {
                reference: self.display_ref(),
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        if status == OrderStatus::Delivered {
            self.delivered_date = Some(date);
        }
        self.revision += 1;
        Ok(())
    }
}
