//! Quote entity - sales quotation (Orçamento)

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;
use crate::entities::order::SalesOrder;

/// Default validity of a quotation in days
pub const DEFAULT_VALIDITY_DAYS: u32 = 30;

/// Quote status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Approved,
    Rejected,
    Converted,
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteStatus::Draft => write!(f, "draft"),
            QuoteStatus::Sent => write!(f, "sent"),
            QuoteStatus::Approved => write!(f, "approved"),
            QuoteStatus::Rejected => write!(f, "rejected"),
            QuoteStatus::Converted => write!(f, "converted"),
        }
    }
}

/// Errors from quote workflow operations
#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("quote {0} was rejected and cannot be converted")]
    Rejected(String),

    #[error("quote {reference} was already converted to order {order}")]
    AlreadyConverted { reference: String, order: String },

    #[error("quote {0} has no items")]
    Empty(String),

    #[error("use the convert command to mark a quote as converted")]
    ManualConversion,

    #[error("quote {0} is converted and can no longer change status")]
    Locked(String),
}

/// A quoted line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub description: String,

    pub quantity: f64,

    pub unit_price: f64,

    /// Manufacturing lead time in days
    #[serde(default)]
    pub lead_time_days: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl QuoteItem {
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// Sales quotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: EntityId,

    /// Sequential number (e.g., "ORC-0120")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub title: String,

    pub customer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<QuoteItem>,

    pub quote_date: NaiveDate,

    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    #[serde(default)]
    pub status: QuoteStatus,

    /// Sales order created from this quote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

impl Entity for Quote {
    const PREFIX: EntityPrefix = EntityPrefix::Quot;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        SequenceFamily::Quote
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

impl Quote {
    pub fn new(title: String, customer: String, quote_date: NaiveDate, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Quot),
            number: None,
            title,
            customer,
            contact: None,
            items: Vec::new(),
            quote_date,
            validity_days: DEFAULT_VALIDITY_DAYS,
            status: QuoteStatus::default(),
            order: None,
            notes: None,
            tags: Vec::new(),
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    pub fn add_item(&mut self, item: QuoteItem) {
        self.items.push(item);
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(QuoteItem::subtotal).sum()
    }

    /// Sum of item lead times; items are produced one after another
    pub fn lead_time_days(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.lead_time_days))
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.quote_date
            .checked_add_days(Days::new(u64::from(self.validity_days)))
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.valid_until().is_some_and(|d| today > d)
    }

    /// Move through draft/sent/approved/rejected.
    ///
    /// Conversion has its own operation, and a converted quote is frozen.
    pub fn set_status(&mut self, status: QuoteStatus) -> Result<(), QuoteError> {
        if self.status == QuoteStatus::Converted {
            return Err(QuoteError::Locked(self.display_ref()));
        }
        if status == QuoteStatus::Converted {
            return Err(QuoteError::ManualConversion);
        }
        if self.status != status {
            self.status = status;
            self.revision += 1;
        }
        Ok(())
    }

    /// Turn the quote into a sales order and link the two.
    pub fn convert(
        &mut self,
        order_number: Option<String>,
        order_date: NaiveDate,
        author: String,
    ) -> Result<SalesOrder, QuoteError> {
        match self.status {
            QuoteStatus::Rejected => return Err(QuoteError::Rejected(self.display_ref())),
            QuoteStatus::Converted => {
                return Err(QuoteError::AlreadyConverted {
                    reference: self.display_ref(),
                    order: self
                        .order
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                })
            }
            _ => {}
        }
        if self.items.is_empty() {
            return Err(QuoteError::Empty(self.display_ref()));
        }

        let order = SalesOrder::from_quote(self, order_number, order_date, author);
        self.status = QuoteStatus::Converted;
        self.order = Some(order.id.clone());
        self.revision += 1;
        Ok(order)
    }
}
