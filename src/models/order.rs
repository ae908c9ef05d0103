use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::states::{FabricationState, SaleState, ShippingState, StampType};

/// Customer who placed an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Delivery details for an order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipping {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// A file reference attached to an order item (artwork, proof photo, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

/// One stamp design within an order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub design_name: String,
    /// Requested width in millimetres.
    #[serde(default)]
    pub requested_width: Decimal,
    /// Requested height in millimetres.
    #[serde(default)]
    pub requested_height: Decimal,
    pub stamp_type: StampType,
    pub fabrication_state: FabricationState,
    pub sale_state: SaleState,
    pub shipping_state: ShippingState,
    #[serde(default)]
    pub is_priority: bool,
    #[serde(default)]
    pub item_value: Decimal,
    #[serde(default)]
    pub deposit_value_item: Decimal,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub contact_channel: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

impl OrderItem {
    /// Creates an item in the given fabrication state with neutral defaults
    /// for every other field.
    pub fn new(design_name: impl Into<String>, fabrication_state: FabricationState) -> Self {
        Self {
            id: Uuid::new_v4(),
            design_name: design_name.into(),
            requested_width: Decimal::ZERO,
            requested_height: Decimal::ZERO,
            stamp_type: StampType::Clasico,
            fabrication_state,
            sale_state: SaleState::Senado,
            shipping_state: ShippingState::SinEnvio,
            is_priority: false,
            item_value: Decimal::ZERO,
            deposit_value_item: Decimal::ZERO,
            balance: Decimal::ZERO,
            attachments: Vec::new(),
            contact_channel: None,
            uploaded_by: None,
        }
    }

    pub fn with_sale_state(mut self, state: SaleState) -> Self {
        self.sale_state = state;
        self
    }

    pub fn with_shipping_state(mut self, state: ShippingState) -> Self {
        self.shipping_state = state;
        self
    }

    pub fn with_stamp_type(mut self, stamp_type: StampType) -> Self {
        self.stamp_type = stamp_type;
        self
    }

    pub fn with_priority(mut self, is_priority: bool) -> Self {
        self.is_priority = is_priority;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.contact_channel = Some(channel.into());
        self
    }

    pub fn with_values(mut self, item_value: Decimal, deposit: Decimal) -> Self {
        self.item_value = item_value;
        self.deposit_value_item = deposit;
        self.balance = (item_value - deposit).max(Decimal::ZERO);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Uploaders associated with this item: the item's own uploader plus the
    /// uploader of every attachment.
    pub fn uploaders(&self) -> impl Iterator<Item = &str> {
        self.uploaded_by.as_deref().into_iter().chain(
            self.attachments
                .iter()
                .filter_map(|attachment| attachment.uploaded_by.as_deref()),
        )
    }
}

/// A customer purchase containing one or more stamp items.
///
/// Monetary totals are computed by the record source and are read-only here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer: Customer,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping: Option<Shipping>,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub total_value: Decimal,
    #[serde(default)]
    pub deposit_value_order: Decimal,
    #[serde(default)]
    pub rest_paid_amount_order: Decimal,
}

impl Order {
    /// Creates an empty order for the given customer and date.
    pub fn new(customer_name: impl Into<String>, order_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer: Customer {
                name: customer_name.into(),
                phone: None,
            },
            items: Vec::new(),
            shipping: None,
            order_date,
            total_value: Decimal::ZERO,
            deposit_value_order: Decimal::ZERO,
            rest_paid_amount_order: Decimal::ZERO,
        }
    }

    pub fn with_item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer.phone = Some(phone.into());
        self
    }

    /// Sets the precomputed totals as the record source would deliver them.
    pub fn with_totals(mut self, total_value: Decimal, deposit_value_order: Decimal) -> Self {
        self.total_value = total_value;
        self.deposit_value_order = deposit_value_order;
        self.rest_paid_amount_order = (total_value - deposit_value_order).max(Decimal::ZERO);
        self
    }

    /// `max(0, total - deposit)`, the value `rest_paid_amount_order` is
    /// expected to hold.
    pub fn expected_rest(&self) -> Decimal {
        (self.total_value - self.deposit_value_order).max(Decimal::ZERO)
    }

    /// Whether the stored remaining amount agrees with the stored totals.
    pub fn totals_consistent(&self) -> bool {
        self.rest_paid_amount_order == self.expected_rest()
    }
}
