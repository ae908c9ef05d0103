use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::states::{FabricationState, ProductionState, StampType};

/// An item as tracked on the production floor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionItem {
    pub id: Uuid,
    #[serde(default)]
    pub order_id: Option<Uuid>,
    pub design_name: String,
    #[serde(default)]
    pub customer_name: String,
    pub stamp_type: StampType,
    pub production_state: ProductionState,
    /// Machine assignment label; `None` while unassigned.
    #[serde(default)]
    pub aspire_state: Option<String>,
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub is_vectorized: bool,
    #[serde(default)]
    pub is_priority: bool,
    #[serde(default)]
    pub width: Decimal,
    #[serde(default)]
    pub height: Decimal,
    pub created_on: NaiveDate,
}

impl ProductionItem {
    pub fn new(
        design_name: impl Into<String>,
        production_state: ProductionState,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: None,
            design_name: design_name.into(),
            customer_name: String::new(),
            stamp_type: StampType::Clasico,
            production_state,
            aspire_state: None,
            program_name: None,
            is_vectorized: false,
            is_priority: false,
            width: Decimal::ZERO,
            height: Decimal::ZERO,
            created_on,
        }
    }

    pub fn with_customer(mut self, customer_name: impl Into<String>) -> Self {
        self.customer_name = customer_name.into();
        self
    }

    pub fn with_aspire(mut self, label: impl Into<String>) -> Self {
        self.aspire_state = Some(label.into());
        self
    }

    pub fn with_program(mut self, program_name: impl Into<String>) -> Self {
        self.program_name = Some(program_name.into());
        self
    }

    pub fn with_priority(mut self, is_priority: bool) -> Self {
        self.is_priority = is_priority;
        self
    }

    pub fn with_stamp_type(mut self, stamp_type: StampType) -> Self {
        self.stamp_type = stamp_type;
        self
    }

    pub fn with_vectorized(mut self, is_vectorized: bool) -> Self {
        self.is_vectorized = is_vectorized;
        self
    }

    /// Fabrication-space equivalent of the production state.
    pub fn fabrication_state(&self) -> FabricationState {
        self.production_state.to_fabrication()
    }
}
