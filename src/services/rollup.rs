use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::order::{Order, OrderItem};
use crate::models::production::ProductionItem;
use crate::models::states::{FabricationState, SaleState, ShippingState, StampType};
use crate::services::priority::canonical_fabrication_order;

/// Per-order values derived from its items.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub item_count: usize,
    pub dominant_state: FabricationState,
    pub has_priority_item: bool,
    /// Distinct sale states in first-appearance order.
    pub sale_states: Vec<SaleState>,
    /// Distinct shipping states in first-appearance order.
    pub shipping_states: Vec<ShippingState>,
    pub stamp_types: Vec<StampType>,
    pub total_value: Decimal,
    pub deposit_value_order: Decimal,
    pub rest_paid_amount_order: Decimal,
    /// Sum of the items' own balances.
    pub items_balance: Decimal,
}

impl OrderSummary {
    /// The sale state when every item agrees, `None` for "multiple".
    pub fn single_sale_state(&self) -> Option<SaleState> {
        match self.sale_states.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// The shipping state when every item agrees, `None` for "multiple".
    pub fn single_shipping_state(&self) -> Option<ShippingState> {
        match self.shipping_states.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

fn distinct<T: PartialEq + Copy>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Least complete fabrication state across `items` under the canonical
/// order. An order without items counts as not started.
pub fn dominant_fabrication_state(items: &[OrderItem]) -> FabricationState {
    let canonical = canonical_fabrication_order();
    items
        .iter()
        .map(|item| item.fabrication_state)
        .min_by_key(|state| canonical.rank(*state))
        .unwrap_or_default()
}

/// Reduces an order's items into its summary. Totals pass through untouched.
pub fn aggregate(order: &Order) -> OrderSummary {
    OrderSummary {
        item_count: order.items.len(),
        dominant_state: dominant_fabrication_state(&order.items),
        has_priority_item: order.items.iter().any(|item| item.is_priority),
        sale_states: distinct(order.items.iter().map(|item| item.sale_state)),
        shipping_states: distinct(order.items.iter().map(|item| item.shipping_state)),
        stamp_types: distinct(order.items.iter().map(|item| item.stamp_type)),
        total_value: order.total_value,
        deposit_value_order: order.deposit_value_order,
        rest_paid_amount_order: order.rest_paid_amount_order,
        items_balance: order.items.iter().map(|item| item.balance).sum(),
    }
}

/// An order together with its derived summary, as rendered by the order table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderRow {
    pub order: Order,
    pub summary: OrderSummary,
}

impl OrderRow {
    pub fn new(order: Order) -> Self {
        let summary = aggregate(&order);
        Self { order, summary }
    }

    pub fn id(&self) -> Uuid {
        self.order.id
    }

    /// Only orders with more than one item offer row expansion.
    pub fn is_expandable(&self) -> bool {
        self.summary.item_count > 1
    }
}

/// A production item with its state mapped into the fabrication space.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductionRow {
    pub item: ProductionItem,
    pub fabrication_state: FabricationState,
}

impl ProductionRow {
    pub fn new(item: ProductionItem) -> Self {
        let fabrication_state = item.fabrication_state();
        Self {
            item,
            fabrication_state,
        }
    }

    pub fn id(&self) -> Uuid {
        self.item.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn order_with(states: &[FabricationState]) -> Order {
        states.iter().fold(
            Order::new("Test", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            |order, state| order.with_item(OrderItem::new("d", *state)),
        )
    }

    #[test]
    fn least_complete_state_wins_regardless_of_item_order() {
        let forward = order_with(&[FabricationState::Haciendo, FabricationState::Hecho]);
        let backward = order_with(&[FabricationState::Hecho, FabricationState::Haciendo]);
        assert_eq!(aggregate(&forward).dominant_state, FabricationState::Haciendo);
        assert_eq!(aggregate(&backward).dominant_state, FabricationState::Haciendo);
    }

    #[test]
    fn scheduled_sits_between_not_started_and_in_progress() {
        let order = order_with(&[FabricationState::Haciendo, FabricationState::Programado]);
        assert_eq!(aggregate(&order).dominant_state, FabricationState::Programado);

        let order = order_with(&[FabricationState::Programado, FabricationState::SinHacer]);
        assert_eq!(aggregate(&order).dominant_state, FabricationState::SinHacer);
    }

    #[test]
    fn unknown_states_only_dominate_when_alone() {
        let order = order_with(&[FabricationState::Unknown, FabricationState::Hecho]);
        assert_eq!(aggregate(&order).dominant_state, FabricationState::Hecho);

        let order = order_with(&[FabricationState::Unknown]);
        assert_eq!(aggregate(&order).dominant_state, FabricationState::Unknown);
    }

    #[test]
    fn empty_order_defaults_to_not_started() {
        let summary = aggregate(&order_with(&[]));
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.dominant_state, FabricationState::SinHacer);
        assert!(summary.sale_states.is_empty());
        assert_eq!(summary.single_sale_state(), None);
    }

    #[test]
    fn distinct_states_and_pass_through_totals() {
        let order = Order::new("Dora", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .with_item(
                OrderItem::new("a", FabricationState::Hecho)
                    .with_sale_state(SaleState::Transferido)
                    .with_values(dec!(5000), dec!(2000)),
            )
            .with_item(
                OrderItem::new("b", FabricationState::Hecho)
                    .with_sale_state(SaleState::Transferido)
                    .with_shipping_state(ShippingState::Despachado)
                    .with_priority(true)
                    .with_values(dec!(3000), dec!(3000)),
            )
            .with_totals(dec!(8000), dec!(5000));

        let row = OrderRow::new(order);
        let summary = &row.summary;
        assert_eq!(summary.single_sale_state(), Some(SaleState::Transferido));
        assert_eq!(summary.single_shipping_state(), None);
        assert_eq!(
            summary.shipping_states,
            vec![ShippingState::SinEnvio, ShippingState::Despachado]
        );
        assert!(summary.has_priority_item);
        assert_eq!(summary.total_value, dec!(8000));
        assert_eq!(summary.rest_paid_amount_order, dec!(3000));
        assert_eq!(summary.items_balance, dec!(3000));
        assert!(row.is_expandable());
    }
}
