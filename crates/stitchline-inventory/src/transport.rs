use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use stitchline_core::{PurchaseItem, round_quantity};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportAllocation {
    pub item_id: Uuid,
    pub weight: Decimal,
    pub transport_share: Decimal,
    pub transport_per_unit: Decimal,
    pub adjusted_unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportPlan {
    pub transport_charge: Decimal,
    pub total_weight: Decimal,
    pub per_unit_transport: Decimal,
    pub allocations: Vec<TransportAllocation>,
}

impl TransportPlan {
    pub fn allocation(&self, item_id: Uuid) -> Option<&TransportAllocation> {
        self.allocations.iter().find(|a| a.item_id == item_id)
    }
}

/// Spreads a purchase's transport charge over its items by weight
/// (`quantity x conversion_rate`, rate defaulting to 1) and folds each share
/// into a per-unit landed price.
pub fn distribute_transport(
    items: &[PurchaseItem],
    conversion_rates: &HashMap<Uuid, Decimal>,
    transport_charge: Decimal,
) -> TransportPlan {
    let weights: Vec<Decimal> = items
        .iter()
        .map(|item| {
            let rate = conversion_rates
                .get(&item.material_id)
                .copied()
                .unwrap_or(Decimal::ONE);
            item.quantity * rate
        })
        .collect();
    let total_weight: Decimal = weights.iter().copied().sum();

    let per_unit_transport = if total_weight > Decimal::ZERO && transport_charge > Decimal::ZERO {
        transport_charge / total_weight
    } else {
        Decimal::ZERO
    };

    let allocations = items
        .iter()
        .zip(weights)
        .map(|(item, weight)| {
            let transport_share = weight * per_unit_transport;
            let transport_per_unit = if item.quantity > Decimal::ZERO {
                transport_share / item.quantity
            } else {
                Decimal::ZERO
            };
            TransportAllocation {
                item_id: item.id,
                weight,
                transport_share,
                transport_per_unit,
                adjusted_unit_price: round_quantity(item.unit_price + transport_per_unit),
            }
        })
        .collect();

    TransportPlan {
        transport_charge,
        total_weight,
        per_unit_transport,
        allocations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(material_id: Uuid, quantity: i64, unit_price: i64) -> PurchaseItem {
        PurchaseItem {
            id: Uuid::new_v4(),
            purchase_id: Uuid::nil(),
            material_id,
            quantity: Decimal::from(quantity),
            actual_meter: None,
            unit_price: Decimal::from(unit_price),
            adjusted_unit_price: None,
        }
    }

    #[test]
    fn charge_is_split_by_weight() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let items = vec![item(a, 10, 5), item(b, 15, 8)];
        let rates = HashMap::from([(a, Decimal::ONE), (b, Decimal::from(2))]);

        let plan = distribute_transport(&items, &rates, Decimal::from(40));

        assert_eq!(plan.total_weight, Decimal::from(40));
        assert_eq!(plan.per_unit_transport, Decimal::ONE);

        let first = &plan.allocations[0];
        assert_eq!(first.transport_share, Decimal::from(10));
        assert_eq!(first.transport_per_unit, Decimal::ONE);
        assert_eq!(first.adjusted_unit_price, Decimal::from(6));

        let second = &plan.allocations[1];
        assert_eq!(second.transport_share, Decimal::from(30));
        assert_eq!(second.transport_per_unit, Decimal::from(2));
        assert_eq!(second.adjusted_unit_price, Decimal::from(10));
    }

    #[test]
    fn missing_rate_counts_as_one() {
        let items = vec![item(Uuid::new_v4(), 4, 1)];
        let plan = distribute_transport(&items, &HashMap::new(), Decimal::from(8));
        assert_eq!(plan.total_weight, Decimal::from(4));
        assert_eq!(plan.allocations[0].adjusted_unit_price, Decimal::from(3));
    }

    #[test]
    fn zero_weight_distributes_nothing() {
        let material = Uuid::new_v4();
        let items = vec![item(material, 4, 7)];
        let rates = HashMap::from([(material, Decimal::ZERO)]);

        let plan = distribute_transport(&items, &rates, Decimal::from(8));
        assert_eq!(plan.per_unit_transport, Decimal::ZERO);
        assert_eq!(plan.allocations[0].adjusted_unit_price, Decimal::from(7));
    }
}
