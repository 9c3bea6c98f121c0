use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use rust_decimal::Decimal;
use serde::Serialize;
use stitchline_core::{
    BatchOutcome, ComponentMetadata, ComponentType, InventoryStore, JobCard, LedgerEntry,
    LedgerMetadata, LedgerReference, LedgerStore, LinkedComponent,
    PendingAdjustment, ProductionStore, RestoreSource, TransactionType,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::InventoryError;
use crate::history::ledger_history;

/// Inventory moved for one component of a job card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentMovement {
    pub component_id: Uuid,
    pub material_id: Uuid,
    pub material_name: String,
    /// Unsigned amount moved.
    pub quantity: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub ledger_entry_id: Uuid,
    /// Set on reversals only.
    pub restore_source: Option<RestoreSource>,
}

impl ComponentMovement {
    fn from_entry(component_id: Uuid, entry: &LedgerEntry, source: Option<RestoreSource>) -> Self {
        Self {
            component_id,
            material_id: entry.material_id,
            material_name: entry.metadata.material_name().to_string(),
            quantity: entry.quantity.abs(),
            previous_quantity: entry.previous_quantity,
            new_quantity: entry.new_quantity,
            ledger_entry_id: entry.id,
            restore_source: source,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.restore_source.is_some_and(|source| source.is_degraded())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DeductionKey {
    Component { material_id: Uuid, component_id: Uuid },
    ComponentType { material_id: Uuid, component_type: ComponentType },
}

/// What a job card still owes back per deduction key, folded over its
/// consumption and reversal rows in logged order. Consumption rows written
/// without a component id are keyed by component type. Each key is handed
/// out at most once per reversal run.
struct Deductions {
    outstanding: HashMap<DeductionKey, Decimal>,
    /// (material, component) pairs restored from current consumption because
    /// no deduction had been logged for them.
    restored_unlogged: HashSet<(Uuid, Uuid)>,
}

impl Deductions {
    fn from_history(history: &[LedgerEntry]) -> Self {
        let mut deductions = Self {
            outstanding: HashMap::new(),
            restored_unlogged: HashSet::new(),
        };
        for entry in history {
            let LedgerMetadata::Component(meta) = &entry.metadata else {
                continue;
            };
            match entry.transaction_type {
                TransactionType::Consumption => {
                    let key = match meta.component_id {
                        Some(component_id) => DeductionKey::Component {
                            material_id: entry.material_id,
                            component_id,
                        },
                        None => DeductionKey::ComponentType {
                            material_id: entry.material_id,
                            component_type: meta.component_type,
                        },
                    };
                    *deductions.outstanding.entry(key).or_insert(Decimal::ZERO) +=
                        entry.quantity.abs();
                }
                TransactionType::JobCardReversal => {
                    deductions.settle(entry.material_id, meta, entry.quantity.abs());
                }
                _ => {}
            }
        }
        deductions
    }

    fn settle(&mut self, material_id: Uuid, meta: &ComponentMetadata, restored: Decimal) {
        let by_type = DeductionKey::ComponentType {
            material_id,
            component_type: meta.component_type,
        };
        let key = meta
            .component_id
            .map(|component_id| DeductionKey::Component {
                material_id,
                component_id,
            })
            .filter(|key| self.outstanding.contains_key(key))
            .or_else(|| self.outstanding.contains_key(&by_type).then_some(by_type));

        match key.and_then(|key| self.outstanding.get_mut(&key)) {
            Some(outstanding) => *outstanding = (*outstanding - restored).max(Decimal::ZERO),
            None => {
                if let Some(component_id) = meta.component_id {
                    self.restored_unlogged.insert((material_id, component_id));
                }
            }
        }
    }

    fn take(&mut self, material_id: Uuid, component_id: Uuid, component_type: ComponentType) -> Option<Decimal> {
        self.outstanding
            .remove(&DeductionKey::Component {
                material_id,
                component_id,
            })
            .or_else(|| {
                self.outstanding.remove(&DeductionKey::ComponentType {
                    material_id,
                    component_type,
                })
            })
    }

    fn restored_unlogged(&self, material_id: Uuid, component_id: Uuid) -> bool {
        self.restored_unlogged.contains(&(material_id, component_id))
    }
}

/// Deducts and restores the materials a job card's order consumes.
pub struct JobCardInventory<S> {
    store: Arc<S>,
}

impl<S> Clone for JobCardInventory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> JobCardInventory<S>
where
    S: InventoryStore + LedgerStore + ProductionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn load_job_card(&self, job_card_id: Uuid) -> Result<JobCard, InventoryError> {
        self.store
            .job_card(job_card_id)
            .await?
            .ok_or(InventoryError::JobCardNotFound(job_card_id))
    }

    /// Deducts every linked component's consumption and logs a `consumption`
    /// row per component against the job card.
    pub async fn consume(&self, job_card: &JobCard) -> Result<BatchOutcome<ComponentMovement>, InventoryError> {
        let components = self.store.order_components(job_card.order_id).await?;
        let mut outcome = BatchOutcome::new();

        for LinkedComponent { component, material } in components {
            let Some(material) = material else {
                continue;
            };
            if component.consumption <= Decimal::ZERO {
                continue;
            }

            let adjustment = PendingAdjustment {
                material_id: material.id,
                transaction_type: TransactionType::Consumption,
                delta: -component.consumption,
                reference: LedgerReference::job_card(job_card.id),
                metadata: LedgerMetadata::Component(ComponentMetadata {
                    component_id: Some(component.id),
                    component_type: component.component_type,
                    material_name: material.material_name.clone(),
                    unit: material.unit.clone(),
                    order_id: Some(job_card.order_id),
                    job_card_id: Some(job_card.id),
                    restore_source: None,
                }),
            };

            match self.store.post_adjustment(adjustment).await {
                Ok(entry) => outcome.record_success(ComponentMovement::from_entry(component.id, &entry, None)),
                Err(err) => {
                    warn!(
                        "failed to deduct {} for job card {}: {err}",
                        material.material_name, job_card.id
                    );
                    outcome.record_failure(material.material_name, err);
                }
            }
        }

        info!(
            "job card {} consumption posted: {} deducted, {} failed",
            job_card.id,
            outcome.succeeded_count(),
            outcome.failed_count()
        );
        Ok(outcome)
    }

    /// Restores what a job card deducted, preferring the logged amounts over
    /// the components' current (possibly edited) consumption. Amounts already
    /// restored by earlier reversals are netted out, so a repeat run restores
    /// nothing.
    pub async fn reverse(&self, job_card: &JobCard) -> Result<BatchOutcome<ComponentMovement>, InventoryError> {
        let components = self.store.order_components(job_card.order_id).await?;
        let history = ledger_history(
            self.store.as_ref(),
            LedgerReference::job_card(job_card.id),
            &[TransactionType::Consumption, TransactionType::JobCardReversal],
        )
        .await?;
        let mut deductions = Deductions::from_history(&history);
        let mut outcome = BatchOutcome::new();

        for LinkedComponent { component, material } in components {
            let Some(material) = material else {
                continue;
            };

            let (restore_quantity, source) =
                match deductions.take(material.id, component.id, component.component_type) {
                    Some(outstanding) => (outstanding, RestoreSource::Ledger),
                    None if deductions.restored_unlogged(material.id, component.id) => {
                        debug!(
                            "component {} on job card {} already restored",
                            component.id, job_card.id
                        );
                        continue;
                    }
                    None => (component.consumption, RestoreSource::CurrentConsumption),
                };
            if restore_quantity <= Decimal::ZERO {
                continue;
            }
            if source.is_degraded() {
                warn!(
                    "no consumption row for component {} on job card {}; restoring current consumption {} of {}",
                    component.id, job_card.id, restore_quantity, material.material_name
                );
            }

            let adjustment = PendingAdjustment {
                material_id: material.id,
                transaction_type: TransactionType::JobCardReversal,
                delta: restore_quantity,
                reference: LedgerReference::job_card(job_card.id),
                metadata: LedgerMetadata::Component(ComponentMetadata {
                    component_id: Some(component.id),
                    component_type: component.component_type,
                    material_name: material.material_name.clone(),
                    unit: material.unit.clone(),
                    order_id: Some(job_card.order_id),
                    job_card_id: Some(job_card.id),
                    restore_source: Some(source),
                }),
            };

            match self.store.post_adjustment(adjustment).await {
                Ok(entry) => outcome.record_success(ComponentMovement::from_entry(
                    component.id,
                    &entry,
                    Some(source),
                )),
                Err(err) => {
                    warn!(
                        "failed to restore {} for job card {}: {err}",
                        material.material_name, job_card.id
                    );
                    outcome.record_failure(material.material_name, err);
                }
            }
        }

        info!(
            "job card {} reversed: {} restored, {} failed",
            job_card.id,
            outcome.succeeded_count(),
            outcome.failed_count()
        );
        Ok(outcome)
    }
}
