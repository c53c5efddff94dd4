//! Migration execution
//!
//! The engine computes a plan against whatever the target reports as its
//! current shape and hands it to the target to apply. The target applies
//! the whole plan (shape changes and version bump) as one unit.

use super::errors::MigrationResult;
use super::plan::{plan, DatasetShape, MigrationPlan};
use crate::observability::{log_event, Event, ObservationScope};
use crate::schema::SchemaCatalog;

/// Something whose schema shape can be upgraded.
pub trait MigrationTarget {
    /// Collections and indexes currently present
    fn shape(&self) -> MigrationResult<DatasetShape>;

    /// Applies every change in `plan` and moves the version to
    /// `plan.to_version`, all or nothing.
    fn apply(&mut self, plan: &MigrationPlan) -> MigrationResult<()>;
}

/// What a call to [`open_or_upgrade`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub collections_created: usize,
    pub indexes_added: usize,
    /// False when nothing was written
    pub applied: bool,
}

/// Brings `target` from `current_on_disk_version` to `target_version` and
/// the shape `catalog` declares.
///
/// Re-running at the same target version writes nothing.
pub fn open_or_upgrade<T: MigrationTarget>(
    target: &mut T,
    current_on_disk_version: u32,
    target_version: u32,
    catalog: &SchemaCatalog,
) -> MigrationResult<MigrationReport> {
    let shape = DatasetShape {
        version: current_on_disk_version,
        ..target.shape()?
    };

    let plan = plan(&shape, target_version, catalog)?;

    let mut report = MigrationReport {
        from_version: plan.from_version,
        to_version: plan.to_version,
        collections_created: plan.create_collections.len(),
        indexes_added: plan.add_indexes.len(),
        applied: false,
    };

    if plan.is_noop() {
        log_event(
            Event::MigrationNotNeeded,
            &[("version", &current_on_disk_version.to_string())],
        );
        return Ok(report);
    }

    let from = plan.from_version.to_string();
    let to = plan.to_version.to_string();
    let scope = ObservationScope::with_fields(
        "MIGRATION",
        &[("from_version", &from), ("to_version", &to)],
    );

    if let Err(e) = target.apply(&plan) {
        scope.fail(&e.to_string());
        return Err(e);
    }

    scope.complete_with_fields(&[
        ("collections_created", &report.collections_created.to_string()),
        ("indexes_added", &report.indexes_added.to_string()),
    ]);
    report.applied = true;
    Ok(report)
}
