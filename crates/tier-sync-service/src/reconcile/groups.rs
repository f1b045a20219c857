//! Group assignment with precise-then-bulk fallback.

use futures::FutureExt;
use tier_sync_core::{CustomerId, GroupId};

use crate::directory::fallback::GROUP_UPDATE_MISMATCH;
use crate::directory::{
    first_success, ApiGeneration, Attempt, DirectoryClient, DirectoryError, GroupUpdate,
};

/// How a group change reached the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupUpdateForm {
    /// Single-customer `PATCH`.
    Precise,
    /// One-entry bulk `PUT`.
    Bulk,
}

/// Applies a group id to a customer.
///
/// Clearing a group is the same operation with [`GroupId::NONE`].
pub struct GroupReconciler<'a> {
    directory: &'a DirectoryClient,
}

impl<'a> GroupReconciler<'a> {
    /// Create a reconciler over `directory`.
    #[must_use]
    pub fn new(directory: &'a DirectoryClient) -> Self {
        Self { directory }
    }

    /// Set `group` on `customer_id`.
    ///
    /// Tries the precise update first. Statuses showing the precise form is
    /// unsupported for this store move on to the bulk form, whose failure is
    /// final.
    ///
    /// # Errors
    ///
    /// Returns the precise update's error if it was not a shape mismatch,
    /// otherwise the bulk update's error.
    pub async fn apply(
        &self,
        customer_id: CustomerId,
        group: GroupId,
    ) -> Result<GroupUpdateForm, DirectoryError> {
        let updates = [GroupUpdate {
            id: customer_id,
            customer_group_id: group,
        }];

        let (_, form) = first_success(
            "apply_group",
            vec![
                Attempt::new(
                    "PATCH v3/customers/{id}",
                    ApiGeneration::Modern,
                    GROUP_UPDATE_MISMATCH,
                    self.directory
                        .patch_group(customer_id, group)
                        .map(|r| r.map(|()| GroupUpdateForm::Precise))
                        .boxed(),
                ),
                Attempt::new(
                    "PUT v3/customers",
                    ApiGeneration::Modern,
                    &[],
                    self.directory
                        .bulk_update_groups(&updates)
                        .map(|r| r.map(|()| GroupUpdateForm::Bulk))
                        .boxed(),
                ),
            ],
        )
        .await?;

        tracing::info!(
            customer_id = %customer_id,
            group_id = %group,
            form = ?form,
            "Customer group applied"
        );

        Ok(form)
    }
}
