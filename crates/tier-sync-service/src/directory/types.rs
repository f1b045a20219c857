//! Commerce-platform wire types.

use serde::{Deserialize, Serialize};
use tier_sync_core::{CustomerId, DirectoryCustomer, GroupId};

/// Customer record as returned by either API generation.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    /// Platform id.
    pub id: CustomerId,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Current group.
    #[serde(default)]
    pub customer_group_id: Option<GroupId>,
}

impl From<CustomerRecord> for DirectoryCustomer {
    fn from(record: CustomerRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            group_id: record.customer_group_id,
        }
    }
}

/// Modern API responses wrap results in `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    /// Wrapped payload.
    pub data: T,
}

/// Body for `POST /v3/customers/lookup-by-email`.
#[derive(Debug, Clone, Serialize)]
pub struct LookupByEmailRequest<'a> {
    /// Emails to look up.
    pub emails: [&'a str; 1],
}

/// One customer in a create payload.
///
/// The modern API takes an array of these; the legacy API takes a single
/// object and does not accept `customer_group_id`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer<'a> {
    /// Email address.
    pub email: &'a str,
    /// Given name.
    pub first_name: &'a str,
    /// Family name.
    pub last_name: &'a str,
    /// Group to assign at creation (modern API only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_group_id: Option<GroupId>,
}

/// Body for `PATCH /v3/customers/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupPatch {
    /// Group to set.
    pub customer_group_id: GroupId,
}

/// One entry of the `PUT /v3/customers` bulk update.
#[derive(Debug, Clone, Serialize)]
pub struct GroupUpdate {
    /// Customer to update.
    pub id: CustomerId,
    /// Group to set.
    pub customer_group_id: GroupId,
}

/// Platform error body; both generations use some subset of these fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryErrorBody {
    /// Short title (modern API).
    #[serde(default)]
    pub title: Option<String>,
    /// Message (legacy API).
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_create_omits_group() {
        let body = NewCustomer {
            email: "a@x.com",
            first_name: "Ada",
            last_name: "Customer",
            customer_group_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("customer_group_id").is_none());
        assert_eq!(json["first_name"], "Ada");
    }

    #[test]
    fn record_tolerates_missing_group() {
        let record: CustomerRecord =
            serde_json::from_str(r#"{"id": 17, "email": "a@x.com"}"#).unwrap();
        let customer = DirectoryCustomer::from(record);
        assert_eq!(customer.id, CustomerId::new(17));
        assert_eq!(customer.group_id, None);
    }
}
