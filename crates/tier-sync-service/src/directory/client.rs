//! Commerce-platform customer API client.
//!
//! The platform exposes two API generations with incompatible shapes. The
//! raw calls below speak one generation each; [`DirectoryClient::lookup_by_email`]
//! and [`DirectoryClient::create_customer`] combine them through
//! [`first_success`].

use futures::FutureExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;

use tier_sync_core::{normalize_email, CustomerId, CustomerName, DirectoryCustomer, GroupId};

use super::fallback::{first_success, ApiGeneration, Attempt, CREATE_MISMATCH, LOOKUP_MISMATCH};
use super::types::{
    CustomerRecord, DataEnvelope, DirectoryErrorBody, GroupPatch, GroupUpdate,
    LookupByEmailRequest, NewCustomer,
};

/// Longest upstream error text kept in an error message.
const MAX_ERROR_TEXT: usize = 200;

/// Error type for commerce-platform operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// HTTP request failed before a status was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {message}")]
    Status {
        /// Which raw call failed.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Error text from the platform, truncated.
        message: String,
    },

    /// A success response did not have the expected shape.
    #[error("{operation} returned an unexpected body: {reason}")]
    Malformed {
        /// Which raw call failed.
        operation: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DirectoryError {
    /// HTTP status, when the platform returned one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A newly created customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCustomer {
    /// The new record.
    pub customer: DirectoryCustomer,
    /// Whether the requested group was already set by the create call.
    pub group_applied: bool,
    /// Which generation created it.
    pub generation: ApiGeneration,
}

/// Commerce-platform customer API client.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: String,
    client_id: String,
    access_token: String,
    assign_group_at_create: bool,
}

impl DirectoryClient {
    /// Create a new directory client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Store API root, e.g. `https://api.example.com/stores/abc123`
    /// * `client_id` - Sent as `X-Auth-Client`
    /// * `access_token` - Sent as `X-Auth-Token`
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Configuration`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DirectoryError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            access_token: access_token.into(),
            assign_group_at_create: true,
        })
    }

    /// Choose whether the modern create call sets the group directly.
    #[must_use]
    pub fn with_group_at_create(mut self, enabled: bool) -> Self {
        self.assign_group_at_create = enabled;
        self
    }

    /// Store API root requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
            .header("X-Auth-Client", &self.client_id)
            .header("X-Auth-Token", &self.access_token)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    // ------------------------------------------------------------------
    // Adapter operations
    // ------------------------------------------------------------------

    /// Find a customer by email.
    ///
    /// The email is trimmed and lowercased, and results are filtered to an
    /// exact case-insensitive match because both generations may return
    /// near matches.
    ///
    /// # Errors
    ///
    /// Returns the legacy error if both generations fail, or the modern
    /// error if it was not a missing-route signal.
    pub async fn lookup_by_email(
        &self,
        email: &str,
    ) -> Result<Option<DirectoryCustomer>, DirectoryError> {
        let Some(email) = normalize_email(email) else {
            return Ok(None);
        };

        let (generation, records) = first_success(
            "lookup_by_email",
            vec![
                Attempt::new(
                    "lookup-by-email",
                    ApiGeneration::Modern,
                    LOOKUP_MISMATCH,
                    self.lookup_modern(&email).boxed(),
                ),
                Attempt::new(
                    "customers?email",
                    ApiGeneration::Legacy,
                    &[],
                    self.lookup_legacy(&email).boxed(),
                ),
            ],
        )
        .await?;

        let found = records
            .into_iter()
            .map(DirectoryCustomer::from)
            .find(|c| c.matches_email(&email));

        tracing::debug!(
            email = %email,
            generation = %generation,
            customer_id = ?found.as_ref().map(|c| c.id),
            "Directory lookup finished"
        );

        Ok(found)
    }

    /// Create a customer.
    ///
    /// With `group` set and group-at-create enabled, the modern call sets the
    /// group in the same request. The legacy call cannot, so the caller must
    /// apply the group when [`CreatedCustomer::group_applied`] is `false`.
    ///
    /// # Errors
    ///
    /// Returns the legacy error if both generations fail, or the modern
    /// error if it was not a shape-mismatch signal.
    pub async fn create_customer(
        &self,
        email: &str,
        name: &CustomerName,
        group: Option<GroupId>,
    ) -> Result<CreatedCustomer, DirectoryError> {
        let email = normalize_email(email).ok_or_else(|| DirectoryError::Malformed {
            operation: "create_customer",
            reason: "email is blank".into(),
        })?;
        let group_at_create = group.filter(|_| self.assign_group_at_create);

        let modern = NewCustomer {
            email: &email,
            first_name: &name.first,
            last_name: &name.last,
            customer_group_id: group_at_create,
        };
        let legacy = NewCustomer {
            customer_group_id: None,
            ..modern.clone()
        };

        let (generation, record) = first_success(
            "create_customer",
            vec![
                Attempt::new(
                    "POST v3/customers",
                    ApiGeneration::Modern,
                    CREATE_MISMATCH,
                    self.create_modern(&modern).boxed(),
                ),
                Attempt::new(
                    "POST v2/customers",
                    ApiGeneration::Legacy,
                    &[],
                    self.create_legacy(&legacy).boxed(),
                ),
            ],
        )
        .await?;

        let group_applied = generation == ApiGeneration::Modern && group_at_create.is_some();
        let mut customer = DirectoryCustomer::from(record);
        if group_applied && customer.group_id.is_none() {
            customer.group_id = group_at_create;
        }

        tracing::info!(
            email = %email,
            customer_id = %customer.id,
            generation = %generation,
            group_applied,
            "Directory customer created"
        );

        Ok(CreatedCustomer {
            customer,
            group_applied,
            generation,
        })
    }

    // ------------------------------------------------------------------
    // Raw calls, one generation each
    // ------------------------------------------------------------------

    /// `POST v3/customers/lookup-by-email`.
    pub async fn lookup_modern(&self, email: &str) -> Result<Vec<CustomerRecord>, DirectoryError> {
        const OP: &str = "modern lookup";
        let response = self
            .request(Method::POST, "v3/customers/lookup-by-email")
            .json(&LookupByEmailRequest { emails: [email] })
            .send()
            .await?;

        let envelope: DataEnvelope<Vec<CustomerRecord>> = read_json(OP, response).await?;
        Ok(envelope.data)
    }

    /// `GET v2/customers?email=...`.
    pub async fn lookup_legacy(&self, email: &str) -> Result<Vec<CustomerRecord>, DirectoryError> {
        const OP: &str = "legacy lookup";
        let response = self
            .request(Method::GET, "v2/customers")
            .query(&[("email", email)])
            .send()
            .await?;

        let response = check_status(OP, response).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Malformed {
            operation: OP,
            reason: e.to_string(),
        })
    }

    /// `POST v3/customers` with a one-element array.
    pub async fn create_modern(
        &self,
        customer: &NewCustomer<'_>,
    ) -> Result<CustomerRecord, DirectoryError> {
        const OP: &str = "modern create";
        let response = self
            .request(Method::POST, "v3/customers")
            .json(&[customer])
            .send()
            .await?;

        let envelope: DataEnvelope<Vec<CustomerRecord>> = read_json(OP, response).await?;
        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| DirectoryError::Malformed {
                operation: OP,
                reason: "no customer in response data".into(),
            })
    }

    /// `POST v2/customers` with a single object.
    pub async fn create_legacy(
        &self,
        customer: &NewCustomer<'_>,
    ) -> Result<CustomerRecord, DirectoryError> {
        let response = self
            .request(Method::POST, "v2/customers")
            .json(customer)
            .send()
            .await?;

        read_json("legacy create", response).await
    }

    /// `PATCH v3/customers/{id}` setting only the group. Any 2xx succeeds,
    /// including an empty body.
    pub async fn patch_group(&self, id: CustomerId, group: GroupId) -> Result<(), DirectoryError> {
        let response = self
            .request(Method::PATCH, &format!("v3/customers/{id}"))
            .json(&GroupPatch {
                customer_group_id: group,
            })
            .send()
            .await?;

        check_status("precise group update", response).await?;
        Ok(())
    }

    /// `PUT v3/customers` with a list of `{id, customer_group_id}` entries.
    pub async fn bulk_update_groups(&self, updates: &[GroupUpdate]) -> Result<(), DirectoryError> {
        let response = self
            .request(Method::PUT, "v3/customers")
            .json(updates)
            .send()
            .await?;

        check_status("bulk group update", response).await?;
        Ok(())
    }
}

/// Pass success responses through; turn anything else into [`DirectoryError::Status`].
async fn check_status(
    operation: &'static str,
    response: Response,
) -> Result<Response, DirectoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DirectoryErrorBody>(&text)
        .ok()
        .and_then(|body| body.title.or(body.message))
        .unwrap_or_else(|| text.chars().take(MAX_ERROR_TEXT).collect());

    Err(DirectoryError::Status {
        operation,
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, DirectoryError> {
    let response = check_status(operation, response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Malformed {
        operation,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client =
            DirectoryClient::new("http://localhost:9000/stores/abc/", "id", "token").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/stores/abc");
    }

    #[test]
    fn only_status_errors_carry_a_status() {
        let err = DirectoryError::Status {
            operation: "x",
            status: 405,
            message: String::new(),
        };
        assert_eq!(err.status(), Some(405));
        let err = DirectoryError::Malformed {
            operation: "x",
            reason: String::new(),
        };
        assert_eq!(err.status(), None);
    }
}
