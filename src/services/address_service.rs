use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::checkout::{AddressInput, CustomerAddresses},
    entity::{
        addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses, Model as AddressModel},
        customers::Entity as Customers,
    },
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Shipping,
    Billing,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Shipping => "shipping",
            AddressType::Billing => "billing",
        }
    }
}

/// Exact field comparison; casing and surrounding whitespace are significant.
pub fn same_address(existing: &AddressModel, candidate: &AddressInput) -> bool {
    existing.street == candidate.street
        && existing.city == candidate.city
        && existing.district == candidate.district
        && existing.postal_code == candidate.postal_code
}

/// Reuse the customer's latest address of `kind` when it matches, otherwise store a new row.
pub async fn resolve_address<C: ConnectionTrait>(
    conn: &C,
    customer_id: &str,
    kind: AddressType,
    fields: &AddressInput,
) -> AppResult<Uuid> {
    let latest = Addresses::find()
        .filter(AddressCol::CustomerId.eq(customer_id))
        .filter(AddressCol::AddressType.eq(kind.as_str()))
        .order_by_desc(AddressCol::CreatedAt)
        .one(conn)
        .await?;

    if let Some(existing) = latest.filter(|a| same_address(a, fields)) {
        tracing::debug!(customer_id, address_id = %existing.id, kind = kind.as_str(), "reusing address");
        return Ok(existing.id);
    }

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id.to_string()),
        address_type: Set(kind.as_str().to_string()),
        street: Set(fields.street.clone()),
        city: Set(fields.city.clone()),
        district: Set(fields.district.clone()),
        postal_code: Set(fields.postal_code.clone()),
        country: Set(fields.country.clone()),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    tracing::debug!(customer_id, address_id = %address.id, kind = kind.as_str(), "stored new address");
    Ok(address.id)
}

pub async fn customer_addresses(
    state: &AppState,
    customer_id: &str,
) -> AppResult<ApiResponse<CustomerAddresses>> {
    let customer = Customers::find_by_id(customer_id.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let addresses = Addresses::find()
        .filter(AddressCol::CustomerId.eq(customer_id))
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CustomerAddresses {
            customer: customer.into(),
            addresses,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn stored() -> AddressModel {
        AddressModel {
            id: Uuid::new_v4(),
            customer_id: "C001".into(),
            address_type: "shipping".into(),
            street: "12 Loom Lane".into(),
            city: "Kathmandu".into(),
            district: "Bagmati".into(),
            postal_code: "44600".into(),
            country: "Nepal".into(),
            created_at: Utc::now().into(),
        }
    }

    fn input() -> AddressInput {
        AddressInput {
            street: "12 Loom Lane".into(),
            city: "Kathmandu".into(),
            district: "Bagmati".into(),
            postal_code: "44600".into(),
            country: "Nepal".into(),
        }
    }

    #[test]
    fn identical_fields_match() {
        assert!(same_address(&stored(), &input()));
    }

    #[test]
    fn country_is_not_compared() {
        let mut candidate = input();
        candidate.country = "NP".into();
        assert!(same_address(&stored(), &candidate));
    }

    #[test]
    fn postal_code_change_is_a_new_address() {
        let mut candidate = input();
        candidate.postal_code = "44700".into();
        assert!(!same_address(&stored(), &candidate));
    }

    #[test]
    fn comparison_is_case_and_whitespace_sensitive() {
        let mut candidate = input();
        candidate.city = "kathmandu".into();
        assert!(!same_address(&stored(), &candidate));

        let mut candidate = input();
        candidate.street = "12 Loom Lane ".into();
        assert!(!same_address(&stored(), &candidate));
    }
}
