//! Secondary records written after an order commits.
//!
//! Each task runs on its own and a failure is logged, never propagated: the
//! order has already been committed by the time these run.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        payment_methods::{
            ActiveModel as PaymentMethodActive, Column as PaymentMethodCol,
            Entity as PaymentMethods,
        },
        transactions::ActiveModel as TransactionActive,
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Clone)]
pub enum Bookkeeping {
    RecordTransaction {
        order_id: String,
        amount: Decimal,
        payment_method: String,
        gateway: Option<String>,
    },
    RememberPaymentMethod {
        customer_id: String,
        method_type: String,
        last_four: Option<String>,
        brand: Option<String>,
        expiry: Option<String>,
    },
    UpdateCustomerStats {
        customer_id: String,
        order_total: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub task: &'static str,
    pub succeeded: bool,
}

impl Bookkeeping {
    pub fn name(&self) -> &'static str {
        match self {
            Bookkeeping::RecordTransaction { .. } => "record_transaction",
            Bookkeeping::RememberPaymentMethod { .. } => "remember_payment_method",
            Bookkeeping::UpdateCustomerStats { .. } => "update_customer_stats",
        }
    }

    pub async fn apply(&self, conn: &DatabaseConnection) -> AppResult<()> {
        match self {
            Bookkeeping::RecordTransaction {
                order_id,
                amount,
                payment_method,
                gateway,
            } => {
                TransactionActive {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id.clone()),
                    amount: Set(*amount),
                    payment_method: Set(payment_method.clone()),
                    gateway: Set(gateway.clone()),
                    gateway_transaction_id: Set(None),
                    status: Set("Pending".into()),
                    created_at: NotSet,
                    updated_at: NotSet,
                }
                .insert(conn)
                .await?;
                Ok(())
            }
            Bookkeeping::RememberPaymentMethod {
                customer_id,
                method_type,
                last_four,
                brand,
                expiry,
            } => {
                remember_payment_method(conn, customer_id, method_type, last_four, brand, expiry)
                    .await
            }
            Bookkeeping::UpdateCustomerStats {
                customer_id,
                order_total,
            } => {
                let now = Utc::now();
                let updated = Customers::update_many()
                    .col_expr(CustomerCol::OrderCount, Expr::col(CustomerCol::OrderCount).add(1))
                    .col_expr(
                        CustomerCol::TotalSpent,
                        Expr::col(CustomerCol::TotalSpent).add(*order_total),
                    )
                    .col_expr(CustomerCol::LastOrderAt, Expr::value(now))
                    .col_expr(CustomerCol::UpdatedAt, Expr::value(now))
                    .filter(CustomerCol::CId.eq(customer_id.as_str()))
                    .exec(conn)
                    .await?;
                if updated.rows_affected == 0 {
                    return Err(AppError::NotFound);
                }
                Ok(())
            }
        }
    }
}

/// Mark the used instrument as the customer's default and demote the rest.
async fn remember_payment_method(
    conn: &DatabaseConnection,
    customer_id: &str,
    method_type: &str,
    last_four: &Option<String>,
    brand: &Option<String>,
    expiry: &Option<String>,
) -> AppResult<()> {
    let txn = conn.begin().await?;

    let mut finder = PaymentMethods::find()
        .filter(PaymentMethodCol::CustomerId.eq(customer_id))
        .filter(PaymentMethodCol::MethodType.eq(method_type));
    finder = match last_four {
        Some(digits) => finder.filter(PaymentMethodCol::LastFour.eq(digits.as_str())),
        None => finder.filter(PaymentMethodCol::LastFour.is_null()),
    };

    let method_id = match finder.one(&txn).await? {
        Some(existing) => {
            let id = existing.id;
            let mut active: PaymentMethodActive = existing.into();
            active.is_default = Set(true);
            if brand.is_some() {
                active.brand = Set(brand.clone());
            }
            if expiry.is_some() {
                active.expiry = Set(expiry.clone());
            }
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;
            id
        }
        None => {
            PaymentMethodActive {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer_id.to_string()),
                method_type: Set(method_type.to_string()),
                last_four: Set(last_four.clone()),
                brand: Set(brand.clone()),
                expiry: Set(expiry.clone()),
                is_default: Set(true),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
            .id
        }
    };

    PaymentMethods::update_many()
        .col_expr(PaymentMethodCol::IsDefault, Expr::value(false))
        .filter(PaymentMethodCol::CustomerId.eq(customer_id))
        .filter(PaymentMethodCol::Id.ne(method_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(())
}

/// Run every task, logging failures. Returns one outcome per task, in order.
pub async fn run_all(conn: &DatabaseConnection, tasks: Vec<Bookkeeping>) -> Vec<TaskOutcome> {
    let mut outcomes = Vec::with_capacity(tasks.len());
    for task in tasks {
        let succeeded = match task.apply(conn).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(task = task.name(), error = %err, "bookkeeping step failed");
                false
            }
        };
        outcomes.push(TaskOutcome {
            task: task.name(),
            succeeded,
        });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_names_are_stable() {
        let tasks = [
            Bookkeeping::RecordTransaction {
                order_id: "O001".into(),
                amount: Decimal::from(10),
                payment_method: "cod".into(),
                gateway: None,
            },
            Bookkeeping::RememberPaymentMethod {
                customer_id: "C001".into(),
                method_type: "card".into(),
                last_four: Some("4242".into()),
                brand: None,
                expiry: None,
            },
            Bookkeeping::UpdateCustomerStats {
                customer_id: "C001".into(),
                order_total: Decimal::from(10),
            },
        ];
        let names: Vec<_> = tasks.iter().map(Bookkeeping::name).collect();
        assert_eq!(
            names,
            ["record_transaction", "remember_payment_method", "update_customer_stats"]
        );
    }
}
