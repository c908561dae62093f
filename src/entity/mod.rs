pub mod addresses;
pub mod audit_logs;
pub mod customers;
pub mod order_details;
pub mod orders;
pub mod payment_methods;
pub mod product_variations;
pub mod products;
pub mod shipping_methods;
pub mod transactions;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use customers::Entity as Customers;
pub use order_details::Entity as OrderDetails;
pub use orders::Entity as Orders;
pub use payment_methods::Entity as PaymentMethods;
pub use product_variations::Entity as ProductVariations;
pub use products::Entity as Products;
pub use shipping_methods::Entity as ShippingMethods;
pub use transactions::Entity as Transactions;
