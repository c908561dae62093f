pub mod address_service;
pub mod admin_service;
pub mod bookkeeping;
pub mod checkout_service;
pub mod inventory_service;
pub mod order_id;
pub mod order_service;
pub mod product_service;
