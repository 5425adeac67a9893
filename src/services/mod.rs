pub mod payment_gateway;
pub mod inventory_service;
pub mod entitlement_service;
pub mod purchase_service;
pub mod pix_service;
