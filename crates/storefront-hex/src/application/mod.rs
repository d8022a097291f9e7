pub mod cart;
pub mod checkout;
pub mod history;
pub mod shop_service;
