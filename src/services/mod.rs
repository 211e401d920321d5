pub mod accounts;
pub mod background;
pub mod catalog;
pub mod pagination;
pub mod payment_methods;
pub mod purchase;
pub mod track_activity;
