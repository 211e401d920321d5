pub mod album;
pub mod bought_album;
pub mod bought_track;
pub mod like_track;
pub mod listen_track;
pub mod payment_method;
pub mod track;
pub mod user;
pub mod user_payment_method;
