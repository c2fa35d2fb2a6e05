pub mod cookies;
pub mod csrf;
pub mod extract;
pub mod password;
pub mod session;
pub mod signature;
pub mod sso;
