//! Service layer for business logic
//!
//! This module contains the lockout policy and the login flow built on top of it.

pub mod lockout;
pub mod login;

pub use lockout::LockoutService;
pub use login::LoginService;
