pub mod hash;
pub mod headers;
pub mod html;
pub mod jwt;
pub mod notify;
