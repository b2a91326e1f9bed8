// src/models/mod.rs

pub mod attempt;
pub mod exam;
pub mod notification;
pub mod paper;
pub mod question;
pub mod user;
