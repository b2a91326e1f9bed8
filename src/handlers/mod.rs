// src/handlers/mod.rs

pub mod attempt;
pub mod auth;
pub mod exam;
pub mod notification;
pub mod paper;
pub mod profile;
pub mod question;
pub mod report;
