// src/services/mod.rs

pub mod catalog;
pub mod pool_service;
pub mod scoring_service;
