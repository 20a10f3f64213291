//! Lambda runtime integration for the CRM SOAP proxy.
//!
//! This crate owns environment configuration, the SOAP client with its
//! transport and signing seams, and the operation handlers. Domain
//! transformations live in `crm_proxy_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod soap;
