//! Data-transfer types shared by the biosys API: persisted models, request
//! payloads and upload reports.

pub mod model;
pub mod requests;
pub mod uploads;
