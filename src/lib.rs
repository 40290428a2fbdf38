//! Arogya: a clinic backend for low-resource primary healthcare centers.
//!
//! Patients arrive with stacks of paper prescriptions. The pipeline scans
//! them in batches, extracts structured data from each image, and
//! synthesizes a single medical timeline per patient. A visit scribe
//! transcribes nurse-patient consultations into SOAP notes. Everything is
//! served over a small JSON API backed by SQLite.

pub mod ai;
pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
