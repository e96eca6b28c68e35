//! Paced admission of waiting clients.
//!
//! The [`AdmissionWorker`] runs a periodic loop that moves the
//! longest-waiting clients out of the queue, at most the current admission
//! rate per tick, and issues each of them an [`AdmissionCredential`].
//! Operators can trigger extra passes with [`AdmissionWorker::admit_now`].
//!
//! [`AdmissionCredential`]: crate::queue::AdmissionCredential

mod config;
mod runner;
mod types;

pub use config::AdmissionConfig;
pub use runner::AdmissionWorker;
pub use types::{AdmissionError, AdmissionTrigger, WorkerStatus};
