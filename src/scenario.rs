//! Transaction generators for every benchmark workload and their mixes

pub mod audit;
pub mod generator;
pub mod mix;
pub mod workload;

pub use audit::{audit_file, AuditReport, NonceGap};
pub use generator::{
    order_records, write_batch, GenerateOptions, Generator, Ordering, PlannedTx, SenderMode,
    SignedRecord,
};
pub use mix::Mix;
pub use workload::{Vm, Workload, ALL_WORKLOADS};
