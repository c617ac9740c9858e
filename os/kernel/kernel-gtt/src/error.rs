use kernel_gpu_addresses::{GttAddress, PhysicalAddress};

#[derive(Debug, thiserror::Error)]
pub enum GttError {
    /// A page-table page could not be allocated.
    #[error("out of memory allocating page-table page {index}")]
    OutOfMemory { index: usize },

    /// Global table boundaries are inconsistent or exceed the table.
    #[error("invalid GTT range: start {start}, mappable end {mappable_end}, end {end}")]
    InvalidRange {
        start: GttAddress,
        mappable_end: GttAddress,
        end: GttAddress,
    },

    /// Registering the mappable aperture as fictitious memory failed.
    #[error("failed to register the fictitious aperture range (error {0})")]
    RangeReservationFailed(i32),

    /// The GPU did not go idle. Only ever logged.
    #[error("couldn't idle GPU")]
    IdleTimeout,

    /// A slot range does not fit the target table.
    #[error("slots {first}+{count} exceed table of {limit} entries")]
    SlotRangeOutOfBounds {
        first: usize,
        count: usize,
        limit: usize,
    },

    /// An object provides fewer backing pages than its size requires.
    #[error("object needs {needed} pages but provides {available}")]
    PageListTooShort { needed: usize, available: usize },

    /// A backing page lies beyond the physical address width entries encode.
    #[error("backing page {address} exceeds {bits} physical address bits")]
    AddressTooWide { address: PhysicalAddress, bits: u32 },

    /// The global table was already initialized.
    #[error("global table already initialized")]
    AlreadyInitialized,

    /// The hardware generation has no per-process translation.
    #[error("per-process translation is not supported on this generation")]
    PerProcessUnsupported,
}

pub type GttResult<T> = Result<T, GttError>;
