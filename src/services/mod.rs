pub mod arbiter;
pub use arbiter::{Verdict, VersionArbiter};

pub mod balancer;
pub use balancer::{BalanceSummary, StorageBalancer};

pub mod disk;
pub use disk::{DfSpace, VolumeSpace};

pub mod media;
pub use media::{MediaProbe, MediaService};

pub mod resolver;
pub use resolver::{MetadataResolver, ResolveError};

pub mod sorter;
pub use sorter::{SortError, SortOutcome, SortSummary, Sorter};
