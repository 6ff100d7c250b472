pub mod catalog;
pub mod identity;
pub mod media;
pub mod metadata;

pub use catalog::{FileVariant, Season, Title, TitleContent};
pub use identity::{CandidateIdentity, Slot};
pub use media::MediaInfo;
pub use metadata::{SearchHit, SeasonInfo, TitleMetadata};
