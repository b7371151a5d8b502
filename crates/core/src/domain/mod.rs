pub mod characteristic;
pub mod news;
pub mod score;
pub mod snapshot;
pub mod stock;

pub use characteristic::{Characteristic, ScoreLevel};
pub use news::NewsItem;
pub use score::{CharacteristicScore, MultibaggerScore, Verdict};
pub use snapshot::{Snapshot, SnapshotSummary};
pub use stock::Stock;
