pub mod articulation;
pub mod assemblage;
pub mod automation;
pub mod chikari;
pub mod config;
pub mod error;
pub mod group;
pub mod instrument;
pub mod keys;
pub mod meter;
pub mod phoneme;
pub mod phrase;
pub mod piece;
pub mod pitch;
pub mod raga;
pub mod section;
pub mod store;
pub mod trajectory;
pub mod uid;
pub mod util;

pub use articulation::Articulation;
pub use assemblage::{Assemblage, AssemblageDescriptor, Strand};
pub use automation::Automation;
pub use chikari::Chikari;
pub use config::Settings;
pub use error::*;
pub use group::Group;
pub use instrument::Instrument;
pub use meter::{Layer, Meter, Pulse};
pub use phrase::{Phrase, PhraseOptions};
pub use piece::{Piece, PieceOptions};
pub use pitch::Pitch;
pub use raga::Raga;
pub use section::{Section, SectionCategorization};
pub use store::{DocumentStore, MemoryStore, UserProfile};
pub use trajectory::{Shape, Trajectory, TrajectoryOptions};
pub use uid::UniqueId;

/// Read a wire document and rebuild the piece it describes.
pub fn load_piece(source: &str) -> Result<Piece> {
    Piece::from_json(serde_json::from_str(source)?)
}
