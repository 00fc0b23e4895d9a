mod local_media;
mod local_track;
mod track_sync;

pub use local_media::*;
pub use local_track::*;
pub use track_sync::*;
