pub mod api_client;
pub mod call_result;
pub mod params;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError};
pub use call_result::{CallResult, Envelope};
pub use params::{Meta, Params};

use serde::{Deserialize, Serialize};

/// Maximum accepted size of a gallery upload, in bytes.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct StoryId(pub i64);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct TourId(pub i64);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct BookId(pub i64);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct GalleryImageId(pub i64);

/// Content categories exposed by the backend. The string form is the
/// resource path segment used by the list and CRUD endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Stories,
    Tours,
    Books,
    Gallery,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Stories => "stories",
            Resource::Tours => "tours",
            Resource::Books => "books",
            Resource::Gallery => "gallery",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
