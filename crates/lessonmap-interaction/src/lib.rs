pub mod http_api;
pub mod utf8;

pub use http_api::HttpLessonApi;
pub use utf8::Utf8ChunkDecoder;
