// handlers/mod.rs - HTTP surface
//
// root      GET /, GET /health
// resource  generic owner-scoped CRUD, mounted once per collection
// qna       read-only filtered list
pub mod qna;
pub mod resource;
pub mod root;

pub use resource::ResourceRouter;
