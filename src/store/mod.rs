//! Client-side key/value storage backing the checkout session.
//!
//! Every backend implements [`StorageArea`]. The [`MemoryStorage`] keeps records in
//! process and is shared by all of its clones, which makes it the natural fit for
//! tests. The [`CookieStorage`] keeps every record on the client, so step data
//! survives full-page navigations without any server-side session.

mod cookie;
mod memory;
mod store_trait;

pub use cookie::*;
pub use memory::*;
pub use store_trait::*;
