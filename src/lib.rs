pub mod audio;
pub mod bank;
pub mod context;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod hirc;
pub mod store;
pub mod toc;
pub mod workset;

pub use audio::{wem_duration_ms, AudioSource, Owner};
pub use bank::{Bank, BankVersion};
pub use context::SessionContext;
pub use error::{Error, ErrorKind, Result};
pub use hash::{murmur64, stream_file_id};
pub use hirc::{HircBody, HircEntry};
pub use store::{AssetIds, AssetStore, ModifiedSet};
pub use toc::{decode, encode, Archive};
pub use workset::patch::{AssetRef, ImportReport, PATCH_NAME};
pub use workset::registry::ModRegistry;
pub use workset::WorkingSet;
