mod client;
pub mod path;

pub use client::{
    DirectoryListing, ErrorKind, FileEntry, FileReacherClient, FileReacherError, SessionToken,
    StoreInfo, UploadSession,
};
pub use path::{PathError, PathToken, RemotePath};
